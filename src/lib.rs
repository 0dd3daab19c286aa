//! Part master and BOM registry.
//!
//! Items get a derived electronic code (`A-E-A00-00001A`) and a unique
//! sequence number; BOM lines link codes as parent and child without
//! enforcing that either exists.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod metrics;
pub mod middleware_helpers;
pub mod migrator;
pub mod models;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{
    extract::{DefaultBodyLimit, Extension, State},
    middleware,
    response::Json,
    routing::{get, post, put},
    Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use std::{sync::Arc, time::Instant};
use utoipa::ToSchema;

use crate::auth::consts as perm;
use crate::auth::{AuthConfig, AuthRouterExt, AuthService};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(db: Arc<DatabaseConnection>, config: config::AppConfig) -> Self {
        let services = handlers::AppServices::new(db.clone(), &config);
        Self {
            db,
            config,
            services,
            started_at: Instant::now(),
        }
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            meta: Some(ResponseMeta::capture()),
        }
    }
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn success_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-123"), async {
                ApiResponse::success("ok")
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-123"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }

    #[tokio::test]
    async fn error_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-err"), async {
                ApiResponse::<()>::error("oops".into())
            })
            .await;

        assert!(!response.success);
        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-err"));
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

fn gated(router: Router<AppState>, permission: &str, auth_enabled: bool) -> Router<AppState> {
    if auth_enabled {
        router.with_permission(permission)
    } else {
        router
    }
}

/// Versioned API. With `auth_enabled` every registry route requires a bearer
/// token carrying the route group's permission.
pub fn api_v1_routes(auth_enabled: bool) -> Router<AppState> {
    use handlers::{bom, items};

    let items_read = Router::new()
        .route("/items", get(items::list_items))
        .route("/items/last-no", get(items::last_no))
        .route("/items/last-code", get(items::last_code))
        .route("/items/export", get(items::export_items))
        .route("/items/{id}", get(items::get_item));

    let items_write = Router::new()
        .route("/items", post(items::create_item))
        .route(
            "/items/{id}",
            put(items::update_item).delete(items::delete_item),
        );

    let items_bulk = Router::new()
        .route("/items/import", post(items::import_items))
        .route("/items/bulk", post(items::bulk_create_items))
        .route("/items/bulk-delete", post(items::bulk_delete_items));

    let boms_read = Router::new()
        .route("/boms", get(bom::list_lines))
        .route("/boms/export", get(bom::export_lines))
        .route("/boms/{id}", get(bom::get_line));

    let boms_write = Router::new()
        .route("/boms", post(bom::create_line))
        .route("/boms/{id}", put(bom::update_line).delete(bom::delete_line))
        .route("/boms/{id}/code", post(bom::select_code))
        .route("/boms/{id}/parent", put(bom::set_parent));

    let boms_bulk = Router::new()
        .route("/boms/import", post(bom::import_lines))
        .route("/boms/bulk", post(bom::bulk_create_lines))
        .route("/boms/bulk-delete", post(bom::bulk_delete_lines));

    Router::new()
        // Status and health endpoints
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .merge(gated(items_read, perm::ITEMS_READ, auth_enabled))
        .merge(gated(items_write, perm::ITEMS_WRITE, auth_enabled))
        .merge(gated(items_bulk, perm::ITEMS_BULK, auth_enabled))
        .merge(gated(boms_read, perm::BOMS_READ, auth_enabled))
        .merge(gated(boms_write, perm::BOMS_WRITE, auth_enabled))
        .merge(gated(boms_bulk, perm::BOMS_BULK, auth_enabled))
}

/// Full application router minus the CORS and compression layers, which the
/// binary adds from configuration.
pub fn build_router(state: AppState) -> Router {
    let auth_service = Arc::new(AuthService::new(AuthConfig::from(&state.config)));
    let body_limit = state.config.max_body_size;
    let auth_enabled = state.config.auth_enabled;

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics::metrics_handler))
        .route("/metrics/json", get(metrics::metrics_json_handler))
        .nest("/api/v1", api_v1_routes(auth_enabled))
        .merge(openapi::swagger_ui())
        .layer(Extension(auth_service))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(metrics::track_http_metrics))
        // HTTP tracing layer for consistent request/response telemetry
        .layer(crate::tracing::configure_http_tracing())
        // Ensure every request carries a request id for traceability
        .layer(middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state)
}

async fn api_status(State(state): State<AppState>) -> Json<ApiResponse<Value>> {
    let status_data = json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "partmaster-api",
        "environment": state.config.environment,
        "auth_enabled": state.config.auth_enabled,
        "timestamp": Utc::now().to_rfc3339(),
    });
    Json(ApiResponse::success(status_data))
}

async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<Value>> {
    let db_status = match db::check_connection(&state.db).await {
        Ok(()) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": Utc::now().to_rfc3339(),
        "uptime_secs": state.started_at.elapsed().as_secs(),
    });
    Json(ApiResponse::success(health_data))
}
