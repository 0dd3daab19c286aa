#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use partmaster_api::{
    auth::{consts::ADMIN_ROLE, AuthConfig, AuthService},
    config::AppConfig,
    db,
    services::{bom::BomLineDraft, code_generator::ItemDraft},
    AppState,
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

pub const TEST_JWT_SECRET: &str = "test_secret_key_for_testing_purposes_only_32chars";

const MULTIPART_BOUNDARY: &str = "partmaster-test-boundary";

/// Application state and router backed by a throwaway SQLite file.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    auth_service: Arc<AuthService>,
    _db_dir: TempDir,
}

impl TestApp {
    /// Fresh database, authorization disabled.
    pub async fn new() -> Self {
        Self::build(|_| {}).await
    }

    /// Fresh database with bearer-token permission checks installed.
    pub async fn with_auth() -> Self {
        Self::build(|cfg| {
            cfg.auth_enabled = true;
            cfg.jwt_secret = TEST_JWT_SECRET.to_string();
        })
        .await
    }

    pub async fn build(customize: impl FnOnce(&mut AppConfig)) -> Self {
        let db_dir = tempfile::tempdir().expect("create temp dir for test database");
        let db_path = db_dir.path().join("partmaster_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.cors_allow_any_origin = true;
        cfg.db_max_connections = 4;
        cfg.db_min_connections = 1;
        customize(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let auth_service = Arc::new(AuthService::new(AuthConfig::from(&cfg)));
        let state = AppState::new(Arc::new(pool), cfg);
        let router = partmaster_api::build_router(state.clone());

        Self {
            router,
            state,
            auth_service,
            _db_dir: db_dir,
        }
    }

    /// Token carrying exactly the given permissions.
    pub fn token_with(&self, permissions: &[&str]) -> String {
        self.auth_service
            .issue_token(
                "test-user",
                Vec::new(),
                permissions.iter().map(|p| p.to_string()).collect(),
            )
            .expect("issue test token")
    }

    pub fn admin_token(&self) -> String {
        self.auth_service
            .issue_token("test-admin", vec![ADMIN_ROLE.to_string()], Vec::new())
            .expect("issue admin token")
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.request(Method::GET, uri, None, None).await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> Response {
        self.request(Method::POST, uri, Some(body), None).await
    }

    pub async fn put_json(&self, uri: &str, body: Value) -> Response {
        self.request(Method::PUT, uri, Some(body), None).await
    }

    /// Uploads `bytes` as the `file` field of a multipart form.
    pub async fn upload(&self, uri: &str, bytes: Vec<u8>, token: Option<&str>) -> Response {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"upload.xlsx\"\r\nContent-Type: application/vnd.openxmlformats-officedocument.spreadsheetml.sheet\r\n\r\n",
                b = MULTIPART_BOUNDARY
            )
            .as_bytes(),
        );
        body.extend_from_slice(&bytes);
        body.extend_from_slice(format!("\r\n--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());

        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", MULTIPART_BOUNDARY),
            );
        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let request = builder
            .body(Body::from(body))
            .expect("failed to build multipart request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during upload")
    }
}

/// Reads a JSON response body.
pub async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("response body is JSON")
}

pub async fn raw_body(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body")
        .to_vec()
}

pub fn assert_status(response: &Response, expected: StatusCode) {
    assert_eq!(response.status(), expected, "unexpected status");
}

pub fn item_draft(name: &str) -> ItemDraft {
    ItemDraft {
        division: "A".into(),
        industry_code: "E".into(),
        part_group: "A00".into(),
        item_name: name.into(),
        ..Default::default()
    }
}

pub fn bom_draft(code: &str, name: &str) -> BomLineDraft {
    BomLineDraft {
        electronic_code: code.into(),
        item_name: name.into(),
        ..Default::default()
    }
}
