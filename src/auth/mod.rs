/*!
 * # Authorization Module
 *
 * Bearer token checks for the registry endpoints. Tokens are HS256 JWTs
 * whose claims carry `roles` and `permissions`; route groups are gated with
 * [`AuthRouterExt::with_permission`]. The gate is only installed when
 * `auth_enabled` is set.
 */

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::AppConfig;

mod permissions;

pub use permissions::*;

/// Claim structure for JWT tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,              // Subject (user or service id)
    pub roles: Vec<String>,       // Roles, `admin` grants everything
    pub permissions: Vec<String>, // Explicit `resource:action` grants
    pub jti: String,              // JWT ID
    pub iat: i64,                 // Issued at time
    pub exp: i64,                 // Expiration time
    pub nbf: i64,                 // Not valid before time
    pub iss: String,              // Issuer
    pub aud: String,              // Audience
}

/// Authenticated caller extracted from the bearer token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: String,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    pub token_id: String,
}

impl AuthUser {
    /// Check if the user has a specific role
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Check if the user has a specific permission
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(consts::ADMIN_ROLE)
    }
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            roles: claims.roles,
            permissions: claims.permissions,
            token_id: claims.jti,
        }
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_audience: String,
    pub jwt_issuer: String,
    pub access_token_expiration: Duration,
}

impl AuthConfig {
    pub fn new(jwt_secret: String, jwt_audience: String, jwt_issuer: String) -> Self {
        Self {
            jwt_secret,
            jwt_audience,
            jwt_issuer,
            access_token_expiration: Duration::from_secs(60 * 60),
        }
    }
}

impl From<&AppConfig> for AuthConfig {
    fn from(config: &AppConfig) -> Self {
        Self::new(
            config.jwt_secret.clone(),
            config.auth_audience.clone(),
            config.auth_issuer.clone(),
        )
    }
}

/// Issues and validates bearer tokens
#[derive(Debug, Clone)]
pub struct AuthService {
    pub config: AuthConfig,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// Signs a token for `subject`. Used by operators to mint client tokens
    /// and by tests.
    pub fn issue_token(
        &self,
        subject: &str,
        roles: Vec<String>,
        permissions: Vec<String>,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = now
            + ChronoDuration::from_std(self.config.access_token_expiration)
                .map_err(|_| AuthError::InternalError("Invalid token duration".to_string()))?;

        let claims = Claims {
            sub: subject.to_string(),
            roles,
            permissions,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            nbf: now.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    /// Validate a JWT token and extract the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.config.jwt_issuer.as_str()]);
        validation.set_audience(&[self.config.jwt_audience.as_str()]);
        validation.validate_nbf = true;

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })
    }
}

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing token")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code, error_message): (StatusCode, &str, String) = match &self {
            Self::MissingToken => (
                StatusCode::UNAUTHORIZED,
                "AUTH_MISSING_TOKEN",
                "No authentication token provided".to_string(),
            ),
            Self::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INVALID_TOKEN",
                "Invalid authentication token".to_string(),
            ),
            Self::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                "AUTH_TOKEN_EXPIRED",
                "Token has expired".to_string(),
            ),
            Self::TokenCreation(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_TOKEN_CREATION_FAILED",
                "Token creation failed".to_string(),
            ),
            Self::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                "AUTH_INSUFFICIENT_PERMISSIONS",
                "Insufficient permissions".to_string(),
            ),
            Self::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_INTERNAL_ERROR",
                "Internal server error".to_string(),
            ),
        };

        let body = Json(serde_json::json!({
            "error": error_code,
            "message": error_message,
            "request_id": crate::tracing::current_request_id().map(|id| id.to_string()),
            "timestamp": Utc::now().to_rfc3339(),
        }));

        (status, body).into_response()
    }
}

/// Permission middleware to check if a user has the required permission
pub async fn permission_middleware(
    State(required_permission): State<String>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or(AuthError::MissingToken)?;

    // Admins have all permissions
    if user.is_admin() || user.has_permission(&required_permission) {
        return Ok(next.run(request).await);
    }

    warn!(
        user_id = %user.user_id,
        permission = %required_permission,
        "Permission denied"
    );
    Err(AuthError::InsufficientPermissions)
}

/// Authentication middleware that extracts and validates bearer tokens
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => {
            return AuthError::InternalError("Authentication service not available".to_string())
                .into_response();
        }
    };

    match extract_auth_from_headers(request.headers(), &auth_service) {
        Ok(user) => {
            debug!(user_id = %user.user_id, "Authenticated request");
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

fn extract_auth_from_headers(
    headers: &HeaderMap,
    auth_service: &AuthService,
) -> Result<AuthUser, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingToken)?;

    let token = value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)?;

    auth_service.validate_token(token).map(AuthUser::from)
}

pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_permission(self, permission: &str) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_permission(self, permission: &str) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            permission.to_string(),
            permission_middleware,
        ))
        .with_auth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use axum::{body::Body, extract::Extension, http::Request as HttpRequest, routing::get, Router};
    use tower::ServiceExt;

    fn service() -> AuthService {
        AuthService::new(AuthConfig::new(
            "k3y-for-tests-0123456789abcdefghijklmnop".to_string(),
            "partmaster-clients".to_string(),
            "partmaster-api".to_string(),
        ))
    }

    fn app(service: AuthService) -> Router {
        Router::new()
            .route("/items", get(|| async { "ok" }))
            .with_permission(consts::ITEMS_READ)
            .layer(Extension(Arc::new(service)))
    }

    async fn status_for(token: Option<String>) -> StatusCode {
        let mut builder = HttpRequest::builder().uri("/items");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        app(service())
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[test]
    fn issued_token_validates() {
        let svc = service();
        let token = svc
            .issue_token("planner", vec![], vec![consts::ITEMS_READ.to_string()])
            .unwrap();
        let claims = svc.validate_token(&token).unwrap();
        assert_eq!(claims.sub, "planner");
        assert_eq!(claims.permissions, vec![consts::ITEMS_READ.to_string()]);
    }

    #[test]
    fn token_from_other_secret_or_audience_is_rejected() {
        let token = service().issue_token("x", vec![], vec![]).unwrap();

        let mut other = service();
        other.config.jwt_secret = "another-secret-that-is-long-enough-000".to_string();
        assert_matches!(other.validate_token(&token), Err(AuthError::InvalidToken));

        let mut other = service();
        other.config.jwt_audience = "someone-else".to_string();
        assert_matches!(other.validate_token(&token), Err(AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn missing_token_is_unauthorized() {
        assert_eq!(status_for(None).await, StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_for(Some("not-a-jwt".to_string())).await,
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn permission_is_enforced() {
        let svc = service();
        let writer = svc
            .issue_token("w", vec![], vec![consts::ITEMS_WRITE.to_string()])
            .unwrap();
        let reader = svc
            .issue_token("r", vec![], vec![consts::ITEMS_READ.to_string()])
            .unwrap();
        let admin = svc
            .issue_token("a", vec![consts::ADMIN_ROLE.to_string()], vec![])
            .unwrap();

        assert_eq!(status_for(Some(writer)).await, StatusCode::FORBIDDEN);
        assert_eq!(status_for(Some(reader)).await, StatusCode::OK);
        assert_eq!(status_for(Some(admin)).await, StatusCode::OK);
    }
}
