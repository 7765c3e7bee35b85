//! Application error types and the uniform JSON error envelope.
//!
//! Errors render as `{timestamp, status, error, message, path}`. The
//! `path` field is filled in by [`error_envelope`], the outermost
//! middleware, because only it sees the request URI; `ApiError` itself
//! parks its parts in a response extension. Request-body validation
//! failures are the one exception: they render as a `{field: message}`
//! map with 400.

use std::collections::BTreeMap;

use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

use stafflow_core::auth::AuthError;
use stafflow_core::directory::DirectoryError;
use stafflow_core::oauth::LinkError;

/// Convenience alias for handler return types.
pub type ApiResult<T> = Result<T, ApiError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request-body validation failures, field name → message.
    #[error("Validation failed")]
    Validation(BTreeMap<String, String>),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but insufficient role. Fixed message.
    #[error("Access denied")]
    Forbidden,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    /// Single-field validation error.
    pub fn invalid_field(field: &str, message: &str) -> Self {
        let mut map = BTreeMap::new();
        map.insert(field.to_string(), message.to_string());
        ApiError::Validation(map)
    }
}

/// Uniform JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub timestamp: String,
    pub status: u16,
    pub error: String,
    pub message: String,
    pub path: String,
}

/// Error parts stashed in response extensions for the envelope layer.
#[derive(Debug, Clone)]
struct ErrorParts {
    status: StatusCode,
    error: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::Validation(fields) => {
                return (StatusCode::BAD_REQUEST, Json(fields)).into_response();
            }
            ApiError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, "unauthorized", m),
            ApiError::Forbidden => (
                StatusCode::FORBIDDEN,
                "forbidden",
                "Access denied".to_string(),
            ),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m),
            ApiError::Conflict(m) => (StatusCode::CONFLICT, "conflict", m),
            ApiError::Unavailable(m) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable", m),
            ApiError::Internal(m) => {
                tracing::error!(error = %m, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error".to_string(),
                )
            }
        };
        let mut resp = render_envelope(status, error, &message, "");
        resp.extensions_mut().insert(ErrorParts {
            status,
            error,
            message,
        });
        resp
    }
}

fn render_envelope(status: StatusCode, error: &str, message: &str, path: &str) -> Response {
    let body = ErrorBody {
        timestamp: Utc::now().to_rfc3339(),
        status: status.as_u16(),
        error: error.to_string(),
        message: message.to_string(),
        path: path.to_string(),
    };
    (status, Json(body)).into_response()
}

/// Outermost middleware: re-renders error responses with the request
/// path filled in.
pub async fn error_envelope(req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    let mut resp = next.run(req).await;
    if let Some(parts) = resp.extensions_mut().remove::<ErrorParts>() {
        return render_envelope(parts.status, parts.error, &parts.message, &path);
    }
    resp
}

/// Panic handler for tower-http's catch-panic layer: uniform 500 body.
pub fn handle_panic(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(panic = %detail, "request handler panicked");
    render_envelope(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        "Internal server error",
        "",
    )
}

impl From<DirectoryError> for ApiError {
    fn from(e: DirectoryError) -> Self {
        match e {
            DirectoryError::NotFound(m) => ApiError::NotFound(m),
            DirectoryError::Conflict(m) => ApiError::Conflict(m),
            DirectoryError::Database(e) => ApiError::Internal(e.to_string()),
            DirectoryError::Internal(m) => ApiError::Internal(m),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidToken => ApiError::Unauthorized("Invalid token".into()),
            AuthError::ValidationError(m) => ApiError::Internal(m),
            AuthError::Internal(m) => ApiError::Internal(m),
        }
    }
}

impl From<LinkError> for ApiError {
    fn from(e: LinkError) -> Self {
        match e {
            LinkError::MissingEmail => {
                ApiError::Unauthorized("No email claim from identity provider".into())
            }
            LinkError::DomainNotAllowed(domain) => {
                ApiError::Unauthorized(format!("Email domain not allowed: {domain}"))
            }
            LinkError::Provider(m) => {
                tracing::warn!(error = %m, "identity provider exchange failed");
                ApiError::Unauthorized("Federated authentication failed".into())
            }
            LinkError::Credential(m) => {
                tracing::warn!(error = %m, "federated login rejected");
                ApiError::Unauthorized("Federated authentication failed".into())
            }
            LinkError::Directory(e) => ApiError::from(e),
        }
    }
}
