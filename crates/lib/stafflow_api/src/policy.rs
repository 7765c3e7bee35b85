//! Central authorization policy.
//!
//! One explicit table maps (method, matched route pattern) to a role
//! requirement, evaluated once per request by [`authorize`] — instead of
//! per-endpoint checks scattered through handlers. Routes that are
//! neither public nor listed default to "any authenticated role", so new
//! endpoints are protected until someone says otherwise.
//!
//! The authenticate layer never rejects; this layer owns the 401/403
//! decisions. Finer-grained ownership checks ("is this my record?") stay
//! in the handlers via `Principal::owns`.

use axum::extract::{MatchedPath, Request};
use axum::http::Method;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use stafflow_core::models::{Principal, Role};

use crate::error::ApiError;

/// Role requirement for one route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// No token needed.
    Public,
    /// Any authenticated principal.
    AnyAuthenticated,
    /// Principal's role must be in the set.
    AnyOf(&'static [Role]),
}

/// Route patterns that never require a token.
const PUBLIC_PATHS: &[&str] = &[
    "/api/health",
    "/api/auth/login",
    "/api/auth/register",
    "/api/auth/refresh",
    "/api/auth/logout",
    "/api/auth/oauth2/{provider}/authorize",
    "/api/auth/oauth2/{provider}/callback",
    "/api/domains",
    "/api/domains/check",
];

/// Look up the requirement for a matched route.
pub fn requirement(method: &Method, pattern: &str) -> Requirement {
    if PUBLIC_PATHS.contains(&pattern) {
        return Requirement::Public;
    }
    match (method.as_str(), pattern) {
        ("GET", "/api/employees") => Requirement::AnyOf(&[Role::Hr, Role::Admin]),
        ("GET", "/api/employees/me") => Requirement::AnyAuthenticated,
        // Ownership (self or HR/ADMIN) is enforced in the handler.
        ("GET", "/api/employees/{id}") => Requirement::AnyAuthenticated,
        ("PUT", "/api/employees/{id}/role") => Requirement::AnyOf(&[Role::Admin]),
        _ => Requirement::AnyAuthenticated,
    }
}

/// Whether a matched route is on the public allowlist.
pub fn is_public(pattern: &str) -> bool {
    PUBLIC_PATHS.contains(&pattern)
}

/// The matched route pattern, falling back to the raw path.
pub fn matched_pattern(req: &Request) -> String {
    req.extensions()
        .get::<MatchedPath>()
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string())
}

/// Route-level middleware: evaluates the policy table against the
/// principal installed by the authenticate layer.
pub async fn authorize(req: Request, next: Next) -> Response {
    let pattern = matched_pattern(&req);
    match requirement(req.method(), &pattern) {
        Requirement::Public => next.run(req).await,
        Requirement::AnyAuthenticated => {
            if req.extensions().get::<Principal>().is_some() {
                next.run(req).await
            } else {
                ApiError::Unauthorized("Authentication required".into()).into_response()
            }
        }
        Requirement::AnyOf(roles) => match req.extensions().get::<Principal>() {
            None => ApiError::Unauthorized("Authentication required".into()).into_response(),
            Some(principal) if principal.has_any_role(roles) => next.run(req).await,
            Some(_) => ApiError::Forbidden.into_response(),
        },
    }
}
