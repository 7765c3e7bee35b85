//! Authentication middleware — Bearer token extraction, validation, and
//! principal resolution.
//!
//! This layer never rejects a request. A missing, malformed, expired, or
//! unresolvable token just leaves the request without a `Principal`; the
//! policy layer decides whether that matters for the matched route.

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use chrono::DateTime;
use tracing::debug;

use stafflow_core::models::Principal;

use crate::policy;
use crate::AppState;

/// Route-level middleware: resolves the bearer token into a `Principal`
/// in request extensions. Public routes skip token handling entirely.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let pattern = policy::matched_pattern(&request);
    if policy::is_public(&pattern) {
        return next.run(request).await;
    }
    if let Some(principal) = resolve_principal(&state, request.headers()).await {
        request.extensions_mut().insert(principal);
    }
    next.run(request).await
}

/// Validate the token and resolve its subject through the directory.
/// Any failure yields `None` — unauthenticated, never an error.
async fn resolve_principal(state: &AppState, headers: &HeaderMap) -> Option<Principal> {
    let header = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?;

    let subject = state.tokens.extract_subject(token).ok()?;
    if !state.tokens.validate(token, &subject) {
        debug!("rejecting invalid or expired bearer token");
        return None;
    }
    let claims = state.tokens.decode_claims(token).ok()?;

    // The subject must resolve to exactly one active account with a
    // linked employee, or the request proceeds unauthenticated.
    let account = state
        .directory
        .find_account_by_email(&subject)
        .await
        .ok()
        .flatten()?;
    if !account.active {
        debug!(email = %subject, "token subject resolves to inactive account");
        return None;
    }
    let employee = state
        .directory
        .find_employee_for_account(account.id)
        .await
        .ok()
        .flatten()?;

    Some(Principal {
        subject,
        user_id: account.id,
        role: employee.role,
        employee_id: employee.id,
        issued_at: DateTime::from_timestamp(claims.iat, 0)?,
        expires_at: DateTime::from_timestamp(claims.exp, 0)?,
    })
}
