//! Authentication service — login, registration, and refresh rotation.
//!
//! SECURITY NOTE: login is email-only by design. The request carries no
//! password and none is verified; an email that resolves to an active
//! account with a linked employee is authenticated. This contract is
//! inherited from the product's front-end flow and is asserted by the
//! integration tests — do not add password verification here without a
//! product decision.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::info;

use stafflow_core::auth::password::placeholder_credential;
use stafflow_core::directory::ProvisionRequest;
use stafflow_core::models::Role;
use stafflow_core::uuid::uuidv7;
use uuid::Uuid;

use crate::dto::{AuthResponse, LogoutResponse, RegisterRequest};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// SHA-256 hash a refresh token for storage.
pub fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Claims embedded in access tokens.
fn identity_claims(user_id: Uuid, email: &str, role: Role, employee_id: Uuid) -> Map<String, Value> {
    let mut claims = Map::new();
    claims.insert("roles".into(), Value::String(role.as_str().into()));
    claims.insert("userId".into(), Value::String(user_id.to_string()));
    claims.insert("email".into(), Value::String(email.to_string()));
    claims.insert("employeeId".into(), Value::String(employee_id.to_string()));
    claims
}

/// Mint an access + refresh pair, track the refresh token by hash, and
/// build the auth response.
pub async fn issue_session(
    state: &AppState,
    user_id: Uuid,
    email: &str,
    role: Role,
    employee_id: Uuid,
    first_name: String,
    last_name: String,
) -> ApiResult<AuthResponse> {
    let claims = identity_claims(user_id, email, role, employee_id);
    let token = state.tokens.issue_access_token(email, &claims)?;

    let mut refresh_claims = Map::new();
    refresh_claims.insert("userId".into(), Value::String(user_id.to_string()));
    // Unique token id: two refreshes in the same second must not mint
    // byte-identical JWTs (the hash is a unique key).
    refresh_claims.insert("jti".into(), Value::String(uuidv7().to_string()));
    let refresh_token = state.tokens.issue_refresh_token(email, &refresh_claims)?;
    let expires_at = state.tokens.extract_expiry(&refresh_token)?;
    state
        .directory
        .store_refresh_token(&hash_refresh_token(&refresh_token), user_id, expires_at)
        .await?;

    Ok(AuthResponse {
        token,
        refresh_token,
        user_id,
        email: email.to_string(),
        role,
        employee_id,
        first_name,
        last_name,
    })
}

/// Email-only login. No password involved (see module note).
pub async fn login(state: &AppState, email: &str) -> ApiResult<AuthResponse> {
    let account = state
        .directory
        .find_account_by_email(email)
        .await?
        .filter(|a| a.active)
        .ok_or_else(|| ApiError::NotFound(format!("No account for {email}")))?;
    let employee = state
        .directory
        .find_employee_for_account(account.id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No employee linked to {email}")))?;

    state.directory.touch_last_login(account.id).await?;
    info!(email, "login");

    issue_session(
        state,
        account.id,
        &account.email,
        employee.role,
        employee.id,
        employee.first_name,
        employee.last_name,
    )
    .await
}

fn validate_registration(req: &RegisterRequest) -> Result<(), ApiError> {
    let mut errors = BTreeMap::new();
    if req.email.trim().is_empty() {
        errors.insert("email".to_string(), "must not be blank".to_string());
    } else if !req.email.contains('@') {
        errors.insert("email".to_string(), "must be a valid email address".to_string());
    }
    if req.first_name.trim().is_empty() {
        errors.insert("firstName".to_string(), "must not be blank".to_string());
    }
    if req.last_name.trim().is_empty() {
        errors.insert("lastName".to_string(), "must not be blank".to_string());
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}

/// Register a new account + employee with the default role, then log the
/// caller straight in.
pub async fn register(state: &AppState, req: &RegisterRequest) -> ApiResult<AuthResponse> {
    validate_registration(req)?;

    let credential_hash =
        placeholder_credential().map_err(|e| ApiError::Internal(e.to_string()))?;
    let outcome = state
        .directory
        .provision_account(ProvisionRequest {
            email: req.email.trim().to_string(),
            first_name: req.first_name.trim().to_string(),
            last_name: req.last_name.trim().to_string(),
            credential_hash,
            role: Role::Employee,
        })
        .await?;
    if !outcome.created {
        return Err(ApiError::Conflict(format!(
            "Email already registered: {}",
            req.email.trim()
        )));
    }
    info!(email = %outcome.account.email, "registered new account");

    issue_session(
        state,
        outcome.account.id,
        &outcome.account.email,
        outcome.employee.role,
        outcome.employee.id,
        outcome.employee.first_name,
        outcome.employee.last_name,
    )
    .await
}

/// Exchange a refresh token for a new pair (single-use rotation). The
/// token must carry a valid signature and expiry AND still have a live
/// tracked record.
pub async fn refresh(state: &AppState, refresh_token: &str) -> ApiResult<AuthResponse> {
    let subject = state
        .tokens
        .extract_subject(refresh_token)
        .map_err(|_| ApiError::Unauthorized("Invalid refresh token".into()))?;
    if !state.tokens.validate(refresh_token, &subject) {
        return Err(ApiError::Unauthorized("Invalid refresh token".into()));
    }

    let record = state
        .directory
        .find_valid_refresh_token(&hash_refresh_token(refresh_token))
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid refresh token".into()))?;

    let account = state
        .directory
        .find_account_by_email(&subject)
        .await?
        .filter(|a| a.active && a.id == record.user_account_id)
        .ok_or_else(|| ApiError::Unauthorized("Invalid refresh token".into()))?;
    let employee = state
        .directory
        .find_employee_for_account(account.id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid refresh token".into()))?;

    // Rotate: mint and store the replacement first, then kill the
    // presented token. A failed issuance must leave the old token live.
    let response = issue_session(
        state,
        account.id,
        &account.email,
        employee.role,
        employee.id,
        employee.first_name,
        employee.last_name,
    )
    .await?;
    state.directory.revoke_refresh_token(record.id).await?;

    Ok(response)
}

/// Revoke a tracked refresh token.
pub async fn logout(state: &AppState, refresh_token: Option<&str>) -> ApiResult<LogoutResponse> {
    if let Some(token) = refresh_token {
        state
            .directory
            .revoke_refresh_token_by_hash(&hash_refresh_token(token))
            .await?;
    }
    Ok(LogoutResponse { success: true })
}
