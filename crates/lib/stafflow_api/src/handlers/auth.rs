//! Authentication request handlers.

use axum::Json;
use axum::extract::State;

use crate::dto::{
    AuthResponse, LoginRequest, LogoutRequest, LogoutResponse, RefreshRequest, RegisterRequest,
};
use crate::error::ApiResult;
use crate::services::auth;
use crate::AppState;

/// `POST /api/auth/login` — email-only login (no password in this flow).
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let resp = auth::login(&state, &body.email).await?;
    Ok(Json(resp))
}

/// `POST /api/auth/register` — create account + employee, auto-login.
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let resp = auth::register(&state, &body).await?;
    Ok(Json(resp))
}

/// `POST /api/auth/refresh` — exchange a refresh token for a new pair.
pub async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let resp = auth::refresh(&state, &body.refresh_token).await?;
    Ok(Json(resp))
}

/// `POST /api/auth/logout` — revoke a refresh token.
pub async fn logout(
    State(state): State<AppState>,
    Json(body): Json<LogoutRequest>,
) -> ApiResult<Json<LogoutResponse>> {
    let resp = auth::logout(&state, body.refresh_token.as_deref()).await?;
    Ok(Json(resp))
}
