//! Federated login flow: authorize redirect and provider callback.

use std::str::FromStr;

use axum::extract::{Path, Query, State};
use axum::response::Redirect;
use serde::Deserialize;
use tracing::info;
use url::Url;

use stafflow_core::oauth::provider::{ProviderKind, build_authorization_url};
use stafflow_core::oauth::state::{
    PendingLogin, compute_code_challenge, generate_code_verifier, generate_state,
};

use crate::error::{ApiError, ApiResult};
use crate::services::auth::issue_session;
use crate::AppState;

fn provider_from_slug(slug: &str) -> ApiResult<ProviderKind> {
    ProviderKind::from_str(slug).map_err(|_| ApiError::NotFound(format!("Unknown provider: {slug}")))
}

/// `GET /api/auth/oauth2/{provider}/authorize` — 302 to the provider.
pub async fn authorize(
    State(state): State<AppState>,
    Path(provider): Path<String>,
) -> ApiResult<Redirect> {
    let kind = provider_from_slug(&provider)?;
    let settings = state
        .config
        .provider_settings(kind)
        .ok_or_else(|| ApiError::Unavailable(format!("Provider not configured: {provider}")))?;

    let login_state = generate_state();
    let verifier = generate_code_verifier();
    let challenge = compute_code_challenge(&verifier);
    state.login_states.insert(
        login_state.clone(),
        PendingLogin {
            provider: kind,
            pkce_verifier: verifier,
            created_at: std::time::Instant::now(),
        },
    );

    let url = build_authorization_url(
        kind,
        settings,
        &state.config.redirect_uri(kind),
        &login_state,
        &challenge,
    );
    Ok(Redirect::temporary(&url))
}

/// Query parameters on the provider callback.
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: String,
    pub state: String,
}

/// `GET /api/auth/oauth2/{provider}/callback` — exchange the code, link
/// the account, and redirect to the front end with a token attached.
pub async fn callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(params): Query<CallbackParams>,
) -> ApiResult<Redirect> {
    let kind = provider_from_slug(&provider)?;
    let settings = state
        .config
        .provider_settings(kind)
        .ok_or_else(|| ApiError::Unavailable(format!("Provider not configured: {provider}")))?;

    let pending = state
        .login_states
        .take(&params.state)
        .filter(|p| p.provider == kind)
        .ok_or_else(|| ApiError::Unauthorized("Invalid or expired login state".into()))?;

    let provider_token = state
        .providers
        .exchange_code(
            kind,
            settings,
            &params.code,
            &state.config.redirect_uri(kind),
            &pending.pkce_verifier,
        )
        .await?;
    let claims = state.providers.fetch_claims(kind, &provider_token).await?;

    let linked = state.linker.link(kind, &claims).await?;
    info!(
        email = %linked.email,
        provider = kind.slug(),
        new = linked.newly_provisioned,
        "federated login"
    );

    let session = issue_session(
        &state,
        linked.user_id,
        &linked.email,
        linked.role,
        linked.employee_id,
        linked.first_name,
        linked.last_name,
    )
    .await?;

    // The refresh token is deliberately NOT put in the redirect URL.
    let mut url = Url::parse(&state.config.frontend_url)
        .map_err(|e| ApiError::Internal(format!("bad frontend URL: {e}")))?;
    url.query_pairs_mut()
        .append_pair("token", &session.token)
        .append_pair("userId", &session.user_id.to_string())
        .append_pair("email", &session.email)
        .append_pair("role", session.role.as_str())
        .append_pair("employeeId", &session.employee_id.to_string())
        .append_pair("firstName", &session.first_name)
        .append_pair("lastName", &session.last_name);
    Ok(Redirect::temporary(url.as_str()))
}
