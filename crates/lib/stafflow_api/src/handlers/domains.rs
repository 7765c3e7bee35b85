//! Public email-domain allowlist lookups.

use axum::extract::{Query, State};
use axum::Json;

use crate::dto::{DomainCheckQuery, DomainCheckResponse, DomainEntry};
use crate::error::ApiResult;
use crate::AppState;

/// `GET /api/domains` — active allowlist entries.
pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<DomainEntry>>> {
    let domains = state.directory.list_domains().await?;
    Ok(Json(
        domains
            .into_iter()
            .map(|d| DomainEntry { domain: d.domain })
            .collect(),
    ))
}

/// `GET /api/domains/check?domain=…` — whether a domain may provision.
pub async fn check(
    State(state): State<AppState>,
    Query(query): Query<DomainCheckQuery>,
) -> ApiResult<Json<DomainCheckResponse>> {
    let allowed = state.directory.is_domain_allowed(&query.domain).await?;
    Ok(Json(DomainCheckResponse {
        domain: query.domain,
        allowed,
    }))
}
