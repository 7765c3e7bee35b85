//! Health endpoint.

use axum::Json;

use crate::dto::HealthResponse;

/// `GET /api/health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: stafflow_core::version(),
    })
}
