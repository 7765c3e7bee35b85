//! Shared test fixtures: in-memory directory, canned provider client,
//! and request helpers for driving the router with `oneshot`.

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use stafflow_api::config::ApiConfig;
use stafflow_api::AppState;
use stafflow_core::auth::token::TokenService;
use stafflow_core::directory::memory::MemoryDirectory;
use stafflow_core::directory::Directory;
use stafflow_core::oauth::client::IdentityProviderClient;
use stafflow_core::oauth::provider::{ProviderKind, ProviderSettings};
use stafflow_core::oauth::LinkError;

pub const JWT_SECRET: &str = "integration-test-secret";
pub const FRONTEND_URL: &str = "http://localhost:5173/auth/complete";

/// Provider client returning canned claims; no network involved.
pub struct FakeProviderClient {
    pub claims: Value,
}

#[async_trait]
impl IdentityProviderClient for FakeProviderClient {
    async fn exchange_code(
        &self,
        _kind: ProviderKind,
        _settings: &ProviderSettings,
        code: &str,
        _redirect_uri: &str,
        _code_verifier: &str,
    ) -> Result<String, LinkError> {
        if code == "bad-code" {
            return Err(LinkError::Provider("invalid authorization code".into()));
        }
        Ok("provider-access-token".into())
    }

    async fn fetch_claims(
        &self,
        _kind: ProviderKind,
        _access_token: &str,
    ) -> Result<Value, LinkError> {
        Ok(self.claims.clone())
    }
}

pub fn test_config() -> ApiConfig {
    ApiConfig {
        bind_addr: "127.0.0.1:0".into(),
        database_url: "postgres://unused".into(),
        jwt_secret: JWT_SECRET.into(),
        access_ttl_secs: 3600,
        refresh_ttl_secs: 86400,
        frontend_url: FRONTEND_URL.into(),
        oauth_redirect_base: "http://localhost:8080".into(),
        google: Some(ProviderSettings {
            client_id: "test-client".into(),
            client_secret: "test-client-secret".into(),
        }),
        microsoft: None,
    }
}

/// Token service matching the router's signing config, for asserting on
/// issued tokens.
pub fn token_service() -> TokenService {
    TokenService::new(JWT_SECRET.into(), 3600, 86400)
}

pub fn app_state(directory: Arc<MemoryDirectory>, provider_claims: Value) -> AppState {
    let directory: Arc<dyn Directory> = directory;
    AppState::new(
        directory,
        Arc::new(FakeProviderClient {
            claims: provider_claims,
        }),
        test_config(),
    )
}

pub async fn get(app: &Router, uri: &str, bearer: Option<&str>) -> Response<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    app.clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .expect("request")
}

pub async fn send_json(
    app: &Router,
    method: &str,
    uri: &str,
    bearer: Option<&str>,
    body: Value,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    app.clone()
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .expect("request")
}

pub async fn body_json(resp: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse JSON body")
}
