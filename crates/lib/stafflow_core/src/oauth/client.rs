//! Identity-provider HTTP client.
//!
//! The trait seam exists so the callback flow is testable without a live
//! provider; tests install a canned implementation.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::LinkError;
use super::provider::{ProviderKind, ProviderSettings};

/// Exchanges authorization codes and fetches userinfo claims.
#[async_trait]
pub trait IdentityProviderClient: Send + Sync {
    /// Exchange an authorization code (+ PKCE verifier) for a provider
    /// access token.
    async fn exchange_code(
        &self,
        kind: ProviderKind,
        settings: &ProviderSettings,
        code: &str,
        redirect_uri: &str,
        code_verifier: &str,
    ) -> Result<String, LinkError>;

    /// Fetch the raw userinfo claims for a provider access token.
    async fn fetch_claims(
        &self,
        kind: ProviderKind,
        access_token: &str,
    ) -> Result<Value, LinkError>;
}

/// Response from a provider token endpoint.
#[derive(Debug, Deserialize)]
struct ProviderTokenResponse {
    access_token: String,
}

/// reqwest-backed provider client.
#[derive(Default)]
pub struct HttpProviderClient {
    http: reqwest::Client,
}

impl HttpProviderClient {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityProviderClient for HttpProviderClient {
    async fn exchange_code(
        &self,
        kind: ProviderKind,
        settings: &ProviderSettings,
        code: &str,
        redirect_uri: &str,
        code_verifier: &str,
    ) -> Result<String, LinkError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", &settings.client_id),
            ("client_secret", &settings.client_secret),
            ("redirect_uri", redirect_uri),
            ("code_verifier", code_verifier),
        ];

        let resp = self
            .http
            .post(kind.token_endpoint())
            .form(&params)
            .send()
            .await
            .map_err(|e| LinkError::Provider(format!("token exchange failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(LinkError::Provider(format!(
                "token exchange HTTP {status}: {body}"
            )));
        }

        let token = resp
            .json::<ProviderTokenResponse>()
            .await
            .map_err(|e| LinkError::Provider(format!("token response parse error: {e}")))?;
        Ok(token.access_token)
    }

    async fn fetch_claims(
        &self,
        kind: ProviderKind,
        access_token: &str,
    ) -> Result<Value, LinkError> {
        let resp = self
            .http
            .get(kind.userinfo_endpoint())
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| LinkError::Provider(format!("userinfo fetch failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(LinkError::Provider(format!(
                "userinfo HTTP {status}: {body}"
            )));
        }

        resp.json::<Value>()
            .await
            .map_err(|e| LinkError::Provider(format!("userinfo parse error: {e}")))
    }
}
