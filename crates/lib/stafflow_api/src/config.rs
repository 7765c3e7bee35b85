//! API server configuration.

use stafflow_core::auth::token::{
    DEFAULT_ACCESS_TTL_SECS, DEFAULT_REFRESH_TTL_SECS, resolve_jwt_secret,
};
use stafflow_core::oauth::provider::{ProviderKind, ProviderSettings};

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:8080").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// JWT signing secret.
    pub jwt_secret: String,
    /// Access token lifetime in seconds.
    pub access_ttl_secs: i64,
    /// Refresh token lifetime in seconds.
    pub refresh_ttl_secs: i64,
    /// Front-end base URL for the OAuth callback redirect.
    pub frontend_url: String,
    /// Base URL under which this server's OAuth callback routes are
    /// reachable from the provider.
    pub oauth_redirect_base: String,
    pub google: Option<ProviderSettings>,
    pub microsoft: Option<ProviderSettings>,
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                  | Default                                  |
    /// |---------------------------|------------------------------------------|
    /// | `BIND_ADDR`               | `127.0.0.1:8080`                         |
    /// | `DATABASE_URL`            | `postgres://localhost:5432/stafflow`     |
    /// | `JWT_SECRET`              | generated & persisted to file            |
    /// | `ACCESS_TOKEN_TTL_SECS`   | `86400` (24 h)                           |
    /// | `REFRESH_TOKEN_TTL_SECS`  | `604800` (7 days)                        |
    /// | `FRONTEND_URL`            | `http://localhost:5173`                  |
    /// | `OAUTH_REDIRECT_BASE`     | `http://localhost:8080`                  |
    /// | `GOOGLE_CLIENT_ID/_SECRET`, `MICROSOFT_CLIENT_ID/_SECRET` | unset → provider disabled |
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".into()),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost:5432/stafflow".into()),
            jwt_secret: resolve_jwt_secret(),
            access_ttl_secs: env_i64("ACCESS_TOKEN_TTL_SECS", DEFAULT_ACCESS_TTL_SECS),
            refresh_ttl_secs: env_i64("REFRESH_TOKEN_TTL_SECS", DEFAULT_REFRESH_TTL_SECS),
            frontend_url: std::env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".into()),
            oauth_redirect_base: std::env::var("OAUTH_REDIRECT_BASE")
                .unwrap_or_else(|_| "http://localhost:8080".into()),
            google: provider_from_env("GOOGLE_CLIENT_ID", "GOOGLE_CLIENT_SECRET"),
            microsoft: provider_from_env("MICROSOFT_CLIENT_ID", "MICROSOFT_CLIENT_SECRET"),
        }
    }

    /// Settings for a provider, or `None` when it is not configured.
    pub fn provider_settings(&self, kind: ProviderKind) -> Option<&ProviderSettings> {
        match kind {
            ProviderKind::Google => self.google.as_ref(),
            ProviderKind::Microsoft => self.microsoft.as_ref(),
        }
    }

    /// The redirect URI registered with the provider for `kind`.
    pub fn redirect_uri(&self, kind: ProviderKind) -> String {
        format!(
            "{}/api/auth/oauth2/{}/callback",
            self.oauth_redirect_base.trim_end_matches('/'),
            kind.slug()
        )
    }
}

fn env_i64(name: &str, default: i64) -> i64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn provider_from_env(id_var: &str, secret_var: &str) -> Option<ProviderSettings> {
    let client_id = std::env::var(id_var).ok().filter(|v| !v.is_empty())?;
    let client_secret = std::env::var(secret_var).ok().filter(|v| !v.is_empty())?;
    Some(ProviderSettings {
        client_id,
        client_secret,
    })
}
