//! JWT issuance and verification.
//!
//! Access tokens are pure bearer credentials: once issued they are valid
//! until expiry and cannot be revoked server-side. Refresh tokens use the
//! same format but are additionally tracked (by hash) through the
//! directory so they can be rotated and revoked. Do not add server-side
//! access-token revocation without an explicit revocation list; stateless
//! validation is a contract the front end relies on.

use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use serde_json::{Map, Value};
use tracing::info;

use super::AuthError;
use crate::models::TokenClaims;

/// Default access token lifetime: 24 hours.
pub const DEFAULT_ACCESS_TTL_SECS: i64 = 24 * 60 * 60;

/// Default refresh token lifetime: 7 days.
pub const DEFAULT_REFRESH_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Mints and verifies HS256-signed tokens from a symmetric secret.
#[derive(Clone)]
pub struct TokenService {
    secret: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(secret: String, access_ttl_secs: i64, refresh_ttl_secs: i64) -> Self {
        Self {
            secret,
            access_ttl: Duration::seconds(access_ttl_secs),
            refresh_ttl: Duration::seconds(refresh_ttl_secs),
        }
    }

    /// Issue a signed token for `subject` with the given extra claims and
    /// lifetime. `sub`, `iat`, and `exp` are set here; everything else is
    /// the caller's responsibility.
    pub fn issue(
        &self,
        subject: &str,
        claims: &Map<String, Value>,
        ttl: Duration,
    ) -> Result<String, AuthError> {
        if subject.is_empty() {
            return Err(AuthError::ValidationError("empty token subject".into()));
        }
        let now = Utc::now();
        let mut payload = claims.clone();
        payload.insert("sub".into(), Value::String(subject.to_string()));
        payload.insert("iat".into(), Value::from(now.timestamp()));
        payload.insert("exp".into(), Value::from((now + ttl).timestamp()));
        encode(
            &Header::default(),
            &Value::Object(payload),
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AuthError::Internal(format!("jwt encode: {e}")))
    }

    /// `issue` with the configured access-token TTL (default 24 h).
    pub fn issue_access_token(
        &self,
        subject: &str,
        claims: &Map<String, Value>,
    ) -> Result<String, AuthError> {
        self.issue(subject, claims, self.access_ttl)
    }

    /// `issue` with the configured refresh-token TTL (default 7 days).
    pub fn issue_refresh_token(
        &self,
        subject: &str,
        claims: &Map<String, Value>,
    ) -> Result<String, AuthError> {
        self.issue(subject, claims, self.refresh_ttl)
    }

    /// Verify signature, expiry, and subject. A token whose `exp` equals
    /// the current instant is already invalid, so a ttl=0 token never
    /// validates.
    pub fn validate(&self, token: &str, expected_subject: &str) -> bool {
        let Ok(payload) = self.decode_value(token) else {
            return false;
        };
        let Some(exp) = payload.get("exp").and_then(Value::as_i64) else {
            return false;
        };
        if Utc::now().timestamp() >= exp {
            return false;
        }
        payload.get("sub").and_then(Value::as_str) == Some(expected_subject)
    }

    /// Decode the subject. Checks the signature but deliberately not the
    /// expiry; callers combine with `validate` as needed.
    pub fn extract_subject(&self, token: &str) -> Result<String, AuthError> {
        let payload = self.decode_value(token)?;
        payload
            .get("sub")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(AuthError::InvalidToken)
    }

    /// Decode a single named claim; `None` when absent. No expiry check.
    pub fn extract_claim(&self, token: &str, name: &str) -> Result<Option<Value>, AuthError> {
        let payload = self.decode_value(token)?;
        Ok(payload.get(name).cloned())
    }

    /// Decode the expiry timestamp. No expiry check.
    pub fn extract_expiry(&self, token: &str) -> Result<DateTime<Utc>, AuthError> {
        let payload = self.decode_value(token)?;
        payload
            .get("exp")
            .and_then(Value::as_i64)
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .ok_or(AuthError::InvalidToken)
    }

    /// Decode the full typed claim set. Signature checked, expiry not.
    pub fn decode_claims(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let payload = self.decode_value(token)?;
        serde_json::from_value(Value::Object(payload)).map_err(|_| AuthError::InvalidToken)
    }

    /// Single decode path: signature verification only. Expiry is checked
    /// manually in `validate` so that `exp == now` is already invalid
    /// (jsonwebtoken's validator applies leeway).
    fn decode_value(&self, token: &str) -> Result<Map<String, Value>, AuthError> {
        let key = DecodingKey::from_secret(self.secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        let data = decode::<Value>(token, &key, &validation).map_err(|_| AuthError::InvalidToken)?;
        match data.claims {
            Value::Object(map) => Ok(map),
            _ => Err(AuthError::InvalidToken),
        }
    }
}

/// Resolve the JWT secret: env var `JWT_SECRET` → persisted file → generate.
pub fn resolve_jwt_secret() -> String {
    if let Ok(secret) = std::env::var("JWT_SECRET")
        && !secret.is_empty()
    {
        return secret;
    }
    let secret_path = jwt_secret_path();
    if let Ok(existing) = std::fs::read_to_string(&secret_path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let secret: String = rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();
    if let Some(parent) = secret_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = std::fs::write(&secret_path, &secret);
    info!(path = %secret_path.display(), "generated new JWT secret");
    secret
}

/// Path to the persisted JWT secret file.
fn jwt_secret_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stafflow")
        .join("jwt-secret")
}
