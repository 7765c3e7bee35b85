//! Identity provider registry.
//!
//! Providers expose the same OIDC-ish surface but disagree on claim
//! names: Google puts the address under `email`, Microsoft under `mail`
//! or `userPrincipalName` depending on account type. Each provider
//! carries a fixed claim-key priority list; normalization tries the keys
//! in order and takes the first non-empty string.

use std::str::FromStr;

use serde_json::Value;
use url::Url;

/// Supported identity providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Google,
    Microsoft,
}

impl ProviderKind {
    /// URL path slug, e.g. `/api/auth/oauth2/google/...`.
    pub fn slug(&self) -> &'static str {
        match self {
            ProviderKind::Google => "google",
            ProviderKind::Microsoft => "microsoft",
        }
    }

    pub fn authorize_endpoint(&self) -> &'static str {
        match self {
            ProviderKind::Google => "https://accounts.google.com/o/oauth2/v2/auth",
            ProviderKind::Microsoft => {
                "https://login.microsoftonline.com/common/oauth2/v2.0/authorize"
            }
        }
    }

    pub fn token_endpoint(&self) -> &'static str {
        match self {
            ProviderKind::Google => "https://oauth2.googleapis.com/token",
            ProviderKind::Microsoft => {
                "https://login.microsoftonline.com/common/oauth2/v2.0/token"
            }
        }
    }

    pub fn userinfo_endpoint(&self) -> &'static str {
        match self {
            ProviderKind::Google => "https://openidconnect.googleapis.com/v1/userinfo",
            ProviderKind::Microsoft => "https://graph.microsoft.com/v1.0/me",
        }
    }

    pub fn scopes(&self) -> &'static str {
        match self {
            ProviderKind::Google => "openid email profile",
            ProviderKind::Microsoft => "openid email profile User.Read",
        }
    }

    /// Claim keys that may hold the email, in priority order.
    pub fn email_claims(&self) -> &'static [&'static str] {
        match self {
            ProviderKind::Google => &["email"],
            ProviderKind::Microsoft => &["mail", "userPrincipalName", "email"],
        }
    }

    /// Claim keys that may hold the first name, in priority order.
    pub fn first_name_claims(&self) -> &'static [&'static str] {
        match self {
            ProviderKind::Google => &["given_name"],
            ProviderKind::Microsoft => &["givenName"],
        }
    }

    /// Claim keys that may hold the last name, in priority order.
    pub fn last_name_claims(&self) -> &'static [&'static str] {
        match self {
            ProviderKind::Google => &["family_name"],
            ProviderKind::Microsoft => &["surname"],
        }
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(ProviderKind::Google),
            "microsoft" => Ok(ProviderKind::Microsoft),
            other => Err(format!("unknown provider: {other}")),
        }
    }
}

/// Client credentials for one registered provider.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub client_id: String,
    pub client_secret: String,
}

/// Identity fields resolved from provider claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub email: String,
    /// Blank when the provider exposed no name claim.
    pub first_name: String,
    pub last_name: String,
}

fn first_string_claim(claims: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| claims.get(*key))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Normalize provider claims into {email, first name, last name}.
/// Returns `None` when no email claim resolves.
pub fn resolve_identity(kind: ProviderKind, claims: &Value) -> Option<ResolvedIdentity> {
    let email = first_string_claim(claims, kind.email_claims())?;
    Some(ResolvedIdentity {
        email,
        first_name: first_string_claim(claims, kind.first_name_claims()).unwrap_or_default(),
        last_name: first_string_claim(claims, kind.last_name_claims()).unwrap_or_default(),
    })
}

/// Build the provider authorization redirect URL (authorization-code +
/// S256 PKCE).
pub fn build_authorization_url(
    kind: ProviderKind,
    settings: &ProviderSettings,
    redirect_uri: &str,
    state: &str,
    code_challenge: &str,
) -> String {
    // The endpoint constants are valid URLs, so this cannot fail.
    let mut url = Url::parse(kind.authorize_endpoint()).expect("static authorize endpoint");
    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", &settings.client_id)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("scope", kind.scopes())
        .append_pair("state", state)
        .append_pair("code_challenge", code_challenge)
        .append_pair("code_challenge_method", "S256");
    url.into()
}
