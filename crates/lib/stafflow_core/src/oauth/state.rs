//! PKCE helpers and the in-memory login-state store.
//!
//! Between the authorize redirect and the provider callback we hold the
//! PKCE verifier keyed by the CSRF `state` parameter. Entries are single
//! use and expire after ten minutes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use sha2::{Digest, Sha256};

use super::provider::ProviderKind;

/// TTL for pending login states (10 minutes).
const STATE_TTL: Duration = Duration::from_secs(600);

/// Generate a cryptographic PKCE code verifier (43–128 chars, URL-safe).
pub fn generate_code_verifier() -> String {
    use base64::Engine;
    use rand::RngCore;

    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Compute the S256 code challenge for a verifier.
pub fn compute_code_challenge(verifier: &str) -> String {
    use base64::Engine;

    let digest = Sha256::digest(verifier.as_bytes());
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest)
}

/// Generate a cryptographic `state` parameter (CSRF token).
pub fn generate_state() -> String {
    use base64::Engine;
    use rand::RngCore;

    let mut bytes = [0u8; 24];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Pending login stored between the authorize redirect and the callback.
pub struct PendingLogin {
    pub provider: ProviderKind,
    pub pkce_verifier: String,
    pub created_at: Instant,
}

/// In-memory store for pending logins (keyed by `state`).
#[derive(Default)]
pub struct LoginStateStore {
    states: DashMap<String, PendingLogin>,
}

impl LoginStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, state_key: String, pending: PendingLogin) {
        self.states.insert(state_key, pending);
    }

    /// Take (remove and return) a pending login. `None` if unknown or
    /// expired — either way the entry is gone, so states are single use.
    pub fn take(&self, state_key: &str) -> Option<PendingLogin> {
        let (_, pending) = self.states.remove(state_key)?;
        if pending.created_at.elapsed() > STATE_TTL {
            return None;
        }
        Some(pending)
    }

    /// Evict expired entries.
    pub fn cleanup(&self) {
        self.states
            .retain(|_, v| v.created_at.elapsed() <= STATE_TTL);
    }

    /// Spawn a periodic cleanup task.
    pub fn spawn_cleanup_task(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                store.cleanup();
            }
        })
    }
}
