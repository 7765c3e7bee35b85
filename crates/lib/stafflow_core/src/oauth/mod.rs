//! Federated login: provider registry, PKCE login state, the provider
//! HTTP client seam, and the account linker.

pub mod client;
pub mod linker;
pub mod provider;
pub mod state;

use thiserror::Error;

use crate::directory::DirectoryError;

/// Federated-login errors.
#[derive(Debug, Error)]
pub enum LinkError {
    /// No email claim resolved from any of the provider's claim keys.
    #[error("No email claim in provider response")]
    MissingEmail,

    /// The email's domain has no active allowlist entry. Raised before
    /// any write occurs.
    #[error("Email domain not allowed: {0}")]
    DomainNotAllowed(String),

    /// Code exchange or userinfo fetch against the provider failed.
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Credential error: {0}")]
    Credential(String),

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}
