//! Token issuance, validation, and credential helpers.

pub mod password;
pub mod token;

use thiserror::Error;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Malformed, badly signed, or otherwise undecodable token.
    #[error("Invalid token")]
    InvalidToken,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
