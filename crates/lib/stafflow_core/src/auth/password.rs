//! Placeholder credentials for accounts that never log in with a password.
//!
//! Neither the email-only login nor the federated flow verifies a
//! password, but every account row carries a hash column. Provisioned
//! accounts get a bcrypt hash of a random 64-char string that is thrown
//! away immediately, so the credential can never be matched.

use rand::distr::Alphanumeric;
use rand::{Rng, rng};

use super::AuthError;

/// bcrypt cost factor.
const BCRYPT_COST: u32 = 10;

/// Generate an unusable placeholder credential hash.
pub fn placeholder_credential() -> Result<String, AuthError> {
    let random: String = rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();
    bcrypt::hash(&random, BCRYPT_COST)
        .map_err(|e| AuthError::Internal(format!("bcrypt hash: {e}")))
}
