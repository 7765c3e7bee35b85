//! # stafflow_core
//!
//! Core domain logic for Stafflow.

pub mod auth;
pub mod directory;
pub mod migrate;
pub mod models;
pub mod oauth;
pub mod uuid;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}
