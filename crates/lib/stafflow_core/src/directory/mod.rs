//! The directory — persistence boundary for accounts, employees, allowed
//! domains, and refresh tokens.
//!
//! Everything above this module talks to the [`Directory`] trait;
//! [`postgres::PgDirectory`] is the production implementation and
//! [`memory::MemoryDirectory`] backs hermetic tests and dev mode.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{AllowedDomain, Employee, RefreshTokenRecord, Role, UserAccount};

/// Directory errors.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Input for atomic account + employee provisioning.
#[derive(Debug, Clone)]
pub struct ProvisionRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Unusable placeholder hash; no flow verifies passwords.
    pub credential_hash: String,
    pub role: Role,
}

/// Result of a provisioning attempt. `created` is false when the email
/// already had an account, in which case the existing rows are returned
/// untouched.
#[derive(Debug, Clone)]
pub struct ProvisionOutcome {
    pub account: UserAccount,
    pub employee: Employee,
    pub created: bool,
}

/// Persistence collaborator for the authentication core.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn find_account_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserAccount>, DirectoryError>;

    async fn find_employee_for_account(
        &self,
        account_id: Uuid,
    ) -> Result<Option<Employee>, DirectoryError>;

    async fn find_employee(&self, id: Uuid) -> Result<Option<Employee>, DirectoryError>;

    async fn list_employees(&self) -> Result<Vec<Employee>, DirectoryError>;

    /// Replace the employee's single role. `NotFound` if the employee
    /// does not exist.
    async fn set_employee_role(
        &self,
        employee_id: Uuid,
        role: Role,
    ) -> Result<Employee, DirectoryError>;

    /// Create an account and linked employee in one atomic step. Backed
    /// by the unique email constraint, so concurrent first logins for the
    /// same address cannot double-provision.
    async fn provision_account(
        &self,
        request: ProvisionRequest,
    ) -> Result<ProvisionOutcome, DirectoryError>;

    async fn touch_last_login(&self, account_id: Uuid) -> Result<(), DirectoryError>;

    async fn list_domains(&self) -> Result<Vec<AllowedDomain>, DirectoryError>;

    /// Whether `domain` has an active allowlist entry.
    async fn is_domain_allowed(&self, domain: &str) -> Result<bool, DirectoryError>;

    async fn store_refresh_token(
        &self,
        token_hash: &str,
        account_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DirectoryError>;

    /// Find a non-revoked, non-expired refresh token by hash.
    async fn find_valid_refresh_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, DirectoryError>;

    async fn revoke_refresh_token(&self, id: Uuid) -> Result<(), DirectoryError>;

    async fn revoke_refresh_token_by_hash(&self, token_hash: &str) -> Result<(), DirectoryError>;
}
