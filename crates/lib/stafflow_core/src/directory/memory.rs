//! In-memory directory.
//!
//! Powers hermetic tests and database-less dev mode. A single `RwLock`
//! over the whole store makes provisioning trivially atomic.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Directory, DirectoryError, ProvisionOutcome, ProvisionRequest};
use crate::models::{AllowedDomain, Employee, RefreshTokenRecord, Role, UserAccount};
use crate::uuid::uuidv7;

#[derive(Default)]
struct Inner {
    accounts: HashMap<Uuid, UserAccount>,
    accounts_by_email: HashMap<String, Uuid>,
    employees: HashMap<Uuid, Employee>,
    domains: Vec<AllowedDomain>,
    refresh_tokens: HashMap<String, RefreshTokenRecord>,
}

/// Directory backed by in-process maps.
#[derive(Default)]
pub struct MemoryDirectory {
    inner: RwLock<Inner>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an active allowlist entry.
    pub async fn allow_domain(&self, domain: &str) {
        let mut inner = self.inner.write().await;
        inner.domains.push(AllowedDomain {
            id: uuidv7(),
            domain: domain.to_string(),
            active: true,
        });
    }

    /// Add an allowlist entry that exists but is inactive.
    pub async fn allow_domain_inactive(&self, domain: &str) {
        let mut inner = self.inner.write().await;
        inner.domains.push(AllowedDomain {
            id: uuidv7(),
            domain: domain.to_string(),
            active: false,
        });
    }

    /// Seed an active account + linked employee. Returns (account id,
    /// employee id).
    pub async fn seed_member(
        &self,
        email: &str,
        first_name: &str,
        last_name: &str,
        role: Role,
    ) -> (Uuid, Uuid) {
        let mut inner = self.inner.write().await;
        let account = UserAccount {
            id: uuidv7(),
            email: email.to_string(),
            active: true,
            created_at: Utc::now(),
            last_login: None,
        };
        let employee = Employee {
            id: uuidv7(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            role,
            user_account_id: Some(account.id),
            hire_date: Utc::now().date_naive(),
            active: true,
        };
        let ids = (account.id, employee.id);
        inner.accounts_by_email.insert(account.email.clone(), account.id);
        inner.accounts.insert(account.id, account);
        inner.employees.insert(employee.id, employee);
        ids
    }

    /// Mark a seeded account inactive.
    pub async fn deactivate_account(&self, account_id: Uuid) {
        let mut inner = self.inner.write().await;
        if let Some(account) = inner.accounts.get_mut(&account_id) {
            account.active = false;
        }
    }

    pub async fn account_count(&self) -> usize {
        self.inner.read().await.accounts.len()
    }

    pub async fn employee_count(&self) -> usize {
        self.inner.read().await.employees.len()
    }

    pub async fn last_login_of(&self, account_id: Uuid) -> Option<DateTime<Utc>> {
        self.inner
            .read()
            .await
            .accounts
            .get(&account_id)
            .and_then(|a| a.last_login)
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn find_account_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserAccount>, DirectoryError> {
        let inner = self.inner.read().await;
        Ok(inner
            .accounts_by_email
            .get(email)
            .and_then(|id| inner.accounts.get(id))
            .cloned())
    }

    async fn find_employee_for_account(
        &self,
        account_id: Uuid,
    ) -> Result<Option<Employee>, DirectoryError> {
        let inner = self.inner.read().await;
        Ok(inner
            .employees
            .values()
            .find(|e| e.user_account_id == Some(account_id))
            .cloned())
    }

    async fn find_employee(&self, id: Uuid) -> Result<Option<Employee>, DirectoryError> {
        Ok(self.inner.read().await.employees.get(&id).cloned())
    }

    async fn list_employees(&self) -> Result<Vec<Employee>, DirectoryError> {
        let inner = self.inner.read().await;
        let mut employees: Vec<Employee> = inner.employees.values().cloned().collect();
        employees.sort_by_key(|e| e.id);
        Ok(employees)
    }

    async fn set_employee_role(
        &self,
        employee_id: Uuid,
        role: Role,
    ) -> Result<Employee, DirectoryError> {
        let mut inner = self.inner.write().await;
        let employee = inner
            .employees
            .get_mut(&employee_id)
            .ok_or_else(|| DirectoryError::NotFound(format!("employee {employee_id}")))?;
        employee.role = role;
        Ok(employee.clone())
    }

    async fn provision_account(
        &self,
        request: ProvisionRequest,
    ) -> Result<ProvisionOutcome, DirectoryError> {
        let mut inner = self.inner.write().await;
        if let Some(&account_id) = inner.accounts_by_email.get(&request.email) {
            let account = inner
                .accounts
                .get(&account_id)
                .cloned()
                .ok_or_else(|| DirectoryError::Internal("dangling email index".into()))?;
            let employee = inner
                .employees
                .values()
                .find(|e| e.user_account_id == Some(account_id))
                .cloned()
                .ok_or_else(|| {
                    DirectoryError::NotFound(format!("employee for account {account_id}"))
                })?;
            return Ok(ProvisionOutcome {
                account,
                employee,
                created: false,
            });
        }

        let now = Utc::now();
        let account = UserAccount {
            id: uuidv7(),
            email: request.email.clone(),
            active: true,
            created_at: now,
            last_login: Some(now),
        };
        let employee = Employee {
            id: uuidv7(),
            first_name: request.first_name,
            last_name: request.last_name,
            role: request.role,
            user_account_id: Some(account.id),
            hire_date: now.date_naive(),
            active: true,
        };
        inner.accounts_by_email.insert(request.email, account.id);
        inner.accounts.insert(account.id, account.clone());
        inner.employees.insert(employee.id, employee.clone());
        Ok(ProvisionOutcome {
            account,
            employee,
            created: true,
        })
    }

    async fn touch_last_login(&self, account_id: Uuid) -> Result<(), DirectoryError> {
        let mut inner = self.inner.write().await;
        if let Some(account) = inner.accounts.get_mut(&account_id) {
            account.last_login = Some(Utc::now());
        }
        Ok(())
    }

    async fn list_domains(&self) -> Result<Vec<AllowedDomain>, DirectoryError> {
        Ok(self
            .inner
            .read()
            .await
            .domains
            .iter()
            .filter(|d| d.active)
            .cloned()
            .collect())
    }

    async fn is_domain_allowed(&self, domain: &str) -> Result<bool, DirectoryError> {
        Ok(self
            .inner
            .read()
            .await
            .domains
            .iter()
            .any(|d| d.domain == domain && d.active))
    }

    async fn store_refresh_token(
        &self,
        token_hash: &str,
        account_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DirectoryError> {
        let mut inner = self.inner.write().await;
        inner.refresh_tokens.insert(
            token_hash.to_string(),
            RefreshTokenRecord {
                id: uuidv7(),
                user_account_id: account_id,
                expires_at,
                revoked_at: None,
            },
        );
        Ok(())
    }

    async fn find_valid_refresh_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, DirectoryError> {
        let inner = self.inner.read().await;
        Ok(inner
            .refresh_tokens
            .get(token_hash)
            .filter(|r| r.revoked_at.is_none() && r.expires_at > Utc::now())
            .cloned())
    }

    async fn revoke_refresh_token(&self, id: Uuid) -> Result<(), DirectoryError> {
        let mut inner = self.inner.write().await;
        if let Some(record) = inner.refresh_tokens.values_mut().find(|r| r.id == id) {
            record.revoked_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn revoke_refresh_token_by_hash(&self, token_hash: &str) -> Result<(), DirectoryError> {
        let mut inner = self.inner.write().await;
        if let Some(record) = inner.refresh_tokens.get_mut(token_hash)
            && record.revoked_at.is_none()
        {
            record.revoked_at = Some(Utc::now());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(email: &str) -> ProvisionRequest {
        ProvisionRequest {
            email: email.to_string(),
            first_name: "New".into(),
            last_name: "Hire".into(),
            credential_hash: "$2b$10$placeholder".into(),
            role: Role::Employee,
        }
    }

    #[tokio::test]
    async fn provision_creates_account_and_employee_once() {
        let dir = MemoryDirectory::new();
        let first = dir.provision_account(request("a@company.com")).await.unwrap();
        assert!(first.created);
        assert_eq!(first.employee.role, Role::Employee);
        assert_eq!(first.employee.user_account_id, Some(first.account.id));

        let second = dir.provision_account(request("a@company.com")).await.unwrap();
        assert!(!second.created);
        assert_eq!(second.account.id, first.account.id);
        assert_eq!(dir.account_count().await, 1);
        assert_eq!(dir.employee_count().await, 1);
    }

    #[tokio::test]
    async fn domain_check_respects_active_flag() {
        let dir = MemoryDirectory::new();
        dir.allow_domain("company.com").await;
        dir.allow_domain_inactive("old.com").await;
        assert!(dir.is_domain_allowed("company.com").await.unwrap());
        assert!(!dir.is_domain_allowed("old.com").await.unwrap());
        assert!(!dir.is_domain_allowed("other.com").await.unwrap());
        assert_eq!(dir.list_domains().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn refresh_token_lifecycle() {
        let dir = MemoryDirectory::new();
        let (account_id, _) = dir.seed_member("a@company.com", "A", "B", Role::Hr).await;
        let expires = Utc::now() + chrono::Duration::days(7);
        dir.store_refresh_token("hash-1", account_id, expires).await.unwrap();

        let record = dir.find_valid_refresh_token("hash-1").await.unwrap().unwrap();
        assert_eq!(record.user_account_id, account_id);

        dir.revoke_refresh_token(record.id).await.unwrap();
        assert!(dir.find_valid_refresh_token("hash-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_refresh_token_is_not_valid() {
        let dir = MemoryDirectory::new();
        let (account_id, _) = dir.seed_member("a@company.com", "A", "B", Role::Hr).await;
        let expired = Utc::now() - chrono::Duration::minutes(1);
        dir.store_refresh_token("hash-2", account_id, expired).await.unwrap();
        assert!(dir.find_valid_refresh_token("hash-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_role_replaces_the_single_role() {
        let dir = MemoryDirectory::new();
        let (_, employee_id) = dir.seed_member("a@company.com", "A", "B", Role::Employee).await;
        let updated = dir.set_employee_role(employee_id, Role::Hr).await.unwrap();
        assert_eq!(updated.role, Role::Hr);
        assert!(matches!(
            dir.set_employee_role(uuidv7(), Role::Hr).await,
            Err(DirectoryError::NotFound(_))
        ));
    }
}
