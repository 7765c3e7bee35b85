//! The account linker — the single just-in-time provisioning path for
//! federated logins.
//!
//! Every federated entry point must go through [`AccountLinker::link`];
//! provisioning logic is deliberately not duplicated anywhere else.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use super::LinkError;
use super::provider::{ProviderKind, resolve_identity};
use crate::auth::password::placeholder_credential;
use crate::directory::{Directory, ProvisionRequest};
use crate::models::Role;

/// Identity handed back after linking, with everything the caller needs
/// to mint a token and redirect the browser.
#[derive(Debug, Clone)]
pub struct LinkedIdentity {
    pub user_id: Uuid,
    pub employee_id: Uuid,
    pub email: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub newly_provisioned: bool,
}

/// Resolves or just-in-time provisions a local account from provider
/// claims.
pub struct AccountLinker {
    directory: Arc<dyn Directory>,
}

impl AccountLinker {
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self { directory }
    }

    /// Normalize claims, enforce the domain allowlist, then resolve or
    /// provision the local account. The allowlist check runs before any
    /// write; a rejected login leaves no state behind.
    pub async fn link(
        &self,
        kind: ProviderKind,
        claims: &serde_json::Value,
    ) -> Result<LinkedIdentity, LinkError> {
        let identity = resolve_identity(kind, claims).ok_or(LinkError::MissingEmail)?;

        let domain = identity
            .email
            .rsplit_once('@')
            .map(|(_, domain)| domain)
            .filter(|d| !d.is_empty())
            .ok_or(LinkError::MissingEmail)?;
        if !self.directory.is_domain_allowed(domain).await? {
            return Err(LinkError::DomainNotAllowed(domain.to_string()));
        }

        if let Some(account) = self.directory.find_account_by_email(&identity.email).await? {
            if !account.active {
                return Err(LinkError::Credential("account is inactive".into()));
            }
            let employee = self
                .directory
                .find_employee_for_account(account.id)
                .await?
                .ok_or_else(|| {
                    LinkError::Credential(format!("no employee linked to {}", identity.email))
                })?;
            self.directory.touch_last_login(account.id).await?;
            return Ok(LinkedIdentity {
                user_id: account.id,
                employee_id: employee.id,
                email: account.email,
                role: employee.role,
                first_name: employee.first_name,
                last_name: employee.last_name,
                newly_provisioned: false,
            });
        }

        let credential_hash =
            placeholder_credential().map_err(|e| LinkError::Credential(e.to_string()))?;
        let outcome = self
            .directory
            .provision_account(ProvisionRequest {
                email: identity.email.clone(),
                first_name: identity.first_name,
                last_name: identity.last_name,
                credential_hash,
                role: Role::Employee,
            })
            .await?;
        if outcome.created {
            info!(
                email = %outcome.account.email,
                provider = kind.slug(),
                "provisioned account from federated login"
            );
        }
        Ok(LinkedIdentity {
            user_id: outcome.account.id,
            employee_id: outcome.employee.id,
            email: outcome.account.email,
            role: outcome.employee.role,
            first_name: outcome.employee.first_name,
            last_name: outcome.employee.last_name,
            newly_provisioned: outcome.created,
        })
    }
}
