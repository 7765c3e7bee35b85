//! Core domain models.
//!
//! These are internal domain models; the API crate owns the wire DTOs
//! (with `#[serde(rename_all = "camelCase")]` etc.). `TokenClaims` is the
//! exception: it is serialized directly into JWTs, so its wire names live
//! here.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The single role assigned to an employee. Exactly one role per employee
/// at a time; the string form is used verbatim as the token authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "ROLE_EMPLOYEE")]
    Employee,
    #[serde(rename = "ROLE_HR")]
    Hr,
    #[serde(rename = "ROLE_ADMIN")]
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Employee => "ROLE_EMPLOYEE",
            Role::Hr => "ROLE_HR",
            Role::Admin => "ROLE_ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ROLE_EMPLOYEE" => Ok(Role::Employee),
            "ROLE_HR" => Ok(Role::Hr),
            "ROLE_ADMIN" => Ok(Role::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// JWT claims embedded in access and refresh tokens.
///
/// `roles` carries a single role string (the employee's one role), kept
/// plural on the wire for compatibility with the front end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject — the account email.
    pub sub: String,
    /// Authority string, e.g. `ROLE_HR`.
    pub roles: String,
    #[serde(rename = "userId", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "employeeId", skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<Uuid>,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiry (unix timestamp).
    pub exp: i64,
}

/// The authenticated identity attached to a request once a token has been
/// validated and resolved through the directory. Request-scoped; never
/// persisted.
#[derive(Debug, Clone)]
pub struct Principal {
    /// Login identifier (account email).
    pub subject: String,
    pub user_id: Uuid,
    pub role: Role,
    pub employee_id: Uuid,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Principal {
    /// Whether the caller owns the resource belonging to `employee_id`.
    pub fn owns(&self, employee_id: Uuid) -> bool {
        self.employee_id == employee_id
    }

    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.contains(&self.role)
    }
}

/// A login account. One account optionally links to one employee.
#[derive(Debug, Clone)]
pub struct UserAccount {
    pub id: Uuid,
    pub email: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// An employee record. `user_account_id` is the 1:0..1 link to the login
/// account.
#[derive(Debug, Clone)]
pub struct Employee {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub user_account_id: Option<Uuid>,
    pub hire_date: NaiveDate,
    pub active: bool,
}

/// An email domain permitted to provision accounts via federated login.
#[derive(Debug, Clone)]
pub struct AllowedDomain {
    pub id: Uuid,
    pub domain: String,
    pub active: bool,
}

/// Refresh token record stored by SHA-256 hash. Access tokens are never
/// tracked; these are, so they can be revoked.
#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    pub id: Uuid,
    pub user_account_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}
