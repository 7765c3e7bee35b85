//! PostgreSQL directory implementation.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{Directory, DirectoryError, ProvisionOutcome, ProvisionRequest};
use crate::models::{AllowedDomain, Employee, RefreshTokenRecord, Role, UserAccount};
use crate::uuid::uuidv7;

/// Directory backed by PostgreSQL.
#[derive(Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

type AccountRow = (Uuid, String, bool, DateTime<Utc>, Option<DateTime<Utc>>);
type EmployeeRow = (Uuid, String, String, String, Option<Uuid>, NaiveDate, bool);

fn account_from_row(row: AccountRow) -> UserAccount {
    UserAccount {
        id: row.0,
        email: row.1,
        active: row.2,
        created_at: row.3,
        last_login: row.4,
    }
}

fn employee_from_row(row: EmployeeRow) -> Result<Employee, DirectoryError> {
    Ok(Employee {
        id: row.0,
        first_name: row.1,
        last_name: row.2,
        role: row.3.parse::<Role>().map_err(DirectoryError::Internal)?,
        user_account_id: row.4,
        hire_date: row.5,
        active: row.6,
    })
}

const EMPLOYEE_COLS: &str =
    "id, first_name, last_name, role::text, user_account_id, hire_date, active";

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Directory for PgDirectory {
    async fn find_account_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserAccount>, DirectoryError> {
        let row = sqlx::query_as::<_, AccountRow>(
            "SELECT id, email, active, created_at, last_login \
             FROM user_accounts WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(account_from_row))
    }

    async fn find_employee_for_account(
        &self,
        account_id: Uuid,
    ) -> Result<Option<Employee>, DirectoryError> {
        let row = sqlx::query_as::<_, EmployeeRow>(&format!(
            "SELECT {EMPLOYEE_COLS} FROM employees WHERE user_account_id = $1"
        ))
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(employee_from_row).transpose()
    }

    async fn find_employee(&self, id: Uuid) -> Result<Option<Employee>, DirectoryError> {
        let row = sqlx::query_as::<_, EmployeeRow>(&format!(
            "SELECT {EMPLOYEE_COLS} FROM employees WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(employee_from_row).transpose()
    }

    async fn list_employees(&self) -> Result<Vec<Employee>, DirectoryError> {
        let rows = sqlx::query_as::<_, EmployeeRow>(&format!(
            "SELECT {EMPLOYEE_COLS} FROM employees ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(employee_from_row).collect()
    }

    async fn set_employee_role(
        &self,
        employee_id: Uuid,
        role: Role,
    ) -> Result<Employee, DirectoryError> {
        let row = sqlx::query_as::<_, EmployeeRow>(&format!(
            "UPDATE employees SET role = $2::employee_role WHERE id = $1 \
             RETURNING {EMPLOYEE_COLS}"
        ))
        .bind(employee_id)
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => employee_from_row(row),
            None => Err(DirectoryError::NotFound(format!(
                "employee {employee_id}"
            ))),
        }
    }

    async fn provision_account(
        &self,
        request: ProvisionRequest,
    ) -> Result<ProvisionOutcome, DirectoryError> {
        let mut tx = self.pool.begin().await?;

        // ON CONFLICT DO NOTHING + re-select makes concurrent first
        // logins for the same email converge on one row.
        let inserted = sqlx::query_as::<_, AccountRow>(
            "INSERT INTO user_accounts (email, password_hash, active, created_at, last_login) \
             VALUES ($1, $2, true, now(), now()) \
             ON CONFLICT (email) DO NOTHING \
             RETURNING id, email, active, created_at, last_login",
        )
        .bind(&request.email)
        .bind(&request.credential_hash)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(row) = inserted {
            let account = account_from_row(row);
            let employee_row = sqlx::query_as::<_, EmployeeRow>(&format!(
                "INSERT INTO employees \
                 (id, first_name, last_name, role, user_account_id, hire_date, active) \
                 VALUES ($1, $2, $3, $4::employee_role, $5, current_date, true) \
                 RETURNING {EMPLOYEE_COLS}"
            ))
            .bind(uuidv7())
            .bind(&request.first_name)
            .bind(&request.last_name)
            .bind(request.role.as_str())
            .bind(account.id)
            .fetch_one(&mut *tx)
            .await?;
            tx.commit().await?;
            return Ok(ProvisionOutcome {
                employee: employee_from_row(employee_row)?,
                account,
                created: true,
            });
        }
        tx.commit().await?;

        // Lost the race (or the account predates this call): hand back
        // the existing rows untouched.
        let account = self
            .find_account_by_email(&request.email)
            .await?
            .ok_or_else(|| DirectoryError::Internal("account vanished after conflict".into()))?;
        let employee = self
            .find_employee_for_account(account.id)
            .await?
            .ok_or_else(|| {
                DirectoryError::NotFound(format!("employee for account {}", account.id))
            })?;
        Ok(ProvisionOutcome {
            account,
            employee,
            created: false,
        })
    }

    async fn touch_last_login(&self, account_id: Uuid) -> Result<(), DirectoryError> {
        sqlx::query("UPDATE user_accounts SET last_login = now() WHERE id = $1")
            .bind(account_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_domains(&self) -> Result<Vec<AllowedDomain>, DirectoryError> {
        let rows = sqlx::query_as::<_, (Uuid, String, bool)>(
            "SELECT id, domain, active FROM allowed_domains WHERE active ORDER BY domain",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(id, domain, active)| AllowedDomain { id, domain, active })
            .collect())
    }

    async fn is_domain_allowed(&self, domain: &str) -> Result<bool, DirectoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM allowed_domains WHERE domain = $1 AND active)",
        )
        .bind(domain)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn store_refresh_token(
        &self,
        token_hash: &str,
        account_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DirectoryError> {
        sqlx::query(
            "INSERT INTO refresh_tokens (id, token_hash, user_account_id, expires_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(uuidv7())
        .bind(token_hash)
        .bind(account_id)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_valid_refresh_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, DirectoryError> {
        let row = sqlx::query_as::<_, (Uuid, Uuid, DateTime<Utc>, Option<DateTime<Utc>>)>(
            "SELECT id, user_account_id, expires_at, revoked_at \
             FROM refresh_tokens \
             WHERE token_hash = $1 AND revoked_at IS NULL AND expires_at > now()",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id, user_account_id, expires_at, revoked_at)| RefreshTokenRecord {
            id,
            user_account_id,
            expires_at,
            revoked_at,
        }))
    }

    async fn revoke_refresh_token(&self, id: Uuid) -> Result<(), DirectoryError> {
        sqlx::query("UPDATE refresh_tokens SET revoked_at = now() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn revoke_refresh_token_by_hash(&self, token_hash: &str) -> Result<(), DirectoryError> {
        sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = now() \
             WHERE token_hash = $1 AND revoked_at IS NULL",
        )
        .bind(token_hash)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
