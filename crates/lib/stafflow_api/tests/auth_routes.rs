//! Router-level tests for login, registration, refresh rotation, and the
//! role-gated employee endpoints. Hermetic: in-memory directory, no
//! database server.

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use common::{app_state, body_json, get, send_json, test_config, token_service, FakeProviderClient};
use stafflow_api::AppState;
use stafflow_core::directory::memory::MemoryDirectory;
use stafflow_core::directory::{Directory, DirectoryError, ProvisionOutcome, ProvisionRequest};
use stafflow_core::models::{AllowedDomain, Employee, RefreshTokenRecord, Role, UserAccount};

async fn seeded() -> (Arc<MemoryDirectory>, axum::Router) {
    let directory = Arc::new(MemoryDirectory::new());
    directory.allow_domain("company.com").await;
    directory
        .seed_member("hr@company.com", "Harriet", "Rhodes", Role::Hr)
        .await;
    directory
        .seed_member("admin@company.com", "Ada", "Minton", Role::Admin)
        .await;
    directory
        .seed_member("emp@company.com", "Evan", "Poole", Role::Employee)
        .await;
    let state = app_state(directory.clone(), json!({}));
    let app = stafflow_api::router(state);
    (directory, app)
}

async fn login_token(app: &axum::Router, email: &str) -> (String, String) {
    let resp = send_json(app, "POST", "/api/auth/login", None, json!({ "email": email })).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    (
        body["token"].as_str().unwrap().to_string(),
        body["refreshToken"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn health_requires_no_token() {
    let (_, app) = seeded().await;
    let resp = get(&app, "/api/health", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn login_is_email_only_and_returns_identity() {
    let (_, app) = seeded().await;
    // No password field anywhere in the request — this is the contract.
    let resp = send_json(
        &app,
        "POST",
        "/api/auth/login",
        None,
        json!({ "email": "hr@company.com" }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["email"], "hr@company.com");
    assert_eq!(body["role"], "ROLE_HR");
    assert_eq!(body["firstName"], "Harriet");
    assert_eq!(body["lastName"], "Rhodes");

    let token = body["token"].as_str().unwrap();
    let svc = token_service();
    assert!(svc.validate(token, "hr@company.com"));
    assert_eq!(
        svc.extract_claim(token, "roles").unwrap(),
        Some(json!("ROLE_HR"))
    );
}

#[tokio::test]
async fn login_unknown_email_is_404_with_error_envelope() {
    let (_, app) = seeded().await;
    let resp = send_json(
        &app,
        "POST",
        "/api/auth/login",
        None,
        json!({ "email": "nobody@company.com" }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = body_json(resp).await;
    assert_eq!(body["status"], 404);
    assert_eq!(body["error"], "not_found");
    assert_eq!(body["path"], "/api/auth/login");
    assert!(body["timestamp"].is_string());
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn login_inactive_account_is_404() {
    let (directory, app) = seeded().await;
    let (account_id, _) = directory
        .seed_member("gone@company.com", "G", "One", Role::Employee)
        .await;
    directory.deactivate_account(account_id).await;
    let resp = send_json(
        &app,
        "POST",
        "/api/auth/login",
        None,
        json!({ "email": "gone@company.com" }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn protected_route_without_token_is_401() {
    let (_, app) = seeded().await;
    let resp = get(&app, "/api/employees", None).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn garbage_token_is_401_not_500() {
    let (_, app) = seeded().await;
    let resp = get(&app, "/api/employees/me", Some("not-a-jwt")).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_role_is_403_with_fixed_message() {
    let (_, app) = seeded().await;
    let (token, _) = login_token(&app, "emp@company.com").await;
    let resp = get(&app, "/api/employees", Some(&token)).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body = body_json(resp).await;
    assert_eq!(body["message"], "Access denied");
}

#[tokio::test]
async fn hr_token_passes_hr_gate_but_not_admin_gate() {
    let (directory, app) = seeded().await;
    let (token, _) = login_token(&app, "hr@company.com").await;

    // HR-gated listing succeeds.
    let resp = get(&app, "/api/employees", Some(&token)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body.as_array().unwrap().len(), 3);

    // Admin-gated role update fails with the same token.
    let (_, employee_id) = directory
        .seed_member("target@company.com", "T", "Arget", Role::Employee)
        .await;
    let resp = send_json(
        &app,
        "PUT",
        &format!("/api/employees/{employee_id}/role"),
        Some(&token),
        json!({ "role": "ROLE_HR" }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_can_replace_an_employees_role() {
    let (directory, app) = seeded().await;
    let (token, _) = login_token(&app, "admin@company.com").await;
    let (_, employee_id) = directory
        .seed_member("target@company.com", "T", "Arget", Role::Employee)
        .await;

    let resp = send_json(
        &app,
        "PUT",
        &format!("/api/employees/{employee_id}/role"),
        Some(&token),
        json!({ "role": "ROLE_HR" }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["role"], "ROLE_HR");
}

#[tokio::test]
async fn unknown_role_value_is_400_field_map() {
    let (directory, app) = seeded().await;
    let (token, _) = login_token(&app, "admin@company.com").await;
    let (_, employee_id) = directory
        .seed_member("target@company.com", "T", "Arget", Role::Employee)
        .await;

    let resp = send_json(
        &app,
        "PUT",
        &format!("/api/employees/{employee_id}/role"),
        Some(&token),
        json!({ "role": "ROLE_WIZARD" }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert!(body["role"].as_str().unwrap().contains("ROLE_EMPLOYEE"));
}

#[tokio::test]
async fn me_returns_the_callers_record() {
    let (_, app) = seeded().await;
    let (token, _) = login_token(&app, "emp@company.com").await;
    let resp = get(&app, "/api/employees/me", Some(&token)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["firstName"], "Evan");
    assert_eq!(body["role"], "ROLE_EMPLOYEE");
}

#[tokio::test]
async fn employee_by_id_is_self_or_hr() {
    let (directory, app) = seeded().await;
    let (_, other_id) = directory
        .seed_member("other@company.com", "O", "Ther", Role::Employee)
        .await;

    // A plain employee cannot read someone else's record...
    let (emp_token, _) = login_token(&app, "emp@company.com").await;
    let resp = get(&app, &format!("/api/employees/{other_id}"), Some(&emp_token)).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // ...but can read their own.
    let me = get(&app, "/api/employees/me", Some(&emp_token)).await;
    let my_id = body_json(me).await["id"].as_str().unwrap().to_string();
    let resp = get(&app, &format!("/api/employees/{my_id}"), Some(&emp_token)).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // HR can read anyone's.
    let (hr_token, _) = login_token(&app, "hr@company.com").await;
    let resp = get(&app, &format!("/api/employees/{other_id}"), Some(&hr_token)).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn register_creates_account_and_auto_logs_in() {
    let (directory, app) = seeded().await;
    let before = directory.account_count().await;
    let resp = send_json(
        &app,
        "POST",
        "/api/auth/register",
        None,
        json!({ "email": "new@company.com", "firstName": "New", "lastName": "Person" }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["role"], "ROLE_EMPLOYEE");
    assert!(body["token"].is_string());
    assert_eq!(directory.account_count().await, before + 1);
}

#[tokio::test]
async fn register_duplicate_email_is_409() {
    let (_, app) = seeded().await;
    let resp = send_json(
        &app,
        "POST",
        "/api/auth/register",
        None,
        json!({ "email": "hr@company.com", "firstName": "H", "lastName": "R" }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn register_validation_failures_render_field_map() {
    let (_, app) = seeded().await;
    let resp = send_json(
        &app,
        "POST",
        "/api/auth/register",
        None,
        json!({ "email": "not-an-email", "firstName": "", "lastName": "X" }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert!(body["email"].is_string());
    assert!(body["firstName"].is_string());
    assert!(body.get("lastName").is_none());
}

#[tokio::test]
async fn refresh_rotates_and_old_token_dies() {
    let (_, app) = seeded().await;
    let (_, refresh) = login_token(&app, "hr@company.com").await;

    let resp = send_json(
        &app,
        "POST",
        "/api/auth/refresh",
        None,
        json!({ "refreshToken": refresh }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    let new_refresh = body["refreshToken"].as_str().unwrap();
    assert_ne!(new_refresh, refresh);
    assert!(body["token"].is_string());

    // Replaying the rotated-out token fails.
    let resp = send_json(
        &app,
        "POST",
        "/api/auth/refresh",
        None,
        json!({ "refreshToken": refresh }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn untracked_refresh_jwt_is_rejected() {
    let (_, app) = seeded().await;
    // Valid signature and expiry, but never stored by the server.
    let rogue = token_service()
        .issue_refresh_token("hr@company.com", &serde_json::Map::new())
        .unwrap();
    let resp = send_json(
        &app,
        "POST",
        "/api/auth/refresh",
        None,
        json!({ "refreshToken": rogue }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

/// Directory wrapper that can fail the next refresh-token store, for
/// exercising the rotation failure path.
struct FlakyTokenStore {
    inner: Arc<MemoryDirectory>,
    fail_next_store: AtomicBool,
}

#[async_trait]
impl Directory for FlakyTokenStore {
    async fn find_account_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserAccount>, DirectoryError> {
        self.inner.find_account_by_email(email).await
    }

    async fn find_employee_for_account(
        &self,
        account_id: Uuid,
    ) -> Result<Option<Employee>, DirectoryError> {
        self.inner.find_employee_for_account(account_id).await
    }

    async fn find_employee(&self, id: Uuid) -> Result<Option<Employee>, DirectoryError> {
        self.inner.find_employee(id).await
    }

    async fn list_employees(&self) -> Result<Vec<Employee>, DirectoryError> {
        self.inner.list_employees().await
    }

    async fn set_employee_role(
        &self,
        employee_id: Uuid,
        role: Role,
    ) -> Result<Employee, DirectoryError> {
        self.inner.set_employee_role(employee_id, role).await
    }

    async fn provision_account(
        &self,
        request: ProvisionRequest,
    ) -> Result<ProvisionOutcome, DirectoryError> {
        self.inner.provision_account(request).await
    }

    async fn touch_last_login(&self, account_id: Uuid) -> Result<(), DirectoryError> {
        self.inner.touch_last_login(account_id).await
    }

    async fn list_domains(&self) -> Result<Vec<AllowedDomain>, DirectoryError> {
        self.inner.list_domains().await
    }

    async fn is_domain_allowed(&self, domain: &str) -> Result<bool, DirectoryError> {
        self.inner.is_domain_allowed(domain).await
    }

    async fn store_refresh_token(
        &self,
        token_hash: &str,
        account_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DirectoryError> {
        if self.fail_next_store.swap(false, Ordering::SeqCst) {
            return Err(DirectoryError::Internal("token store unavailable".into()));
        }
        self.inner
            .store_refresh_token(token_hash, account_id, expires_at)
            .await
    }

    async fn find_valid_refresh_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, DirectoryError> {
        self.inner.find_valid_refresh_token(token_hash).await
    }

    async fn revoke_refresh_token(&self, id: Uuid) -> Result<(), DirectoryError> {
        self.inner.revoke_refresh_token(id).await
    }

    async fn revoke_refresh_token_by_hash(&self, token_hash: &str) -> Result<(), DirectoryError> {
        self.inner.revoke_refresh_token_by_hash(token_hash).await
    }
}

#[tokio::test]
async fn failed_rotation_leaves_the_presented_token_live() {
    let directory = Arc::new(MemoryDirectory::new());
    directory.allow_domain("company.com").await;
    directory
        .seed_member("hr@company.com", "Harriet", "Rhodes", Role::Hr)
        .await;
    let flaky = Arc::new(FlakyTokenStore {
        inner: directory,
        fail_next_store: AtomicBool::new(false),
    });
    let state = AppState::new(
        flaky.clone(),
        Arc::new(FakeProviderClient { claims: json!({}) }),
        test_config(),
    );
    let app = stafflow_api::router(state);

    let (_, refresh) = login_token(&app, "hr@company.com").await;

    // Storing the replacement fails mid-rotation.
    flaky.fail_next_store.store(true, Ordering::SeqCst);
    let resp = send_json(
        &app,
        "POST",
        "/api/auth/refresh",
        None,
        json!({ "refreshToken": refresh }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    // The presented token was not revoked and still rotates.
    let resp = send_json(
        &app,
        "POST",
        "/api/auth/refresh",
        None,
        json!({ "refreshToken": refresh }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn logout_revokes_the_refresh_token() {
    let (_, app) = seeded().await;
    let (_, refresh) = login_token(&app, "hr@company.com").await;

    let resp = send_json(
        &app,
        "POST",
        "/api/auth/logout",
        None,
        json!({ "refreshToken": refresh }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["success"], true);

    let resp = send_json(
        &app,
        "POST",
        "/api/auth/refresh",
        None,
        json!({ "refreshToken": refresh }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn domain_check_is_public() {
    let (_, app) = seeded().await;
    let resp = get(&app, "/api/domains/check?domain=company.com", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["allowed"], true);

    let resp = get(&app, "/api/domains/check?domain=elsewhere.com", None).await;
    assert_eq!(body_json(resp).await["allowed"], false);

    let resp = get(&app, "/api/domains", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body[0]["domain"], "company.com");
}
