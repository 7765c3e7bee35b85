//! Employee handlers — the representative role-gated surface.
//!
//! Role requirements live in the policy table; only the ownership check
//! for `GET /api/employees/{id}` (self or HR/ADMIN) is enforced here.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use uuid::Uuid;

use stafflow_core::models::{Principal, Role};

use crate::dto::{EmployeeResponse, RoleUpdateRequest};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// `GET /api/employees/me` — the caller's own employee record.
pub async fn me(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<EmployeeResponse>> {
    let employee = state
        .directory
        .find_employee(principal.employee_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Employee not found".into()))?;
    Ok(Json(employee.into()))
}

/// `GET /api/employees` — list all employees (HR/ADMIN).
pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<EmployeeResponse>>> {
    let employees = state.directory.list_employees().await?;
    Ok(Json(employees.into_iter().map(Into::into).collect()))
}

/// `GET /api/employees/{id}` — self, or HR/ADMIN for anyone.
pub async fn get_one(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<EmployeeResponse>> {
    if !principal.owns(id) && !principal.has_any_role(&[Role::Hr, Role::Admin]) {
        return Err(ApiError::Forbidden);
    }
    let employee = state
        .directory
        .find_employee(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Employee not found: {id}")))?;
    Ok(Json(employee.into()))
}

/// `PUT /api/employees/{id}/role` — replace the employee's role (ADMIN).
pub async fn set_role(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<RoleUpdateRequest>,
) -> ApiResult<Json<EmployeeResponse>> {
    let role: Role = body
        .role
        .parse()
        .map_err(|_| ApiError::invalid_field("role", "must be one of ROLE_EMPLOYEE, ROLE_HR, ROLE_ADMIN"))?;
    let employee = state.directory.set_employee_role(id, role).await?;
    Ok(Json(employee.into()))
}
