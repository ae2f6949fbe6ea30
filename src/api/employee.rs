use actix_web::{HttpRequest, HttpResponse, Responder, web};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use strum::IntoEnumIterator;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::api::audit_log;
use crate::auth::auth::AuthUser;
use crate::auth::handlers::{NewAccount, create_account, is_email_available};
use crate::config::Config;
use crate::error::ApiError;
use crate::model::audit_log::AuditAction;
use crate::model::leave_request::{LeaveType, RequestState};
use crate::model::role::Role;
use crate::model::user::{Gender, LeaveBalance, LeaveBalancePatch, UserProfile, normalize_email};
use crate::models::RegisterReq;
use crate::state::AppState;
use crate::store::{LeaveFilter, UserChanges, UserFilter};

#[derive(Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEmployee {
    #[validate(custom(
        function = "crate::utils::validation::not_blank",
        message = "Name, email, password and department are required"
    ))]
    #[schema(example = "Asha Patel")]
    pub name: String,
    #[validate(email(message = "Please provide a valid email address"))]
    #[schema(example = "asha@company.com")]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    #[schema(example = "secret1")]
    pub password: String,
    #[validate(custom(
        function = "crate::utils::validation::not_blank",
        message = "Name, email, password and department are required"
    ))]
    #[schema(example = "Engineering")]
    pub department: String,
    pub gender: Option<Gender>,
    /// Defaults to `employee`
    pub role: Option<Role>,
    /// Overrides for the policy balances
    pub leave_balance: Option<LeaveBalancePatch>,
}

/// Partial update. Role and employee id are immutable.
#[derive(Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEmployee {
    #[validate(custom(
        function = "crate::utils::validation::not_blank",
        message = "Name cannot be empty"
    ))]
    pub name: Option<String>,
    #[validate(email(message = "Please provide a valid email address"))]
    pub email: Option<String>,
    #[validate(custom(
        function = "crate::utils::validation::not_blank",
        message = "Department cannot be empty"
    ))]
    pub department: Option<String>,
    pub gender: Option<Gender>,
    pub leave_balance: Option<LeaveBalancePatch>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EmployeeQuery {
    /// Name, email or employee id
    pub search: Option<String>,
    #[param(example = "Engineering")]
    pub department: Option<String>,
    /// Defaults to `employee`
    pub role: Option<Role>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeResponse {
    #[schema(example = "Employee created successfully")]
    pub message: String,
    pub employee: UserProfile,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaveTypeUsage {
    pub leave_type: LeaveType,
    /// Approved days taken from this pool
    pub days_taken: u32,
    pub remaining: u32,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeStats {
    pub employee: UserProfile,
    pub total_requests: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub expired: usize,
    /// Approved share of decided requests, in percent
    #[schema(example = 75.0)]
    pub approval_rate: f64,
    pub days_taken: u32,
    /// Days left across every pool
    pub total_remaining: u64,
    pub by_type: Vec<LeaveTypeUsage>,
}

async fn load_employee(state: &AppState, id: u64) -> Result<crate::model::user::User, ApiError> {
    state
        .store
        .find_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Employee"))
}

#[utoipa::path(
    get,
    path = "/api/admin/employees",
    tag = "Employee",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Matching users, newest first", body = [UserProfile]),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_employees(
    auth: AuthUser,
    query: web::Query<EmployeeQuery>,
    state: web::Data<AppState>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let query = query.into_inner();
    let filter = UserFilter {
        role: Some(query.role.unwrap_or(Role::Employee)),
        department: query.department.filter(|d| !d.trim().is_empty()),
        search: query.search.filter(|s| !s.trim().is_empty()),
    };
    let mut users = state.store.list_users(&filter).await?;
    users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));

    let profiles: Vec<UserProfile> = users.iter().map(|u| u.profile()).collect();
    Ok(HttpResponse::Ok().json(profiles))
}

#[utoipa::path(
    post,
    path = "/api/admin/employees",
    tag = "Employee",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created", body = EmployeeResponse),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Email already registered")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_employee(
    auth: AuthUser,
    req: HttpRequest,
    body: web::Json<CreateEmployee>,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let mut body = body.into_inner();
    body.email = normalize_email(&body.email);
    body.validate()?;

    let mut balance = config.default_balance;
    if let Some(patch) = &body.leave_balance {
        patch.apply(&mut balance);
    }

    let user = create_account(
        &state,
        NewAccount {
            name: &body.name,
            email: &body.email,
            password: &body.password,
            department: &body.department,
            gender: body.gender,
            role: body.role.unwrap_or(Role::Employee),
            balance,
        },
    )
    .await?;

    audit_log::record(
        &state,
        &req,
        auth.user_id,
        AuditAction::EmployeeCreated,
        format!("Created employee {} ({})", user.name, user.employee_id),
        json!({ "userId": user.id, "employeeId": user.employee_id, "role": user.role }),
    )
    .await?;

    tracing::info!(user_id = user.id, employee_id = %user.employee_id, "Employee created");
    Ok(HttpResponse::Created().json(EmployeeResponse {
        message: "Employee created successfully".into(),
        employee: user.profile(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/admin/employees/{id}",
    tag = "Employee",
    params(("id" = u64, Path, description = "User id")),
    responses(
        (status = 200, description = "The employee", body = UserProfile),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_employee(
    auth: AuthUser,
    path: web::Path<u64>,
    state: web::Data<AppState>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;
    let user = load_employee(&state, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user.profile()))
}

#[utoipa::path(
    put,
    path = "/api/admin/employees/{id}",
    tag = "Employee",
    params(("id" = u64, Path, description = "User id")),
    request_body = UpdateEmployee,
    responses(
        (status = 200, description = "Employee updated", body = EmployeeResponse),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Email already registered")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_employee(
    auth: AuthUser,
    req: HttpRequest,
    path: web::Path<u64>,
    body: web::Json<UpdateEmployee>,
    state: web::Data<AppState>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let mut body = body.into_inner();
    body.email = body.email.as_deref().map(normalize_email);
    body.validate()?;

    let current = load_employee(&state, path.into_inner()).await?;

    let email = match body.email {
        Some(email) if email != current.email => {
            if !is_email_available(&state, &email).await? {
                return Err(ApiError::Duplicate(
                    "A user with this email already exists".into(),
                ));
            }
            Some(email)
        }
        _ => None,
    };
    let changes = UserChanges {
        name: body.name.as_deref().map(|n| n.trim().to_string()),
        email,
        department: body.department.as_deref().map(|d| d.trim().to_string()),
        gender: body.gender,
        balance: body.leave_balance.filter(|patch| !patch.is_empty()),
        ..UserChanges::default()
    };
    if changes.is_empty() {
        return Err(ApiError::validation("No fields provided for update"));
    }

    let user = state
        .store
        .update_user(current.id, &changes, Utc::now())
        .await?
        .ok_or_else(|| ApiError::not_found("Employee"))?;
    state.profiles.invalidate(user.id).await;
    if user.email != current.email {
        state.emails.remove(&current.email);
        state.emails.insert(&user.email);
    }

    audit_log::record(
        &state,
        &req,
        auth.user_id,
        AuditAction::EmployeeUpdated,
        format!("Updated employee {} ({})", user.name, user.employee_id),
        json!({ "userId": user.id, "fields": changes.fields() }),
    )
    .await?;

    Ok(HttpResponse::Ok().json(EmployeeResponse {
        message: "Employee updated successfully".into(),
        employee: user.profile(),
    }))
}

#[utoipa::path(
    delete,
    path = "/api/admin/employees/{id}",
    tag = "Employee",
    params(("id" = u64, Path, description = "User id")),
    responses(
        (status = 200, description = "Employee and their history removed"),
        (status = 403, description = "Admins cannot be deleted"),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_employee(
    auth: AuthUser,
    req: HttpRequest,
    path: web::Path<u64>,
    state: web::Data<AppState>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let user = load_employee(&state, path.into_inner()).await?;
    if user.role.is_admin() {
        return Err(ApiError::Forbidden("Admin users cannot be deleted".into()));
    }

    // Each step is idempotent; a retry after a partial failure finishes the job.
    let deleted_requests = state.store.delete_leaves_for_user(user.id).await?;
    let deleted_logs = state.store.delete_audit_for_user(user.id).await?;
    state.store.delete_user(user.id).await?;

    state.profiles.invalidate(user.id).await;
    state.emails.remove(&user.email);

    audit_log::record(
        &state,
        &req,
        auth.user_id,
        AuditAction::EmployeeDeleted,
        format!("Deleted employee {} ({})", user.name, user.employee_id),
        json!({
            "userId": user.id,
            "employeeId": user.employee_id,
            "deletedRequests": deleted_requests,
            "deletedLogs": deleted_logs,
        }),
    )
    .await?;

    tracing::info!(user_id = user.id, deleted_requests, deleted_logs, "Employee deleted");
    Ok(HttpResponse::Ok().json(json!({
        "message": "Employee deleted successfully",
        "deletedRequests": deleted_requests,
        "deletedLogs": deleted_logs,
    })))
}

#[utoipa::path(
    get,
    path = "/api/admin/employees/{id}/summary",
    tag = "Employee",
    params(("id" = u64, Path, description = "User id")),
    responses(
        (status = 200, description = "Request analytics for one employee", body = EmployeeStats),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn employee_summary(
    auth: AuthUser,
    path: web::Path<u64>,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let user = load_employee(&state, path.into_inner()).await?;
    let filter = LeaveFilter {
        user_id: Some(user.id),
        ..LeaveFilter::default()
    };
    let requests = state.store.list_leaves(&filter).await?;
    let today = config.today();

    let count = |wanted: RequestState| requests.iter().filter(|r| r.state(today) == wanted).count();
    let pending = count(RequestState::Pending);
    let approved = count(RequestState::Approved);
    let rejected = count(RequestState::Rejected);
    let expired = count(RequestState::Expired);

    let decided = approved + rejected;
    let approval_rate = if decided == 0 {
        0.0
    } else {
        (approved as f64 / decided as f64 * 1000.0).round() / 10.0
    };

    let by_type: Vec<LeaveTypeUsage> = LeaveType::iter()
        .map(|leave_type| LeaveTypeUsage {
            leave_type,
            days_taken: requests
                .iter()
                .filter(|r| r.leave_type == leave_type && r.state(today) == RequestState::Approved)
                .map(|r| r.days)
                .sum(),
            remaining: user.leave_balance.get(leave_type),
        })
        .collect();
    let days_taken: u32 = by_type.iter().map(|u| u.days_taken).sum();

    Ok(HttpResponse::Ok().json(EmployeeStats {
        employee: user.profile(),
        total_requests: requests.len(),
        pending,
        approved,
        rejected,
        expired,
        approval_rate,
        days_taken,
        total_remaining: user.leave_balance.total(),
        by_type,
    }))
}

/// Creates the configured administrator on first start.
pub async fn ensure_admin(state: &AppState, config: &Config) -> anyhow::Result<()> {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        return Ok(());
    };

    let email = normalize_email(email);
    if state.store.find_user_by_email(&email).await?.is_some() {
        log::info!("Administrator {} already present", email);
        return Ok(());
    }

    let seed = RegisterReq {
        name: "System Administrator".into(),
        email,
        password: password.clone(),
        department: "Administration".into(),
        gender: None,
    };
    if let Err(e) = seed.validate() {
        anyhow::bail!("invalid administrator credentials: {}", ApiError::from(e));
    }

    let admin = create_account(
        state,
        NewAccount {
            name: &seed.name,
            email: &seed.email,
            password: &seed.password,
            department: &seed.department,
            gender: None,
            role: Role::Admin,
            balance: LeaveBalance::default(),
        },
    )
    .await
    .map_err(|e| anyhow::anyhow!("seeding administrator failed: {}", e))?;

    log::info!("Seeded administrator {} ({})", admin.email, admin.employee_id);
    Ok(())
}
