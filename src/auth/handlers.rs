use actix_web::{HttpRequest, HttpResponse, Responder, web};
use chrono::Utc;
use serde_json::json;
use tracing::{debug, info, instrument};
use validator::Validate;

use crate::{
    api::audit_log,
    auth::{
        auth::AuthUser,
        jwt::generate_access_token,
        password::{hash_password, verify_password},
    },
    config::Config,
    error::ApiError,
    model::{
        audit_log::AuditAction,
        role::Role,
        user::{
            Gender, LeaveBalance, NewUser, User, UserProfile, next_employee_code, normalize_email,
        },
    },
    models::{
        AuthResponse, ChangeEmailReq, ChangeEmailResponse, ChangePasswordReq, LoginReqDto,
        MessageResponse, RegisterReq, UpdateProfileReq,
    },
    state::AppState,
    store::UserChanges,
};

/// true  => email AVAILABLE
/// false => email TAKEN
pub async fn is_email_available(state: &AppState, email: &str) -> Result<bool, ApiError> {
    // Cuckoo filter: a miss is definitive
    if !state.emails.might_exist(email) {
        return Ok(true);
    }
    Ok(state.store.find_user_by_email(email).await?.is_none())
}

pub(crate) fn issue_token(user: &User, config: &Config) -> Result<String, ApiError> {
    generate_access_token(user, &config.jwt_secret, config.access_token_ttl)
        .map_err(|e| ApiError::Internal(format!("token encoding failed: {}", e)))
}

pub(crate) fn hash(password: &str) -> Result<String, ApiError> {
    hash_password(password)
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {}", e)))
}

pub(crate) struct NewAccount<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub department: &'a str,
    pub gender: Option<Gender>,
    pub role: Role,
    pub balance: LeaveBalance,
}

/// Reserves an employee code and persists an already validated account.
pub(crate) async fn create_account(
    state: &AppState,
    new: NewAccount<'_>,
) -> Result<User, ApiError> {
    let name = new.name.trim();
    let department = new.department.trim();
    let email = normalize_email(new.email);

    if !is_email_available(state, &email).await? {
        return Err(ApiError::Duplicate(
            "A user with this email already exists".into(),
        ));
    }

    let codes = state.store.employee_codes().await?;
    let employee_id = next_employee_code(codes.iter().map(String::as_str));

    let user = state
        .store
        .insert_user(NewUser {
            employee_id,
            name: name.to_string(),
            email,
            password_hash: hash(new.password)?,
            role: new.role,
            department: department.to_string(),
            gender: new.gender,
            leave_balance: new.balance,
            created_at: Utc::now(),
        })
        .await?;

    state.emails.insert(&user.email);
    Ok(user)
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterReq,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Email already registered")
    )
)]
#[instrument(name = "auth_register", skip(req, state, config, body), fields(email = %body.email))]
pub async fn register(
    req: HttpRequest,
    body: web::Json<RegisterReq>,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> Result<impl Responder, ApiError> {
    info!("Registration request received");

    let mut body = body.into_inner();
    body.email = normalize_email(&body.email);
    body.validate()?;

    let user = create_account(
        &state,
        NewAccount {
            name: &body.name,
            email: &body.email,
            password: &body.password,
            department: &body.department,
            gender: body.gender,
            role: Role::Employee,
            balance: config.default_balance,
        },
    )
    .await?;
    let token = issue_token(&user, &config)?;

    audit_log::record_best_effort(
        &state,
        &req,
        user.id,
        AuditAction::UserRegistered,
        format!("{} registered", user.name),
        json!({ "employeeId": user.employee_id }),
    )
    .await;

    info!(user_id = user.id, "User registered");
    Ok(HttpResponse::Created().json(AuthResponse {
        message: "User registered successfully".into(),
        token,
        user: user.profile(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Token issued", body = AuthResponse),
        (status = 400, description = "Missing credentials"),
        (status = 401, description = "Invalid credentials")
    )
)]
#[instrument(name = "auth_login", skip(req, state, config, body), fields(email = %body.email))]
pub async fn login(
    req: HttpRequest,
    body: web::Json<LoginReqDto>,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> Result<impl Responder, ApiError> {
    info!("Login request received");

    if let Err(e) = body.validate() {
        info!("Validation failed: empty email or password");
        return Err(e.into());
    }

    let email = normalize_email(&body.email);
    let invalid = || ApiError::Unauthorized("Invalid credentials".into());

    debug!("Fetching user");
    let user = match state.store.find_user_by_email(&email).await? {
        Some(user) => user,
        None => {
            info!("Invalid credentials: user not found");
            return Err(invalid());
        }
    };

    if !verify_password(&body.password, &user.password_hash) {
        info!("Invalid credentials: password mismatch");
        return Err(invalid());
    }

    let token = issue_token(&user, &config)?;

    audit_log::record_best_effort(
        &state,
        &req,
        user.id,
        AuditAction::UserLogin,
        format!("{} logged in", user.name),
        json!({ "email": user.email }),
    )
    .await;

    info!(user_id = user.id, "Login successful");
    Ok(HttpResponse::Ok().json(AuthResponse {
        message: "Login successful".into(),
        token,
        user: user.profile(),
    }))
}

/// Loads a profile through the cache.
pub async fn load_profile(state: &AppState, user_id: u64) -> Result<UserProfile, ApiError> {
    if let Some(profile) = state.profiles.get(user_id).await {
        return Ok(profile);
    }
    let generation = state.profiles.generation();
    let user = state
        .store
        .find_user(user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;
    let profile = user.profile();
    state.profiles.put_if_current(profile.clone(), generation).await;
    Ok(profile)
}

#[utoipa::path(
    get,
    path = "/api/auth/profile",
    tag = "Auth",
    responses(
        (status = 200, description = "Caller's profile", body = UserProfile),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User no longer exists")
    ),
    security(("bearer_auth" = []))
)]
pub async fn profile(
    auth: AuthUser,
    state: web::Data<AppState>,
) -> Result<impl Responder, ApiError> {
    let profile = load_profile(&state, auth.user_id).await?;
    Ok(HttpResponse::Ok().json(profile))
}

#[utoipa::path(
    put,
    path = "/api/auth/profile",
    tag = "Auth",
    request_body = UpdateProfileReq,
    responses(
        (status = 200, description = "Profile updated", body = UserProfile),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_profile(
    auth: AuthUser,
    req: HttpRequest,
    body: web::Json<UpdateProfileReq>,
    state: web::Data<AppState>,
) -> Result<impl Responder, ApiError> {
    body.validate()?;

    let changes = UserChanges {
        name: body.name.as_deref().map(|n| n.trim().to_string()),
        department: body.department.as_deref().map(|d| d.trim().to_string()),
        ..UserChanges::default()
    };
    if changes.is_empty() {
        return Err(ApiError::validation("No fields provided for update"));
    }

    let user = state
        .store
        .update_user(auth.user_id, &changes, Utc::now())
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;
    state.profiles.invalidate(user.id).await;

    audit_log::record(
        &state,
        &req,
        user.id,
        AuditAction::ProfileUpdated,
        format!("{} updated their profile", user.name),
        json!({ "fields": changes.fields() }),
    )
    .await?;

    Ok(HttpResponse::Ok().json(user.profile()))
}

#[utoipa::path(
    post,
    path = "/api/auth/change-password",
    tag = "Auth",
    request_body = ChangePasswordReq,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Invalid input or wrong current password"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn change_password(
    auth: AuthUser,
    req: HttpRequest,
    body: web::Json<ChangePasswordReq>,
    state: web::Data<AppState>,
) -> Result<impl Responder, ApiError> {
    body.validate()?;
    if body.new_password != body.confirm_password {
        return Err(ApiError::validation("New passwords do not match"));
    }

    let user = state
        .store
        .find_user(auth.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    if !verify_password(&body.current_password, &user.password_hash) {
        return Err(ApiError::validation("Current password is incorrect"));
    }

    let changes = UserChanges {
        password_hash: Some(hash(&body.new_password)?),
        ..UserChanges::default()
    };
    state
        .store
        .update_user(user.id, &changes, Utc::now())
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    audit_log::record(
        &state,
        &req,
        user.id,
        AuditAction::PasswordChanged,
        format!("{} changed their password", user.name),
        json!({}),
    )
    .await?;

    Ok(HttpResponse::Ok().json(MessageResponse::new("Password changed successfully")))
}

#[utoipa::path(
    post,
    path = "/api/auth/change-email",
    tag = "Auth",
    request_body = ChangeEmailReq,
    responses(
        (status = 200, description = "Email changed", body = ChangeEmailResponse),
        (status = 400, description = "Invalid input or wrong password"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Email already registered")
    ),
    security(("bearer_auth" = []))
)]
pub async fn change_email(
    auth: AuthUser,
    req: HttpRequest,
    body: web::Json<ChangeEmailReq>,
    state: web::Data<AppState>,
) -> Result<impl Responder, ApiError> {
    let mut body = body.into_inner();
    body.new_email = normalize_email(&body.new_email);
    body.validate()?;

    let user = state
        .store
        .find_user(auth.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    if !verify_password(&body.password, &user.password_hash) {
        return Err(ApiError::validation("Password is incorrect"));
    }
    if body.new_email == user.email {
        return Err(ApiError::validation("New email is the same as current email"));
    }
    if !is_email_available(&state, &body.new_email).await? {
        return Err(ApiError::Duplicate(
            "A user with this email already exists".into(),
        ));
    }

    let changes = UserChanges {
        email: Some(body.new_email.clone()),
        ..UserChanges::default()
    };
    let updated = state
        .store
        .update_user(user.id, &changes, Utc::now())
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;
    state.profiles.invalidate(user.id).await;
    state.emails.remove(&user.email);
    state.emails.insert(&updated.email);

    audit_log::record(
        &state,
        &req,
        user.id,
        AuditAction::EmailChanged,
        format!("{} changed email from {} to {}", user.name, user.email, updated.email),
        json!({ "oldEmail": user.email, "newEmail": updated.email }),
    )
    .await?;

    info!(user_id = user.id, "Email changed");
    Ok(HttpResponse::Ok().json(ChangeEmailResponse {
        message: "Email changed successfully".into(),
        new_email: updated.email,
    }))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Auth",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn logout(
    auth: AuthUser,
    req: HttpRequest,
    state: web::Data<AppState>,
) -> impl Responder {
    // Tokens are stateless; logging out only leaves a trail.
    audit_log::record_best_effort(
        &state,
        &req,
        auth.user_id,
        AuditAction::UserLogout,
        format!("{} logged out", auth.email),
        json!({ "email": auth.email }),
    )
    .await;

    HttpResponse::Ok().json(MessageResponse::new("Logged out successfully"))
}
