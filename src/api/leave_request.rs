use std::collections::{HashMap, HashSet};

use actix_web::{HttpRequest, HttpResponse, Responder, web};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

use crate::api::audit_log;
use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::error::ApiError;
use crate::model::audit_log::AuditAction;
use crate::model::leave_request::{
    Decision, LeaveDraft, LeaveRequest, LeaveRequestView, LeaveStatus, LeaveType, NewLeaveRequest,
    RequestState, Review, sort_for_listing,
};
use crate::state::AppState;
use crate::store::{LeaveFilter, ReviewOutcome};
use crate::utils::time::{flexible_date, flexible_date_opt};

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitLeave {
    pub leave_type: LeaveType,
    #[serde(deserialize_with = "flexible_date")]
    #[schema(example = "2026-03-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[serde(deserialize_with = "flexible_date")]
    #[schema(example = "2026-03-03", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "Family trip")]
    pub reason: String,
}

/// Partial edit; omitted fields keep their current value.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLeave {
    pub leave_type: Option<LeaveType>,
    #[serde(default, deserialize_with = "flexible_date_opt")]
    #[schema(format = "date", value_type = Option<String>)]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "flexible_date_opt")]
    #[schema(format = "date", value_type = Option<String>)]
    pub end_date: Option<NaiveDate>,
    pub reason: Option<String>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatus {
    /// `approved` or `rejected`
    pub status: LeaveStatus,
    #[schema(example = "Enjoy your break")]
    pub admin_comment: Option<String>,
}

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct LeaveListQuery {
    /// Derived status, `expired` included
    pub status: Option<RequestState>,
    #[param(example = 7)]
    pub user_id: Option<u64>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaveResponse {
    #[schema(example = "Leave request submitted successfully")]
    pub message: String,
    pub leave_request: LeaveRequestView,
}

/// Joins requests with their owners and reviewers and orders them for display.
/// Requests whose owner no longer exists are dropped.
pub async fn build_views(
    state: &AppState,
    requests: Vec<LeaveRequest>,
    today: NaiveDate,
) -> Result<Vec<LeaveRequestView>, ApiError> {
    let ids: Vec<u64> = requests
        .iter()
        .flat_map(|r| std::iter::once(r.user_id).chain(r.reviewed_by))
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let users: HashMap<u64, _> = state
        .store
        .users_by_ids(&ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let mut views: Vec<LeaveRequestView> = requests
        .into_iter()
        .filter_map(|request| {
            let owner = users.get(&request.user_id)?.summary();
            let reviewer = request
                .reviewed_by
                .and_then(|id| users.get(&id))
                .map(|u| u.name.clone());
            Some(LeaveRequestView::new(request, owner, reviewer, today))
        })
        .collect();
    sort_for_listing(&mut views);
    Ok(views)
}

async fn single_view(
    state: &AppState,
    request: LeaveRequest,
    today: NaiveDate,
) -> Result<LeaveRequestView, ApiError> {
    build_views(state, vec![request], today)
        .await?
        .pop()
        .ok_or_else(|| ApiError::not_found("Employee"))
}

async fn load_request(state: &AppState, id: u64) -> Result<LeaveRequest, ApiError> {
    state
        .store
        .find_leave(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Leave request"))
}

fn audit_details(request: &LeaveRequest) -> serde_json::Value {
    json!({
        "leaveRequestId": request.id,
        "leaveType": request.leave_type,
        "startDate": request.start_date,
        "endDate": request.end_date,
        "days": request.days,
    })
}

#[utoipa::path(
    post,
    path = "/api/leave/request",
    tag = "Leave",
    request_body = SubmitLeave,
    responses(
        (status = 201, description = "Request created as pending", body = LeaveResponse),
        (status = 400, description = "Invalid dates, missing reason or insufficient balance"),
        (status = 403, description = "Only employees can submit")
    ),
    security(("bearer_auth" = []))
)]
pub async fn submit_leave(
    auth: AuthUser,
    req: HttpRequest,
    body: web::Json<SubmitLeave>,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> Result<impl Responder, ApiError> {
    auth.require_employee()?;

    let user = state
        .store
        .find_user(auth.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    let body = body.into_inner();
    let draft = LeaveDraft {
        leave_type: body.leave_type,
        start_date: body.start_date,
        end_date: body.end_date,
        reason: body.reason.trim().to_string(),
    };
    let days = draft.validate(&user.leave_balance)?;

    let request = state
        .store
        .insert_leave(NewLeaveRequest {
            user_id: user.id,
            leave_type: draft.leave_type,
            start_date: draft.start_date,
            end_date: draft.end_date,
            days,
            reason: draft.reason,
            applied_at: Utc::now(),
        })
        .await?;

    audit_log::record(
        &state,
        &req,
        user.id,
        AuditAction::LeaveRequested,
        format!("{} requested {} days of {} leave", user.name, days, request.leave_type),
        audit_details(&request),
    )
    .await?;

    tracing::info!(request_id = request.id, user_id = user.id, days, "Leave requested");
    let view = LeaveRequestView::new(request, user.summary(), None, config.today());
    Ok(HttpResponse::Created().json(LeaveResponse {
        message: "Leave request submitted successfully".into(),
        leave_request: view,
    }))
}

#[utoipa::path(
    get,
    path = "/api/leave/my-requests",
    tag = "Leave",
    responses(
        (status = 200, description = "Caller's requests", body = [LeaveRequestView]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn my_requests(
    auth: AuthUser,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> Result<impl Responder, ApiError> {
    auth.require_employee()?;

    let filter = LeaveFilter {
        user_id: Some(auth.user_id),
        ..LeaveFilter::default()
    };
    let requests = state.store.list_leaves(&filter).await?;
    let views = build_views(&state, requests, config.today()).await?;
    Ok(HttpResponse::Ok().json(views))
}

#[utoipa::path(
    get,
    path = "/api/leave/all-requests",
    tag = "Leave",
    params(LeaveListQuery),
    responses(
        (
            status = 200,
            description = "Every request, joined with its owner",
            body = [LeaveRequestView]
        ),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = []))
)]
pub async fn all_requests(
    auth: AuthUser,
    query: web::Query<LeaveListQuery>,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let filter = LeaveFilter {
        user_id: query.user_id,
        ..LeaveFilter::default()
    };
    let requests = state.store.list_leaves(&filter).await?;
    let mut views = build_views(&state, requests, config.today()).await?;
    if let Some(status) = query.status {
        views.retain(|v| v.status == status);
    }
    Ok(HttpResponse::Ok().json(views))
}

#[utoipa::path(
    get,
    path = "/api/leave/{id}",
    tag = "Leave",
    params(("id" = u64, Path, description = "Leave request id")),
    responses(
        (status = 200, description = "The request", body = LeaveRequestView),
        (status = 403, description = "Neither owner nor admin"),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_leave(
    auth: AuthUser,
    path: web::Path<u64>,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> Result<impl Responder, ApiError> {
    let request = load_request(&state, path.into_inner()).await?;
    if !auth.is_admin() && request.user_id != auth.user_id {
        return Err(ApiError::Forbidden(
            "You can only view your own leave requests".into(),
        ));
    }
    let view = single_view(&state, request, config.today()).await?;
    Ok(HttpResponse::Ok().json(view))
}

#[utoipa::path(
    put,
    path = "/api/leave/{id}",
    tag = "Leave",
    params(("id" = u64, Path, description = "Leave request id")),
    request_body = UpdateLeave,
    responses(
        (status = 200, description = "Request updated", body = LeaveResponse),
        (status = 400, description = "Invalid input or request no longer editable"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_leave(
    auth: AuthUser,
    req: HttpRequest,
    path: web::Path<u64>,
    body: web::Json<UpdateLeave>,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> Result<impl Responder, ApiError> {
    let today = config.today();
    let mut request = load_request(&state, path.into_inner()).await?;

    if request.user_id != auth.user_id {
        return Err(ApiError::Forbidden(
            "You can only edit your own leave requests".into(),
        ));
    }
    match request.state(today) {
        RequestState::Pending => {}
        RequestState::Expired => {
            return Err(ApiError::InvalidState(
                "Expired leave requests cannot be edited".into(),
            ));
        }
        _ => {
            return Err(ApiError::InvalidState(
                "Only pending leave requests can be edited".into(),
            ));
        }
    }

    let owner = state
        .store
        .find_user(auth.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    let body = body.into_inner();
    let draft = LeaveDraft {
        leave_type: body.leave_type.unwrap_or(request.leave_type),
        start_date: body.start_date.unwrap_or(request.start_date),
        end_date: body.end_date.unwrap_or(request.end_date),
        reason: body
            .reason
            .map(|r| r.trim().to_string())
            .unwrap_or_else(|| request.reason.clone()),
    };
    let days = draft.validate(&owner.leave_balance)?;

    let previous = audit_details(&request);
    request.leave_type = draft.leave_type;
    request.start_date = draft.start_date;
    request.end_date = draft.end_date;
    request.reason = draft.reason;
    request.days = days;

    if !state.store.update_leave(&request).await? {
        return Err(ApiError::InvalidState(
            "Only pending leave requests can be edited".into(),
        ));
    }

    audit_log::record(
        &state,
        &req,
        auth.user_id,
        AuditAction::LeaveUpdated,
        format!("{} updated leave request #{}", owner.name, request.id),
        json!({ "before": previous, "after": audit_details(&request) }),
    )
    .await?;

    let view = LeaveRequestView::new(request, owner.summary(), None, today);
    Ok(HttpResponse::Ok().json(LeaveResponse {
        message: "Leave request updated successfully".into(),
        leave_request: view,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/leave/{id}",
    tag = "Leave",
    params(("id" = u64, Path, description = "Leave request id")),
    responses(
        (status = 200, description = "Request deleted"),
        (status = 400, description = "Owner tried to delete a non-pending request"),
        (status = 403, description = "Neither owner nor admin"),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_leave(
    auth: AuthUser,
    req: HttpRequest,
    path: web::Path<u64>,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> Result<impl Responder, ApiError> {
    let request = load_request(&state, path.into_inner()).await?;

    if !auth.is_admin() {
        if request.user_id != auth.user_id {
            return Err(ApiError::Forbidden(
                "You can only delete your own leave requests".into(),
            ));
        }
        if !request.is_editable(config.today()) {
            return Err(ApiError::InvalidState(
                "Only pending leave requests can be deleted".into(),
            ));
        }
    }

    let removed = state
        .store
        .delete_leave(request.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Leave request"))?;

    let restored = if removed.status == LeaveStatus::Approved {
        state.profiles.invalidate(removed.user_id).await;
        removed.days
    } else {
        0
    };

    let mut details = audit_details(&removed);
    details["status"] = json!(removed.status);
    details["restoredDays"] = json!(restored);
    audit_log::record(
        &state,
        &req,
        auth.user_id,
        AuditAction::LeaveDeleted,
        format!("Deleted leave request #{}", removed.id),
        details,
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Leave request deleted successfully",
        "restoredDays": restored,
    })))
}

#[utoipa::path(
    put,
    path = "/api/leave/update-status/{id}",
    tag = "Leave",
    params(("id" = u64, Path, description = "Leave request id")),
    request_body = UpdateStatus,
    responses(
        (status = 200, description = "Request reviewed", body = LeaveResponse),
        (status = 400, description = "Not pending, expired, or insufficient balance"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_status(
    auth: AuthUser,
    req: HttpRequest,
    path: web::Path<u64>,
    body: web::Json<UpdateStatus>,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;
    let today = config.today();

    let decision = match body.status {
        LeaveStatus::Approved => Decision::Approve,
        LeaveStatus::Rejected => Decision::Reject,
        LeaveStatus::Pending => {
            return Err(ApiError::validation("Status must be approved or rejected"));
        }
    };

    let current = load_request(&state, path.into_inner()).await?;
    if current.status.is_terminal() {
        return Err(ApiError::InvalidState(format!(
            "Leave request has already been {}",
            current.status
        )));
    }
    let expired = current.is_expired(today);
    if decision == Decision::Approve && expired {
        return Err(ApiError::InvalidState(
            "Expired leave requests cannot be approved".into(),
        ));
    }

    let comment = body
        .admin_comment
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string);

    let outcome = state
        .store
        .review_leave(Review {
            request_id: current.id,
            decision,
            reviewer_id: auth.user_id,
            comment,
            reviewed_at: Utc::now(),
        })
        .await?;

    let reviewed = match outcome {
        ReviewOutcome::Reviewed(request) => request,
        ReviewOutcome::NotFound => return Err(ApiError::not_found("Leave request")),
        ReviewOutcome::NotPending(request) => {
            return Err(ApiError::InvalidState(format!(
                "Leave request has already been {}",
                request.status
            )));
        }
        ReviewOutcome::InsufficientBalance {
            available,
            requested,
        } => {
            return Err(ApiError::validation(format!(
                "Insufficient {} leave balance. Available: {} days, Requested: {} days",
                current.leave_type, available, requested
            )));
        }
    };

    if reviewed.status == LeaveStatus::Approved {
        state.profiles.invalidate(reviewed.user_id).await;
    }

    // Closing out a lapsed request is recorded as its expiry
    let (action, verb) = match decision {
        Decision::Approve => (AuditAction::LeaveApproved, "approved"),
        Decision::Reject if expired => (AuditAction::LeaveExpired, "rejected"),
        Decision::Reject => (AuditAction::LeaveRejected, "rejected"),
    };
    let mut details = audit_details(&reviewed);
    details["employeeId"] = json!(reviewed.user_id);
    details["adminComment"] = json!(reviewed.admin_comment);
    let description = if expired {
        format!("Expired leave request #{} {}", reviewed.id, verb)
    } else {
        format!("Leave request #{} {}", reviewed.id, verb)
    };
    audit_log::record(
        &state,
        &req,
        auth.user_id,
        action,
        description,
        details,
    )
    .await?;

    tracing::info!(request_id = reviewed.id, status = %reviewed.status, "Leave reviewed");
    let view = single_view(&state, reviewed, today).await?;
    Ok(HttpResponse::Ok().json(LeaveResponse {
        message: format!("Leave request {} successfully", verb),
        leave_request: view,
    }))
}
