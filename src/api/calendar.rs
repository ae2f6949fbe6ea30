use actix_web::{HttpResponse, Responder, web};

use crate::api::leave_request::build_views;
use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::error::ApiError;
use crate::model::calendar::{Calendar, CalendarQuery, CalendarRange, CalendarScope, build_calendar};
use crate::state::AppState;
use crate::store::LeaveFilter;

async fn assemble(
    state: &AppState,
    range: CalendarRange,
    user_id: Option<u64>,
    scope: CalendarScope,
    config: &Config,
) -> Result<Calendar, ApiError> {
    let filter = LeaveFilter {
        user_id,
        overlapping: Some((range.start, range.end)),
    };
    let requests = state.store.list_leaves(&filter).await?;
    let views = build_views(state, requests, config.today()).await?;
    let holidays = state.holidays.between(range.start, range.end);
    Ok(build_calendar(range, &views, &holidays, scope))
}

#[utoipa::path(
    get,
    path = "/api/admin/calendar",
    tag = "Calendar",
    params(CalendarQuery),
    responses(
        (status = 200, description = "Approved leave of every employee, per day", body = Calendar),
        (status = 400, description = "Invalid range"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = []))
)]
pub async fn fleet_calendar(
    auth: AuthUser,
    query: web::Query<CalendarQuery>,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let range = CalendarRange::from_query(&query, config.today())?;
    let calendar = assemble(&state, range, None, CalendarScope::Fleet, &config).await?;
    Ok(HttpResponse::Ok().json(calendar))
}

#[utoipa::path(
    get,
    path = "/api/leave/calendar",
    tag = "Calendar",
    params(CalendarQuery),
    responses(
        (
            status = 200,
            description = "Caller's own requests in every state, per day",
            body = Calendar
        ),
        (status = 400, description = "Invalid range"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn my_calendar(
    auth: AuthUser,
    query: web::Query<CalendarQuery>,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> Result<impl Responder, ApiError> {
    let range = CalendarRange::from_query(&query, config.today())?;
    let calendar = assemble(
        &state,
        range,
        Some(auth.user_id),
        CalendarScope::Personal,
        &config,
    )
    .await?;
    Ok(HttpResponse::Ok().json(calendar))
}
