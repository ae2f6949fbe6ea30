use actix_web::{HttpResponse, Responder, web};

use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::error::ApiError;
use crate::model::calendar::{CalendarQuery, CalendarRange};
use crate::model::holiday::Holiday;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/holidays",
    tag = "Calendar",
    params(CalendarQuery),
    responses(
        (status = 200, description = "Public holidays in range, by date", body = [Holiday]),
        (status = 400, description = "Invalid range"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_holidays(
    _auth: AuthUser,
    query: web::Query<CalendarQuery>,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> Result<impl Responder, ApiError> {
    let range = CalendarRange::from_query(&query, config.today())?;
    let holidays: Vec<Holiday> = state.holidays.between(range.start, range.end);
    Ok(HttpResponse::Ok().json(holidays))
}
