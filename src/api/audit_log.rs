use std::net::SocketAddr;

use actix_web::{HttpRequest, HttpResponse, Responder, web};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use utoipa::IntoParams;

use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::error::ApiError;
use crate::model::audit_log::{AuditAction, AuditFilter, NewAuditEntry};
use crate::state::AppState;
use crate::utils::time::{day_bounds, flexible_date_opt};

const DEFAULT_LIMIT: u32 = 100;
const MAX_LIMIT: u32 = 1000;

/// Client address without the port.
fn client_ip(req: &HttpRequest) -> Option<String> {
    let info = req.connection_info();
    let raw = info.realip_remote_addr()?;
    Some(
        raw.parse::<SocketAddr>()
            .map(|addr| addr.ip().to_string())
            .unwrap_or_else(|_| raw.to_string()),
    )
}

/// Appends an audit entry; failures surface to the caller.
pub async fn record(
    state: &AppState,
    req: &HttpRequest,
    actor: u64,
    action: AuditAction,
    description: impl Into<String>,
    details: Value,
) -> Result<(), ApiError> {
    state
        .store
        .insert_audit(NewAuditEntry {
            user_id: actor,
            action,
            description: description.into(),
            details,
            timestamp: Utc::now(),
            ip_address: client_ip(req),
        })
        .await?;
    Ok(())
}

/// Same as [`record`], but a failed write is only logged.
pub async fn record_best_effort(
    state: &AppState,
    req: &HttpRequest,
    actor: u64,
    action: AuditAction,
    description: impl Into<String>,
    details: Value,
) {
    if let Err(e) = record(state, req, actor, action, description, details).await {
        tracing::warn!(
            error = %e,
            action = %action,
            user_id = actor,
            "Failed to write audit entry"
        );
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LogQuery {
    /// Max entries (default 100, capped at 1000)
    #[param(example = 50)]
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub action: Option<AuditAction>,
    /// Matches actor name, email or description
    pub search: Option<String>,
    /// Single local day, `YYYY-MM-DD`
    #[serde(default, deserialize_with = "flexible_date_opt")]
    #[param(value_type = Option<String>, format = "date")]
    pub date: Option<chrono::NaiveDate>,
}

impl LogQuery {
    fn into_filter(self, tz_offset_minutes: i32) -> AuditFilter {
        AuditFilter {
            limit: self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
            offset: self.offset.unwrap_or(0),
            action: self.action,
            search: self.search.filter(|s| !s.trim().is_empty()),
            between: self.date.map(|day| day_bounds(day, tz_offset_minutes)),
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/logs",
    tag = "Audit",
    params(LogQuery),
    responses(
        (
            status = 200,
            description = "Audit entries, newest first",
            body = [crate::model::audit_log::AuditEntryView]
        ),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_logs(
    auth: AuthUser,
    state: web::Data<AppState>,
    config: web::Data<Config>,
    query: web::Query<LogQuery>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let filter = query.into_inner().into_filter(config.tz_offset_minutes);
    let logs = state.store.list_audit(&filter).await?;
    Ok(HttpResponse::Ok().json(logs))
}

#[utoipa::path(
    delete,
    path = "/api/logs/reset",
    tag = "Audit",
    responses(
        (status = 200, description = "All entries removed; one reset entry remains"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = []))
)]
pub async fn reset_logs(
    auth: AuthUser,
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let deleted = state.store.delete_all_audit().await?;
    tracing::info!(deleted, user_id = auth.user_id, "Audit log reset");

    record(
        &state,
        &req,
        auth.user_id,
        AuditAction::AuditLogsReset,
        "System Administrator reset all audit logs",
        json!({ "deletedCount": deleted }),
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Audit logs reset successfully",
        "deletedCount": deleted,
    })))
}
