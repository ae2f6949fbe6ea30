use std::collections::{BTreeMap, HashMap, HashSet};

use actix_web::{HttpResponse, Responder, web};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::error::ApiError;
use crate::model::leave_request::RequestState;
use crate::model::role::Role;
use crate::model::user::User;
use crate::state::AppState;
use crate::store::{LeaveFilter, UserFilter};

#[derive(Debug, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_employees: usize,
    pub total_departments: usize,
    /// Pending and not yet expired
    pub pending_requests: usize,
    pub expired_requests: usize,
    pub approved_requests: usize,
    pub rejected_requests: usize,
    pub total_requests: usize,
    /// Employees with approved leave covering today
    pub on_leave_today: usize,
    /// Mean days left across every pool, per employee
    #[schema(example = 142.5)]
    pub average_leave_balance: f64,
}

#[derive(Debug, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentStats {
    #[schema(example = "Engineering")]
    pub department: String,
    pub employee_count: usize,
    pub total_requests: usize,
    #[schema(example = 142.5)]
    pub average_leave_balance: f64,
}

fn average_balance<'a>(users: impl IntoIterator<Item = &'a User>) -> f64 {
    let (count, total) = users
        .into_iter()
        .fold((0u64, 0u64), |(n, sum), u| (n + 1, sum + u.leave_balance.total()));
    if count == 0 {
        return 0.0;
    }
    (total as f64 / count as f64 * 100.0).round() / 100.0
}

async fn employees(state: &AppState) -> Result<Vec<User>, ApiError> {
    Ok(state
        .store
        .list_users(&UserFilter {
            role: Some(Role::Employee),
            ..UserFilter::default()
        })
        .await?)
}

#[utoipa::path(
    get,
    path = "/api/admin/dashboard-stats",
    tag = "Admin",
    responses(
        (status = 200, description = "Headline counts", body = DashboardStats),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = []))
)]
pub async fn dashboard_stats(
    auth: AuthUser,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let employees = employees(&state).await?;
    let departments: HashSet<String> = employees
        .iter()
        .map(|u| u.department.to_lowercase())
        .collect();

    let requests = state.store.list_leaves(&LeaveFilter::default()).await?;
    let today = config.today();

    let mut stats = DashboardStats {
        total_employees: employees.len(),
        total_departments: departments.len(),
        total_requests: requests.len(),
        average_leave_balance: average_balance(&employees),
        ..DashboardStats::default()
    };
    let mut away: HashSet<u64> = HashSet::new();
    for request in &requests {
        match request.state(today) {
            RequestState::Pending => stats.pending_requests += 1,
            RequestState::Expired => stats.expired_requests += 1,
            RequestState::Approved => {
                stats.approved_requests += 1;
                if request.contains(today) {
                    away.insert(request.user_id);
                }
            }
            RequestState::Rejected => stats.rejected_requests += 1,
        }
    }
    stats.on_leave_today = away.len();

    Ok(HttpResponse::Ok().json(stats))
}

#[utoipa::path(
    get,
    path = "/api/admin/analytics/departments",
    tag = "Admin",
    responses(
        (status = 200, description = "Per-department counts, by name", body = [DepartmentStats]),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = []))
)]
pub async fn department_analytics(
    auth: AuthUser,
    state: web::Data<AppState>,
) -> Result<impl Responder, ApiError> {
    auth.require_admin()?;

    let mut employees = employees(&state).await?;
    employees.sort_by_key(|u| u.id);

    // Departments compare case-insensitively; the oldest member's spelling wins
    let mut groups: BTreeMap<String, Vec<&User>> = BTreeMap::new();
    for user in &employees {
        groups.entry(user.department.to_lowercase()).or_default().push(user);
    }
    let department_of: HashMap<u64, String> = employees
        .iter()
        .map(|u| (u.id, u.department.to_lowercase()))
        .collect();

    let mut requests_per: HashMap<&str, usize> = HashMap::new();
    for request in state.store.list_leaves(&LeaveFilter::default()).await? {
        if let Some(key) = department_of.get(&request.user_id) {
            *requests_per.entry(key.as_str()).or_default() += 1;
        }
    }

    let stats: Vec<DepartmentStats> = groups
        .iter()
        .map(|(key, members)| DepartmentStats {
            department: members[0].department.clone(),
            employee_count: members.len(),
            total_requests: requests_per.get(key.as_str()).copied().unwrap_or(0),
            average_leave_balance: average_balance(members.iter().copied()),
        })
        .collect();

    Ok(HttpResponse::Ok().json(stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::user::LeaveBalance;
    use chrono::Utc;

    fn user(id: u64, annual: u32) -> User {
        User {
            id,
            employee_id: format!("EMP{:03}", id),
            name: "Asha".into(),
            email: format!("u{}@x.io", id),
            password_hash: String::new(),
            role: Role::Employee,
            department: "Ops".into(),
            gender: None,
            leave_balance: LeaveBalance {
                annual,
                ..LeaveBalance::default()
            },
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn average_is_rounded_to_two_places() {
        // 145 + 145 + 144 days
        let users = [user(1, 20), user(2, 20), user(3, 19)];
        assert_eq!(average_balance(&users), 144.67);
        assert_eq!(average_balance(&[]), 0.0);
    }
}
