use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::model::user::{EmployeeSummary, LeaveBalance};

/// Leave pools; each maps to one counter of [`LeaveBalance`].
#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveType {
    Annual,
    Sick,
    Personal,
    Emergency,
    Maternity,
    Paternity,
}

/// Persisted status. `pending` moves once, to either terminal state.
#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

impl LeaveStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, LeaveStatus::Pending)
    }
}

/// Status as shown to callers: `expired` is derived on read, never stored.
#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RequestState {
    Pending,
    Approved,
    Rejected,
    Expired,
}

impl RequestState {
    /// Listing rank: active pendings, then expired pendings, then the rest.
    fn rank(&self) -> u8 {
        match self {
            RequestState::Pending => 0,
            RequestState::Expired => 1,
            RequestState::Approved | RequestState::Rejected => 2,
        }
    }
}

/// Inclusive day count of `[start, end]`.
pub fn day_count(start: NaiveDate, end: NaiveDate) -> u32 {
    let span = (end - start).num_days().unsigned_abs() + 1;
    u32::try_from(span).unwrap_or(u32::MAX)
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeaveRequest {
    pub id: u64,
    pub user_id: u64,
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: u32,
    pub reason: String,
    pub status: LeaveStatus,
    pub admin_comment: Option<String>,
    pub applied_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<u64>,
}

impl LeaveRequest {
    /// Pending and past its last day. A request ending `today` is still live.
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.status == LeaveStatus::Pending && self.end_date < today
    }

    pub fn state(&self, today: NaiveDate) -> RequestState {
        match self.status {
            LeaveStatus::Pending if self.is_expired(today) => RequestState::Expired,
            LeaveStatus::Pending => RequestState::Pending,
            LeaveStatus::Approved => RequestState::Approved,
            LeaveStatus::Rejected => RequestState::Rejected,
        }
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start_date <= day && day <= self.end_date
    }

    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start_date <= end && self.end_date >= start
    }

    /// Owner edits and deletes are allowed only on live pending requests.
    pub fn is_editable(&self, today: NaiveDate) -> bool {
        self.state(today) == RequestState::Pending
    }
}

/// Validated input for a new request.
#[derive(Debug, Clone)]
pub struct NewLeaveRequest {
    pub user_id: u64,
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: u32,
    pub reason: String,
    pub applied_at: DateTime<Utc>,
}

/// Fields an employee supplies when submitting or editing.
#[derive(Debug, Clone)]
pub struct LeaveDraft {
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
}

impl LeaveDraft {
    /// Checks ordering, reason and pool sufficiency; returns the day count.
    pub fn validate(&self, balance: &LeaveBalance) -> Result<u32, ApiError> {
        if self.end_date < self.start_date {
            return Err(ApiError::validation("End date cannot be before start date"));
        }
        if self.reason.trim().is_empty() {
            return Err(ApiError::validation("Reason is required"));
        }

        let days = day_count(self.start_date, self.end_date);
        let available = balance.get(self.leave_type);
        if days > available {
            return Err(ApiError::validation(format!(
                "Insufficient {} leave balance. Available: {} days, Requested: {} days",
                self.leave_type, available, days
            )));
        }
        Ok(days)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Decision {
    Approve,
    Reject,
}

/// A reviewer's status transition, applied atomically by the store.
#[derive(Debug, Clone)]
pub struct Review {
    pub request_id: u64,
    pub decision: Decision,
    pub reviewer_id: u64,
    pub comment: Option<String>,
    pub reviewed_at: DateTime<Utc>,
}

/// Joined, display-ready request. The only shape list endpoints return.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequestView {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 7)]
    pub user_id: u64,
    pub leave_type: LeaveType,
    #[schema(example = "2026-03-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-03-03", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = 3)]
    pub days: u32,
    #[schema(example = "Family trip")]
    pub reason: String,
    pub status: RequestState,
    #[schema(nullable = true)]
    pub admin_comment: Option<String>,
    #[schema(example = "2026-02-20T09:30:00Z", format = "date-time", value_type = String)]
    pub applied_at: DateTime<Utc>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[schema(nullable = true)]
    pub reviewed_by: Option<u64>,
    #[schema(nullable = true)]
    pub reviewed_by_name: Option<String>,
    pub employee: EmployeeSummary,
}

impl LeaveRequestView {
    pub fn new(
        request: LeaveRequest,
        employee: EmployeeSummary,
        reviewed_by_name: Option<String>,
        today: NaiveDate,
    ) -> Self {
        let status = request.state(today);
        Self {
            id: request.id,
            user_id: request.user_id,
            leave_type: request.leave_type,
            start_date: request.start_date,
            end_date: request.end_date,
            days: request.days,
            reason: request.reason,
            status,
            admin_comment: request.admin_comment,
            applied_at: request.applied_at,
            reviewed_at: request.reviewed_at,
            reviewed_by: request.reviewed_by,
            reviewed_by_name,
            employee,
        }
    }
}

fn listing_order(a: &LeaveRequestView, b: &LeaveRequestView) -> Ordering {
    a.status
        .rank()
        .cmp(&b.status.rank())
        .then_with(|| b.applied_at.cmp(&a.applied_at))
        .then_with(|| b.id.cmp(&a.id))
}

pub fn sort_for_listing(views: &mut [LeaveRequestView]) {
    views.sort_by(listing_order);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn request(id: u64, status: LeaveStatus, end: NaiveDate, applied_hour: u32) -> LeaveRequest {
        LeaveRequest {
            id,
            user_id: 1,
            leave_type: LeaveType::Annual,
            start_date: end,
            end_date: end,
            days: 1,
            reason: "r".into(),
            status,
            admin_comment: None,
            applied_at: Utc.with_ymd_and_hms(2026, 1, 1, applied_hour, 0, 0).unwrap(),
            reviewed_at: None,
            reviewed_by: None,
        }
    }

    fn summary() -> EmployeeSummary {
        EmployeeSummary {
            id: 1,
            name: "Asha".into(),
            email: "asha@example.com".into(),
            employee_id: "EMP001".into(),
            department: "Ops".into(),
        }
    }

    #[test]
    fn day_count_is_inclusive() {
        assert_eq!(day_count(date(2026, 1, 1), date(2026, 1, 1)), 1);
        assert_eq!(day_count(date(2026, 1, 1), date(2026, 1, 3)), 3);
        assert_eq!(day_count(date(2026, 2, 27), date(2026, 3, 2)), 4);
    }

    #[test]
    fn request_ending_today_is_not_expired() {
        let today = date(2026, 3, 10);
        let ends_today = request(1, LeaveStatus::Pending, today, 0);
        let ended_yesterday = request(2, LeaveStatus::Pending, date(2026, 3, 9), 0);
        let approved_past = request(3, LeaveStatus::Approved, date(2026, 3, 1), 0);

        assert!(!ends_today.is_expired(today));
        assert_eq!(ends_today.state(today), RequestState::Pending);
        assert!(ended_yesterday.is_expired(today));
        assert_eq!(ended_yesterday.state(today), RequestState::Expired);
        assert!(!approved_past.is_expired(today));
        assert_eq!(approved_past.state(today), RequestState::Approved);
    }

    #[test]
    fn draft_rejects_reversed_range_and_blank_reason() {
        let balance = LeaveBalance::default();
        let reversed = LeaveDraft {
            leave_type: LeaveType::Annual,
            start_date: date(2026, 3, 3),
            end_date: date(2026, 3, 1),
            reason: "trip".into(),
        };
        assert!(matches!(reversed.validate(&balance), Err(ApiError::Validation(_))));

        let blank = LeaveDraft {
            reason: "   ".into(),
            start_date: date(2026, 3, 1),
            end_date: date(2026, 3, 3),
            ..reversed
        };
        assert!(matches!(blank.validate(&balance), Err(ApiError::Validation(_))));
    }

    #[test]
    fn draft_checks_the_matching_pool() {
        let balance = LeaveBalance {
            personal: 2,
            ..LeaveBalance::default()
        };
        let draft = LeaveDraft {
            leave_type: LeaveType::Personal,
            start_date: date(2026, 3, 1),
            end_date: date(2026, 3, 3),
            reason: "move".into(),
        };
        let err = draft.validate(&balance).unwrap_err();
        assert!(err.to_string().contains("Available: 2 days, Requested: 3 days"));

        let fits = LeaveDraft {
            leave_type: LeaveType::Annual,
            ..draft
        };
        assert_eq!(fits.validate(&balance).unwrap(), 3);
    }

    #[test]
    fn listing_puts_live_pendings_first_and_expired_after() {
        let today = date(2026, 3, 10);
        let view = |id, status, end, hour| {
            LeaveRequestView::new(request(id, status, end, hour), summary(), None, today)
        };
        let mut views = vec![
            view(1, LeaveStatus::Approved, date(2026, 4, 1), 9),
            view(2, LeaveStatus::Pending, date(2026, 3, 1), 8),
            view(3, LeaveStatus::Pending, date(2026, 4, 1), 1),
            view(4, LeaveStatus::Pending, date(2026, 4, 2), 5),
        ];
        sort_for_listing(&mut views);
        let ids: Vec<u64> = views.iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![4, 3, 2, 1]);
    }
}
