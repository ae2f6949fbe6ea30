use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::ApiError;
use crate::model::holiday::Holiday;
use crate::model::leave_request::{LeaveRequestView, LeaveType, RequestState};
use crate::utils::time::parse_date;

pub const MAX_RANGE_DAYS: u32 = 366;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CalendarScope {
    /// Every employee, approved leave only.
    Fleet,
    /// One employee, requests in every state.
    Personal,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CalendarQuery {
    /// First day, `YYYY-MM-DD`.
    pub start: Option<String>,
    /// Last day, inclusive.
    pub end: Option<String>,
    /// Whole month, `YYYY-MM`. Ignored when `start`/`end` are given.
    pub month: Option<String>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct CalendarRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl CalendarRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ApiError> {
        if end < start {
            return Err(ApiError::validation("End date cannot be before start date"));
        }
        let span = (end - start).num_days() + 1;
        if span > i64::from(MAX_RANGE_DAYS) {
            return Err(ApiError::validation(format!(
                "Calendar range cannot exceed {} days",
                MAX_RANGE_DAYS
            )));
        }
        Ok(Self { start, end })
    }

    pub fn month(year: i32, month: u32) -> Result<Self, ApiError> {
        let invalid = || ApiError::validation("Invalid month, expected YYYY-MM");
        let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }
        .ok_or_else(invalid)?;
        let end = next.pred_opt().ok_or_else(invalid)?;
        Self::new(start, end)
    }

    /// Resolves a query; with nothing given, the month containing `today`.
    pub fn from_query(query: &CalendarQuery, today: NaiveDate) -> Result<Self, ApiError> {
        match (&query.start, &query.end, &query.month) {
            (Some(start), Some(end), _) => {
                let start = parse_date(start)
                    .ok_or_else(|| ApiError::validation("Invalid start date"))?;
                let end = parse_date(end).ok_or_else(|| ApiError::validation("Invalid end date"))?;
                Self::new(start, end)
            }
            (Some(_), None, _) | (None, Some(_), _) => Err(ApiError::validation(
                "Both start and end are required",
            )),
            (None, None, Some(month)) => {
                let (year, month) = month
                    .trim()
                    .split_once('-')
                    .and_then(|(y, m)| Some((y.parse::<i32>().ok()?, m.parse::<u32>().ok()?)))
                    .ok_or_else(|| ApiError::validation("Invalid month, expected YYYY-MM"))?;
                Self::month(year, month)
            }
            (None, None, None) => Self::month(today.year(), today.month()),
        }
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start
            .iter_days()
            .take_while(move |day| *day <= self.end)
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEntry {
    pub request_id: u64,
    pub user_id: u64,
    #[schema(example = "Asha Patel")]
    pub employee_name: String,
    #[schema(example = "Engineering")]
    pub department: String,
    pub leave_type: LeaveType,
    pub status: RequestState,
    #[schema(format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(format = "date", value_type = String)]
    pub end_date: NaiveDate,
}

impl From<&LeaveRequestView> for CalendarEntry {
    fn from(view: &LeaveRequestView) -> Self {
        Self {
            request_id: view.id,
            user_id: view.user_id,
            employee_name: view.employee.name.clone(),
            department: view.employee.department.clone(),
            leave_type: view.leave_type,
            status: view.status,
            start_date: view.start_date,
            end_date: view.end_date,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CalendarDay {
    #[schema(format = "date", value_type = String)]
    pub date: NaiveDate,
    pub entries: Vec<CalendarEntry>,
    pub holidays: Vec<Holiday>,
}

/// Leave days in range, per derived state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct CalendarTotals {
    pub pending: u32,
    pub approved: u32,
    pub rejected: u32,
    pub expired: u32,
}

impl CalendarTotals {
    fn bump(&mut self, state: RequestState) {
        let slot = match state {
            RequestState::Pending => &mut self.pending,
            RequestState::Approved => &mut self.approved,
            RequestState::Rejected => &mut self.rejected,
            RequestState::Expired => &mut self.expired,
        };
        *slot += 1;
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Calendar {
    #[schema(format = "date", value_type = String)]
    pub start: NaiveDate,
    #[schema(format = "date", value_type = String)]
    pub end: NaiveDate,
    pub days: Vec<CalendarDay>,
    pub totals: CalendarTotals,
}

/// Lays requests and holidays out one cell per day of `range`.
///
/// Views must already carry their derived state; `Fleet` keeps approved
/// requests only.
pub fn build_calendar(
    range: CalendarRange,
    requests: &[LeaveRequestView],
    holidays: &[Holiday],
    scope: CalendarScope,
) -> Calendar {
    let visible: Vec<&LeaveRequestView> = requests
        .iter()
        .filter(|r| r.start_date <= range.end && r.end_date >= range.start)
        .filter(|r| scope == CalendarScope::Personal || r.status == RequestState::Approved)
        .collect();

    let mut by_date: BTreeMap<NaiveDate, Vec<Holiday>> = BTreeMap::new();
    for holiday in holidays {
        by_date.entry(holiday.date).or_default().push(holiday.clone());
    }

    let mut totals = CalendarTotals::default();
    let days = range
        .days()
        .map(|date| {
            let entries: Vec<CalendarEntry> = visible
                .iter()
                .filter(|r| r.start_date <= date && date <= r.end_date)
                .map(|r| {
                    totals.bump(r.status);
                    CalendarEntry::from(*r)
                })
                .collect();
            CalendarDay {
                date,
                entries,
                holidays: by_date.remove(&date).unwrap_or_default(),
            }
        })
        .collect();

    Calendar {
        start: range.start,
        end: range.end,
        days,
        totals,
    }
}
