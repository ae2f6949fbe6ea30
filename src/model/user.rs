use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::model::leave_request::LeaveType;
use crate::model::role::Role;

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
pub enum Gender {
    Male,
    Female,
    Other,
}

/// Remaining days per leave pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LeaveBalance {
    #[schema(example = 20)]
    pub annual: u32,
    #[schema(example = 10)]
    pub sick: u32,
    #[schema(example = 5)]
    pub personal: u32,
    #[schema(example = 5)]
    pub emergency: u32,
    #[schema(example = 90)]
    pub maternity: u32,
    #[schema(example = 15)]
    pub paternity: u32,
}

impl Default for LeaveBalance {
    fn default() -> Self {
        Self {
            annual: 20,
            sick: 10,
            personal: 5,
            emergency: 5,
            maternity: 90,
            paternity: 15,
        }
    }
}

impl LeaveBalance {
    pub fn get(&self, leave_type: LeaveType) -> u32 {
        match leave_type {
            LeaveType::Annual => self.annual,
            LeaveType::Sick => self.sick,
            LeaveType::Personal => self.personal,
            LeaveType::Emergency => self.emergency,
            LeaveType::Maternity => self.maternity,
            LeaveType::Paternity => self.paternity,
        }
    }

    fn slot(&mut self, leave_type: LeaveType) -> &mut u32 {
        match leave_type {
            LeaveType::Annual => &mut self.annual,
            LeaveType::Sick => &mut self.sick,
            LeaveType::Personal => &mut self.personal,
            LeaveType::Emergency => &mut self.emergency,
            LeaveType::Maternity => &mut self.maternity,
            LeaveType::Paternity => &mut self.paternity,
        }
    }

    /// Takes `days` from the pool; leaves it untouched and returns false when short.
    pub fn deduct(&mut self, leave_type: LeaveType, days: u32) -> bool {
        let slot = self.slot(leave_type);
        match slot.checked_sub(days) {
            Some(rest) => {
                *slot = rest;
                true
            }
            None => false,
        }
    }

    pub fn restore(&mut self, leave_type: LeaveType, days: u32) {
        let slot = self.slot(leave_type);
        *slot = slot.saturating_add(days);
    }

    pub fn total(&self) -> u64 {
        [
            self.annual,
            self.sick,
            self.personal,
            self.emergency,
            self.maternity,
            self.paternity,
        ]
        .iter()
        .map(|d| u64::from(*d))
        .sum()
    }
}

/// Partial balance override sent by an administrator.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct LeaveBalancePatch {
    pub annual: Option<u32>,
    pub sick: Option<u32>,
    pub personal: Option<u32>,
    pub emergency: Option<u32>,
    pub maternity: Option<u32>,
    pub paternity: Option<u32>,
}

impl LeaveBalancePatch {
    /// The pools this patch sets, with their new values.
    pub fn entries(&self) -> impl Iterator<Item = (LeaveType, u32)> {
        [
            (LeaveType::Annual, self.annual),
            (LeaveType::Sick, self.sick),
            (LeaveType::Personal, self.personal),
            (LeaveType::Emergency, self.emergency),
            (LeaveType::Maternity, self.maternity),
            (LeaveType::Paternity, self.paternity),
        ]
        .into_iter()
        .filter_map(|(leave_type, value)| value.map(|v| (leave_type, v)))
    }

    pub fn is_empty(&self) -> bool {
        self.entries().next().is_none()
    }

    pub fn apply(&self, balance: &mut LeaveBalance) {
        for (leave_type, value) in self.entries() {
            *balance.slot(leave_type) = value;
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: u64,
    pub employee_id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub department: String,
    pub gender: Option<Gender>,
    pub leave_balance: LeaveBalance,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            employee_id: self.employee_id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            department: self.department.clone(),
            gender: self.gender,
            leave_balance: self.leave_balance,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn summary(&self) -> EmployeeSummary {
        EmployeeSummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            employee_id: self.employee_id.clone(),
            department: self.department.clone(),
        }
    }
}

/// Insert payload; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub employee_id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub department: String,
    pub gender: Option<Gender>,
    pub leave_balance: LeaveBalance,
    pub created_at: DateTime<Utc>,
}

/// A user as returned by the API. Never carries the password hash.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[schema(example = 7)]
    pub id: u64,
    #[schema(example = "EMP007")]
    pub employee_id: String,
    #[schema(example = "Asha Patel")]
    pub name: String,
    #[schema(example = "asha@company.com", format = "email")]
    pub email: String,
    pub role: Role,
    #[schema(example = "Engineering")]
    pub department: String,
    #[schema(nullable = true)]
    pub gender: Option<Gender>,
    pub leave_balance: LeaveBalance,
    #[schema(example = "2026-01-05T08:00:00Z", format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Owner fields embedded in joined request listings.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeSummary {
    pub id: u64,
    #[schema(example = "Asha Patel")]
    pub name: String,
    #[schema(example = "asha@company.com")]
    pub email: String,
    #[schema(example = "EMP007")]
    pub employee_id: String,
    #[schema(example = "Engineering")]
    pub department: String,
}

const EMPLOYEE_CODE_PREFIX: &str = "EMP";

/// Next `EMPnnn` code after the highest one in use.
pub fn next_employee_code<'a, I>(existing: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let highest = existing
        .into_iter()
        .filter_map(|code| code.strip_prefix(EMPLOYEE_CODE_PREFIX))
        .filter_map(|digits| digits.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    format!("{}{:03}", EMPLOYEE_CODE_PREFIX, highest + 1)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
