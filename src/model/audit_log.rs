use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AuditAction {
    LeaveRequested,
    LeaveApproved,
    LeaveRejected,
    LeaveUpdated,
    LeaveDeleted,
    LeaveExpired,
    UserLogin,
    UserLogout,
    UserRegistered,
    EmployeeCreated,
    EmployeeUpdated,
    EmployeeDeleted,
    PasswordChanged,
    ProfileUpdated,
    EmailChanged,
    AuditLogsReset,
}

/// Append-only record of a state change.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub id: u64,
    pub user_id: u64,
    pub action: AuditAction,
    pub description: String,
    pub details: Value,
    pub timestamp: DateTime<Utc>,
    pub ip_address: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub user_id: u64,
    pub action: AuditAction,
    pub description: String,
    pub details: Value,
    pub timestamp: DateTime<Utc>,
    pub ip_address: Option<String>,
}

/// Audit entry joined with its actor.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntryView {
    #[schema(example = 42)]
    pub id: u64,
    #[schema(example = 7)]
    pub user_id: u64,
    #[schema(example = "Asha Patel")]
    pub user_name: String,
    #[schema(nullable = true)]
    pub user_email: Option<String>,
    pub action: AuditAction,
    #[schema(example = "Submitted annual leave request")]
    pub description: String,
    #[schema(value_type = Object)]
    pub details: Value,
    #[schema(example = "2026-03-01T10:00:00Z", format = "date-time", value_type = String)]
    pub timestamp: DateTime<Utc>,
    #[schema(nullable = true)]
    pub ip_address: Option<String>,
}

pub const UNKNOWN_ACTOR: &str = "Unknown User";

impl AuditEntryView {
    pub fn new(entry: AuditEntry, actor: Option<(&str, &str)>) -> Self {
        let (user_name, user_email) = match actor {
            Some((name, email)) => (name.to_string(), Some(email.to_string())),
            None => (UNKNOWN_ACTOR.to_string(), None),
        };
        Self {
            id: entry.id,
            user_id: entry.user_id,
            user_name,
            user_email,
            action: entry.action,
            description: entry.description,
            details: entry.details,
            timestamp: entry.timestamp,
            ip_address: entry.ip_address,
        }
    }

    /// Case-insensitive match on actor name, email or description.
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.user_name.to_lowercase().contains(&needle)
            || self
                .user_email
                .as_deref()
                .is_some_and(|e| e.to_lowercase().contains(&needle))
            || self.description.to_lowercase().contains(&needle)
    }
}

#[derive(Debug, Clone)]
pub struct AuditFilter {
    pub limit: u32,
    pub offset: u32,
    pub action: Option<AuditAction>,
    pub search: Option<String>,
    /// Half-open `[from, until)` window in UTC.
    pub between: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl Default for AuditFilter {
    fn default() -> Self {
        Self {
            limit: 100,
            offset: 0,
            action: None,
            search: None,
            between: None,
        }
    }
}
