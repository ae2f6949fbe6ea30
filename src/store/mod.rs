//! Persistence seam. Handlers only ever talk to `dyn Store`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use derive_more::Display;

use crate::model::audit_log::{AuditEntry, AuditEntryView, AuditFilter, NewAuditEntry};
use crate::model::leave_request::{LeaveRequest, NewLeaveRequest, Review};
use crate::model::role::Role;
use crate::model::user::{Gender, LeaveBalancePatch, NewUser, User};

pub mod memory;
pub mod mysql;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

#[derive(Debug, Display)]
pub enum StoreError {
    /// A unique column rejected the write; carries the API field name.
    #[display(fmt = "duplicate {}", _0)]
    Duplicate(String),
    #[display(fmt = "database error: {}", _0)]
    Database(sqlx::Error),
    /// A stored value could not be mapped back into the domain.
    #[display(fmt = "corrupt row: {}", _0)]
    Corrupt(String),
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                let field = if db.message().contains("employee_id") {
                    "employeeId"
                } else {
                    "email"
                };
                return StoreError::Duplicate(field.to_string());
            }
        }
        StoreError::Database(err)
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub department: Option<String>,
    /// Case-insensitive match on name, email or employee id.
    pub search: Option<String>,
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        if self.role.is_some_and(|r| r != user.role) {
            return false;
        }
        if let Some(department) = &self.department {
            if !user.department.eq_ignore_ascii_case(department) {
                return false;
            }
        }
        match &self.search {
            Some(needle) => {
                let needle = needle.to_lowercase();
                user.name.to_lowercase().contains(&needle)
                    || user.email.contains(&needle)
                    || user.employee_id.to_lowercase().contains(&needle)
            }
            None => true,
        }
    }
}

/// Column-level user edit. Only the columns set here are written, so an
/// approval that lands in between keeps its deduction.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub department: Option<String>,
    pub gender: Option<Gender>,
    pub password_hash: Option<String>,
    /// Overwrites only the pools it names.
    pub balance: Option<LeaveBalancePatch>,
}

impl UserChanges {
    /// API names of the touched fields, for audit details.
    pub fn fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.name.is_some() {
            fields.push("name");
        }
        if self.email.is_some() {
            fields.push("email");
        }
        if self.department.is_some() {
            fields.push("department");
        }
        if self.gender.is_some() {
            fields.push("gender");
        }
        if self.password_hash.is_some() {
            fields.push("password");
        }
        if self.balance.as_ref().is_some_and(|p| !p.is_empty()) {
            fields.push("leaveBalance");
        }
        fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    pub fn apply(&self, user: &mut User) {
        if let Some(name) = &self.name {
            user.name = name.clone();
        }
        if let Some(email) = &self.email {
            user.email = email.clone();
        }
        if let Some(department) = &self.department {
            user.department = department.clone();
        }
        if let Some(gender) = self.gender {
            user.gender = Some(gender);
        }
        if let Some(hash) = &self.password_hash {
            user.password_hash = hash.clone();
        }
        if let Some(patch) = &self.balance {
            patch.apply(&mut user.leave_balance);
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LeaveFilter {
    pub user_id: Option<u64>,
    /// Keep requests whose interval intersects `[start, end]`.
    pub overlapping: Option<(NaiveDate, NaiveDate)>,
}

impl LeaveFilter {
    pub fn matches(&self, request: &LeaveRequest) -> bool {
        self.user_id.is_none_or(|id| id == request.user_id)
            && self
                .overlapping
                .is_none_or(|(start, end)| request.overlaps(start, end))
    }
}

/// Result of a status transition attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum ReviewOutcome {
    Reviewed(LeaveRequest),
    NotFound,
    /// Someone else already moved it out of `pending`.
    NotPending(LeaveRequest),
    /// Approval would take the owner's pool below zero.
    InsufficientBalance { available: u32, requested: u32 },
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn find_user(&self, id: u64) -> Result<Option<User>, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn users_by_ids(&self, ids: &[u64]) -> Result<Vec<User>, StoreError>;

    async fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>, StoreError>;

    /// Writes only the given columns and returns the fresh row; `None` when
    /// the user is gone.
    async fn update_user(
        &self,
        id: u64,
        changes: &UserChanges,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError>;

    async fn delete_user(&self, id: u64) -> Result<bool, StoreError>;

    async fn employee_codes(&self) -> Result<Vec<String>, StoreError>;

    async fn all_emails(&self) -> Result<Vec<String>, StoreError>;

    async fn insert_leave(&self, request: NewLeaveRequest) -> Result<LeaveRequest, StoreError>;

    async fn find_leave(&self, id: u64) -> Result<Option<LeaveRequest>, StoreError>;

    async fn list_leaves(&self, filter: &LeaveFilter) -> Result<Vec<LeaveRequest>, StoreError>;

    /// Rewrites type, dates, days and reason, only while still pending.
    async fn update_leave(&self, request: &LeaveRequest) -> Result<bool, StoreError>;

    /// Moves a pending request to its terminal state. Approval deducts the
    /// owner's balance in the same atomic step.
    async fn review_leave(&self, review: Review) -> Result<ReviewOutcome, StoreError>;

    /// Removes a request, returning it. Approved days go back to the owner.
    async fn delete_leave(&self, id: u64) -> Result<Option<LeaveRequest>, StoreError>;

    async fn delete_leaves_for_user(&self, user_id: u64) -> Result<u64, StoreError>;

    async fn insert_audit(&self, entry: NewAuditEntry) -> Result<AuditEntry, StoreError>;

    /// Newest first, joined with the actor.
    async fn list_audit(&self, filter: &AuditFilter) -> Result<Vec<AuditEntryView>, StoreError>;

    async fn delete_all_audit(&self) -> Result<u64, StoreError>;

    async fn delete_audit_for_user(&self, user_id: u64) -> Result<u64, StoreError>;
}
