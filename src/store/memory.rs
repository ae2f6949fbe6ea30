use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{LeaveFilter, ReviewOutcome, Store, StoreError, UserChanges, UserFilter};
use crate::model::audit_log::{AuditEntry, AuditEntryView, AuditFilter, NewAuditEntry};
use crate::model::leave_request::{Decision, LeaveRequest, LeaveStatus, NewLeaveRequest, Review};
use crate::model::user::{NewUser, User};

#[derive(Default)]
struct Tables {
    users: BTreeMap<u64, User>,
    leaves: BTreeMap<u64, LeaveRequest>,
    audit: BTreeMap<u64, AuditEntry>,
    next_user: u64,
    next_leave: u64,
    next_audit: u64,
}

impl Tables {
    fn next_id(counter: &mut u64) -> u64 {
        *counter += 1;
        *counter
    }

    fn unique_violation(&self, user: &User) -> Option<StoreError> {
        self.users
            .values()
            .filter(|u| u.id != user.id)
            .find_map(|u| {
                if u.email == user.email {
                    Some(StoreError::Duplicate("email".into()))
                } else if u.employee_id == user.employee_id {
                    Some(StoreError::Duplicate("employeeId".into()))
                } else {
                    None
                }
            })
    }
}

/// Process-local store. Every operation runs under one lock, so review and
/// balance changes are atomic with respect to each other.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut tables = self.write();
        let mut created = User {
            id: 0,
            employee_id: user.employee_id,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            department: user.department,
            gender: user.gender,
            leave_balance: user.leave_balance,
            created_at: user.created_at,
            updated_at: None,
        };
        if let Some(err) = tables.unique_violation(&created) {
            return Err(err);
        }
        created.id = Tables::next_id(&mut tables.next_user);
        tables.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_user(&self, id: u64) -> Result<Option<User>, StoreError> {
        Ok(self.read().users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .read()
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn users_by_ids(&self, ids: &[u64]) -> Result<Vec<User>, StoreError> {
        let tables = self.read();
        Ok(ids
            .iter()
            .filter_map(|id| tables.users.get(id).cloned())
            .collect())
    }

    async fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>, StoreError> {
        Ok(self
            .read()
            .users
            .values()
            .filter(|u| filter.matches(u))
            .cloned()
            .collect())
    }

    async fn update_user(
        &self,
        id: u64,
        changes: &UserChanges,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        let mut tables = self.write();
        let Some(mut user) = tables.users.get(&id).cloned() else {
            return Ok(None);
        };
        changes.apply(&mut user);
        user.updated_at = Some(updated_at);
        if let Some(err) = tables.unique_violation(&user) {
            return Err(err);
        }
        tables.users.insert(id, user.clone());
        Ok(Some(user))
    }

    async fn delete_user(&self, id: u64) -> Result<bool, StoreError> {
        Ok(self.write().users.remove(&id).is_some())
    }

    async fn employee_codes(&self) -> Result<Vec<String>, StoreError> {
        Ok(self
            .read()
            .users
            .values()
            .map(|u| u.employee_id.clone())
            .collect())
    }

    async fn all_emails(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.read().users.values().map(|u| u.email.clone()).collect())
    }

    async fn insert_leave(&self, request: NewLeaveRequest) -> Result<LeaveRequest, StoreError> {
        let mut tables = self.write();
        let id = Tables::next_id(&mut tables.next_leave);
        let created = LeaveRequest {
            id,
            user_id: request.user_id,
            leave_type: request.leave_type,
            start_date: request.start_date,
            end_date: request.end_date,
            days: request.days,
            reason: request.reason,
            status: LeaveStatus::Pending,
            admin_comment: None,
            applied_at: request.applied_at,
            reviewed_at: None,
            reviewed_by: None,
        };
        tables.leaves.insert(id, created.clone());
        Ok(created)
    }

    async fn find_leave(&self, id: u64) -> Result<Option<LeaveRequest>, StoreError> {
        Ok(self.read().leaves.get(&id).cloned())
    }

    async fn list_leaves(&self, filter: &LeaveFilter) -> Result<Vec<LeaveRequest>, StoreError> {
        Ok(self
            .read()
            .leaves
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    async fn update_leave(&self, request: &LeaveRequest) -> Result<bool, StoreError> {
        let mut tables = self.write();
        match tables.leaves.get_mut(&request.id) {
            Some(stored) if stored.status == LeaveStatus::Pending => {
                stored.leave_type = request.leave_type;
                stored.start_date = request.start_date;
                stored.end_date = request.end_date;
                stored.days = request.days;
                stored.reason = request.reason.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn review_leave(&self, review: Review) -> Result<ReviewOutcome, StoreError> {
        let mut tables = self.write();
        let Tables { users, leaves, .. } = &mut *tables;

        let Some(request) = leaves.get_mut(&review.request_id) else {
            return Ok(ReviewOutcome::NotFound);
        };
        if request.status != LeaveStatus::Pending {
            return Ok(ReviewOutcome::NotPending(request.clone()));
        }

        let status = match review.decision {
            Decision::Approve => {
                let Some(owner) = users.get_mut(&request.user_id) else {
                    return Ok(ReviewOutcome::NotFound);
                };
                let available = owner.leave_balance.get(request.leave_type);
                if !owner.leave_balance.deduct(request.leave_type, request.days) {
                    return Ok(ReviewOutcome::InsufficientBalance {
                        available,
                        requested: request.days,
                    });
                }
                owner.updated_at = Some(review.reviewed_at);
                LeaveStatus::Approved
            }
            Decision::Reject => LeaveStatus::Rejected,
        };

        request.status = status;
        request.admin_comment = review.comment;
        request.reviewed_at = Some(review.reviewed_at);
        request.reviewed_by = Some(review.reviewer_id);
        Ok(ReviewOutcome::Reviewed(request.clone()))
    }

    async fn delete_leave(&self, id: u64) -> Result<Option<LeaveRequest>, StoreError> {
        let mut tables = self.write();
        let Some(removed) = tables.leaves.remove(&id) else {
            return Ok(None);
        };
        if removed.status == LeaveStatus::Approved {
            if let Some(owner) = tables.users.get_mut(&removed.user_id) {
                owner.leave_balance.restore(removed.leave_type, removed.days);
            }
        }
        Ok(Some(removed))
    }

    async fn delete_leaves_for_user(&self, user_id: u64) -> Result<u64, StoreError> {
        let mut tables = self.write();
        let before = tables.leaves.len();
        tables.leaves.retain(|_, r| r.user_id != user_id);
        Ok((before - tables.leaves.len()) as u64)
    }

    async fn insert_audit(&self, entry: NewAuditEntry) -> Result<AuditEntry, StoreError> {
        let mut tables = self.write();
        let id = Tables::next_id(&mut tables.next_audit);
        let created = AuditEntry {
            id,
            user_id: entry.user_id,
            action: entry.action,
            description: entry.description,
            details: entry.details,
            timestamp: entry.timestamp,
            ip_address: entry.ip_address,
        };
        tables.audit.insert(id, created.clone());
        Ok(created)
    }

    async fn list_audit(&self, filter: &AuditFilter) -> Result<Vec<AuditEntryView>, StoreError> {
        let tables = self.read();
        let mut entries: Vec<&AuditEntry> = tables
            .audit
            .values()
            .filter(|e| filter.action.is_none_or(|a| a == e.action))
            .filter(|e| {
                filter
                    .between
                    .is_none_or(|(from, until)| e.timestamp >= from && e.timestamp < until)
            })
            .collect();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.id.cmp(&a.id)));

        Ok(entries
            .into_iter()
            .map(|entry| {
                let actor = tables
                    .users
                    .get(&entry.user_id)
                    .map(|u| (u.name.as_str(), u.email.as_str()));
                AuditEntryView::new(entry.clone(), actor)
            })
            .filter(|view| {
                filter
                    .search
                    .as_deref()
                    .is_none_or(|needle| view.matches_search(needle))
            })
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .collect())
    }

    async fn delete_all_audit(&self) -> Result<u64, StoreError> {
        let mut tables = self.write();
        let removed = tables.audit.len() as u64;
        tables.audit.clear();
        Ok(removed)
    }

    async fn delete_audit_for_user(&self, user_id: u64) -> Result<u64, StoreError> {
        let mut tables = self.write();
        let before = tables.audit.len();
        tables.audit.retain(|_, e| e.user_id != user_id);
        Ok((before - tables.audit.len()) as u64)
    }
}
