use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::mysql::MySqlArguments;
use sqlx::query::{Query, QueryAs};
use sqlx::{FromRow, MySql, MySqlPool};

use super::{LeaveFilter, ReviewOutcome, Store, StoreError, UserChanges, UserFilter};
use crate::model::audit_log::{
    AuditAction, AuditEntry, AuditEntryView, AuditFilter, NewAuditEntry,
};
use crate::model::leave_request::{
    Decision, LeaveRequest, LeaveStatus, LeaveType, NewLeaveRequest, Review,
};
use crate::model::role::Role;
use crate::model::user::{Gender, LeaveBalance, NewUser, User};

const USER_COLUMNS: &str = r#"
    id, employee_id, name, email, password_hash, role, department, gender,
    annual_balance, sick_balance, personal_balance, emergency_balance,
    maternity_balance, paternity_balance, created_at, updated_at
"#;

const LEAVE_COLUMNS: &str = r#"
    id, user_id, leave_type, start_date, end_date, days, reason, status,
    admin_comment, applied_at, reviewed_at, reviewed_by
"#;

// Helper enum for typed SQLx binding
enum FilterValue<'a> {
    U64(u64),
    Str(&'a str),
    Owned(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

fn bind_filters<'q, O>(
    mut query: QueryAs<'q, MySql, O, MySqlArguments>,
    args: &'q [FilterValue<'q>],
) -> QueryAs<'q, MySql, O, MySqlArguments> {
    for arg in args {
        query = match arg {
            FilterValue::U64(v) => query.bind(*v),
            FilterValue::Str(s) => query.bind(*s),
            FilterValue::Owned(s) => query.bind(s.as_str()),
            FilterValue::Date(d) => query.bind(*d),
            FilterValue::DateTime(t) => query.bind(*t),
        };
    }
    query
}

fn bind_values<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    args: &'q [FilterValue<'q>],
) -> Query<'q, MySql, MySqlArguments> {
    for arg in args {
        query = match arg {
            FilterValue::U64(v) => query.bind(*v),
            FilterValue::Str(s) => query.bind(*s),
            FilterValue::Owned(s) => query.bind(s.as_str()),
            FilterValue::Date(d) => query.bind(*d),
            FilterValue::DateTime(t) => query.bind(*t),
        };
    }
    query
}

fn balance_column(leave_type: LeaveType) -> &'static str {
    match leave_type {
        LeaveType::Annual => "annual_balance",
        LeaveType::Sick => "sick_balance",
        LeaveType::Personal => "personal_balance",
        LeaveType::Emergency => "emergency_balance",
        LeaveType::Maternity => "maternity_balance",
        LeaveType::Paternity => "paternity_balance",
    }
}

fn parse_column<T: FromStr>(column: &str, raw: &str) -> Result<T, StoreError> {
    T::from_str(raw).map_err(|_| StoreError::Corrupt(format!("{} = '{}'", column, raw)))
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

#[derive(FromRow)]
struct UserRow {
    id: u64,
    employee_id: String,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    department: String,
    gender: Option<String>,
    annual_balance: u32,
    sick_balance: u32,
    personal_balance: u32,
    emergency_balance: u32,
    maternity_balance: u32,
    paternity_balance: u32,
    created_at: NaiveDateTime,
    updated_at: Option<NaiveDateTime>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let gender = match row.gender.as_deref() {
            Some(raw) => Some(parse_column::<Gender>("gender", raw)?),
            None => None,
        };
        Ok(User {
            id: row.id,
            employee_id: row.employee_id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            role: parse_column::<Role>("role", &row.role)?,
            department: row.department,
            gender,
            leave_balance: LeaveBalance {
                annual: row.annual_balance,
                sick: row.sick_balance,
                personal: row.personal_balance,
                emergency: row.emergency_balance,
                maternity: row.maternity_balance,
                paternity: row.paternity_balance,
            },
            created_at: row.created_at.and_utc(),
            updated_at: row.updated_at.map(|t| t.and_utc()),
        })
    }
}

#[derive(FromRow)]
struct LeaveRow {
    id: u64,
    user_id: u64,
    leave_type: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    days: u32,
    reason: String,
    status: String,
    admin_comment: Option<String>,
    applied_at: NaiveDateTime,
    reviewed_at: Option<NaiveDateTime>,
    reviewed_by: Option<u64>,
}

impl TryFrom<LeaveRow> for LeaveRequest {
    type Error = StoreError;

    fn try_from(row: LeaveRow) -> Result<Self, Self::Error> {
        Ok(LeaveRequest {
            id: row.id,
            user_id: row.user_id,
            leave_type: parse_column("leave_type", &row.leave_type)?,
            start_date: row.start_date,
            end_date: row.end_date,
            days: row.days,
            reason: row.reason,
            status: parse_column("status", &row.status)?,
            admin_comment: row.admin_comment,
            applied_at: row.applied_at.and_utc(),
            reviewed_at: row.reviewed_at.map(|t| t.and_utc()),
            reviewed_by: row.reviewed_by,
        })
    }
}

#[derive(FromRow)]
struct AuditRow {
    id: u64,
    user_id: u64,
    action: String,
    description: String,
    details: String,
    timestamp: NaiveDateTime,
    ip_address: Option<String>,
    user_name: Option<String>,
    user_email: Option<String>,
}

impl TryFrom<AuditRow> for AuditEntryView {
    type Error = StoreError;

    fn try_from(row: AuditRow) -> Result<Self, Self::Error> {
        let entry = AuditEntry {
            id: row.id,
            user_id: row.user_id,
            action: parse_column::<AuditAction>("action", &row.action)?,
            description: row.description,
            details: serde_json::from_str(&row.details)
                .map_err(|e| StoreError::Corrupt(format!("details: {}", e)))?,
            timestamp: row.timestamp.and_utc(),
            ip_address: row.ip_address,
        };
        let actor = match (row.user_name.as_deref(), row.user_email.as_deref()) {
            (Some(name), Some(email)) => Some((name, email)),
            _ => None,
        };
        Ok(AuditEntryView::new(entry, actor))
    }
}

pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn fetch_users(
        &self,
        sql: &str,
        args: &[FilterValue<'_>],
    ) -> Result<Vec<User>, StoreError> {
        let query = bind_filters(sqlx::query_as::<_, UserRow>(sql), args);
        query
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(User::try_from)
            .collect()
    }
}

#[async_trait]
impl Store for MySqlStore {
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let balance = user.leave_balance;
        let result = sqlx::query(
            r#"
            INSERT INTO users (
                employee_id, name, email, password_hash, role, department, gender,
                annual_balance, sick_balance, personal_balance, emergency_balance,
                maternity_balance, paternity_balance, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.employee_id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_ref())
        .bind(&user.department)
        .bind(user.gender.map(|g| g.to_string()))
        .bind(balance.annual)
        .bind(balance.sick)
        .bind(balance.personal)
        .bind(balance.emergency)
        .bind(balance.maternity)
        .bind(balance.paternity)
        .bind(user.created_at.naive_utc())
        .execute(&self.pool)
        .await?;

        Ok(User {
            id: result.last_insert_id(),
            employee_id: user.employee_id,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            department: user.department,
            gender: user.gender,
            leave_balance: balance,
            created_at: user.created_at,
            updated_at: None,
        })
    }

    async fn find_user(&self, id: u64) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS);
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn users_by_ids(&self, ids: &[u64]) -> Result<Vec<User>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {} FROM users WHERE id IN ({})",
            USER_COLUMNS,
            placeholders(ids.len())
        );
        let args: Vec<FilterValue> = ids.iter().map(|id| FilterValue::U64(*id)).collect();
        self.fetch_users(&sql, &args).await
    }

    async fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>, StoreError> {
        let mut where_sql = String::from(" WHERE 1=1");
        let mut args: Vec<FilterValue> = Vec::new();

        if let Some(role) = filter.role {
            where_sql.push_str(" AND role = ?");
            args.push(FilterValue::Owned(role.to_string()));
        }
        if let Some(department) = filter.department.as_deref() {
            where_sql.push_str(" AND department = ?");
            args.push(FilterValue::Str(department));
        }
        if let Some(search) = filter.search.as_deref() {
            let pattern = format!("%{}%", search);
            where_sql.push_str(" AND (name LIKE ? OR email LIKE ? OR employee_id LIKE ?)");
            args.push(FilterValue::Owned(pattern.clone()));
            args.push(FilterValue::Owned(pattern.clone()));
            args.push(FilterValue::Owned(pattern));
        }

        let sql = format!(
            "SELECT {} FROM users{} ORDER BY created_at DESC, id DESC",
            USER_COLUMNS, where_sql
        );
        self.fetch_users(&sql, &args).await
    }

    async fn update_user(
        &self,
        id: u64,
        changes: &UserChanges,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        let mut sets: Vec<String> = Vec::new();
        let mut args: Vec<FilterValue> = Vec::new();

        if let Some(name) = &changes.name {
            sets.push("name = ?".into());
            args.push(FilterValue::Str(name));
        }
        if let Some(email) = &changes.email {
            sets.push("email = ?".into());
            args.push(FilterValue::Str(email));
        }
        if let Some(department) = &changes.department {
            sets.push("department = ?".into());
            args.push(FilterValue::Str(department));
        }
        if let Some(gender) = changes.gender {
            sets.push("gender = ?".into());
            args.push(FilterValue::Owned(gender.to_string()));
        }
        if let Some(hash) = &changes.password_hash {
            sets.push("password_hash = ?".into());
            args.push(FilterValue::Str(hash));
        }
        // Patched pools only; approvals own the rest
        if let Some(patch) = &changes.balance {
            for (leave_type, value) in patch.entries() {
                sets.push(format!("{} = ?", balance_column(leave_type)));
                args.push(FilterValue::U64(u64::from(value)));
            }
        }
        sets.push("updated_at = ?".into());
        args.push(FilterValue::DateTime(updated_at.naive_utc()));
        args.push(FilterValue::U64(id));

        let sql = format!("UPDATE users SET {} WHERE id = ?", sets.join(", "));
        bind_values(sqlx::query(&sql), &args)
            .execute(&self.pool)
            .await?;

        self.find_user(id).await
    }

    async fn delete_user(&self, id: u64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn employee_codes(&self) -> Result<Vec<String>, StoreError> {
        Ok(sqlx::query_scalar::<_, String>("SELECT employee_id FROM users")
            .fetch_all(&self.pool)
            .await?)
    }

    async fn all_emails(&self) -> Result<Vec<String>, StoreError> {
        Ok(sqlx::query_scalar::<_, String>("SELECT email FROM users")
            .fetch_all(&self.pool)
            .await?)
    }

    async fn insert_leave(&self, request: NewLeaveRequest) -> Result<LeaveRequest, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO leave_requests
                (user_id, leave_type, start_date, end_date, days, reason, status, applied_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(request.user_id)
        .bind(request.leave_type.as_ref())
        .bind(request.start_date)
        .bind(request.end_date)
        .bind(request.days)
        .bind(&request.reason)
        .bind(LeaveStatus::Pending.as_ref())
        .bind(request.applied_at.naive_utc())
        .execute(&self.pool)
        .await?;

        Ok(LeaveRequest {
            id: result.last_insert_id(),
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
        })
    }

    async fn find_leave(&self, id: u64) -> Result<Option<LeaveRequest>, StoreError> {
        let sql = format!("SELECT {} FROM leave_requests WHERE id = ?", LEAVE_COLUMNS);
        sqlx::query_as::<_, LeaveRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(LeaveRequest::try_from)
            .transpose()
    }

    async fn list_leaves(&self, filter: &LeaveFilter) -> Result<Vec<LeaveRequest>, StoreError> {
        let mut where_sql = String::from(" WHERE 1=1");
        let mut args: Vec<FilterValue> = Vec::new();

        if let Some(user_id) = filter.user_id {
            where_sql.push_str(" AND user_id = ?");
            args.push(FilterValue::U64(user_id));
        }
        if let Some((start, end)) = filter.overlapping {
            where_sql.push_str(" AND start_date <= ? AND end_date >= ?");
            args.push(FilterValue::Date(end));
            args.push(FilterValue::Date(start));
        }

        let sql = format!("SELECT {} FROM leave_requests{}", LEAVE_COLUMNS, where_sql);
        let query = bind_filters(sqlx::query_as::<_, LeaveRow>(&sql), &args);

        query
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(LeaveRequest::try_from)
            .collect()
    }

    async fn update_leave(&self, request: &LeaveRequest) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE leave_requests
            SET leave_type = ?, start_date = ?, end_date = ?, days = ?, reason = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(request.leave_type.as_ref())
        .bind(request.start_date)
        .bind(request.end_date)
        .bind(request.days)
        .bind(&request.reason)
        .bind(request.id)
        .bind(LeaveStatus::Pending.as_ref())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn review_leave(&self, review: Review) -> Result<ReviewOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "SELECT {} FROM leave_requests WHERE id = ? FOR UPDATE",
            LEAVE_COLUMNS
        );
        let Some(row) = sqlx::query_as::<_, LeaveRow>(&sql)
            .bind(review.request_id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(ReviewOutcome::NotFound);
        };
        let mut request = LeaveRequest::try_from(row)?;
        if request.status != LeaveStatus::Pending {
            return Ok(ReviewOutcome::NotPending(request));
        }

        let status = match review.decision {
            Decision::Approve => {
                let column = balance_column(request.leave_type);
                let deduct = format!(
                    "UPDATE users SET {col} = {col} - ?, updated_at = ? \
                     WHERE id = ? AND {col} >= ?",
                    col = column
                );
                let deducted = sqlx::query(&deduct)
                    .bind(request.days)
                    .bind(review.reviewed_at.naive_utc())
                    .bind(request.user_id)
                    .bind(request.days)
                    .execute(&mut *tx)
                    .await?;

                if deducted.rows_affected() == 0 {
                    let lookup = format!("SELECT {} FROM users WHERE id = ?", column);
                    let available = sqlx::query_scalar::<_, u32>(&lookup)
                        .bind(request.user_id)
                        .fetch_optional(&mut *tx)
                        .await?;
                    tx.rollback().await?;
                    return Ok(match available {
                        Some(available) => ReviewOutcome::InsufficientBalance {
                            available,
                            requested: request.days,
                        },
                        None => ReviewOutcome::NotFound,
                    });
                }
                LeaveStatus::Approved
            }
            Decision::Reject => LeaveStatus::Rejected,
        };

        sqlx::query(
            r#"
            UPDATE leave_requests
            SET status = ?, admin_comment = ?, reviewed_at = ?, reviewed_by = ?
            WHERE id = ?
            "#,
        )
        .bind(status.as_ref())
        .bind(review.comment.as_deref())
        .bind(review.reviewed_at.naive_utc())
        .bind(review.reviewer_id)
        .bind(request.id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        request.status = status;
        request.admin_comment = review.comment;
        request.reviewed_at = Some(review.reviewed_at);
        request.reviewed_by = Some(review.reviewer_id);
        Ok(ReviewOutcome::Reviewed(request))
    }

    async fn delete_leave(&self, id: u64) -> Result<Option<LeaveRequest>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "SELECT {} FROM leave_requests WHERE id = ? FOR UPDATE",
            LEAVE_COLUMNS
        );
        let Some(row) = sqlx::query_as::<_, LeaveRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };
        let request = LeaveRequest::try_from(row)?;

        sqlx::query("DELETE FROM leave_requests WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if request.status == LeaveStatus::Approved {
            let restore = format!(
                "UPDATE users SET {col} = {col} + ? WHERE id = ?",
                col = balance_column(request.leave_type)
            );
            sqlx::query(&restore)
                .bind(request.days)
                .bind(request.user_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(Some(request))
    }

    async fn delete_leaves_for_user(&self, user_id: u64) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM leave_requests WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_audit(&self, entry: NewAuditEntry) -> Result<AuditEntry, StoreError> {
        let details = entry.details.to_string();
        let result = sqlx::query(
            r#"
            INSERT INTO audit_logs (user_id, action, description, details, `timestamp`, ip_address)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.user_id)
        .bind(entry.action.as_ref())
        .bind(&entry.description)
        .bind(details)
        .bind(entry.timestamp.naive_utc())
        .bind(entry.ip_address.as_deref())
        .execute(&self.pool)
        .await?;

        Ok(AuditEntry {
            id: result.last_insert_id(),
            user_id: entry.user_id,
            action: entry.action,
            description: entry.description,
            details: entry.details,
            timestamp: entry.timestamp,
            ip_address: entry.ip_address,
        })
    }

    async fn list_audit(&self, filter: &AuditFilter) -> Result<Vec<AuditEntryView>, StoreError> {
        let mut where_sql = String::from(" WHERE 1=1");
        let mut args: Vec<FilterValue> = Vec::new();

        if let Some(action) = filter.action {
            where_sql.push_str(" AND a.action = ?");
            args.push(FilterValue::Owned(action.to_string()));
        }
        if let Some(search) = filter.search.as_deref() {
            let pattern = format!("%{}%", search);
            where_sql.push_str(" AND (u.name LIKE ? OR u.email LIKE ? OR a.description LIKE ?)");
            args.push(FilterValue::Owned(pattern.clone()));
            args.push(FilterValue::Owned(pattern.clone()));
            args.push(FilterValue::Owned(pattern));
        }
        if let Some((from, until)) = filter.between {
            where_sql.push_str(" AND a.`timestamp` >= ? AND a.`timestamp` < ?");
            args.push(FilterValue::DateTime(from.naive_utc()));
            args.push(FilterValue::DateTime(until.naive_utc()));
        }

        let sql = format!(
            r#"
            SELECT a.id, a.user_id, a.action, a.description, a.details, a.`timestamp`,
                   a.ip_address, u.name AS user_name, u.email AS user_email
            FROM audit_logs a
            LEFT JOIN users u ON u.id = a.user_id
            {}
            ORDER BY a.`timestamp` DESC, a.id DESC
            LIMIT ? OFFSET ?
            "#,
            where_sql
        );

        let query = bind_filters(sqlx::query_as::<_, AuditRow>(&sql), &args);

        query
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(AuditEntryView::try_from)
            .collect()
    }

    async fn delete_all_audit(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM audit_logs")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_audit_for_user(&self, user_id: u64) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM audit_logs WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
