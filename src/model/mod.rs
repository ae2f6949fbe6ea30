pub mod audit_log;
pub mod calendar;
pub mod holiday;
pub mod leave_request;
pub mod role;
pub mod user;
