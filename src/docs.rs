use crate::api::dashboard::{DashboardStats, DepartmentStats};
use crate::api::employee::{
    CreateEmployee, EmployeeResponse, EmployeeStats, LeaveTypeUsage, UpdateEmployee,
};
use crate::api::leave_request::{LeaveResponse, SubmitLeave, UpdateLeave, UpdateStatus};
use crate::model::audit_log::{AuditAction, AuditEntryView};
use crate::model::calendar::{Calendar, CalendarDay, CalendarEntry, CalendarTotals};
use crate::model::holiday::{Holiday, HolidayKind};
use crate::model::leave_request::{LeaveRequestView, LeaveStatus, LeaveType, RequestState};
use crate::model::role::Role;
use crate::model::user::{EmployeeSummary, Gender, LeaveBalance, LeaveBalancePatch, UserProfile};
use crate::models::{
    AuthResponse, ChangeEmailReq, ChangeEmailResponse, ChangePasswordReq, LoginReqDto,
    MessageResponse, RegisterReq, UpdateProfileReq,
};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Leave Management API",
        version = "1.0.0",
        description = r#"
## Leave Management System

Employees request time off; administrators review it.

### Features
- **Leave requests**: submit, edit and withdraw while pending; approval deducts the balance
- **Employees**: admin-managed accounts with per-type leave balances
- **Calendar**: approved leave and public holidays laid out per day
- **Audit log**: every state change, newest first

### Security
Everything except login, register and `/health` needs a **JWT Bearer** token.
Admin-only endpoints answer 403 to employees.

### Errors
Every failure is `{"message": "..."}` with a 4xx or 500 status.
"#,
    ),
    paths(
        crate::auth::handlers::register,
        crate::auth::handlers::login,
        crate::auth::handlers::profile,
        crate::auth::handlers::update_profile,
        crate::auth::handlers::change_password,
        crate::auth::handlers::change_email,
        crate::auth::handlers::logout,

        crate::api::leave_request::submit_leave,
        crate::api::leave_request::my_requests,
        crate::api::leave_request::all_requests,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::update_leave,
        crate::api::leave_request::delete_leave,
        crate::api::leave_request::update_status,

        crate::api::employee::list_employees,
        crate::api::employee::create_employee,
        crate::api::employee::get_employee,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,
        crate::api::employee::employee_summary,

        crate::api::dashboard::dashboard_stats,
        crate::api::dashboard::department_analytics,
        crate::api::calendar::fleet_calendar,
        crate::api::calendar::my_calendar,
        crate::api::holiday::list_holidays,

        crate::api::audit_log::list_logs,
        crate::api::audit_log::reset_logs
    ),
    components(
        schemas(
            LoginReqDto,
            RegisterReq,
            AuthResponse,
            UpdateProfileReq,
            ChangePasswordReq,
            ChangeEmailReq,
            ChangeEmailResponse,
            MessageResponse,
            UserProfile,
            EmployeeSummary,
            LeaveBalance,
            LeaveBalancePatch,
            Gender,
            Role,
            SubmitLeave,
            UpdateLeave,
            UpdateStatus,
            LeaveResponse,
            LeaveRequestView,
            LeaveType,
            LeaveStatus,
            RequestState,
            CreateEmployee,
            UpdateEmployee,
            EmployeeResponse,
            EmployeeStats,
            LeaveTypeUsage,
            DashboardStats,
            DepartmentStats,
            Calendar,
            CalendarDay,
            CalendarEntry,
            CalendarTotals,
            Holiday,
            HolidayKind,
            AuditEntryView,
            AuditAction
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Accounts and tokens"),
        (name = "Leave", description = "Leave request lifecycle"),
        (name = "Employee", description = "Admin employee management"),
        (name = "Admin", description = "Admin dashboard"),
        (name = "Calendar", description = "Leave calendar and public holidays"),
        (name = "Audit", description = "Audit trail"),
    )
)]
pub struct ApiDoc;
