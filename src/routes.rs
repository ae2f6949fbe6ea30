use crate::{
    api::{audit_log, calendar, dashboard, employee, holiday, leave_request},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
    error::ApiError,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{
    HttpResponse, Responder, ResponseError,
    error::InternalError,
    middleware::from_fn,
    web,
};
use serde_json::json;
use std::sync::Arc;

// Helper to build per-route limiter
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .unwrap_or_default();
    Governor::new(&cfg)
}

/// Renders extractor failures (bad JSON, query or path) as `{"message"}` 400s.
fn bad_input(err: impl std::fmt::Display + std::fmt::Debug + 'static) -> actix_web::Error {
    let response = ApiError::validation(err.to_string()).error_response();
    InternalError::from_response(err, response).into()
}

async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config) {
    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let register_limiter = Arc::new(build_limiter(config.rate_register_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    cfg.app_data(web::JsonConfig::default().error_handler(|err, _| bad_input(err)))
        .app_data(web::QueryConfig::default().error_handler(|err, _| bad_input(err)))
        .app_data(web::PathConfig::default().error_handler(|err, _| bad_input(err)));

    cfg.route("/health", web::get().to(health));

    // Auth: login and register are public, the rest needs a token
    cfg.service(
        web::scope(&format!("{}/auth", config.api_prefix))
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/register")
                    .wrap(register_limiter.clone())
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/profile")
                    .wrap(from_fn(auth_middleware))
                    .wrap(protected_limiter.clone())
                    .route(web::get().to(handlers::profile))
                    .route(web::put().to(handlers::update_profile)),
            )
            .service(
                web::resource("/change-password")
                    .wrap(from_fn(auth_middleware))
                    .wrap(protected_limiter.clone())
                    .route(web::post().to(handlers::change_password)),
            )
            .service(
                web::resource("/change-email")
                    .wrap(from_fn(auth_middleware))
                    .wrap(protected_limiter.clone())
                    .route(web::post().to(handlers::change_email)),
            )
            .service(
                web::resource("/logout")
                    .wrap(from_fn(auth_middleware))
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(protected_limiter)
            .service(
                web::scope("/leave")
                    .service(
                        web::resource("/request")
                            .route(web::post().to(leave_request::submit_leave)),
                    )
                    .service(
                        web::resource("/my-requests")
                            .route(web::get().to(leave_request::my_requests)),
                    )
                    .service(
                        web::resource("/all-requests")
                            .route(web::get().to(leave_request::all_requests)),
                    )
                    .service(web::resource("/calendar").route(web::get().to(calendar::my_calendar)))
                    .service(
                        web::resource("/update-status/{id}")
                            .route(web::put().to(leave_request::update_status)),
                    )
                    // /leave/{id}
                    .service(
                        web::resource("/{id:\\d+}")
                            .route(web::get().to(leave_request::get_leave))
                            .route(web::put().to(leave_request::update_leave))
                            .route(web::delete().to(leave_request::delete_leave)),
                    ),
            )
            .service(
                web::scope("/admin")
                    .service(
                        web::resource("/dashboard-stats")
                            .route(web::get().to(dashboard::dashboard_stats)),
                    )
                    .service(
                        web::resource("/analytics/departments")
                            .route(web::get().to(dashboard::department_analytics)),
                    )
                    .service(
                        web::resource("/calendar").route(web::get().to(calendar::fleet_calendar)),
                    )
                    // /admin/employees
                    .service(
                        web::resource("/employees")
                            .route(web::get().to(employee::list_employees))
                            .route(web::post().to(employee::create_employee)),
                    )
                    // /admin/employees/{id}
                    .service(
                        web::resource("/employees/{id}")
                            .route(web::get().to(employee::get_employee))
                            .route(web::put().to(employee::update_employee))
                            .route(web::delete().to(employee::delete_employee)),
                    )
                    .service(
                        web::resource("/employees/{id}/summary")
                            .route(web::get().to(employee::employee_summary)),
                    ),
            )
            .service(web::resource("/holidays").route(web::get().to(holiday::list_holidays)))
            .service(web::resource("/logs").route(web::get().to(audit_log::list_logs)))
            .service(web::resource("/logs/reset").route(web::delete().to(audit_log::reset_logs))),
    );
}
