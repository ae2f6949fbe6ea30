#[macro_use]
mod common;

use actix_web::http::StatusCode;
use serde_json::{Value, json};

use common::{date, get, post, put};

fn day<'a>(calendar: &'a Value, date: &str) -> &'a Value {
    calendar["days"]
        .as_array()
        .unwrap()
        .iter()
        .find(|d| d["date"] == date)
        .unwrap()
}

#[actix_web::test]
async fn holidays_are_listed_for_a_month() {
    let ctx = common::context().await;
    let app = test_app!(ctx);

    let (status, body) = call!(app, get("/api/holidays?month=2026-05", Some(&ctx.admin_token)));
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|h| h["name"].as_str())
        .collect();
    assert!(names.contains(&"Gujarat Day"));
    assert!(body.as_array().unwrap().iter().all(|h| h["type"].is_string()));

    let (status, body) = call!(
        app,
        get("/api/holidays?start=2026-01-01&end=2026-01-31", Some(&ctx.admin_token))
    );
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().iter().any(|h| h["name"] == "Republic Day"));
}

#[actix_web::test]
async fn range_queries_are_validated() {
    let ctx = common::context().await;
    let app = test_app!(ctx);

    let (status, body) = call!(
        app,
        get("/api/admin/calendar?start=2026-03-10&end=2026-03-01", Some(&ctx.admin_token))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "End date cannot be before start date");

    let (status, body) = call!(
        app,
        get("/api/admin/calendar?start=2025-01-01&end=2026-06-30", Some(&ctx.admin_token))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Calendar range cannot exceed 366 days");

    let (status, body) = call!(
        app,
        get("/api/admin/calendar?start=2026-03-10", Some(&ctx.admin_token))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Both start and end are required");

    let (status, _) = call!(app, get("/api/holidays?month=2026-13", Some(&ctx.admin_token)));
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn fleet_calendar_shows_approved_leave_only() {
    let ctx = common::context().await;
    let (_, asha) = ctx.seed_employee("Asha Patel", "asha@company.com", "Engineering").await;
    let (_, ravi) = ctx.seed_employee("Ravi Kumar", "ravi@company.com", "Sales").await;
    let app = test_app!(ctx);

    let (_, approved) = call!(
        app,
        post(
            "/api/leave/request",
            Some(&asha),
            json!({
                "leaveType": "annual",
                "startDate": date(2),
                "endDate": date(3),
                "reason": "Trip"
            })
        )
    );
    let id = approved["leaveRequest"]["id"].as_u64().unwrap();
    call!(
        app,
        put(
            &format!("/api/leave/update-status/{}", id),
            Some(&ctx.admin_token),
            json!({ "status": "approved" })
        )
    );
    call!(
        app,
        post(
            "/api/leave/request",
            Some(&ravi),
            json!({
                "leaveType": "sick",
                "startDate": date(2),
                "endDate": date(2),
                "reason": "Checkup"
            })
        )
    );

    let uri = format!("/api/admin/calendar?start={}&end={}", date(0), date(6));
    let (status, body) = call!(app, get(&uri, Some(&ctx.admin_token)));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["days"].as_array().map(Vec::len), Some(7));

    let busy = day(&body, &date(2));
    let entries = busy["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["employeeName"], "Asha Patel");
    assert_eq!(entries[0]["status"], "approved");
    assert_eq!(day(&body, &date(3))["entries"].as_array().map(Vec::len), Some(1));
    assert_eq!(day(&body, &date(4))["entries"].as_array().map(Vec::len), Some(0));
    assert_eq!(body["totals"]["approved"], 2);
    assert_eq!(body["totals"]["pending"], 0);

    let (status, _) = call!(app, get(&uri, Some(&asha)));
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn personal_calendar_shows_every_state() {
    let ctx = common::context().await;
    let (_, asha) = ctx.seed_employee("Asha Patel", "asha@company.com", "Engineering").await;
    let (_, ravi) = ctx.seed_employee("Ravi Kumar", "ravi@company.com", "Sales").await;
    let app = test_app!(ctx);

    for (start, end) in [(-3, -2), (1, 2)] {
        call!(
            app,
            post(
                "/api/leave/request",
                Some(&asha),
                json!({
                    "leaveType": "annual",
                    "startDate": date(start),
                    "endDate": date(end),
                    "reason": "Trip"
                })
            )
        );
    }
    call!(
        app,
        post(
            "/api/leave/request",
            Some(&ravi),
            json!({
                "leaveType": "annual",
                "startDate": date(1),
                "endDate": date(1),
                "reason": "Not mine"
            })
        )
    );

    let uri = format!("/api/leave/calendar?start={}&end={}", date(-5), date(5));
    let (status, body) = call!(app, get(&uri, Some(&asha)));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totals"]["expired"], 2);
    assert_eq!(body["totals"]["pending"], 2);

    let tomorrow = day(&body, &date(1));
    let entries = tomorrow["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["employeeName"], "Asha Patel");
    assert_eq!(day(&body, &date(-2))["entries"][0]["status"], "expired");
}
