#[macro_use]
mod common;

use actix_web::http::StatusCode;
use serde_json::json;

use common::{date, delete, get, post, put};
use lms::model::audit_log::{AuditAction, AuditFilter};

fn leave(kind: &str, start: i64, end: i64, reason: &str) -> serde_json::Value {
    json!({
        "leaveType": kind,
        "startDate": date(start),
        "endDate": date(end),
        "reason": reason
    })
}

#[actix_web::test]
async fn employee_submits_and_lists_own_requests() {
    let ctx = common::context().await;
    let (user, token) = ctx.seed_employee("Asha Patel", "asha@company.com", "Engineering").await;
    let app = test_app!(ctx);

    let (status, body) = call!(
        app,
        post("/api/leave/request", Some(&token), leave("annual", 10, 12, "Family trip"))
    );
    assert_eq!(status, StatusCode::CREATED);
    let request = &body["leaveRequest"];
    assert_eq!(request["status"], "pending");
    assert_eq!(request["days"], 3);
    assert_eq!(request["userId"], user.id);
    assert_eq!(request["employee"]["employeeId"], user.employee_id);

    let (status, body) = call!(app, get("/api/leave/my-requests", Some(&token)));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1));

    // Admins review; they do not submit
    let (status, body) = call!(
        app,
        post("/api/leave/request", Some(&ctx.admin_token), leave("annual", 10, 12, "Nope"))
    );
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Employee access required");

    let (status, _) = call!(app, get("/api/leave/all-requests", Some(&token)));
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn submission_is_validated_server_side() {
    let ctx = common::context().await;
    let (_, token) = ctx.seed_employee("Asha Patel", "asha@company.com", "Engineering").await;
    let app = test_app!(ctx);

    let (status, body) = call!(
        app,
        post("/api/leave/request", Some(&token), leave("annual", 5, 3, "Backwards"))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "End date cannot be before start date");

    let (status, body) = call!(
        app,
        post("/api/leave/request", Some(&token), leave("sick", 1, 1, "   "))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Reason is required");

    let (status, body) = call!(
        app,
        post("/api/leave/request", Some(&token), leave("personal", 1, 6, "Long errand"))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Insufficient personal leave balance. Available: 5 days, Requested: 6 days"
    );

    let (status, _) = call!(
        app,
        post("/api/leave/request", Some(&token), leave("sabbatical", 1, 2, "Unknown type"))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = call!(app, get("/api/leave/my-requests", Some(&token)));
    assert_eq!(body.as_array().map(Vec::len), Some(0));
}

#[actix_web::test]
async fn approval_deducts_balance_once() {
    let ctx = common::context().await;
    let (user, token) = ctx.seed_employee("Asha Patel", "asha@company.com", "Engineering").await;
    let app = test_app!(ctx);

    let (_, body) = call!(
        app,
        post("/api/leave/request", Some(&token), leave("annual", 3, 5, "Wedding"))
    );
    let id = body["leaveRequest"]["id"].as_u64().unwrap();

    let review = json!({ "status": "approved", "adminComment": "Enjoy" });
    let (status, body) = call!(
        app,
        put(&format!("/api/leave/update-status/{}", id), Some(&ctx.admin_token), review.clone())
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Leave request approved successfully");
    assert_eq!(body["leaveRequest"]["status"], "approved");
    assert_eq!(body["leaveRequest"]["adminComment"], "Enjoy");
    assert_eq!(body["leaveRequest"]["reviewedBy"], ctx.admin.id);
    assert_eq!(body["leaveRequest"]["reviewedByName"], "System Administrator");

    let (_, profile) = call!(app, get("/api/auth/profile", Some(&token)));
    assert_eq!(profile["leaveBalance"]["annual"], 17);

    // A second decision is refused and the balance is untouched
    let (status, body) = call!(
        app,
        put(&format!("/api/leave/update-status/{}", id), Some(&ctx.admin_token), review)
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Leave request has already been approved");

    let stored = ctx.state.store.find_user(user.id).await.unwrap().unwrap();
    assert_eq!(stored.leave_balance.annual, 17);
}

#[actix_web::test]
async fn approval_rechecks_balance() {
    let ctx = common::context().await;
    let (_, token) = ctx.seed_employee("Asha Patel", "asha@company.com", "Engineering").await;
    let app = test_app!(ctx);

    let mut ids = Vec::new();
    for (start, end) in [(10, 24), (30, 44)] {
        let (status, body) = call!(
            app,
            post("/api/leave/request", Some(&token), leave("annual", start, end, "Long break"))
        );
        assert_eq!(status, StatusCode::CREATED);
        ids.push(body["leaveRequest"]["id"].as_u64().unwrap());
    }

    let approve = json!({ "status": "approved" });
    let (status, _) = call!(
        app,
        put(
            &format!("/api/leave/update-status/{}", ids[0]),
            Some(&ctx.admin_token),
            approve.clone(),
        )
    );
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call!(
        app,
        put(&format!("/api/leave/update-status/{}", ids[1]), Some(&ctx.admin_token), approve)
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Insufficient annual leave balance. Available: 5 days, Requested: 15 days"
    );

    let (_, body) = call!(app, get(&format!("/api/leave/{}", ids[1]), Some(&token)));
    assert_eq!(body["status"], "pending");
}

#[actix_web::test]
async fn status_must_be_a_decision() {
    let ctx = common::context().await;
    let (_, token) = ctx.seed_employee("Asha Patel", "asha@company.com", "Engineering").await;
    let app = test_app!(ctx);

    let (_, body) = call!(
        app,
        post("/api/leave/request", Some(&token), leave("sick", 1, 1, "Flu"))
    );
    let id = body["leaveRequest"]["id"].as_u64().unwrap();

    let (status, body) = call!(
        app,
        put(
            &format!("/api/leave/update-status/{}", id),
            Some(&ctx.admin_token),
            json!({ "status": "pending" })
        )
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Status must be approved or rejected");

    let (status, _) = call!(
        app,
        put(
            &format!("/api/leave/update-status/{}", id),
            Some(&token),
            json!({ "status": "approved" })
        )
    );
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call!(
        app,
        put(
            "/api/leave/update-status/9999",
            Some(&ctx.admin_token),
            json!({ "status": "rejected" }),
        )
    );
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Leave request not found");
}

#[actix_web::test]
async fn expired_requests_are_frozen_except_for_rejection() {
    let ctx = common::context().await;
    let (_, token) = ctx.seed_employee("Asha Patel", "asha@company.com", "Engineering").await;
    let app = test_app!(ctx);

    let (status, body) = call!(
        app,
        post("/api/leave/request", Some(&token), leave("sick", -4, -2, "Was ill"))
    );
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["leaveRequest"]["status"], "expired");
    let id = body["leaveRequest"]["id"].as_u64().unwrap();

    let (status, body) = call!(
        app,
        put(
            &format!("/api/leave/update-status/{}", id),
            Some(&ctx.admin_token),
            json!({ "status": "approved" })
        )
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Expired leave requests cannot be approved");

    let (status, body) = call!(
        app,
        put(&format!("/api/leave/{}", id), Some(&token), json!({ "reason": "Edited" }))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Expired leave requests cannot be edited");

    let (status, body) = call!(app, delete(&format!("/api/leave/{}", id), Some(&token)));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Only pending leave requests can be deleted");

    let (status, body) = call!(
        app,
        put(
            &format!("/api/leave/update-status/{}", id),
            Some(&ctx.admin_token),
            json!({ "status": "rejected" })
        )
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["leaveRequest"]["status"], "rejected");

    let filter = AuditFilter {
        action: Some(AuditAction::LeaveExpired),
        ..AuditFilter::default()
    };
    let closed = ctx.state.store.list_audit(&filter).await.unwrap();
    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0].description, format!("Expired leave request #{} rejected", id));
}

#[actix_web::test]
async fn request_ending_today_is_still_active() {
    let ctx = common::context().await;
    let (_, token) = ctx.seed_employee("Asha Patel", "asha@company.com", "Engineering").await;
    let app = test_app!(ctx);

    let (_, body) = call!(
        app,
        post("/api/leave/request", Some(&token), leave("emergency", -1, 0, "Burst pipe"))
    );
    assert_eq!(body["leaveRequest"]["status"], "pending");
}

#[actix_web::test]
async fn owner_edits_pending_request() {
    let ctx = common::context().await;
    let (_, token) = ctx.seed_employee("Asha Patel", "asha@company.com", "Engineering").await;
    let (_, other) = ctx.seed_employee("Ravi Kumar", "ravi@company.com", "Sales").await;
    let app = test_app!(ctx);

    let (_, body) = call!(
        app,
        post("/api/leave/request", Some(&token), leave("annual", 5, 6, "Trip"))
    );
    let id = body["leaveRequest"]["id"].as_u64().unwrap();

    let (status, body) = call!(
        app,
        put(
            &format!("/api/leave/{}", id),
            Some(&token),
            json!({ "endDate": date(9), "leaveType": "sick" })
        )
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["leaveRequest"]["days"], 5);
    assert_eq!(body["leaveRequest"]["leaveType"], "sick");
    assert_eq!(body["leaveRequest"]["reason"], "Trip");

    let (status, body) = call!(
        app,
        put(&format!("/api/leave/{}", id), Some(&token), json!({ "endDate": date(1) }))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "End date cannot be before start date");

    let (status, _) = call!(
        app,
        put(&format!("/api/leave/{}", id), Some(&other), json!({ "reason": "Mine now" }))
    );
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call!(app, get(&format!("/api/leave/{}", id), Some(&other)));
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call!(app, get(&format!("/api/leave/{}", id), Some(&ctx.admin_token)));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["employee"]["name"], "Asha Patel");
}

#[actix_web::test]
async fn reviewed_requests_cannot_be_changed_by_owner() {
    let ctx = common::context().await;
    let (_, token) = ctx.seed_employee("Asha Patel", "asha@company.com", "Engineering").await;
    let app = test_app!(ctx);

    let (_, body) = call!(
        app,
        post("/api/leave/request", Some(&token), leave("annual", 5, 6, "Trip"))
    );
    let id = body["leaveRequest"]["id"].as_u64().unwrap();
    call!(
        app,
        put(
            &format!("/api/leave/update-status/{}", id),
            Some(&ctx.admin_token),
            json!({ "status": "rejected", "adminComment": "Busy week" })
        )
    );

    let (status, body) = call!(
        app,
        put(&format!("/api/leave/{}", id), Some(&token), json!({ "reason": "Please?" }))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Only pending leave requests can be edited");

    let (status, _) = call!(app, delete(&format!("/api/leave/{}", id), Some(&token)));
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn owner_withdraws_pending_request() {
    let ctx = common::context().await;
    let (_, token) = ctx.seed_employee("Asha Patel", "asha@company.com", "Engineering").await;
    let app = test_app!(ctx);

    let (_, body) = call!(
        app,
        post("/api/leave/request", Some(&token), leave("annual", 5, 6, "Trip"))
    );
    let id = body["leaveRequest"]["id"].as_u64().unwrap();

    let (status, body) = call!(app, delete(&format!("/api/leave/{}", id), Some(&token)));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["restoredDays"], 0);

    let (status, _) = call!(app, get(&format!("/api/leave/{}", id), Some(&token)));
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn admin_deleting_approved_request_restores_days() {
    let ctx = common::context().await;
    let (user, token) = ctx.seed_employee("Asha Patel", "asha@company.com", "Engineering").await;
    let app = test_app!(ctx);

    let (_, body) = call!(
        app,
        post("/api/leave/request", Some(&token), leave("sick", 2, 5, "Surgery"))
    );
    let id = body["leaveRequest"]["id"].as_u64().unwrap();
    call!(
        app,
        put(
            &format!("/api/leave/update-status/{}", id),
            Some(&ctx.admin_token),
            json!({ "status": "approved" })
        )
    );
    let stored = ctx.state.store.find_user(user.id).await.unwrap().unwrap();
    assert_eq!(stored.leave_balance.sick, 6);

    let (status, body) = call!(app, delete(&format!("/api/leave/{}", id), Some(&ctx.admin_token)));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["restoredDays"], 4);

    let (_, profile) = call!(app, get("/api/auth/profile", Some(&token)));
    assert_eq!(profile["leaveBalance"]["sick"], 10);
}

#[actix_web::test]
async fn listings_put_active_pending_first() {
    let ctx = common::context().await;
    let (_, token) = ctx.seed_employee("Asha Patel", "asha@company.com", "Engineering").await;
    let app = test_app!(ctx);

    let mut ids = Vec::new();
    for (kind, start, end) in [
        ("annual", 1, 2),
        ("sick", -6, -5),
        ("annual", 20, 21),
        ("personal", 3, 3),
    ] {
        let (_, body) = call!(
            app,
            post("/api/leave/request", Some(&token), leave(kind, start, end, "Reason"))
        );
        ids.push(body["leaveRequest"]["id"].as_u64().unwrap());
    }
    call!(
        app,
        put(
            &format!("/api/leave/update-status/{}", ids[0]),
            Some(&ctx.admin_token),
            json!({ "status": "approved" })
        )
    );

    let (status, body) = call!(app, get("/api/leave/all-requests", Some(&ctx.admin_token)));
    assert_eq!(status, StatusCode::OK);
    let order: Vec<(u64, String)> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|v| (v["id"].as_u64().unwrap(), v["status"].as_str().unwrap().to_string()))
        .collect();
    assert_eq!(
        order,
        vec![
            (ids[3], "pending".to_string()),
            (ids[2], "pending".to_string()),
            (ids[1], "expired".to_string()),
            (ids[0], "approved".to_string()),
        ]
    );

    let (_, body) = call!(
        app,
        get("/api/leave/all-requests?status=expired", Some(&ctx.admin_token))
    );
    assert_eq!(body.as_array().map(Vec::len), Some(1));
    assert_eq!(body[0]["id"], ids[1]);
}

#[actix_web::test]
async fn listings_are_scoped_to_the_caller() {
    let ctx = common::context().await;
    let (asha_user, asha) = ctx
        .seed_employee("Asha Patel", "asha@company.com", "Engineering")
        .await;
    let (ravi_user, ravi) = ctx.seed_employee("Ravi Kumar", "ravi@company.com", "Sales").await;
    let app = test_app!(ctx);

    for (token, kind) in [
        (asha.as_str(), "annual"),
        (asha.as_str(), "sick"),
        (ravi.as_str(), "personal"),
    ] {
        let (status, _) = call!(
            app,
            post("/api/leave/request", Some(token), leave(kind, 4, 4, "Errand"))
        );
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = call!(app, get("/api/leave/my-requests", Some(&asha)));
    assert_eq!(status, StatusCode::OK);
    let mine = body.as_array().unwrap();
    assert_eq!(mine.len(), 2);
    assert!(mine.iter().all(|r| r["userId"] == asha_user.id));

    let (_, body) = call!(app, get("/api/leave/my-requests", Some(&ravi)));
    let theirs = body.as_array().unwrap();
    assert_eq!(theirs.len(), 1);
    assert_eq!(theirs[0]["userId"], ravi_user.id);

    let (status, body) = call!(app, get("/api/leave/all-requests", Some(&ctx.admin_token)));
    assert_eq!(status, StatusCode::OK);
    let all = body.as_array().unwrap();
    assert_eq!(all.len(), 3);
    assert!(all.iter().any(|r| r["userId"] == asha_user.id));
    assert!(all.iter().any(|r| r["userId"] == ravi_user.id));
}

#[actix_web::test]
async fn only_the_owner_can_withdraw_a_request() {
    let ctx = common::context().await;
    let (_, asha) = ctx.seed_employee("Asha Patel", "asha@company.com", "Engineering").await;
    let (_, ravi) = ctx.seed_employee("Ravi Kumar", "ravi@company.com", "Sales").await;
    let app = test_app!(ctx);

    let (_, body) = call!(
        app,
        post("/api/leave/request", Some(&asha), leave("annual", 8, 9, "Wedding"))
    );
    let id = body["leaveRequest"]["id"].as_u64().unwrap();

    let (status, body) = call!(app, delete(&format!("/api/leave/{}", id), Some(&ravi)));
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "You can only delete your own leave requests");

    let (status, body) = call!(app, get(&format!("/api/leave/{}", id), Some(&asha)));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending");
}
