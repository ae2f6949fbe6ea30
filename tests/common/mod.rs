#![allow(dead_code)]

use std::sync::Arc;

use actix_web::body::MessageBody;
use actix_web::dev::ServiceResponse;
use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use actix_web::web::Data;
use chrono::Utc;
use serde_json::Value;

use lms::api::employee::ensure_admin;
use lms::auth::jwt::generate_access_token;
use lms::auth::password::hash_password;
use lms::config::Config;
use lms::model::holiday::StaticHolidays;
use lms::model::role::Role;
use lms::model::user::{NewUser, User, next_employee_code};
use lms::state::AppState;
use lms::store::{MemoryStore, Store};

pub const ADMIN_EMAIL: &str = "admin@company.com";
pub const ADMIN_PASSWORD: &str = "admin123";
pub const PASSWORD: &str = "secret1";

/// Builds the full route table over the context's state.
macro_rules! test_app {
    ($ctx:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data($ctx.state.clone())
                .app_data($ctx.config.clone())
                .configure(|cfg| lms::routes::configure(cfg, &$ctx.config)),
        )
        .await
    };
}

/// Sends a `TestRequest` and yields `(status, json)`.
macro_rules! call {
    ($app:expr, $req:expr) => {
        crate::common::read(actix_web::test::call_service(&$app, $req.to_request()).await).await
    };
}

pub struct TestContext {
    pub state: Data<AppState>,
    pub config: Data<Config>,
    pub admin: User,
    pub admin_token: String,
}

/// In-memory store with the administrator already seeded.
pub async fn context() -> TestContext {
    let config = Config {
        jwt_secret: "test-secret".into(),
        rate_login_per_min: 100_000,
        rate_register_per_min: 100_000,
        rate_protected_per_min: 100_000,
        admin_email: Some(ADMIN_EMAIL.into()),
        admin_password: Some(ADMIN_PASSWORD.into()),
        ..Config::default()
    };
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let state = Data::new(AppState::new(
        store,
        Arc::new(StaticHolidays::builtin()),
        &config,
    ));
    ensure_admin(&state, &config).await.unwrap();

    let admin = state
        .store
        .find_user_by_email(ADMIN_EMAIL)
        .await
        .unwrap()
        .unwrap();
    let admin_token =
        generate_access_token(&admin, &config.jwt_secret, config.access_token_ttl).unwrap();

    TestContext {
        state,
        config: Data::new(config),
        admin,
        admin_token,
    }
}

impl TestContext {
    pub fn token_for(&self, user: &User) -> String {
        generate_access_token(user, &self.config.jwt_secret, self.config.access_token_ttl).unwrap()
    }

    /// Inserts an employee straight into the store and returns a token for them.
    pub async fn seed_employee(&self, name: &str, email: &str, department: &str) -> (User, String) {
        let codes = self.state.store.employee_codes().await.unwrap();
        let user = self
            .state
            .store
            .insert_user(NewUser {
                employee_id: next_employee_code(codes.iter().map(String::as_str)),
                name: name.into(),
                email: email.into(),
                password_hash: hash_password(PASSWORD).unwrap(),
                role: Role::Employee,
                department: department.into(),
                gender: None,
                leave_balance: self.config.default_balance,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        self.state.emails.insert(&user.email);
        let token = self.token_for(&user);
        (user, token)
    }

    pub fn today(&self) -> chrono::NaiveDate {
        self.config.today()
    }
}

fn with_peer(req: TestRequest, token: Option<&str>) -> TestRequest {
    let req = req.peer_addr("127.0.0.1:40000".parse().unwrap());
    match token {
        Some(token) => req.insert_header(("Authorization", format!("Bearer {}", token))),
        None => req,
    }
}

pub fn get(uri: &str, token: Option<&str>) -> TestRequest {
    with_peer(TestRequest::get().uri(uri), token)
}

pub fn post(uri: &str, token: Option<&str>, body: Value) -> TestRequest {
    with_peer(TestRequest::post().uri(uri).set_json(body), token)
}

pub fn put(uri: &str, token: Option<&str>, body: Value) -> TestRequest {
    with_peer(TestRequest::put().uri(uri).set_json(body), token)
}

pub fn delete(uri: &str, token: Option<&str>) -> TestRequest {
    with_peer(TestRequest::delete().uri(uri), token)
}

/// Status plus the decoded JSON body (`Null` when the body is not JSON).
pub async fn read<B: MessageBody>(resp: ServiceResponse<B>) -> (StatusCode, Value) {
    let status = resp.status();
    let bytes = test::read_body(resp).await;
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

pub fn date(offset_days: i64) -> String {
    (Utc::now().date_naive() + chrono::Duration::days(offset_days))
        .format("%Y-%m-%d")
        .to_string()
}
