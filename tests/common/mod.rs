#![allow(dead_code)]

use std::sync::Arc;

use actix_web::body::MessageBody;
use actix_web::dev::ServiceResponse;
use actix_web::test;
use serde_json::Value;

use taskhub::auth::password::hash_password;
use taskhub::mailer::MemoryMailer;
use taskhub::models::{NewUser, User, UserRole};
use taskhub::store::MemoryStore;
use taskhub::{AppState, Config};

pub const PASSWORD: &str = "Sup3rSecret!";

pub struct TestContext {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<MemoryMailer>,
}

pub fn context() -> TestContext {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(MemoryMailer::new());
    let state = AppState::new(Config::for_tests(), store.clone(), mailer.clone());
    TestContext { state, store, mailer }
}

/// Builds the service under test from a `TestContext`.
macro_rules! init_app {
    ($ctx:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($ctx.state.clone()))
                .configure(taskhub::configure_app),
        )
        .await
    };
}

/// Sends a `TestRequest` and returns the status with the decoded body.
macro_rules! call {
    ($app:expr, $req:expr) => {{
        let resp = actix_web::test::call_service(&$app, $req.to_request()).await;
        let status = resp.status();
        (status, $crate::common::json_body(resp).await)
    }};
}

/// Body as JSON; an empty body reads as `null`.
pub async fn json_body<B: MessageBody>(resp: ServiceResponse<B>) -> Value {
    let bytes = test::read_body(resp).await;
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|e| panic!("response is not JSON: {}", e))
    }
}

/// Creates an active user straight in the store and returns an access token.
pub async fn seed_user(ctx: &TestContext, username: &str) -> (User, String) {
    let user = ctx
        .state
        .store
        .create_user(NewUser {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password_hash: hash_password(PASSWORD, 4).unwrap(),
            first_name: username.to_string(),
            last_name: "Tester".to_string(),
            role: UserRole::Developer,
            bio: String::new(),
            phone: String::new(),
        })
        .await
        .unwrap();
    let tokens = ctx.state.tokens.issue_pair(user.id).unwrap();
    (user, tokens.access)
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}

pub fn get(uri: &str, token: &str) -> test::TestRequest {
    test::TestRequest::get().uri(uri).insert_header(bearer(token))
}

pub fn post(uri: &str, token: &str, body: Value) -> test::TestRequest {
    test::TestRequest::post().uri(uri).insert_header(bearer(token)).set_json(body)
}

pub fn put(uri: &str, token: &str, body: Value) -> test::TestRequest {
    test::TestRequest::put().uri(uri).insert_header(bearer(token)).set_json(body)
}

pub fn patch(uri: &str, token: &str, body: Value) -> test::TestRequest {
    test::TestRequest::patch().uri(uri).insert_header(bearer(token)).set_json(body)
}

pub fn delete(uri: &str, token: &str) -> test::TestRequest {
    test::TestRequest::delete().uri(uri).insert_header(bearer(token))
}
