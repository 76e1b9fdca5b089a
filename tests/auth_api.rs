#[macro_use]
mod common;

use actix_web::http::StatusCode;
use actix_web::test::TestRequest;
use serde_json::json;

use common::{context, get, patch, seed_user, PASSWORD};

fn registration(username: &str) -> serde_json::Value {
    json!({
        "username": username,
        "email": format!("{}@example.com", username),
        "password": "Tr1cky-Passw0rd",
        "password2": "Tr1cky-Passw0rd",
        "first_name": "Jane",
        "last_name": "Doe",
    })
}

#[actix_web::test]
async fn register_returns_tokens_and_sends_welcome() {
    let ctx = context();
    let app = init_app!(ctx);

    let (status, body) = call!(app, TestRequest::post().uri("/api/auth/register/").set_json(registration("jane")));
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "User registered successfully");
    assert_eq!(body["user"]["username"], "jane");
    assert_eq!(body["user"]["full_name"], "Jane Doe");
    assert!(body["tokens"]["access"].as_str().is_some());
    assert!(body["tokens"]["refresh"].as_str().is_some());

    let sent = ctx.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "jane@example.com");
    assert_eq!(sent[0].subject, "Welcome to Task Manager!");

    let user_id = body["user"]["id"].as_i64().unwrap();
    let notifications = ctx.state.store.notifications_for_user(user_id).await.unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind.as_str(), "welcome");
    assert!(ctx.state.store.profile(user_id).await.unwrap().is_some());
}

#[actix_web::test]
async fn register_reports_field_errors() {
    let ctx = context();
    let app = init_app!(ctx);
    seed_user(&ctx, "taken").await;

    let mut body = registration("taken");
    body["email"] = json!("not-an-email");
    body["password"] = json!("12345678");
    body["password2"] = json!("12345678");
    let (status, errors) = call!(app, TestRequest::post().uri("/api/auth/register/").set_json(body));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(errors["username"][0], "A user with this username already exists.");
    assert_eq!(errors["email"][0], "Enter a valid email address.");
    assert!(errors["password"]
        .as_array()
        .unwrap()
        .iter()
        .any(|m| m == "This password is entirely numeric."));

    let mut body = registration("newbie");
    body["password2"] = json!("Something-else-1");
    let (status, errors) = call!(app, TestRequest::post().uri("/api/auth/register/").set_json(body));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(errors, json!({ "password2": ["Passwords do not match."] }));
}

#[actix_web::test]
async fn login_accepts_username_or_email() {
    let ctx = context();
    let app = init_app!(ctx);
    seed_user(&ctx, "omar").await;

    for login in ["omar", "omar@example.com"] {
        let req = TestRequest::post()
            .uri("/api/auth/login/")
            .set_json(json!({ "username": login, "password": PASSWORD }));
        let (status, body) = call!(app, req);
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Login successful");
        assert_eq!(body["user"]["username"], "omar");
    }

    let req = TestRequest::post()
        .uri("/api/auth/login/")
        .set_json(json!({ "username": "omar", "password": "wrong-password" }));
    let (status, body) = call!(app, req);
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid credentials");
    assert_eq!(body["details"]["non_field_errors"][0], "Invalid username/email or password.");
}

#[actix_web::test]
async fn login_rejects_disabled_accounts() {
    let ctx = context();
    let app = init_app!(ctx);
    let (mut user, _) = seed_user(&ctx, "gone").await;
    user.is_active = false;
    ctx.state.store.update_user(&user).await.unwrap();

    let req = TestRequest::post()
        .uri("/api/auth/login/")
        .set_json(json!({ "username": "gone", "password": PASSWORD }));
    let (status, body) = call!(app, req);
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["non_field_errors"][0], "User account is disabled.");
}

#[actix_web::test]
async fn protected_routes_need_a_valid_token() {
    let ctx = context();
    let app = init_app!(ctx);

    let (status, body) = call!(app, TestRequest::get().uri("/api/auth/profile/"));
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Authentication credentials were not provided.");

    let (status, body) = call!(app, get("/api/auth/profile/", "garbage"));
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Given token not valid for any token type");
}

#[actix_web::test]
async fn profile_update_validates_links() {
    let ctx = context();
    let app = init_app!(ctx);
    let (_, token) = seed_user(&ctx, "pia").await;

    let (status, body) = call!(app, get("/api/auth/profile/", &token));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "pia");
    assert_eq!(body["email_notifications"], true);

    let (status, errors) = call!(
        app,
        patch("/api/auth/profile/", &token, json!({ "github": "https://gitlab.com/pia" }))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(errors["github"][0], "Please provide a valid GitHub URL");

    let update = json!({
        "job_title": "Engineer",
        "github": "https://github.com/pia",
        "role": "manager",
        "email_notifications": false,
    });
    let (status, body) = call!(app, patch("/api/auth/profile/", &token, update));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Profile updated successfully");
    assert_eq!(body["data"]["job_title"], "Engineer");
    assert_eq!(body["data"]["role"], "manager");
    assert_eq!(body["data"]["email_notifications"], false);
}

#[actix_web::test]
async fn refresh_rotates_and_blacklists() {
    let ctx = context();
    let app = init_app!(ctx);
    seed_user(&ctx, "rita").await;

    let req = TestRequest::post()
        .uri("/api/token/")
        .set_json(json!({ "username": "rita", "password": PASSWORD }));
    let (status, pair) = call!(app, req);
    assert_eq!(status, StatusCode::OK);
    let refresh = pair["refresh"].as_str().unwrap().to_string();

    let req = TestRequest::post().uri("/api/token/refresh/").set_json(json!({ "refresh": refresh }));
    let (status, rotated) = call!(app, req);
    assert_eq!(status, StatusCode::OK);
    assert_ne!(rotated["refresh"], pair["refresh"]);

    // the old refresh token was blacklisted by the rotation
    let req = TestRequest::post().uri("/api/token/refresh/").set_json(json!({ "refresh": refresh }));
    let (status, body) = call!(app, req);
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Token is blacklisted");

    let req = TestRequest::post().uri("/api/token/verify/").set_json(json!({ "token": rotated["access"] }));
    let (status, body) = call!(app, req);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));

    let req = TestRequest::post()
        .uri("/api/token/")
        .set_json(json!({ "username": "rita", "password": "nope-nope" }));
    let (status, body) = call!(app, req);
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "No active account found with the given credentials");
}
