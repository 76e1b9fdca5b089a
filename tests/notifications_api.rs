#[macro_use]
mod common;

use actix_web::http::StatusCode;
use actix_web::test::TestRequest;
use serde_json::json;

use common::{context, get, patch, post, seed_user, TestContext};
use taskhub::models::{NewNotification, NotificationKind, ObjectRef};

async fn notify(ctx: &TestContext, user_id: i64, kind: NotificationKind, message: &str) -> i64 {
    ctx.state
        .store
        .create_notification(NewNotification {
            user_id,
            message: message.to_string(),
            kind,
            related: Some(ObjectRef::task(1)),
            metadata: None,
        })
        .await
        .unwrap()
        .id
}

#[actix_web::test]
async fn inbox_lists_filters_and_counts() {
    let ctx = context();
    let app = init_app!(ctx);
    let (nina, token) = seed_user(&ctx, "nina").await;
    let (other, _) = seed_user(&ctx, "olaf").await;

    notify(&ctx, nina.id, NotificationKind::TaskAssigned, "Task assigned to you: Deploy").await;
    notify(&ctx, nina.id, NotificationKind::CommentAdded, "New comment on task: Deploy").await;
    notify(&ctx, nina.id, NotificationKind::System, "Maintenance tonight").await;
    notify(&ctx, other.id, NotificationKind::System, "Not yours").await;

    let (status, page) = call!(app, get("/api/notifications/", &token));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["count"], 3);
    // newest first by default
    assert_eq!(page["results"][0]["message"], "Maintenance tonight");
    assert_eq!(page["results"][0]["type"], "system");
    assert_eq!(page["results"][0]["type_display"], "System Notification");
    assert_eq!(page["results"][0]["metadata"], json!({}));
    assert_eq!(page["results"][0]["is_recent"], true);

    let (_, page) = call!(app, get("/api/notifications/?type=task_assigned", &token));
    assert_eq!(page["count"], 1);
    assert_eq!(page["results"][0]["icon"], "assignment");

    let (_, page) = call!(app, get("/api/notifications/?search=deploy", &token));
    assert_eq!(page["count"], 2);

    let (status, counts) = call!(app, get("/api/notifications/count/", &token));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(counts, json!({ "unread_count": 3, "total_count": 3 }));
}

#[actix_web::test]
async fn marking_read_is_owner_only() {
    let ctx = context();
    let app = init_app!(ctx);
    let (nick, nick_token) = seed_user(&ctx, "nick").await;
    let (_, mallory) = seed_user(&ctx, "mallory").await;
    let first = notify(&ctx, nick.id, NotificationKind::TaskUpdated, "Task updated: Report").await;
    notify(&ctx, nick.id, NotificationKind::TaskUpdated, "Task updated: Slides").await;

    let uri = format!("/api/notifications/{}/mark-read/", first);
    let (status, body) = call!(app, patch(&uri, &mallory, json!({})));
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "You can only mark your own notifications as read");

    let (status, _) = call!(app, get(&format!("/api/notifications/{}/", first), &mallory));
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call!(app, patch("/api/notifications/99999/mark-read/", &nick_token, json!({})));
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call!(app, patch(&uri, &nick_token, json!({})));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Notification marked as read");
    assert_eq!(body["data"]["read"], true);
    assert!(body["data"]["read_at"].as_str().is_some());

    let (_, page) = call!(app, get("/api/notifications/?read=false", &nick_token));
    assert_eq!(page["count"], 1);

    let (status, body) = call!(app, post("/api/notifications/mark-all-read/", &nick_token, json!({})));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["marked_count"], 1);
    assert_eq!(body["message"], "All notifications marked as read");

    let (_, counts) = call!(app, get("/api/notifications/count/", &nick_token));
    assert_eq!(counts["unread_count"], 0);
}

#[actix_web::test]
async fn activity_feed_shows_own_actions() {
    let ctx = context();
    let app = init_app!(ctx);
    let (_, token) = seed_user(&ctx, "ada").await;

    let req = post("/api/teams/", &token, json!({ "name": "Research" })).insert_header(("User-Agent", "itest/1.0"));
    call!(app, req);

    let (status, body) = call!(app, get("/api/activity/?hours=1&limit=10", &token));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hours"], 1);
    assert_eq!(body["count"], 2);
    let actions: Vec<&str> = body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["action"].as_str().unwrap())
        .collect();
    assert!(actions.contains(&"created"));
    assert!(actions.contains(&"member_added"));
    assert_eq!(body["results"][0]["user_agent"], "itest/1.0");

    let (status, body) = call!(app, get("/api/activity/?limit=zero", &token));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["limit"].is_array());
}

#[actix_web::test]
async fn health_reports_database_and_scheduler() {
    let ctx = context();
    let app = init_app!(ctx);

    let (status, body) = call!(app, TestRequest::get().uri("/health/"));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], "test");
    assert_eq!(body["services"]["database"]["status"], "healthy");
    assert_eq!(body["services"]["scheduler"]["status"], "disabled");

    let (status, body) = call!(app, TestRequest::get().uri("/health/db/"));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"]["engine"], "memory");
}
