#[macro_use]
mod common;

use actix_web::http::StatusCode;
use serde_json::json;

use common::{context, delete, get, patch, post, put, seed_user, TestContext};

/// Team and project owned by `owner_token` with `members` on both.
async fn project_with(ctx: &TestContext, owner_token: &str, members: &[i64]) -> i64 {
    let app = init_app!(ctx);
    let (_, team) = call!(app, post("/api/teams/", owner_token, json!({ "name": "Delivery" })));
    let team_id = team["data"]["id"].as_i64().unwrap();
    let (_, project) = call!(app, post("/api/projects/", owner_token, json!({ "name": "Website", "team": team_id })));
    let project_id = project["data"]["id"].as_i64().unwrap();
    for user_id in members {
        call!(app, post(&format!("/api/teams/{}/members/", team_id), owner_token, json!({ "user_id": user_id })));
        call!(
            app,
            post(&format!("/api/projects/{}/members/", project_id), owner_token, json!({ "user_id": user_id }))
        );
    }
    project_id
}

#[actix_web::test]
async fn creating_an_assigned_task_notifies_and_emails() {
    let ctx = context();
    let app = init_app!(ctx);
    let (_, lead) = seed_user(&ctx, "lena").await;
    let (dev, _) = seed_user(&ctx, "dave").await;
    let project_id = project_with(&ctx, &lead, &[dev.id]).await;
    let mails_before = ctx.mailer.sent().len();

    let body = json!({
        "title": "Design mockups",
        "project": project_id,
        "priority": "high",
        "assignee": dev.id,
        "due_date": "2030-01-15T12:00:00Z",
    });
    let (status, created) = call!(app, post("/api/tasks/", &lead, body));
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["message"], "Task created successfully");
    let task = &created["data"];
    assert_eq!(task["project_name"], "Website");
    assert_eq!(task["status"], "todo");
    assert_eq!(task["priority_display"], "High");
    assert_eq!(task["assignee_username"], "dave");
    assert_eq!(task["created_by_username"], "lena");
    assert_eq!(task["is_assigned"], true);
    assert_eq!(task["is_overdue"], false);
    assert_eq!(task["comment_count"], 0);
    assert_eq!(task["attachment_count"], 0);

    let notifications = ctx.state.store.notifications_for_user(dev.id).await.unwrap();
    assert!(notifications
        .iter()
        .any(|n| n.kind.as_str() == "task_assigned" && n.message.contains("Design mockups")));

    let sent = ctx.mailer.sent();
    assert_eq!(sent.len(), mails_before + 1);
    assert_eq!(sent[mails_before].to, "dave@example.com");
    assert_eq!(sent[mails_before].subject, "New Task Assigned: Design mockups");
}

#[actix_web::test]
async fn task_validation_and_visibility() {
    let ctx = context();
    let app = init_app!(ctx);
    let (_, lead) = seed_user(&ctx, "lara").await;
    let (outsider, outsider_token) = seed_user(&ctx, "otto").await;
    let project_id = project_with(&ctx, &lead, &[]).await;

    let body = json!({ "title": "x", "project": project_id, "assignee": outsider.id, "status": "doing" });
    let (status, errors) = call!(app, post("/api/tasks/", &lead, body));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(errors["title"][0].as_str().is_some());
    assert_eq!(errors["assignee"][0], "Assignee must be a member of the project.");
    assert_eq!(errors["status"][0], "\"doing\" is not a valid choice.");

    let (_, created) = call!(app, post("/api/tasks/", &lead, json!({ "title": "Private", "project": project_id })));
    let task_uri = format!("/api/tasks/{}/", created["data"]["id"]);
    let (status, body) = call!(app, get(&task_uri, &outsider_token));
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Not found.");

    let (_, page) = call!(app, get("/api/tasks/", &outsider_token));
    assert_eq!(page["count"], 0);
    let (_, page) = call!(app, get(&format!("/api/tasks/?project={}&search=priv", project_id), &lead));
    assert_eq!(page["count"], 1);
}

#[actix_web::test]
async fn assignment_and_status_permissions() {
    let ctx = context();
    let app = init_app!(ctx);
    let (_, lead) = seed_user(&ctx, "lou").await;
    let (dev, dev_token) = seed_user(&ctx, "dina").await;
    let (peer, peer_token) = seed_user(&ctx, "pete").await;
    let (stranger, _) = seed_user(&ctx, "sam").await;
    let project_id = project_with(&ctx, &lead, &[dev.id, peer.id]).await;

    let (_, created) = call!(app, post("/api/tasks/", &lead, json!({ "title": "Write docs", "project": project_id })));
    let task_id = created["data"]["id"].as_i64().unwrap();
    let assign_uri = format!("/api/tasks/{}/assign/", task_id);

    let (status, body) = call!(app, post(&assign_uri, &dev_token, json!({ "assignee_id": dev.id })));
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Only project admins and owners can assign tasks.");

    let (status, body) = call!(app, post(&assign_uri, &lead, json!({ "assignee_id": 4242 })));
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User not found.");

    let (status, body) = call!(app, post(&assign_uri, &lead, json!({ "assignee_id": stranger.id })));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Assignee must be a member of the project.");

    let (status, body) = call!(app, post(&assign_uri, &lead, json!({ "assignee_id": dev.id })));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Task assigned successfully");
    assert_eq!(body["data"]["assignee"], dev.id);

    let status_uri = format!("/api/tasks/{}/status/", task_id);
    let (status, _) = call!(app, patch(&status_uri, &peer_token, json!({ "status": "in_progress" })));
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call!(app, patch(&status_uri, &dev_token, json!({ "status": "finished" })));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"][0], "Invalid status. Must be one of: todo, in_progress, done, blocked");

    let (status, body) = call!(app, patch(&status_uri, &dev_token, json!({ "status": "done" })));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "done");

    // other project members hear about the completion
    let notifications = ctx.state.store.notifications_for_user(peer.id).await.unwrap();
    assert!(notifications.iter().any(|n| n.kind.as_str() == "task_completed"));

    let (status, body) = call!(app, post(&assign_uri, &lead, json!({ "assignee_id": null })));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Task unassigned successfully");
    assert!(body["data"]["assignee"].is_null());
}

/// A second team and project owned by `token`.
async fn side_project(ctx: &TestContext, token: &str, team: &str, name: &str) -> i64 {
    let app = init_app!(ctx);
    let (_, team) = call!(app, post("/api/teams/", token, json!({ "name": team })));
    let team_id = team["data"]["id"].as_i64().unwrap();
    let (_, project) = call!(app, post("/api/projects/", token, json!({ "name": name, "team": team_id })));
    project["data"]["id"].as_i64().unwrap()
}

#[actix_web::test]
async fn moving_a_task_needs_membership_of_the_destination() {
    let ctx = context();
    let app = init_app!(ctx);
    let (_, lead) = seed_user(&ctx, "lorna").await;
    let (dev, _) = seed_user(&ctx, "dirk").await;
    let (_, stranger) = seed_user(&ctx, "sven").await;
    let origin = project_with(&ctx, &lead, &[dev.id]).await;
    let destination = side_project(&ctx, &lead, "Operations", "Backoffice").await;
    let foreign = side_project(&ctx, &stranger, "Elsewhere", "Hidden").await;

    let (_, created) = call!(app, post("/api/tasks/", &lead, json!({ "title": "Rotate keys", "project": origin })));
    let task_id = created["data"]["id"].as_i64().unwrap();
    let task_uri = format!("/api/tasks/{}/", task_id);

    let (status, errors) = call!(app, patch(&task_uri, &lead, json!({ "project": foreign })));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(errors["project"][0], "You must be a member of the project to create tasks in it.");

    let (status, body) = call!(app, patch(&task_uri, &lead, json!({ "project": destination })));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["project"], destination);
    assert_eq!(body["data"]["project_name"], "Backoffice");

    let stored = ctx.state.store.task_by_id(task_id).await.unwrap().unwrap();
    assert_eq!(stored.project_id, destination);
    let (_, page) = call!(app, get(&format!("/api/tasks/?project={}", origin), &lead));
    assert_eq!(page["count"], 0);
    let (_, page) = call!(app, get(&format!("/api/tasks/?project={}", destination), &lead));
    assert_eq!(page["count"], 1);

    // the assignee has to follow the task into the new project
    let body = json!({ "title": "Patch servers", "project": origin, "assignee": dev.id });
    let (_, assigned) = call!(app, post("/api/tasks/", &lead, body));
    let assigned_uri = format!("/api/tasks/{}/", assigned["data"]["id"]);
    let (status, errors) = call!(app, patch(&assigned_uri, &lead, json!({ "project": destination })));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(errors["assignee"][0], "Assignee must be a member of the project.");
}

#[actix_web::test]
async fn task_list_rejects_unknown_filter_values() {
    let ctx = context();
    let app = init_app!(ctx);
    let (_, lead) = seed_user(&ctx, "fay").await;
    let project_id = project_with(&ctx, &lead, &[]).await;
    call!(app, post("/api/tasks/", &lead, json!({ "title": "Triage", "project": project_id, "status": "blocked" })));

    let (status, errors) = call!(app, get("/api/tasks/?status=doing", &lead));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(errors["status"][0], "\"doing\" is not a valid choice.");
    let (status, errors) = call!(app, get("/api/tasks/?project=abc", &lead));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(errors["project"][0], "Enter a whole number.");

    let (_, page) = call!(app, get("/api/tasks/?status=blocked&priority=", &lead));
    assert_eq!(page["count"], 1);
    let (_, page) = call!(app, get("/api/tasks/?status=todo", &lead));
    assert_eq!(page["count"], 0);
}

#[actix_web::test]
async fn edits_belong_to_creators_and_admins() {
    let ctx = context();
    let app = init_app!(ctx);
    let (_, lead) = seed_user(&ctx, "liz").await;
    let (dev, dev_token) = seed_user(&ctx, "dan").await;
    let project_id = project_with(&ctx, &lead, &[dev.id]).await;

    let (_, created) = call!(app, post("/api/tasks/", &lead, json!({ "title": "Plan sprint", "project": project_id })));
    let task_uri = format!("/api/tasks/{}/", created["data"]["id"]);

    let (status, body) = call!(app, patch(&task_uri, &dev_token, json!({ "priority": "low" })));
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().is_some());

    let (status, errors) = call!(app, put(&task_uri, &lead, json!({ "description": "no title" })));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(errors["title"].is_array());

    let (status, body) = call!(app, patch(&task_uri, &lead, json!({ "priority": "low", "due_date": null })));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Task updated successfully");
    assert_eq!(body["data"]["priority"], "low");

    let (status, _) = call!(app, delete(&task_uri, &dev_token));
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call!(app, delete(&task_uri, &lead));
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call!(app, get(&task_uri, &lead));
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn comment_lifecycle() {
    let ctx = context();
    let app = init_app!(ctx);
    let (lead_user, lead) = seed_user(&ctx, "lina").await;
    let (dev, dev_token) = seed_user(&ctx, "drew").await;
    let (peer, peer_token) = seed_user(&ctx, "paul").await;
    let project_id = project_with(&ctx, &lead, &[dev.id, peer.id]).await;

    let body = json!({ "title": "Fix login", "project": project_id, "assignee": dev.id });
    let (_, created) = call!(app, post("/api/tasks/", &lead, body));
    let task_id = created["data"]["id"].as_i64().unwrap();
    let comments_uri = format!("/api/tasks/{}/comments/", task_id);

    let (status, errors) = call!(app, post(&comments_uri, &peer_token, json!({ "content": "   " })));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(errors["content"][0], "Comment content cannot be empty.");

    let (status, body) = call!(app, post(&comments_uri, &peer_token, json!({ "content": "Looking into it" })));
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Comment created successfully");
    assert_eq!(body["data"]["author_username"], "paul");
    assert_eq!(body["data"]["task_title"], "Fix login");
    assert_eq!(body["data"]["is_edited"], false);
    let comment_uri = format!("{}{}/", comments_uri, body["data"]["id"]);

    let notifications = ctx.state.store.notifications_for_user(dev.id).await.unwrap();
    assert!(notifications.iter().any(|n| n.kind.as_str() == "comment_added"));
    let notifications = ctx.state.store.notifications_for_user(lead_user.id).await.unwrap();
    assert!(notifications.iter().any(|n| n.kind.as_str() == "comment_added"));

    let (status, _) = call!(app, patch(&comment_uri, &dev_token, json!({ "content": "Hijacked" })));
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call!(app, put(&comment_uri, &peer_token, json!({ "content": "Fixed in #42" })));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Comment updated successfully");
    assert_eq!(body["data"]["content"], "Fixed in #42");

    let (status, page) = call!(app, get(&comments_uri, &dev_token));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["count"], 1);

    let (_, task) = call!(app, get(&format!("/api/tasks/{}/", task_id), &dev_token));
    assert_eq!(task["comment_count"], 1);

    let (status, _) = call!(app, delete(&comment_uri, &dev_token));
    assert_eq!(status, StatusCode::FORBIDDEN);
    // task creator may delete any comment on the task
    let (status, _) = call!(app, delete(&comment_uri, &lead));
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call!(app, get(&comment_uri, &peer_token));
    assert_eq!(status, StatusCode::NOT_FOUND);
}
