#[macro_use]
mod common;

use actix_web::http::StatusCode;
use serde_json::{json, Value};

use common::{context, get, patch, post, seed_user, TestContext};

async fn team_with_members(ctx: &TestContext, owner_token: &str, members: &[i64]) -> i64 {
    let app = init_app!(ctx);
    let (_, body) = call!(app, post("/api/teams/", owner_token, json!({ "name": "Product" })));
    let team_id = body["data"]["id"].as_i64().unwrap();
    for user_id in members {
        let uri = format!("/api/teams/{}/members/", team_id);
        call!(app, post(&uri, owner_token, json!({ "user_id": user_id })));
    }
    team_id
}

#[actix_web::test]
async fn creating_needs_team_membership() {
    let ctx = context();
    let app = init_app!(ctx);
    let (_, owner) = seed_user(&ctx, "pam").await;
    let (_, outsider) = seed_user(&ctx, "oscar").await;
    let team_id = team_with_members(&ctx, &owner, &[]).await;

    let body = json!({ "name": "Launch", "team": team_id, "priority": "high" });
    let (status, errors) = call!(app, post("/api/projects/", &outsider, body.clone()));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(errors["team"][0], "You must be a member of the team to create projects in it.");

    let (status, errors) = call!(app, post("/api/projects/", &owner, json!({ "name": "Launch", "team": 777 })));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(errors["team"][0], "Invalid pk \"777\" - object does not exist.");

    let (status, created) = call!(app, post("/api/projects/", &owner, body));
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["message"], "Project created successfully");
    assert_eq!(created["data"]["team_name"], "Product");
    assert_eq!(created["data"]["priority_display"], "High");
    assert_eq!(created["data"]["members"][0]["role"], "owner");

    let body = json!({ "name": "launch ", "team": team_id });
    let (status, errors) = call!(app, post("/api/projects/", &owner, body));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(errors["name"][0], "A project with this name already exists in this team.");
}

#[actix_web::test]
async fn members_must_belong_to_the_team() {
    let ctx = context();
    let app = init_app!(ctx);
    let (_, owner) = seed_user(&ctx, "quinn").await;
    let (teammate, teammate_token) = seed_user(&ctx, "tess").await;
    let (stranger, _) = seed_user(&ctx, "sid").await;
    let team_id = team_with_members(&ctx, &owner, &[teammate.id]).await;

    let (_, created) = call!(app, post("/api/projects/", &owner, json!({ "name": "Atlas", "team": team_id })));
    let project_id = created["data"]["id"].as_i64().unwrap();
    let members_uri = format!("/api/projects/{}/members/", project_id);

    let (status, body) = call!(app, post(&members_uri, &owner, json!({ "user_id": stranger.id })));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "User must be a member of the project's team to be added to the project.");

    let (status, _) = call!(app, get(&format!("/api/projects/{}/", project_id), &teammate_token));
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call!(app, post(&members_uri, &owner, json!({ "user_id": teammate.id })));
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["username"], "tess");

    let (status, page) = call!(app, get("/api/projects/", &teammate_token));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["count"], 1);

    let uri = format!("/api/projects/{}/", project_id);
    let (status, _) = call!(app, patch(&uri, &teammate_token, json!({ "status": "on_hold" })));
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call!(app, patch(&uri, &owner, json!({ "status": "on_hold" })));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "on_hold");
    let notifications = ctx.state.store.notifications_for_user(teammate.id).await.unwrap();
    assert!(notifications.iter().any(|n| n.kind.as_str() == "project_status_changed"));
}

#[actix_web::test]
async fn stats_summarise_tasks() {
    let ctx = context();
    let app = init_app!(ctx);
    let (owner_user, owner) = seed_user(&ctx, "stan").await;
    let team_id = team_with_members(&ctx, &owner, &[]).await;
    let (_, created) = call!(app, post("/api/projects/", &owner, json!({ "name": "Metrics", "team": team_id })));
    let project_id = created["data"]["id"].as_i64().unwrap();

    for (title, status) in [("One", "done"), ("Two", "todo"), ("Three", "in_progress")] {
        let body = json!({ "title": title, "project": project_id, "status": status, "assignee": owner_user.id });
        let (code, _) = call!(app, post("/api/tasks/", &owner, body));
        assert_eq!(code, StatusCode::CREATED);
    }

    let (status, body) = call!(app, get(&format!("/api/projects/{}/stats/", project_id), &owner));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Project statistics retrieved successfully");
    let stats: &Value = &body["data"];
    assert_eq!(stats["task_statistics"]["total"], 3);
    assert_eq!(stats["task_statistics"]["done"], 1);
    assert_eq!(stats["task_statistics"]["completion_percentage"], 33.33);
    assert_eq!(stats["task_status_timeline"]["created_this_week"], 3);
    assert_eq!(stats["member_activity"][0]["tasks_assigned"], 3);
    assert_eq!(stats["member_activity"][0]["tasks_completed"], 1);
}

#[actix_web::test]
async fn moving_a_project_needs_membership_of_the_new_team() {
    let ctx = context();
    let app = init_app!(ctx);
    let (_, owner) = seed_user(&ctx, "priya").await;
    let (_, stranger) = seed_user(&ctx, "saul").await;
    let origin = team_with_members(&ctx, &owner, &[]).await;
    let (_, second) = call!(app, post("/api/teams/", &owner, json!({ "name": "Platform" })));
    let destination = second["data"]["id"].as_i64().unwrap();
    let (_, foreign) = call!(app, post("/api/teams/", &stranger, json!({ "name": "Closed shop" })));
    let foreign = foreign["data"]["id"].as_i64().unwrap();

    let (_, created) = call!(app, post("/api/projects/", &owner, json!({ "name": "Billing", "team": origin })));
    let project_id = created["data"]["id"].as_i64().unwrap();
    let uri = format!("/api/projects/{}/", project_id);

    let (status, errors) = call!(app, patch(&uri, &owner, json!({ "team": foreign })));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(errors["team"][0], "You must be a member of the team to create projects in it.");

    let (status, body) = call!(app, patch(&uri, &owner, json!({ "team": destination })));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["team"], destination);
    assert_eq!(body["data"]["team_name"], "Platform");

    let stored = ctx.state.store.project_by_id(project_id).await.unwrap().unwrap();
    assert_eq!(stored.team_id, destination);
    let (_, page) = call!(app, get(&format!("/api/projects/?team={}", origin), &owner));
    assert_eq!(page["count"], 0);
    let (_, page) = call!(app, get(&format!("/api/projects/?team={}", destination), &owner));
    assert_eq!(page["count"], 1);
}
