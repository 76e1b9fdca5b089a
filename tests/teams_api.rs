#[macro_use]
mod common;

use actix_web::http::StatusCode;
use serde_json::json;

use common::{context, delete, get, patch, post, seed_user};

#[actix_web::test]
async fn creator_owns_the_team() {
    let ctx = context();
    let app = init_app!(ctx);
    let (owner, token) = seed_user(&ctx, "olga").await;

    let (status, body) = call!(app, post("/api/teams/", &token, json!({ "name": "  Platform ", "description": "Core" })));
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Team created successfully");
    assert_eq!(body["data"]["name"], "Platform");
    assert_eq!(body["data"]["member_count"], 1);
    assert_eq!(body["data"]["members"][0]["user"], owner.id);
    assert_eq!(body["data"]["members"][0]["role"], "owner");

    let (status, errors) = call!(app, post("/api/teams/", &token, json!({ "name": "Platform" })));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(errors["name"][0], "A team with this name already exists.");
}

#[actix_web::test]
async fn list_is_scoped_searchable_and_paginated() {
    let ctx = context();
    let app = init_app!(ctx);
    let (_, alice) = seed_user(&ctx, "alice").await;
    let (_, bob) = seed_user(&ctx, "bob").await;

    for name in ["Alpha", "Beta", "Gamma"] {
        call!(app, post("/api/teams/", &alice, json!({ "name": name })));
    }
    call!(app, post("/api/teams/", &bob, json!({ "name": "Bobs" })));

    let (status, page) = call!(app, get("/api/teams/?ordering=name&page_size=2", &alice));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["count"], 3);
    assert_eq!(page["results"][0]["name"], "Alpha");
    assert_eq!(page["results"][1]["name"], "Beta");
    assert!(page["next"].as_str().unwrap().contains("page=2"));
    assert!(page["previous"].is_null());

    let (_, page) = call!(app, get("/api/teams/?search=gam", &alice));
    assert_eq!(page["count"], 1);
    assert_eq!(page["results"][0]["name"], "Gamma");

    let (status, body) = call!(app, get("/api/teams/?page=9", &alice));
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Invalid page.");
}

#[actix_web::test]
async fn roles_gate_team_changes() {
    let ctx = context();
    let app = init_app!(ctx);
    let (_, owner) = seed_user(&ctx, "owner").await;
    let (member, member_token) = seed_user(&ctx, "member").await;
    let (_, outsider) = seed_user(&ctx, "outsider").await;

    let (_, body) = call!(app, post("/api/teams/", &owner, json!({ "name": "Design" })));
    let team_id = body["data"]["id"].as_i64().unwrap();
    let team_uri = format!("/api/teams/{}/", team_id);

    let (status, _) = call!(app, get(&team_uri, &outsider));
    assert_eq!(status, StatusCode::NOT_FOUND);

    let members_uri = format!("/api/teams/{}/members/", team_id);
    let (status, body) = call!(app, post(&members_uri, &owner, json!({ "user_id": member.id })));
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Member added successfully");
    assert_eq!(body["data"]["role"], "member");

    let (status, body) = call!(app, post(&members_uri, &owner, json!({ "user_id": member.id })));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "User is already a member of this team.");

    let (status, body) = call!(app, post(&members_uri, &owner, json!({ "user_id": 9999 })));
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User not found.");

    let (status, body) = call!(app, patch(&team_uri, &member_token, json!({ "name": "Renamed" })));
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().is_some());

    let notifications = ctx.state.store.notifications_for_user(member.id).await.unwrap();
    assert!(notifications.iter().any(|n| n.kind.as_str() == "team_member_added"));

    let (status, body) = call!(app, delete(&team_uri, &member_token));
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Only team owners can delete teams.");

    let (status, body) = call!(app, delete(&team_uri, &owner));
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());
    let (status, _) = call!(app, get(&team_uri, &owner));
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn owners_are_protected_from_demotion_and_removal() {
    let ctx = context();
    let app = init_app!(ctx);
    let (owner, owner_token) = seed_user(&ctx, "boss").await;
    let (admin, admin_token) = seed_user(&ctx, "lead").await;
    let (dev, _) = seed_user(&ctx, "dev").await;

    let (_, body) = call!(app, post("/api/teams/", &owner_token, json!({ "name": "Infra" })));
    let team_id = body["data"]["id"].as_i64().unwrap();
    let members_uri = format!("/api/teams/{}/members/", team_id);
    call!(app, post(&members_uri, &owner_token, json!({ "user_id": admin.id, "role": "admin" })));

    // admins cannot hand out ownership
    let (status, body) = call!(app, post(&members_uri, &admin_token, json!({ "user_id": dev.id, "role": "owner" })));
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Only team owners can assign owner role.");

    let owner_uri = format!("/api/teams/{}/members/{}/", team_id, owner.id);
    let (status, body) = call!(app, patch(&owner_uri, &admin_token, json!({ "role": "member" })));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Cannot change the role of the team owner.");

    let (status, _) = call!(app, delete(&owner_uri, &admin_token));
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let self_uri = format!("/api/teams/{}/members/{}/", team_id, admin.id);
    let (status, body) = call!(app, delete(&self_uri, &admin_token));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "You cannot remove yourself from the team. Please contact another admin or owner."
    );

    let (status, body) = call!(app, patch(&self_uri, &owner_token, json!({ "role": "viewer" })));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["role"][0], "Invalid role. Must be one of: owner, admin, member");

    let (status, _) = call!(app, delete(&self_uri, &owner_token));
    assert_eq!(status, StatusCode::NO_CONTENT);
}
