use actix_web::{web, HttpRequest, HttpResponse};
use log::info;

use super::teams_models::{AddMemberRequest, TeamListQuery, TeamRequest, UpdateMemberRequest};
use crate::auth::Caller;
use crate::error::ApiError;
use crate::pagination::PageLinks;
use crate::routes::DataResponse;
use crate::services::teams;
use crate::state::AppState;

pub async fn list_teams(
    state: web::Data<AppState>,
    caller: Caller,
    query: web::Query<TeamListQuery>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let page = teams::list(&state, &caller, &query, &PageLinks::from_request(&req)).await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn create_team(
    state: web::Data<AppState>,
    caller: Caller,
    req: web::Json<TeamRequest>,
) -> Result<HttpResponse, ApiError> {
    info!("Received request to create a team from user {}", caller.id());
    let team = teams::create(&state, &caller, req.into_inner()).await?;
    Ok(HttpResponse::Created().json(DataResponse::new(team, "Team created successfully")))
}

pub async fn get_team(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let team = teams::get(&state, &caller, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(team))
}

pub async fn put_team(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<i64>,
    req: web::Json<TeamRequest>,
) -> Result<HttpResponse, ApiError> {
    let team = teams::update(&state, &caller, path.into_inner(), req.into_inner(), false).await?;
    Ok(HttpResponse::Ok().json(DataResponse::new(team, "Team updated successfully")))
}

pub async fn patch_team(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<i64>,
    req: web::Json<TeamRequest>,
) -> Result<HttpResponse, ApiError> {
    let team = teams::update(&state, &caller, path.into_inner(), req.into_inner(), true).await?;
    Ok(HttpResponse::Ok().json(DataResponse::new(team, "Team updated successfully")))
}

pub async fn delete_team(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let team_id = path.into_inner();
    info!("Received request to delete team {} from user {}", team_id, caller.id());
    teams::delete(&state, &caller, team_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn add_member(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<i64>,
    req: web::Json<AddMemberRequest>,
) -> Result<HttpResponse, ApiError> {
    let member = teams::add_member(&state, &caller, path.into_inner(), req.into_inner()).await?;
    Ok(HttpResponse::Created().json(DataResponse::new(member, "Member added successfully")))
}

pub async fn update_member(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<(i64, i64)>,
    req: web::Json<UpdateMemberRequest>,
) -> Result<HttpResponse, ApiError> {
    let (team_id, user_id) = path.into_inner();
    let member = teams::update_member(&state, &caller, team_id, user_id, req.into_inner()).await?;
    Ok(HttpResponse::Ok().json(DataResponse::new(member, "Member role updated successfully")))
}

pub async fn remove_member(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse, ApiError> {
    let (team_id, user_id) = path.into_inner();
    teams::remove_member(&state, &caller, team_id, user_id).await?;
    Ok(HttpResponse::NoContent().finish())
}
