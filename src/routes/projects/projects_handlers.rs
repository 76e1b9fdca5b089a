use actix_web::{web, HttpRequest, HttpResponse};
use log::info;

use super::projects_models::{ProjectListQuery, ProjectRequest};
use crate::auth::Caller;
use crate::error::ApiError;
use crate::pagination::PageLinks;
use crate::routes::teams::teams_models::{AddMemberRequest, UpdateMemberRequest};
use crate::routes::DataResponse;
use crate::services::projects;
use crate::state::AppState;

pub async fn list_projects(
    state: web::Data<AppState>,
    caller: Caller,
    query: web::Query<ProjectListQuery>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let page = projects::list(&state, &caller, &query, &PageLinks::from_request(&req)).await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn create_project(
    state: web::Data<AppState>,
    caller: Caller,
    req: web::Json<ProjectRequest>,
) -> Result<HttpResponse, ApiError> {
    info!("Received request to create a project from user {}", caller.id());
    let project = projects::create(&state, &caller, req.into_inner()).await?;
    Ok(HttpResponse::Created().json(DataResponse::new(project, "Project created successfully")))
}

pub async fn get_project(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let project = projects::get(&state, &caller, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(project))
}

pub async fn put_project(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<i64>,
    req: web::Json<ProjectRequest>,
) -> Result<HttpResponse, ApiError> {
    let project = projects::update(&state, &caller, path.into_inner(), req.into_inner(), false).await?;
    Ok(HttpResponse::Ok().json(DataResponse::new(project, "Project updated successfully")))
}

pub async fn patch_project(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<i64>,
    req: web::Json<ProjectRequest>,
) -> Result<HttpResponse, ApiError> {
    let project = projects::update(&state, &caller, path.into_inner(), req.into_inner(), true).await?;
    Ok(HttpResponse::Ok().json(DataResponse::new(project, "Project updated successfully")))
}

pub async fn delete_project(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let project_id = path.into_inner();
    info!("Received request to delete project {} from user {}", project_id, caller.id());
    projects::delete(&state, &caller, project_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn add_member(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<i64>,
    req: web::Json<AddMemberRequest>,
) -> Result<HttpResponse, ApiError> {
    let member = projects::add_member(&state, &caller, path.into_inner(), req.into_inner()).await?;
    Ok(HttpResponse::Created().json(DataResponse::new(member, "Member added successfully")))
}

pub async fn update_member(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<(i64, i64)>,
    req: web::Json<UpdateMemberRequest>,
) -> Result<HttpResponse, ApiError> {
    let (project_id, user_id) = path.into_inner();
    let member = projects::update_member(&state, &caller, project_id, user_id, req.into_inner()).await?;
    Ok(HttpResponse::Ok().json(DataResponse::new(member, "Member role updated successfully")))
}

pub async fn remove_member(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse, ApiError> {
    let (project_id, user_id) = path.into_inner();
    projects::remove_member(&state, &caller, project_id, user_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn project_stats(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let stats = projects::stats(&state, &caller, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(DataResponse::new(stats, "Project statistics retrieved successfully")))
}
