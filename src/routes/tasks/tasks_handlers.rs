use actix_web::{web, HttpRequest, HttpResponse};
use log::info;

use super::tasks_models::{AssignRequest, CommentRequest, PageQuery, StatusRequest, TaskListQuery, TaskRequest};
use crate::auth::Caller;
use crate::error::ApiError;
use crate::pagination::PageLinks;
use crate::routes::DataResponse;
use crate::services::tasks;
use crate::state::AppState;

pub async fn list_tasks(
    state: web::Data<AppState>,
    caller: Caller,
    query: web::Query<TaskListQuery>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let page = tasks::list(&state, &caller, &query, &PageLinks::from_request(&req)).await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn create_task(
    state: web::Data<AppState>,
    caller: Caller,
    req: web::Json<TaskRequest>,
) -> Result<HttpResponse, ApiError> {
    info!("Received request to create a task from user {}", caller.id());
    let task = tasks::create(&state, &caller, req.into_inner()).await?;
    Ok(HttpResponse::Created().json(DataResponse::new(task, "Task created successfully")))
}

pub async fn get_task(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let task = tasks::get(&state, &caller, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(task))
}

pub async fn put_task(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<i64>,
    req: web::Json<TaskRequest>,
) -> Result<HttpResponse, ApiError> {
    let task = tasks::update(&state, &caller, path.into_inner(), req.into_inner(), false).await?;
    Ok(HttpResponse::Ok().json(DataResponse::new(task, "Task updated successfully")))
}

pub async fn patch_task(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<i64>,
    req: web::Json<TaskRequest>,
) -> Result<HttpResponse, ApiError> {
    let task = tasks::update(&state, &caller, path.into_inner(), req.into_inner(), true).await?;
    Ok(HttpResponse::Ok().json(DataResponse::new(task, "Task updated successfully")))
}

pub async fn delete_task(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let task_id = path.into_inner();
    info!("Received request to delete task {} from user {}", task_id, caller.id());
    tasks::delete(&state, &caller, task_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn assign_task(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<i64>,
    req: web::Json<AssignRequest>,
) -> Result<HttpResponse, ApiError> {
    let (task, assigned) = tasks::assign(&state, &caller, path.into_inner(), req.into_inner()).await?;
    let message = if assigned {
        "Task assigned successfully"
    } else {
        "Task unassigned successfully"
    };
    Ok(HttpResponse::Ok().json(DataResponse::new(task, message)))
}

pub async fn change_status(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<i64>,
    req: web::Json<StatusRequest>,
) -> Result<HttpResponse, ApiError> {
    let task = tasks::change_status(&state, &caller, path.into_inner(), req.into_inner()).await?;
    Ok(HttpResponse::Ok().json(DataResponse::new(task, "Task status updated successfully")))
}

pub async fn list_comments(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<i64>,
    query: web::Query<PageQuery>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let links = PageLinks::from_request(&req);
    let page = tasks::list_comments(&state, &caller, path.into_inner(), &query, &links).await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn create_comment(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<i64>,
    req: web::Json<CommentRequest>,
) -> Result<HttpResponse, ApiError> {
    let comment = tasks::create_comment(&state, &caller, path.into_inner(), req.into_inner()).await?;
    Ok(HttpResponse::Created().json(DataResponse::new(comment, "Comment created successfully")))
}

pub async fn get_comment(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse, ApiError> {
    let (task_id, comment_id) = path.into_inner();
    let comment = tasks::get_comment(&state, &caller, task_id, comment_id).await?;
    Ok(HttpResponse::Ok().json(comment))
}

pub async fn put_comment(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<(i64, i64)>,
    req: web::Json<CommentRequest>,
) -> Result<HttpResponse, ApiError> {
    let (task_id, comment_id) = path.into_inner();
    let comment = tasks::update_comment(&state, &caller, task_id, comment_id, req.into_inner(), false).await?;
    Ok(HttpResponse::Ok().json(DataResponse::new(comment, "Comment updated successfully")))
}

pub async fn patch_comment(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<(i64, i64)>,
    req: web::Json<CommentRequest>,
) -> Result<HttpResponse, ApiError> {
    let (task_id, comment_id) = path.into_inner();
    let comment = tasks::update_comment(&state, &caller, task_id, comment_id, req.into_inner(), true).await?;
    Ok(HttpResponse::Ok().json(DataResponse::new(comment, "Comment updated successfully")))
}

pub async fn delete_comment(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse, ApiError> {
    let (task_id, comment_id) = path.into_inner();
    tasks::delete_comment(&state, &caller, task_id, comment_id).await?;
    Ok(HttpResponse::NoContent().finish())
}
