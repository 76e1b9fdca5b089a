use actix_web::{web, HttpRequest, HttpResponse};

use super::notifications_models::NotificationListQuery;
use crate::auth::Caller;
use crate::error::ApiError;
use crate::pagination::PageLinks;
use crate::routes::DataResponse;
use crate::services::notifications;
use crate::state::AppState;

pub async fn list_notifications(
    state: web::Data<AppState>,
    caller: Caller,
    query: web::Query<NotificationListQuery>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let page = notifications::list(&state, &caller, &query, &PageLinks::from_request(&req)).await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn get_notification(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let notification = notifications::get(&state, &caller, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(notification))
}

pub async fn mark_read(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let notification = notifications::mark_read(&state, &caller, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(DataResponse::new(notification, "Notification marked as read")))
}

pub async fn mark_all_read(state: web::Data<AppState>, caller: Caller) -> Result<HttpResponse, ApiError> {
    let response = notifications::mark_all_read(&state, &caller).await?;
    Ok(HttpResponse::Ok().json(response))
}

pub async fn counts(state: web::Data<AppState>, caller: Caller) -> Result<HttpResponse, ApiError> {
    let response = notifications::counts(&state, &caller).await?;
    Ok(HttpResponse::Ok().json(response))
}
