use actix_web::{web, HttpResponse};
use log::info;

use super::auth_models::{LoginRequest, ProfileUpdateRequest, RegisterRequest};
use crate::auth::{Caller, ClientInfo};
use crate::error::ApiError;
use crate::routes::DataResponse;
use crate::services::users;
use crate::state::AppState;

// register a new account and hand back its first token pair
pub async fn register(
    state: web::Data<AppState>,
    client: ClientInfo,
    req: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    info!("Received request on /api/auth/register/");
    let response = users::register(&state, &client, req.into_inner()).await?;
    Ok(HttpResponse::Created().json(response))
}

pub async fn login(
    state: web::Data<AppState>,
    client: ClientInfo,
    req: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    info!("Received request on /api/auth/login/");
    let response = users::login(&state, &client, req.into_inner()).await?;
    Ok(HttpResponse::Ok().json(response))
}

pub async fn get_profile(state: web::Data<AppState>, caller: Caller) -> Result<HttpResponse, ApiError> {
    let profile = users::profile(&state, &caller).await?;
    Ok(HttpResponse::Ok().json(profile))
}

// PUT and PATCH share the handler: every profile field is optional
pub async fn update_profile(
    state: web::Data<AppState>,
    caller: Caller,
    req: web::Json<ProfileUpdateRequest>,
) -> Result<HttpResponse, ApiError> {
    info!("Received profile update from user {}", caller.id());
    let profile = users::update_profile(&state, &caller, req.into_inner()).await?;
    Ok(HttpResponse::Ok().json(DataResponse::new(profile, "Profile updated successfully")))
}
