use actix_web::{web, HttpResponse};
use log::info;
use serde_json::json;

use super::token_models::{ObtainRequest, RefreshRequest, VerifyRequest};
use crate::auth::ClientInfo;
use crate::error::ApiError;
use crate::services::tokens;
use crate::state::AppState;

pub async fn obtain_pair(state: web::Data<AppState>, req: web::Json<ObtainRequest>) -> Result<HttpResponse, ApiError> {
    info!("Received request on /api/token/");
    let pair = tokens::obtain(&state, req.into_inner()).await?;
    Ok(HttpResponse::Ok().json(pair))
}

pub async fn refresh(state: web::Data<AppState>, req: web::Json<RefreshRequest>) -> Result<HttpResponse, ApiError> {
    let pair = tokens::refresh(&state, req.into_inner()).await?;
    Ok(HttpResponse::Ok().json(pair))
}

pub async fn verify(state: web::Data<AppState>, req: web::Json<VerifyRequest>) -> Result<HttpResponse, ApiError> {
    tokens::verify(&state, req.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({})))
}

pub async fn blacklist(
    state: web::Data<AppState>,
    client: ClientInfo,
    req: web::Json<RefreshRequest>,
) -> Result<HttpResponse, ApiError> {
    info!("Received request on /api/token/blacklist/");
    tokens::blacklist(&state, &client, req.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({})))
}
