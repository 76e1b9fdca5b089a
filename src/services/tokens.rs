// src/services/tokens.rs
//
// Token endpoints: obtain, refresh with rotation, verify and blacklist.

use chrono::Utc;
use log::info;
use serde_json::json;

use super::{activity, ServiceResult};
use crate::auth::password::verify_password;
use crate::auth::{Claims, ClientInfo, TokenPair, TokenType};
use crate::error::{ApiError, FieldErrors};
use crate::models::{ActivityAction, BlacklistedToken, ObjectRef};
use crate::routes::token::token_models::{ObtainRequest, RefreshRequest, VerifyRequest};
use crate::state::AppState;
use crate::validation::{BLANK, REQUIRED};

const NO_ACTIVE_ACCOUNT: &str = "No active account found with the given credentials";
const INVALID_TOKEN: &str = "Token is invalid or expired";
const BLACKLISTED: &str = "Token is blacklisted";

fn required(errors: &mut FieldErrors, field: &str, raw: Option<String>) -> String {
    match raw {
        None => {
            errors.add(field, REQUIRED);
            String::new()
        }
        Some(value) if value.is_empty() => {
            errors.add(field, BLANK);
            String::new()
        }
        Some(value) => value,
    }
}

fn invalid_token() -> ApiError {
    ApiError::Unauthenticated(INVALID_TOKEN.to_string())
}

/// Decodes a token of the expected type and rejects blacklisted ones.
async fn usable_claims(state: &AppState, token: &str, expected: Option<TokenType>) -> ServiceResult<Claims> {
    let claims = match expected {
        Some(token_type) => state.tokens.decode_as(token, token_type),
        None => state.tokens.decode(token),
    }
    .map_err(|e| {
        info!("Rejected token: {}", e);
        invalid_token()
    })?;
    if state.store.is_token_blacklisted(&claims.jti).await? {
        return Err(ApiError::Unauthenticated(BLACKLISTED.to_string()));
    }
    Ok(claims)
}

async fn blacklist_claims(state: &AppState, claims: &Claims) -> ServiceResult<()> {
    let entry = BlacklistedToken {
        jti: claims.jti.clone(),
        user_id: claims.user_id,
        expires_at: claims.expires_at(),
        blacklisted_at: Utc::now(),
    };
    state.store.blacklist_token(entry).await?;
    Ok(())
}

pub async fn obtain(state: &AppState, request: ObtainRequest) -> ServiceResult<TokenPair> {
    let mut errors = FieldErrors::new();
    let username = required(&mut errors, "username", request.username);
    let password = required(&mut errors, "password", request.password);
    errors.into_result()?;

    let user = state.store.user_by_username(&username.trim().to_lowercase()).await?;
    match user {
        Some(user) if user.is_active && verify_password(&password, &user.password_hash) => {
            Ok(state.tokens.issue_pair(user.id)?)
        }
        _ => Err(ApiError::Unauthenticated(NO_ACTIVE_ACCOUNT.to_string())),
    }
}

/// Rotates the pair: the presented refresh token is blacklisted.
pub async fn refresh(state: &AppState, request: RefreshRequest) -> ServiceResult<TokenPair> {
    let mut errors = FieldErrors::new();
    let token = required(&mut errors, "refresh", request.refresh);
    errors.into_result()?;

    let claims = usable_claims(state, &token, Some(TokenType::Refresh)).await?;
    match state.store.user_by_id(claims.user_id).await? {
        Some(user) if user.is_active => {}
        _ => return Err(invalid_token()),
    }
    blacklist_claims(state, &claims).await?;
    Ok(state.tokens.issue_pair(claims.user_id)?)
}

pub async fn verify(state: &AppState, request: VerifyRequest) -> ServiceResult<()> {
    let mut errors = FieldErrors::new();
    let token = required(&mut errors, "token", request.token);
    errors.into_result()?;

    usable_claims(state, &token, None).await?;
    Ok(())
}

/// Logout: the refresh token can no longer be exchanged.
pub async fn blacklist(state: &AppState, client: &ClientInfo, request: RefreshRequest) -> ServiceResult<()> {
    let mut errors = FieldErrors::new();
    let token = required(&mut errors, "refresh", request.refresh);
    errors.into_result()?;

    let claims = usable_claims(state, &token, Some(TokenType::Refresh)).await?;
    blacklist_claims(state, &claims).await?;
    info!("Refresh token of user {} blacklisted", claims.user_id);

    activity::record(
        state,
        Some(claims.user_id),
        client,
        ActivityAction::Logout,
        Some(ObjectRef::user(claims.user_id)),
        json!({ "jti": claims.jti }),
    )
    .await;
    Ok(())
}
