// src/auth/extractor.rs

use std::future::Future;
use std::pin::Pin;

use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use log::info;

use super::{AuthError, TokenType};
use crate::error::{ApiError, NOT_AUTHENTICATED, TOKEN_NOT_VALID};
use crate::models::User;
use crate::state::AppState;

/// The caller, resolved from an `Authorization: Bearer <access token>` header.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl AuthUser {
    pub fn id(&self) -> i64 {
        self.0.id
    }
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let bearer = bearer_token(req);

        Box::pin(async move {
            let state = state.ok_or_else(|| ApiError::Internal("application state is not configured".into()))?;
            let token = match bearer {
                Some(token) => token,
                None => return Err(ApiError::Unauthenticated(NOT_AUTHENTICATED.to_string())),
            };

            let claims = state.tokens.decode_as(&token, TokenType::Access).map_err(|e| {
                info!("Rejected access token: {}", e);
                ApiError::Unauthenticated(TOKEN_NOT_VALID.to_string())
            })?;

            // Check that the user still exists and may log in
            match state.store.user_by_id(claims.user_id).await.map_err(AuthError::from)? {
                Some(user) if user.is_active => Ok(AuthUser(user)),
                _ => Err(ApiError::Unauthenticated(TOKEN_NOT_VALID.to_string())),
            }
        })
    }
}

/// Authenticated user plus the client details recorded with their actions.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user: User,
    pub client: ClientInfo,
}

impl Caller {
    pub fn id(&self) -> i64 {
        self.user.id
    }
}

impl FromRequest for Caller {
    type Error = ApiError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let client = ClientInfo::from_http_request(req);
        let auth = AuthUser::from_request(req, payload);
        Box::pin(async move {
            let AuthUser(user) = auth.await?;
            Ok(Caller { user, client })
        })
    }
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let mut parts = value.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(scheme), Some(token)) if scheme.eq_ignore_ascii_case("bearer") => Some(token.to_string()),
        _ => None,
    }
}

/// Client address and user agent, recorded with activity log entries.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: String,
}

impl ClientInfo {
    pub fn from_http_request(req: &HttpRequest) -> Self {
        let forwarded = req
            .headers()
            .get("X-Forwarded-For")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|ip| ip.trim().to_string())
            .filter(|ip| !ip.is_empty());
        let ip_address = forwarded.or_else(|| req.peer_addr().map(|addr| addr.ip().to_string()));
        let user_agent = req
            .headers()
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        Self { ip_address, user_agent }
    }
}

impl FromRequest for ClientInfo {
    type Error = ApiError;
    type Future = std::future::Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        std::future::ready(Ok(ClientInfo::from_http_request(req)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn parses_bearer_header() {
        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Bearer abc.def.ghi"))
            .to_http_request();
        assert_eq!(bearer_token(&req).as_deref(), Some("abc.def.ghi"));

        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Token abc"))
            .to_http_request();
        assert_eq!(bearer_token(&req), None);
    }

    #[test]
    fn forwarded_address_wins_over_peer() {
        let req = TestRequest::default()
            .insert_header(("X-Forwarded-For", "10.0.0.7, 172.16.0.1"))
            .insert_header((header::USER_AGENT, "curl/8.0"))
            .peer_addr("127.0.0.1:9000".parse().unwrap())
            .to_http_request();
        let info = ClientInfo::from_http_request(&req);
        assert_eq!(info.ip_address.as_deref(), Some("10.0.0.7"));
        assert_eq!(info.user_agent, "curl/8.0");
    }
}
