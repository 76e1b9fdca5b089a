// src/error.rs

use std::collections::BTreeMap;

use actix_web::{error::JsonPayloadError, http::StatusCode, HttpRequest, HttpResponse, ResponseError};
use log::error;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::auth::AuthError;
use crate::store::StoreError;

pub const NOT_AUTHENTICATED: &str = "Authentication credentials were not provided.";
pub const TOKEN_NOT_VALID: &str = "Given token not valid for any token type";

/// Per-field validation messages, serialized as `{"field": ["message", ...]}`.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), ApiError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self))
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed: {0:?}")]
    Validation(FieldErrors),
    #[error("{0}")]
    BadRequest(String),
    #[error("{message}")]
    BadRequestWithDetails { message: String, details: Value },
    #[error("{0}")]
    Malformed(String),
    #[error("{0}")]
    Unauthenticated(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    /// 404 for a referenced record, rendered as `{"error": ...}`.
    #[error("{0}")]
    Missing(String),
    #[error(transparent)]
    Store(StoreError),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        ApiError::Validation(FieldErrors::single(field, message))
    }

    pub fn not_found() -> Self {
        ApiError::NotFound("Not found.".to_string())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn missing(message: impl Into<String>) -> Self {
        ApiError::Missing(message.into())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(message) => ApiError::BadRequest(message),
            StoreError::NotFound => ApiError::not_found(),
            other => ApiError::Store(other),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Store(e) => e.into(),
            AuthError::Encode(e) => ApiError::Internal(format!("failed to sign token: {}", e)),
            AuthError::Hash(e) => ApiError::Internal(format!("failed to hash password: {}", e)),
            _ => ApiError::Unauthenticated(TOKEN_NOT_VALID.to_string()),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::BadRequest(_)
            | ApiError::BadRequestWithDetails { .. }
            | ApiError::Malformed(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) | ApiError::Missing(_) => StatusCode::NOT_FOUND,
            ApiError::Store(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            ApiError::Validation(errors) => json!(errors),
            ApiError::BadRequest(message) | ApiError::Forbidden(message) | ApiError::Missing(message) => {
                json!({ "error": message })
            }
            ApiError::BadRequestWithDetails { message, details } => {
                json!({ "error": message, "details": details })
            }
            ApiError::Malformed(message) | ApiError::Unauthenticated(message) | ApiError::NotFound(message) => {
                json!({ "detail": message })
            }
            ApiError::Store(e) => {
                error!("Storage failure: {}", e);
                json!({ "error": "Internal server error" })
            }
            ApiError::Internal(message) => {
                error!("Internal failure: {}", message);
                json!({ "error": "Internal server error" })
            }
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

/// Error handler for `web::JsonConfig` so malformed bodies come back as 400 JSON.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let message = match &err {
        JsonPayloadError::ContentType => "Unsupported media type in request.".to_string(),
        other => format!("JSON parse error - {}", other),
    };
    ApiError::Malformed(message).into()
}
