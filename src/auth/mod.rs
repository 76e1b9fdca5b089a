// src/auth/mod.rs

use thiserror::Error;

use crate::store::StoreError;

pub mod extractor;
pub mod jwt;
pub mod password;

pub use extractor::{AuthUser, Caller, ClientInfo};
pub use jwt::{Claims, TokenPair, TokenService, TokenType};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token is invalid or expired: {0}")]
    InvalidToken(String),
    #[error("expected a {expected} token")]
    WrongTokenType { expected: TokenType },
    #[error("token is blacklisted")]
    Blacklisted,
    #[error("user not found or inactive")]
    InactiveUser,
    #[error("failed to sign token: {0}")]
    Encode(jsonwebtoken::errors::Error),
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
