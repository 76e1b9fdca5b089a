// src/auth/jwt.rs

use std::fmt;

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AuthError;
use crate::config::AuthConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenType::Access => f.write_str("access"),
            TokenType::Refresh => f.write_str("refresh"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub token_type: TokenType,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
    pub user_id: i64,
}

impl Claims {
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or_else(Utc::now)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Signs and checks HS256 access/refresh tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            access_ttl: Duration::minutes(config.access_token_minutes),
            refresh_ttl: Duration::days(config.refresh_token_days),
        }
    }

    pub fn issue_pair(&self, user_id: i64) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access: self.issue(user_id, TokenType::Access, self.access_ttl)?,
            refresh: self.issue(user_id, TokenType::Refresh, self.refresh_ttl)?,
        })
    }

    fn issue(&self, user_id: i64, token_type: TokenType, ttl: Duration) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            token_type,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().simple().to_string(),
            user_id,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(AuthError::Encode)
    }

    /// Checks signature and expiry, whatever the token type.
    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }

    pub fn decode_as(&self, token: &str, expected: TokenType) -> Result<Claims, AuthError> {
        let claims = self.decode(token)?;
        if claims.token_type != expected {
            return Err(AuthError::WrongTokenType { expected });
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn service() -> TokenService {
        TokenService::new(&Config::for_tests().auth)
    }

    #[test]
    fn issued_pair_carries_typed_claims() {
        let tokens = service();
        let pair = tokens.issue_pair(42).unwrap();

        let access = tokens.decode_as(&pair.access, TokenType::Access).unwrap();
        let refresh = tokens.decode_as(&pair.refresh, TokenType::Refresh).unwrap();
        assert_eq!(access.user_id, 42);
        assert_eq!(refresh.user_id, 42);
        assert_ne!(access.jti, refresh.jti);
        assert!(refresh.exp - refresh.iat > access.exp - access.iat);
    }

    #[test]
    fn access_token_is_not_a_refresh_token() {
        let tokens = service();
        let pair = tokens.issue_pair(1).unwrap();
        let err = tokens.decode_as(&pair.access, TokenType::Refresh).unwrap_err();
        assert!(matches!(err, AuthError::WrongTokenType { expected: TokenType::Refresh }));
    }

    #[test]
    fn other_secrets_are_rejected() {
        let pair = service().issue_pair(1).unwrap();
        let mut config = Config::for_tests().auth;
        config.jwt_secret = "another-secret".to_string();
        let other = TokenService::new(&config);
        assert!(matches!(other.decode(&pair.access), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let mut config = Config::for_tests().auth;
        config.access_token_minutes = -10;
        let tokens = TokenService::new(&config);
        let pair = tokens.issue_pair(1).unwrap();
        assert!(tokens.decode(&pair.access).is_err());
        assert!(tokens.decode(&pair.refresh).is_ok());
    }
}
