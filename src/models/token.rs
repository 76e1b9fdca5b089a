use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// A refresh token that may no longer be used.
#[derive(Debug, Clone, FromRow)]
pub struct BlacklistedToken {
    pub jti: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
    pub blacklisted_at: DateTime<Utc>,
}
