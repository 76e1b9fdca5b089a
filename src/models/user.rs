use chrono::{DateTime, Utc};
use sqlx::FromRow;

use super::UserRole;

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    #[sqlx(try_from = "String")]
    pub role: UserRole,
    pub bio: String,
    pub phone: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// "First Last", or the username when neither name is set.
    pub fn full_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub bio: String,
    pub phone: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(first: &str, last: &str) -> User {
        let now = Utc::now();
        User {
            id: 1,
            username: "jdoe".into(),
            email: "jdoe@example.com".into(),
            password_hash: String::new(),
            first_name: first.into(),
            last_name: last.into(),
            role: UserRole::Member,
            bio: String::new(),
            phone: String::new(),
            is_active: true,
            is_staff: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn full_name_falls_back_to_username() {
        assert_eq!(user("John", "Doe").full_name(), "John Doe");
        assert_eq!(user("John", "").full_name(), "John");
        assert_eq!(user("", "").full_name(), "jdoe");
    }
}
