use chrono::{DateTime, Utc};
use sqlx::FromRow;

string_enum! {
    pub enum Location {
        Remote => ("remote", "Remote"),
        Office => ("office", "Office"),
        Hybrid => ("hybrid", "Hybrid"),
    }
}

/// Extended profile, one row per user.
///
/// `location` is kept as text because the empty string is an accepted value.
#[derive(Debug, Clone, FromRow)]
pub struct UserProfile {
    pub user_id: i64,
    pub job_title: String,
    pub department: String,
    pub location: String,
    pub address: String,
    pub city: String,
    pub country: String,
    pub website: String,
    pub linkedin: String,
    pub github: String,
    pub twitter: String,
    pub timezone: String,
    pub language: String,
    pub email_notifications: bool,
    pub push_notifications: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(user_id: i64) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            job_title: String::new(),
            department: String::new(),
            location: String::new(),
            address: String::new(),
            city: String::new(),
            country: String::new(),
            website: String::new(),
            linkedin: String::new(),
            github: String::new(),
            twitter: String::new(),
            timezone: "UTC".to_string(),
            language: "en".to_string(),
            email_notifications: true,
            push_notifications: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_complete_profile(&self, email: &str) -> bool {
        !self.job_title.is_empty() && !self.department.is_empty() && !email.is_empty()
    }
}
