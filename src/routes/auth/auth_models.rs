use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::TokenPair;
use crate::models::{User, UserProfile};

// structs
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub role: String,
    pub bio: String,
    pub phone: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        UserView {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            full_name: user.full_name(),
            role: user.role.as_str().to_string(),
            bio: user.bio.clone(),
            phone: user.phone.clone(),
            is_active: user.is_active,
            is_staff: user.is_staff,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// User and profile fields flattened into one object.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub bio: String,
    pub phone: String,
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
    pub has_complete_profile: bool,
    pub profile_created_at: DateTime<Utc>,
    pub profile_updated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProfileView {
    pub fn new(user: &User, profile: UserProfile) -> Self {
        ProfileView {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            full_name: user.full_name(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role.as_str().to_string(),
            bio: user.bio.clone(),
            phone: user.phone.clone(),
            has_complete_profile: profile.has_complete_profile(&user.email),
            job_title: profile.job_title,
            department: profile.department,
            location: profile.location,
            address: profile.address,
            city: profile.city,
            country: profile.country,
            website: profile.website,
            linkedin: profile.linkedin,
            github: profile.github,
            twitter: profile.twitter,
            timezone: profile.timezone,
            language: profile.language,
            email_notifications: profile.email_notifications,
            push_notifications: profile.push_notifications,
            profile_created_at: profile.created_at,
            profile_updated_at: profile.updated_at,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserView,
    pub tokens: TokenPair,
    pub message: String,
}

// json format

#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub password2: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Every field is optional on both PUT and PATCH; `username` and `email` are read-only.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileUpdateRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<String>,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub job_title: Option<String>,
    pub department: Option<String>,
    pub location: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub website: Option<String>,
    pub linkedin: Option<String>,
    pub github: Option<String>,
    pub twitter: Option<String>,
    pub timezone: Option<String>,
    pub language: Option<String>,
    pub email_notifications: Option<bool>,
    pub push_notifications: Option<bool>,
}
