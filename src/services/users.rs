// src/services/users.rs

use chrono::Utc;
use log::info;
use serde_json::json;

use super::{activity, emails, notifier, parse_choice, ServiceResult};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::{Caller, ClientInfo};
use crate::error::{ApiError, FieldErrors};
use crate::models::{ActivityAction, Location, NewUser, ObjectRef, User, UserProfile, UserRole};
use crate::routes::auth::auth_models::{
    AuthResponse, LoginRequest, ProfileUpdateRequest, ProfileView, RegisterRequest, UserView,
};
use crate::state::AppState;
use crate::store::StoreResult;
use crate::validation::{self, BLANK, REQUIRED};

/// Reads a required text field, recording REQUIRED or BLANK.
fn required_text<'a>(errors: &mut FieldErrors, field: &str, raw: Option<&'a str>) -> Option<&'a str> {
    match raw {
        None => {
            errors.add(field, REQUIRED);
            None
        }
        Some(value) if value.trim().is_empty() => {
            errors.add(field, BLANK);
            None
        }
        Some(value) => Some(value),
    }
}

fn bounded(errors: &mut FieldErrors, field: &str, value: Option<String>, max: usize) -> String {
    let value = value.unwrap_or_default();
    if let Err(message) = validation::max_length(&value, max) {
        errors.add(field, message);
    }
    value
}

pub async fn register(state: &AppState, client: &ClientInfo, request: RegisterRequest) -> ServiceResult<AuthResponse> {
    let mut errors = FieldErrors::new();

    let username = match required_text(&mut errors, "username", request.username.as_deref()) {
        Some(raw) => {
            if state.store.user_by_username(&raw.trim().to_lowercase()).await?.is_some() {
                errors.add("username", "A user with this username already exists.");
                None
            } else {
                match validation::username(raw) {
                    Ok(username) => Some(username),
                    Err(message) => {
                        errors.add("username", message);
                        None
                    }
                }
            }
        }
        None => None,
    };

    let email = match required_text(&mut errors, "email", request.email.as_deref()) {
        Some(raw) => match validation::email(raw) {
            Ok(email) => {
                if state.store.user_by_email(&email).await?.is_some() {
                    errors.add("email", "A user with this email already exists.");
                }
                Some(email)
            }
            Err(message) => {
                errors.add("email", message);
                None
            }
        },
        None => None,
    };

    let password = required_text(&mut errors, "password", request.password.as_deref());
    if let Some(password) = password {
        let problems = validation::password(password, username.as_deref().unwrap_or_default());
        for problem in problems {
            errors.add("password", problem);
        }
    }
    let password2 = required_text(&mut errors, "password2", request.password2.as_deref());

    let role: UserRole = parse_choice(&mut errors, "role", request.role.as_deref()).unwrap_or_default();
    let phone = match validation::phone(request.phone.as_deref().unwrap_or_default()) {
        Ok(phone) => phone,
        Err(message) => {
            errors.add("phone", message);
            String::new()
        }
    };
    let first_name = bounded(&mut errors, "first_name", request.first_name, 150);
    let last_name = bounded(&mut errors, "last_name", request.last_name, 150);
    let bio = bounded(&mut errors, "bio", request.bio, 500);
    errors.into_result()?;

    // Field checks passed, so every required value is present
    let (username, email, password) = match (username, email, password) {
        (Some(username), Some(email), Some(password)) => (username, email, password),
        _ => return Err(ApiError::field("non_field_errors", REQUIRED)),
    };
    if Some(password) != password2 {
        return Err(ApiError::field("password2", "Passwords do not match."));
    }

    let password_hash = hash_password(password, state.config.auth.bcrypt_cost)?;
    let user = state
        .store
        .create_user(NewUser { username, email, password_hash, first_name, last_name, role, bio, phone })
        .await?;
    state.store.save_profile(&UserProfile::new(user.id)).await?;
    info!("User {} registered successfully", user.username);

    notifier::welcome(state, &user).await;
    emails::send_welcome(state, &user).await;
    activity::record(
        state,
        Some(user.id),
        client,
        ActivityAction::Created,
        Some(ObjectRef::user(user.id)),
        json!({ "username": user.username }),
    )
    .await;

    let tokens = state.tokens.issue_pair(user.id)?;
    Ok(AuthResponse {
        user: UserView::from(&user),
        tokens,
        message: "User registered successfully".to_string(),
    })
}

fn invalid_credentials(details: FieldErrors) -> ApiError {
    ApiError::BadRequestWithDetails {
        message: "Invalid credentials".to_string(),
        details: json!(details),
    }
}

/// Looks the login name up as a username first, then as an email.
async fn find_login_user(state: &AppState, login: &str) -> StoreResult<Option<User>> {
    let login = login.trim();
    if let Some(user) = state.store.user_by_username(&login.to_lowercase()).await? {
        return Ok(Some(user));
    }
    state.store.user_by_email(&login.to_lowercase()).await
}

pub async fn login(state: &AppState, client: &ClientInfo, request: LoginRequest) -> ServiceResult<AuthResponse> {
    let mut errors = FieldErrors::new();
    let login = required_text(&mut errors, "username", request.username.as_deref());
    let password = required_text(&mut errors, "password", request.password.as_deref());
    if !errors.is_empty() {
        return Err(invalid_credentials(errors));
    }
    let (login, password) = match (login, password) {
        (Some(login), Some(password)) => (login, password),
        _ => {
            return Err(invalid_credentials(FieldErrors::single(
                "non_field_errors",
                "Both username and password are required.",
            )))
        }
    };

    let user = match find_login_user(state, login).await? {
        Some(user) if verify_password(password, &user.password_hash) => user,
        _ => {
            info!("Failed login attempt for {}", login);
            return Err(invalid_credentials(FieldErrors::single(
                "non_field_errors",
                "Invalid username/email or password.",
            )));
        }
    };
    if !user.is_active {
        return Err(invalid_credentials(FieldErrors::single(
            "non_field_errors",
            "User account is disabled.",
        )));
    }

    let tokens = state.tokens.issue_pair(user.id)?;
    info!("User {} logged in", user.username);
    activity::record(
        state,
        Some(user.id),
        client,
        ActivityAction::Login,
        Some(ObjectRef::user(user.id)),
        json!({ "username": user.username }),
    )
    .await;

    Ok(AuthResponse {
        user: UserView::from(&user),
        tokens,
        message: "Login successful".to_string(),
    })
}

/// The stored profile, created with defaults when missing.
async fn profile_of(state: &AppState, user_id: i64) -> StoreResult<UserProfile> {
    match state.store.profile(user_id).await? {
        Some(profile) => Ok(profile),
        None => state.store.save_profile(&UserProfile::new(user_id)).await,
    }
}

pub async fn profile(state: &AppState, caller: &Caller) -> ServiceResult<ProfileView> {
    let profile = profile_of(state, caller.id()).await?;
    Ok(ProfileView::new(&caller.user, profile))
}

fn set_text(errors: &mut FieldErrors, field: &str, value: Option<String>, max: usize, target: &mut String) {
    if let Some(value) = value {
        if let Err(message) = validation::max_length(&value, max) {
            errors.add(field, message);
        }
        *target = value;
    }
}

fn checked_url(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<String>,
    check: fn(&str) -> Result<(), String>,
    target: &mut String,
) {
    if let Some(value) = value {
        let value = value.trim().to_string();
        if let Err(message) = validation::max_length(&value, 200).and_then(|_| check(&value)) {
            errors.add(field, message);
        }
        *target = value;
    }
}

pub async fn update_profile(
    state: &AppState,
    caller: &Caller,
    request: ProfileUpdateRequest,
) -> ServiceResult<ProfileView> {
    let mut errors = FieldErrors::new();
    let mut user = caller.user.clone();
    let mut profile = profile_of(state, caller.id()).await?;

    set_text(&mut errors, "first_name", request.first_name, 150, &mut user.first_name);
    set_text(&mut errors, "last_name", request.last_name, 150, &mut user.last_name);
    set_text(&mut errors, "bio", request.bio, 500, &mut user.bio);
    if let Some(role) = request.role {
        match role.parse::<UserRole>() {
            Ok(role) => user.role = role,
            Err(_) => errors.add("role", format!("Invalid role. Must be one of: {}", UserRole::choices())),
        }
    }
    if let Some(phone) = request.phone {
        match validation::phone(&phone) {
            Ok(phone) => user.phone = phone,
            Err(message) => errors.add("phone", message),
        }
    }

    set_text(&mut errors, "job_title", request.job_title, 100, &mut profile.job_title);
    set_text(&mut errors, "department", request.department, 100, &mut profile.department);
    set_text(&mut errors, "address", request.address, 255, &mut profile.address);
    set_text(&mut errors, "city", request.city, 100, &mut profile.city);
    set_text(&mut errors, "country", request.country, 100, &mut profile.country);
    set_text(&mut errors, "timezone", request.timezone, 50, &mut profile.timezone);
    set_text(&mut errors, "language", request.language, 10, &mut profile.language);
    if let Some(location) = request.location {
        if location.is_empty() {
            profile.location = location;
        } else {
            match location.parse::<Location>() {
                Ok(location) => profile.location = location.as_str().to_string(),
                Err(message) => errors.add("location", message),
            }
        }
    }
    checked_url(&mut errors, "website", request.website, validation::website, &mut profile.website);
    checked_url(&mut errors, "linkedin", request.linkedin, validation::linkedin, &mut profile.linkedin);
    checked_url(&mut errors, "github", request.github, validation::github, &mut profile.github);
    checked_url(&mut errors, "twitter", request.twitter, validation::twitter, &mut profile.twitter);
    if let Some(enabled) = request.email_notifications {
        profile.email_notifications = enabled;
    }
    if let Some(enabled) = request.push_notifications {
        profile.push_notifications = enabled;
    }
    errors.into_result()?;

    let now = Utc::now();
    user.updated_at = now;
    profile.updated_at = now;
    let user = state.store.update_user(&user).await?;
    let profile = state.store.save_profile(&profile).await?;
    info!("Profile of user {} updated", user.id);

    Ok(ProfileView::new(&user, profile))
}
