// src/validation.rs
//
// Field level checks shared by the request handlers. Each check returns the
// cleaned value or the message to report under the field name.

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";

const MIN_PASSWORD_LENGTH: usize = 8;

const COMMON_PASSWORDS: &[&str] = &[
    "password", "password1", "password123", "12345678", "123456789", "1234567890", "qwerty123", "qwertyuiop",
    "iloveyou", "sunshine", "princess", "football", "baseball", "welcome1", "letmein1", "admin123", "abc12345",
    "trustno1", "passw0rd", "superman",
];

pub fn max_length(value: &str, max: usize) -> Result<(), String> {
    if value.chars().count() > max {
        Err(format!("Ensure this field has no more than {} characters.", max))
    } else {
        Ok(())
    }
}

/// Trims `raw` and checks its length against `min..=max`.
pub fn trimmed_length(raw: &str, min: usize, max: usize, label: &str) -> Result<String, String> {
    let value = raw.trim();
    let len = value.chars().count();
    if len < min {
        return Err(format!("{} must be at least {} characters long.", label, min));
    }
    if len > max {
        return Err(format!("{} must not exceed {} characters.", label, max));
    }
    Ok(value.to_string())
}

pub fn username(raw: &str) -> Result<String, String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(BLANK.to_string());
    }
    max_length(value, 150)?;
    if !value.chars().all(|c| c.is_alphanumeric() || c == '_') || value.chars().all(|c| c == '_') {
        return Err("Username can only contain letters, numbers, and underscores.".to_string());
    }
    Ok(value.to_lowercase())
}

pub fn email(raw: &str) -> Result<String, String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(BLANK.to_string());
    }
    let invalid = || "Enter a valid email address.".to_string();
    let (local, domain) = value.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.contains('@')
        || value.chars().any(char::is_whitespace)
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
    {
        return Err(invalid());
    }
    Ok(value.to_lowercase())
}

/// Every rule the password breaks, empty when it is acceptable.
pub fn password(password: &str, username: &str) -> Vec<String> {
    let mut problems = Vec::new();
    if !username.is_empty() && password.eq_ignore_ascii_case(username) {
        problems.push("The password is too similar to the username.".to_string());
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        problems.push(format!(
            "This password is too short. It must contain at least {} characters.",
            MIN_PASSWORD_LENGTH
        ));
    }
    if COMMON_PASSWORDS.contains(&password.to_lowercase().as_str()) {
        problems.push("This password is too common.".to_string());
    }
    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        problems.push("This password is entirely numeric.".to_string());
    }
    problems
}

/// Optional leading `+`, optional `1`, then 9 to 15 digits. Empty is allowed.
pub fn phone(raw: &str) -> Result<String, String> {
    let value = raw.trim();
    if value.is_empty() {
        return Ok(String::new());
    }
    let digits = value.strip_prefix('+').unwrap_or(value);
    let valid = digits.chars().all(|c| c.is_ascii_digit()) && {
        let len = digits.len();
        (9..=15).contains(&len) || (digits.starts_with('1') && (10..=16).contains(&len))
    };
    if valid {
        Ok(value.to_string())
    } else {
        Err("Phone number must be entered in the format: '+999999999'. Up to 15 digits allowed.".to_string())
    }
}

pub fn website(value: &str) -> Result<(), String> {
    if !value.is_empty() && !(value.starts_with("http://") || value.starts_with("https://")) {
        return Err("Website URL must start with http:// or https://".to_string());
    }
    Ok(())
}

pub fn linkedin(value: &str) -> Result<(), String> {
    url_mentions(value, &["linkedin.com"], "Please provide a valid LinkedIn URL")
}

pub fn github(value: &str) -> Result<(), String> {
    url_mentions(value, &["github.com"], "Please provide a valid GitHub URL")
}

pub fn twitter(value: &str) -> Result<(), String> {
    url_mentions(value, &["twitter.com", "x.com"], "Please provide a valid Twitter/X URL")
}

fn url_mentions(value: &str, hosts: &[&str], message: &str) -> Result<(), String> {
    let lower = value.to_lowercase();
    if !value.is_empty() && !hosts.iter().any(|host| lower.contains(host)) {
        return Err(message.to_string());
    }
    Ok(())
}

/// Query string booleans: `true`, `1` and `yes` are truthy, anything else is not.
pub fn flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
}
