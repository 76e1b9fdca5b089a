// src/config.rs

use std::env;
use std::str::FromStr;

use log::warn;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// HTTP server tuning, applied to `actix_web::HttpServer`.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub workers: usize,
    pub keep_alive_secs: u64,
    pub client_timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_token_minutes: i64,
    pub refresh_token_days: i64,
    pub bcrypt_cost: u32,
}

/// Addresses and names used in outgoing emails.
#[derive(Clone, Debug)]
pub struct MailConfig {
    pub default_from_email: String,
    pub frontend_url: String,
    pub site_name: String,
}

#[derive(Clone, Debug)]
pub struct JobsConfig {
    pub scheduler_enabled: bool,
    pub notification_retention_days: i64,
    pub project_archive_days: i64,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub app_version: String,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub mail: MailConfig,
    pub jobs: JobsConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_default();
        let jwt_secret = if jwt_secret.is_empty() {
            warn!("JWT_SECRET not set -- using an insecure development secret");
            "insecure-development-secret".to_string()
        } else {
            jwt_secret
        };

        Ok(Self {
            database_url,
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", 5)?,
            app_version: env::var("APP_VERSION").unwrap_or_else(|_| "1.0.0".to_string()),
            server: ServerConfig {
                bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
                workers: parse_var("HTTP_WORKERS", default_workers())?,
                keep_alive_secs: parse_var("HTTP_KEEP_ALIVE_SECS", 5)?,
                client_timeout_secs: parse_var("HTTP_CLIENT_TIMEOUT_SECS", 30)?,
            },
            auth: AuthConfig {
                jwt_secret,
                access_token_minutes: parse_var("ACCESS_TOKEN_LIFETIME_MINUTES", 60)?,
                refresh_token_days: parse_var("REFRESH_TOKEN_LIFETIME_DAYS", 7)?,
                bcrypt_cost: parse_var("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            },
            mail: MailConfig {
                default_from_email: env::var("DEFAULT_FROM_EMAIL")
                    .unwrap_or_else(|_| "noreply@taskmanager.com".to_string()),
                frontend_url: env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_string()),
                site_name: env::var("SITE_NAME").unwrap_or_else(|_| "Task Manager".to_string()),
            },
            jobs: JobsConfig {
                scheduler_enabled: parse_var("SCHEDULER_ENABLED", true)?,
                notification_retention_days: parse_var("NOTIFICATION_RETENTION_DAYS", 30)?,
                project_archive_days: parse_var("PROJECT_ARCHIVE_DAYS", 90)?,
            },
        })
    }

    /// Settings for tests and local tooling that never touch the environment.
    pub fn for_tests() -> Self {
        Self {
            database_url: String::new(),
            db_max_connections: 1,
            app_version: "test".to_string(),
            server: ServerConfig {
                bind_address: "127.0.0.1:0".to_string(),
                workers: 1,
                keep_alive_secs: 5,
                client_timeout_secs: 30,
            },
            auth: AuthConfig {
                jwt_secret: "test-secret".to_string(),
                access_token_minutes: 60,
                refresh_token_days: 7,
                bcrypt_cost: 4,
            },
            mail: MailConfig {
                default_from_email: "noreply@taskmanager.com".to_string(),
                frontend_url: "http://localhost:3000".to_string(),
                site_name: "Task Manager".to_string(),
            },
            jobs: JobsConfig {
                scheduler_enabled: false,
                notification_retention_days: 30,
                project_archive_days: 90,
            },
        }
    }
}

// 2 * cpus + 1, capped at 3 like the old process manager setup
fn default_workers() -> usize {
    let cpus = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    (cpus * 2 + 1).min(3)
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => {
            let parsed = value.trim().parse().ok();
            parsed.ok_or(ConfigError::Invalid { name, value })
        }
        _ => Ok(default),
    }
}
