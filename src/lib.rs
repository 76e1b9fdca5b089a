// src/lib.rs

use actix_web::web;

pub mod auth;
pub mod config;
pub mod error;
pub mod jobs;
pub mod mailer;
pub mod models;
pub mod pagination;
pub mod permissions;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
pub mod validation;

pub use config::Config;
pub use state::AppState;

/// Registers every route plus the JSON body error handler.
/// `AppState` is expected as `web::Data` on the app.
pub fn configure_app(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(error::json_error_handler))
        .configure(routes::routes::auth_configure)
        .configure(routes::routes::token_configure)
        .configure(routes::routes::teams_configure)
        .configure(routes::routes::projects_configure)
        .configure(routes::routes::tasks_configure)
        .configure(routes::routes::notifications_configure)
        .configure(routes::routes::activity_configure)
        .configure(routes::routes::health_configure);
}
