use std::time::Instant;

use actix_web::{http::StatusCode, web, HttpResponse};
use chrono::Utc;
use log::{error, warn};

use super::health_models::{DatabaseHealthResponse, DatabaseInfo, HealthResponse, HealthServices, ServiceCheck};
use crate::state::AppState;

fn elapsed_ms(start: Instant) -> f64 {
    (start.elapsed().as_secs_f64() * 100_000.0).round() / 100.0
}

fn health_label(healthy: bool) -> &'static str {
    if healthy {
        "healthy"
    } else {
        "unhealthy"
    }
}

fn status_code(healthy: bool) -> StatusCode {
    if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn check_database(state: &AppState) -> ServiceCheck {
    let start = Instant::now();
    match state.store.ping().await {
        Ok(()) => ServiceCheck {
            status: "healthy",
            response_time_ms: elapsed_ms(start),
            error: None,
        },
        Err(e) => {
            error!("Database health check failed: {}", e);
            ServiceCheck {
                status: "unhealthy",
                response_time_ms: elapsed_ms(start),
                error: Some(e.to_string()),
            }
        }
    }
}

// Overall health; only the database decides the status code
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    let start = Instant::now();
    let database = check_database(&state).await;
    let healthy = database.is_healthy();
    let response = HealthResponse {
        status: health_label(healthy),
        timestamp: Utc::now(),
        version: state.config.app_version.clone(),
        services: HealthServices {
            database,
            scheduler: state.scheduler.snapshot(Utc::now()),
        },
        response_time_ms: elapsed_ms(start),
    };
    if !healthy {
        warn!("Health check failed");
    }
    HttpResponse::build(status_code(healthy)).json(response)
}

pub async fn database_health(state: web::Data<AppState>) -> HttpResponse {
    let check = check_database(&state).await;
    let healthy = check.is_healthy();
    let response = DatabaseHealthResponse {
        status: health_label(healthy),
        timestamp: Utc::now(),
        database: DatabaseInfo {
            engine: state.store.backend_name(),
            check,
        },
    };
    HttpResponse::build(status_code(healthy)).json(response)
}
