use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::jobs::scheduler::SchedulerSnapshot;

// structs
#[derive(Debug, Clone, Serialize)]
pub struct ServiceCheck {
    pub status: &'static str,
    pub response_time_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServiceCheck {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

#[derive(Debug, Serialize)]
pub struct HealthServices {
    pub database: ServiceCheck,
    pub scheduler: SchedulerSnapshot,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub services: HealthServices,
    pub response_time_ms: f64,
}

#[derive(Debug, Serialize)]
pub struct DatabaseInfo {
    pub engine: &'static str,
    #[serde(flatten)]
    pub check: ServiceCheck,
}

#[derive(Debug, Serialize)]
pub struct DatabaseHealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub database: DatabaseInfo,
}
