use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::ActivityLog;

// structs
#[derive(Debug, Clone, Serialize)]
pub struct ActivityView {
    pub id: i64,
    pub action: String,
    pub action_display: String,
    pub object_type: Option<String>,
    pub object_id: Option<i64>,
    pub metadata: Value,
    pub ip_address: Option<String>,
    pub user_agent: String,
    pub timestamp: DateTime<Utc>,
}

impl From<ActivityLog> for ActivityView {
    fn from(log: ActivityLog) -> Self {
        ActivityView {
            id: log.id,
            action: log.action.as_str().to_string(),
            action_display: log.action.label().to_string(),
            object_type: log.object_type,
            object_id: log.object_id,
            metadata: log.metadata,
            ip_address: log.ip_address,
            user_agent: log.user_agent,
            timestamp: log.timestamp,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ActivityResponse {
    pub hours: i64,
    pub count: usize,
    pub results: Vec<ActivityView>,
}

// json format

#[derive(Debug, Default, Deserialize)]
pub struct ActivityQuery {
    pub hours: Option<String>,
    pub limit: Option<String>,
}
