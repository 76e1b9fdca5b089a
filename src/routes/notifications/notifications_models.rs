use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::Notification;

// structs
#[derive(Debug, Clone, Serialize)]
pub struct NotificationView {
    pub id: i64,
    pub user: i64,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub type_display: String,
    pub read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub related_object_type: Option<String>,
    pub related_object_id: Option<i64>,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
    pub age_in_hours: i64,
    pub age_in_days: i64,
    pub is_recent: bool,
    pub icon: String,
}

impl NotificationView {
    pub fn new(notification: Notification, now: DateTime<Utc>) -> Self {
        let age_in_hours = notification.age_in_hours(now);
        let is_recent = notification.is_recent(now);
        NotificationView {
            id: notification.id,
            user: notification.user_id,
            kind: notification.kind.as_str().to_string(),
            type_display: notification.kind.label().to_string(),
            icon: notification.kind.icon().to_string(),
            message: notification.message,
            read: notification.read,
            read_at: notification.read_at,
            related_object_type: notification.related_object_type,
            related_object_id: notification.related_object_id,
            metadata: notification.metadata.unwrap_or_else(|| Value::Object(Default::default())),
            age_in_days: (now - notification.created_at).num_days(),
            created_at: notification.created_at,
            age_in_hours,
            is_recent,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MarkAllReadResponse {
    pub message: String,
    pub marked_count: u64,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub unread_count: usize,
    pub total_count: usize,
}

// json format

#[derive(Debug, Default, Deserialize)]
pub struct NotificationListQuery {
    pub read: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub search: Option<String>,
    pub ordering: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
}
