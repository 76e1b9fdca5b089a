use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

string_enum! {
    pub enum ActivityAction {
        Created => ("created", "Created"),
        Updated => ("updated", "Updated"),
        Deleted => ("deleted", "Deleted"),
        Viewed => ("viewed", "Viewed"),
        Assigned => ("assigned", "Assigned"),
        Unassigned => ("unassigned", "Unassigned"),
        StatusChanged => ("status_changed", "Status Changed"),
        PriorityChanged => ("priority_changed", "Priority Changed"),
        MemberAdded => ("member_added", "Member Added"),
        MemberRemoved => ("member_removed", "Member Removed"),
        CommentAdded => ("comment_added", "Comment Added"),
        AttachmentAdded => ("attachment_added", "Attachment Added"),
        Login => ("login", "Login"),
        Logout => ("logout", "Logout"),
    }
}

/// Points at a row in another table, e.g. `("task", 12)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub object_type: &'static str,
    pub object_id: i64,
}

impl ObjectRef {
    pub fn team(id: i64) -> Self {
        Self { object_type: "team", object_id: id }
    }

    pub fn project(id: i64) -> Self {
        Self { object_type: "project", object_id: id }
    }

    pub fn task(id: i64) -> Self {
        Self { object_type: "task", object_id: id }
    }

    pub fn comment(id: i64) -> Self {
        Self { object_type: "task_comment", object_id: id }
    }

    pub fn user(id: i64) -> Self {
        Self { object_type: "user", object_id: id }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActivityLog {
    pub id: i64,
    pub user_id: Option<i64>,
    #[sqlx(try_from = "String")]
    pub action: ActivityAction,
    pub object_type: Option<String>,
    pub object_id: Option<i64>,
    pub metadata: Value,
    pub ip_address: Option<String>,
    pub user_agent: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewActivity {
    pub user_id: Option<i64>,
    pub action: ActivityAction,
    pub object: Option<ObjectRef>,
    pub metadata: Value,
    pub ip_address: Option<String>,
    pub user_agent: String,
}
