use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

use super::ObjectRef;

string_enum! {
    pub enum NotificationKind {
        TaskAssigned => ("task_assigned", "Task Assigned"),
        TaskCompleted => ("task_completed", "Task Completed"),
        TaskUpdated => ("task_updated", "Task Updated"),
        TaskDueSoon => ("task_due_soon", "Task Due Soon"),
        TaskOverdue => ("task_overdue", "Task Overdue"),
        TaskStatusChanged => ("task_status_changed", "Task Status Changed"),
        TaskPriorityChanged => ("task_priority_changed", "Task Priority Changed"),
        TaskDependencyAdded => ("task_dependency_added", "Task Dependency Added"),
        TaskDependencyCompleted => ("task_dependency_completed", "Task Dependency Completed"),
        ProjectUpdated => ("project_updated", "Project Updated"),
        ProjectMemberAdded => ("project_member_added", "Project Member Added"),
        ProjectMemberRemoved => ("project_member_removed", "Project Member Removed"),
        ProjectStatusChanged => ("project_status_changed", "Project Status Changed"),
        TeamMemberAdded => ("team_member_added", "Team Member Added"),
        TeamMemberRemoved => ("team_member_removed", "Team Member Removed"),
        CommentAdded => ("comment_added", "Comment Added"),
        AttachmentAdded => ("attachment_added", "Attachment Added"),
        Welcome => ("welcome", "Welcome"),
        System => ("system", "System Notification"),
    }
}

impl NotificationKind {
    /// Material icon name used by the frontend.
    pub fn icon(&self) -> &'static str {
        match self {
            NotificationKind::TaskAssigned => "assignment",
            NotificationKind::TaskCompleted => "check_circle",
            NotificationKind::TaskUpdated => "update",
            NotificationKind::TaskDueSoon => "schedule",
            NotificationKind::TaskOverdue => "warning",
            NotificationKind::TaskStatusChanged => "swap_horiz",
            NotificationKind::TaskPriorityChanged => "priority_high",
            NotificationKind::TaskDependencyAdded => "link",
            NotificationKind::TaskDependencyCompleted => "link_off",
            NotificationKind::ProjectUpdated => "folder",
            NotificationKind::ProjectMemberAdded => "person_add",
            NotificationKind::ProjectMemberRemoved => "person_remove",
            NotificationKind::ProjectStatusChanged => "change_circle",
            NotificationKind::TeamMemberAdded => "group_add",
            NotificationKind::TeamMemberRemoved => "group_remove",
            NotificationKind::CommentAdded => "comment",
            NotificationKind::AttachmentAdded => "attach_file",
            NotificationKind::Welcome => "waving_hand",
            NotificationKind::System => "notifications",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub message: String,
    #[sqlx(rename = "type", try_from = "String")]
    pub kind: NotificationKind,
    pub read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub related_object_type: Option<String>,
    pub related_object_id: Option<i64>,
    pub metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn age_in_hours(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_hours()
    }

    pub fn is_recent(&self, now: DateTime<Utc>) -> bool {
        self.age_in_hours(now) < 24
    }
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: i64,
    pub message: String,
    pub kind: NotificationKind,
    pub related: Option<ObjectRef>,
    pub metadata: Option<Value>,
}
