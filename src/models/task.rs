use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::Priority;

string_enum! {
    pub enum TaskStatus {
        Todo => ("todo", "To Do"),
        InProgress => ("in_progress", "In Progress"),
        Done => ("done", "Done"),
        Blocked => ("blocked", "Blocked"),
    }
}

impl TaskStatus {
    /// Statuses that still count towards overdue and reminder totals.
    pub fn is_open(&self) -> bool {
        !matches!(self, TaskStatus::Done)
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Todo
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: String,
    #[sqlx(try_from = "String")]
    pub status: TaskStatus,
    #[sqlx(try_from = "String")]
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    pub project_id: i64,
    pub assignee_id: Option<i64>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn is_overdue_at(&self, now: DateTime<Utc>) -> bool {
        match self.due_date {
            Some(due) => self.status.is_open() && now > due,
            None => false,
        }
    }

    pub fn is_assigned_to(&self, user_id: i64) -> bool {
        self.assignee_id == Some(user_id)
    }

    pub fn is_created_by(&self, user_id: i64) -> bool {
        self.created_by == Some(user_id)
    }
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    pub project_id: i64,
    pub assignee_id: Option<i64>,
    pub created_by: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn done_tasks_are_never_overdue() {
        let now = Utc::now();
        let mut task = Task {
            id: 7,
            title: "Write docs".into(),
            description: String::new(),
            status: TaskStatus::InProgress,
            priority: Priority::Low,
            due_date: Some(now - Duration::hours(2)),
            project_id: 1,
            assignee_id: Some(3),
            created_by: Some(2),
            created_at: now,
            updated_at: now,
        };
        assert!(task.is_overdue_at(now));
        task.status = TaskStatus::Done;
        assert!(!task.is_overdue_at(now));
        assert!(task.is_assigned_to(3));
        assert!(task.is_created_by(2));
    }
}
