use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TaskComment {
    pub id: i64,
    pub task_id: i64,
    pub author_id: Option<i64>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskComment {
    pub fn is_edited(&self) -> bool {
        self.updated_at > self.created_at
    }
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub task_id: i64,
    pub author_id: Option<i64>,
    pub content: String,
}
