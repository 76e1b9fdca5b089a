use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Task, TaskComment, User};
use crate::routes::nullable;

// structs
#[derive(Debug, Clone, Serialize)]
pub struct TaskView {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub status: String,
    pub status_display: String,
    pub priority: String,
    pub priority_display: String,
    pub due_date: Option<DateTime<Utc>>,
    pub project: i64,
    pub project_name: String,
    pub assignee: Option<i64>,
    pub assignee_username: Option<String>,
    pub assignee_email: Option<String>,
    pub assignee_full_name: Option<String>,
    pub created_by: Option<i64>,
    pub created_by_username: Option<String>,
    pub is_overdue: bool,
    pub is_assigned: bool,
    pub comment_count: i64,
    pub attachment_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskView {
    pub fn new(
        task: Task,
        project_name: String,
        assignee: Option<&User>,
        creator: Option<&User>,
        comment_count: i64,
    ) -> Self {
        let is_overdue = task.is_overdue_at(Utc::now());
        TaskView {
            id: task.id,
            title: task.title,
            description: task.description,
            status: task.status.as_str().to_string(),
            status_display: task.status.label().to_string(),
            priority: task.priority.as_str().to_string(),
            priority_display: task.priority.label().to_string(),
            due_date: task.due_date,
            project: task.project_id,
            project_name,
            assignee: task.assignee_id,
            assignee_username: assignee.map(|u| u.username.clone()),
            assignee_email: assignee.map(|u| u.email.clone()),
            assignee_full_name: assignee.map(User::full_name),
            created_by: task.created_by,
            created_by_username: creator.map(|u| u.username.clone()),
            is_overdue,
            is_assigned: task.assignee_id.is_some(),
            comment_count,
            attachment_count: 0,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: i64,
    pub task: i64,
    pub task_title: String,
    pub author: Option<i64>,
    pub author_username: Option<String>,
    pub author_email: Option<String>,
    pub author_full_name: Option<String>,
    pub content: String,
    pub is_edited: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CommentView {
    pub fn new(comment: TaskComment, task_title: &str, author: Option<&User>) -> Self {
        let is_edited = comment.is_edited();
        CommentView {
            id: comment.id,
            task: comment.task_id,
            task_title: task_title.to_string(),
            author: comment.author_id,
            author_username: author.map(|u| u.username.clone()),
            author_email: author.map(|u| u.email.clone()),
            author_full_name: author.map(User::full_name),
            content: comment.content,
            is_edited,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        }
    }
}

// json format

#[derive(Debug, Default, Deserialize)]
pub struct TaskListQuery {
    pub project: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub assignee: Option<String>,
    pub assigned_to_me: Option<String>,
    pub overdue: Option<String>,
    pub search: Option<String>,
    pub ordering: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
}

/// Body of POST, PUT and PATCH on tasks. PUT requires `title` and `project`.
#[derive(Debug, Default, Deserialize)]
pub struct TaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub project: Option<i64>,
    #[serde(default, deserialize_with = "nullable")]
    pub assignee: Option<Option<i64>>,
}

/// `assignee_id: null` (or no field) unassigns.
#[derive(Debug, Default, Deserialize)]
pub struct AssignRequest {
    pub assignee_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusRequest {
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CommentRequest {
    pub content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub page_size: Option<String>,
}
