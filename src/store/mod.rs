// src/store/mod.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{
    ActivityLog, BlacklistedToken, MemberRole, NewActivity, NewComment, NewNotification, NewProject, NewTask,
    NewTeam, NewUser, Notification, Project, ProjectMember, Task, TaskComment, Team, TeamMember, User,
    UserProfile,
};

pub mod memory;
pub mod mysql;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("{0}")]
    Conflict(String),
    #[error("record not found")]
    NotFound,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence seam for every entity the API manages.
///
/// Deleting a team removes its memberships and projects; deleting a project
/// removes its memberships and tasks; deleting a task removes its comments.
/// `update_*` methods write the row as given, callers stamp `updated_at`.
#[async_trait]
pub trait Store: Send + Sync {
    fn backend_name(&self) -> &'static str;
    async fn ping(&self) -> StoreResult<()>;

    // users
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;
    async fn user_by_id(&self, id: i64) -> StoreResult<Option<User>>;
    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>>;
    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn users_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<User>>;
    async fn active_users(&self) -> StoreResult<Vec<User>>;
    async fn update_user(&self, user: &User) -> StoreResult<User>;
    async fn profile(&self, user_id: i64) -> StoreResult<Option<UserProfile>>;
    async fn save_profile(&self, profile: &UserProfile) -> StoreResult<UserProfile>;

    // refresh token blacklist
    async fn blacklist_token(&self, token: BlacklistedToken) -> StoreResult<()>;
    async fn is_token_blacklisted(&self, jti: &str) -> StoreResult<bool>;

    // teams
    async fn create_team(&self, team: NewTeam, owner_id: i64) -> StoreResult<Team>;
    async fn team_by_id(&self, id: i64) -> StoreResult<Option<Team>>;
    async fn teams_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<Team>>;
    async fn team_name_taken(&self, name: &str, exclude: Option<i64>) -> StoreResult<bool>;
    async fn teams_for_user(&self, user_id: i64) -> StoreResult<Vec<Team>>;
    async fn update_team(&self, team: &Team) -> StoreResult<Team>;
    async fn delete_team(&self, id: i64) -> StoreResult<()>;
    async fn team_members(&self, team_id: i64) -> StoreResult<Vec<TeamMember>>;
    async fn team_member(&self, team_id: i64, user_id: i64) -> StoreResult<Option<TeamMember>>;
    async fn add_team_member(&self, team_id: i64, user_id: i64, role: MemberRole) -> StoreResult<TeamMember>;
    async fn set_team_member_role(&self, team_id: i64, user_id: i64, role: MemberRole) -> StoreResult<TeamMember>;
    async fn remove_team_member(&self, team_id: i64, user_id: i64) -> StoreResult<()>;

    // projects
    async fn create_project(&self, project: NewProject, owner_id: i64) -> StoreResult<Project>;
    async fn project_by_id(&self, id: i64) -> StoreResult<Option<Project>>;
    async fn projects_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<Project>>;
    async fn project_name_taken(&self, team_id: i64, name: &str, exclude: Option<i64>) -> StoreResult<bool>;
    async fn projects_for_user(&self, user_id: i64) -> StoreResult<Vec<Project>>;
    async fn completed_projects_updated_before(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<Project>>;
    async fn update_project(&self, project: &Project) -> StoreResult<Project>;
    async fn delete_project(&self, id: i64) -> StoreResult<()>;
    async fn project_members(&self, project_id: i64) -> StoreResult<Vec<ProjectMember>>;
    async fn project_member(&self, project_id: i64, user_id: i64) -> StoreResult<Option<ProjectMember>>;
    async fn add_project_member(&self, project_id: i64, user_id: i64, role: MemberRole)
        -> StoreResult<ProjectMember>;
    async fn set_project_member_role(&self, project_id: i64, user_id: i64, role: MemberRole)
        -> StoreResult<ProjectMember>;
    async fn remove_project_member(&self, project_id: i64, user_id: i64) -> StoreResult<()>;

    // tasks
    async fn create_task(&self, task: NewTask) -> StoreResult<Task>;
    async fn task_by_id(&self, id: i64) -> StoreResult<Option<Task>>;
    /// Tasks in projects the user belongs to, plus tasks assigned to or created by them.
    async fn tasks_visible_to(&self, user_id: i64) -> StoreResult<Vec<Task>>;
    async fn tasks_in_project(&self, project_id: i64) -> StoreResult<Vec<Task>>;
    /// Tasks assigned to or created by the user.
    async fn tasks_involving(&self, user_id: i64) -> StoreResult<Vec<Task>>;
    async fn update_task(&self, task: &Task) -> StoreResult<Task>;
    async fn delete_task(&self, id: i64) -> StoreResult<()>;
    async fn comment_counts(&self, task_ids: &[i64]) -> StoreResult<HashMap<i64, i64>>;

    // comments
    async fn create_comment(&self, comment: NewComment) -> StoreResult<TaskComment>;
    async fn comment_by_id(&self, id: i64) -> StoreResult<Option<TaskComment>>;
    async fn comments_for_task(&self, task_id: i64) -> StoreResult<Vec<TaskComment>>;
    async fn update_comment(&self, comment: &TaskComment) -> StoreResult<TaskComment>;
    async fn delete_comment(&self, id: i64) -> StoreResult<()>;

    // notifications
    async fn create_notification(&self, notification: NewNotification) -> StoreResult<Notification>;
    async fn notification_by_id(&self, id: i64) -> StoreResult<Option<Notification>>;
    async fn notifications_for_user(&self, user_id: i64) -> StoreResult<Vec<Notification>>;
    async fn mark_notification_read(&self, id: i64, at: DateTime<Utc>) -> StoreResult<()>;
    /// Returns how many unread notifications were flipped.
    async fn mark_all_notifications_read(&self, user_id: i64, at: DateTime<Utc>) -> StoreResult<u64>;
    /// Deletes read notifications created before `cutoff`; unread rows are kept.
    async fn delete_read_notifications_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64>;

    // activity log
    async fn record_activity(&self, activity: NewActivity) -> StoreResult<ActivityLog>;
    async fn activity_for_user_since(&self, user_id: i64, since: DateTime<Utc>, limit: i64)
        -> StoreResult<Vec<ActivityLog>>;
}
