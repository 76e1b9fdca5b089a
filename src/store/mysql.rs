// src/store/mysql.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::info;
use serde_json::json;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::types::Json;
use sqlx::{FromRow, MySql, QueryBuilder};

use super::{Store, StoreError, StoreResult};
use crate::models::{
    ActivityLog, BlacklistedToken, MemberRole, NewActivity, NewComment, NewNotification, NewProject, NewTask,
    NewTeam, NewUser, Notification, Project, ProjectMember, Task, TaskComment, Team, TeamMember, User,
    UserProfile,
};

const USER_COLUMNS: &str = "id, username, email, password_hash, first_name, last_name, role, bio, phone, \
                            is_active, is_staff, created_at, updated_at";
const PROFILE_COLUMNS: &str = "user_id, job_title, department, location, address, city, country, website, \
                               linkedin, github, twitter, timezone, language, email_notifications, \
                               push_notifications, created_at, updated_at";
const TEAM_COLUMNS: &str = "id, name, description, created_at, updated_at";
const MEMBER_COLUMNS: &str = "id, team_id, user_id, role, joined_at";
const PROJECT_COLUMNS: &str = "id, name, description, status, priority, deadline, team_id, created_at, updated_at";
const PROJECT_MEMBER_COLUMNS: &str = "id, project_id, user_id, role, joined_at";
const TASK_COLUMNS: &str = "id, title, description, status, priority, due_date, project_id, assignee_id, \
                            created_by, created_at, updated_at";
const UPDATE_PROJECT_SQL: &str = "UPDATE projects SET name = ?, description = ?, status = ?, priority = ?, \
     deadline = ?, team_id = ?, updated_at = ? WHERE id = ?";
const UPDATE_TASK_SQL: &str = "UPDATE tasks SET title = ?, description = ?, status = ?, priority = ?, due_date = ?, \
     project_id = ?, assignee_id = ?, updated_at = ? WHERE id = ?";
const COMMENT_COLUMNS: &str = "id, task_id, author_id, content, created_at, updated_at";
const NOTIFICATION_COLUMNS: &str = "id, user_id, message, `type`, `read`, read_at, related_object_type, \
                                    related_object_id, metadata, created_at";
const ACTIVITY_COLUMNS: &str = "id, user_id, action, object_type, object_id, metadata, ip_address, user_agent, \
                                `timestamp`";

/// MySQL backed store. Cascading deletes are enforced by foreign keys in the schema.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    async fn fetch_by_ids<T>(&self, select: &str, ids: &[i64]) -> StoreResult<Vec<T>>
    where
        T: for<'r> FromRow<'r, MySqlRow> + Send + Unpin,
    {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut builder = QueryBuilder::<MySql>::new(select);
        builder.push(" WHERE id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");
        Ok(builder.build_query_as::<T>().fetch_all(&self.pool).await?)
    }
}

// Unique key violations surface as conflicts, everything else as database errors.
fn conflict_or(err: sqlx::Error, message: &str) -> StoreError {
    let unique = err
        .as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false);
    if unique {
        StoreError::Conflict(message.to_string())
    } else {
        StoreError::Database(err)
    }
}

#[async_trait]
impl Store for MySqlStore {
    fn backend_name(&self) -> &'static str {
        "mysql"
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO users (username, email, password_hash, first_name, last_name, role, bio, phone, \
             is_active, is_staff, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, TRUE, FALSE, ?, ?)",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.role.as_str())
        .bind(&user.bio)
        .bind(&user.phone)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_or(e, "A user with that username or email already exists."))?;

        Ok(User {
            id: result.last_insert_id() as i64,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
            bio: user.bio,
            phone: user.phone,
            is_active: true,
            is_staff: false,
            created_at: now,
            updated_at: now,
        })
    }

    async fn user_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE LOWER(username) = LOWER(?)", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql).bind(username).fetch_optional(&self.pool).await?)
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE LOWER(email) = LOWER(?)", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql).bind(email).fetch_optional(&self.pool).await?)
    }

    async fn users_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<User>> {
        self.fetch_by_ids(&format!("SELECT {} FROM users", USER_COLUMNS), ids).await
    }

    async fn active_users(&self) -> StoreResult<Vec<User>> {
        let sql = format!("SELECT {} FROM users WHERE is_active = TRUE ORDER BY id", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql).fetch_all(&self.pool).await?)
    }

    async fn update_user(&self, user: &User) -> StoreResult<User> {
        sqlx::query(
            "UPDATE users SET first_name = ?, last_name = ?, role = ?, bio = ?, phone = ?, is_active = ?, \
             updated_at = ? WHERE id = ?",
        )
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.role.as_str())
        .bind(&user.bio)
        .bind(&user.phone)
        .bind(user.is_active)
        .bind(user.updated_at)
        .bind(user.id)
        .execute(&self.pool)
        .await?;
        Ok(user.clone())
    }

    async fn profile(&self, user_id: i64) -> StoreResult<Option<UserProfile>> {
        let sql = format!("SELECT {} FROM user_profiles WHERE user_id = ?", PROFILE_COLUMNS);
        Ok(sqlx::query_as::<_, UserProfile>(&sql).bind(user_id).fetch_optional(&self.pool).await?)
    }

    async fn save_profile(&self, profile: &UserProfile) -> StoreResult<UserProfile> {
        sqlx::query(
            "INSERT INTO user_profiles (user_id, job_title, department, location, address, city, country, \
             website, linkedin, github, twitter, timezone, language, email_notifications, push_notifications, \
             created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON DUPLICATE KEY UPDATE job_title = VALUES(job_title), department = VALUES(department), \
             location = VALUES(location), address = VALUES(address), city = VALUES(city), \
             country = VALUES(country), website = VALUES(website), linkedin = VALUES(linkedin), \
             github = VALUES(github), twitter = VALUES(twitter), timezone = VALUES(timezone), \
             language = VALUES(language), email_notifications = VALUES(email_notifications), \
             push_notifications = VALUES(push_notifications), updated_at = VALUES(updated_at)",
        )
        .bind(profile.user_id)
        .bind(&profile.job_title)
        .bind(&profile.department)
        .bind(&profile.location)
        .bind(&profile.address)
        .bind(&profile.city)
        .bind(&profile.country)
        .bind(&profile.website)
        .bind(&profile.linkedin)
        .bind(&profile.github)
        .bind(&profile.twitter)
        .bind(&profile.timezone)
        .bind(&profile.language)
        .bind(profile.email_notifications)
        .bind(profile.push_notifications)
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(profile.clone())
    }

    async fn blacklist_token(&self, token: BlacklistedToken) -> StoreResult<()> {
        sqlx::query(
            "INSERT IGNORE INTO blacklisted_tokens (jti, user_id, expires_at, blacklisted_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&token.jti)
        .bind(token.user_id)
        .bind(token.expires_at)
        .bind(token.blacklisted_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn is_token_blacklisted(&self, jti: &str) -> StoreResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM blacklisted_tokens WHERE jti = ?")
            .bind(jti)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    async fn create_team(&self, team: NewTeam, owner_id: i64) -> StoreResult<Team> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("INSERT INTO teams (name, description, created_at, updated_at) VALUES (?, ?, ?, ?)")
            .bind(&team.name)
            .bind(&team.description)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| conflict_or(e, "A team with this name already exists."))?;
        let team_id = result.last_insert_id() as i64;

        sqlx::query("INSERT INTO team_members (team_id, user_id, role, joined_at) VALUES (?, ?, ?, ?)")
            .bind(team_id)
            .bind(owner_id)
            .bind(MemberRole::Owner.as_str())
            .bind(now)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(Team {
            id: team_id,
            name: team.name,
            description: team.description,
            created_at: now,
            updated_at: now,
        })
    }

    async fn team_by_id(&self, id: i64) -> StoreResult<Option<Team>> {
        let sql = format!("SELECT {} FROM teams WHERE id = ?", TEAM_COLUMNS);
        Ok(sqlx::query_as::<_, Team>(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn teams_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<Team>> {
        self.fetch_by_ids(&format!("SELECT {} FROM teams", TEAM_COLUMNS), ids).await
    }

    async fn team_name_taken(&self, name: &str, exclude: Option<i64>) -> StoreResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM teams WHERE LOWER(name) = LOWER(?) AND id <> ?")
            .bind(name)
            .bind(exclude.unwrap_or(0))
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    async fn teams_for_user(&self, user_id: i64) -> StoreResult<Vec<Team>> {
        let sql = format!(
            "SELECT {} FROM teams WHERE id IN (SELECT team_id FROM team_members WHERE user_id = ?)",
            TEAM_COLUMNS
        );
        Ok(sqlx::query_as::<_, Team>(&sql).bind(user_id).fetch_all(&self.pool).await?)
    }

    async fn update_team(&self, team: &Team) -> StoreResult<Team> {
        sqlx::query("UPDATE teams SET name = ?, description = ?, updated_at = ? WHERE id = ?")
            .bind(&team.name)
            .bind(&team.description)
            .bind(team.updated_at)
            .bind(team.id)
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_or(e, "A team with this name already exists."))?;
        Ok(team.clone())
    }

    async fn delete_team(&self, id: i64) -> StoreResult<()> {
        sqlx::query("DELETE FROM teams WHERE id = ?").bind(id).execute(&self.pool).await?;
        Ok(())
    }

    async fn team_members(&self, team_id: i64) -> StoreResult<Vec<TeamMember>> {
        let sql = format!("SELECT {} FROM team_members WHERE team_id = ? ORDER BY joined_at, id", MEMBER_COLUMNS);
        Ok(sqlx::query_as::<_, TeamMember>(&sql).bind(team_id).fetch_all(&self.pool).await?)
    }

    async fn team_member(&self, team_id: i64, user_id: i64) -> StoreResult<Option<TeamMember>> {
        let sql = format!("SELECT {} FROM team_members WHERE team_id = ? AND user_id = ?", MEMBER_COLUMNS);
        Ok(sqlx::query_as::<_, TeamMember>(&sql)
            .bind(team_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn add_team_member(&self, team_id: i64, user_id: i64, role: MemberRole) -> StoreResult<TeamMember> {
        let now = Utc::now();
        let result = sqlx::query("INSERT INTO team_members (team_id, user_id, role, joined_at) VALUES (?, ?, ?, ?)")
            .bind(team_id)
            .bind(user_id)
            .bind(role.as_str())
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_or(e, "User is already a member of this team"))?;
        Ok(TeamMember {
            id: result.last_insert_id() as i64,
            team_id,
            user_id,
            role,
            joined_at: now,
        })
    }

    async fn set_team_member_role(&self, team_id: i64, user_id: i64, role: MemberRole) -> StoreResult<TeamMember> {
        sqlx::query("UPDATE team_members SET role = ? WHERE team_id = ? AND user_id = ?")
            .bind(role.as_str())
            .bind(team_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        self.team_member(team_id, user_id).await?.ok_or(StoreError::NotFound)
    }

    async fn remove_team_member(&self, team_id: i64, user_id: i64) -> StoreResult<()> {
        sqlx::query("DELETE FROM team_members WHERE team_id = ? AND user_id = ?")
            .bind(team_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn create_project(&self, project: NewProject, owner_id: i64) -> StoreResult<Project> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            "INSERT INTO projects (name, description, status, priority, deadline, team_id, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&project.name)
        .bind(&project.description)
        .bind(project.status.as_str())
        .bind(project.priority.as_str())
        .bind(project.deadline)
        .bind(project.team_id)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| conflict_or(e, "A project with this name already exists in this team."))?;
        let project_id = result.last_insert_id() as i64;

        sqlx::query("INSERT INTO project_members (project_id, user_id, role, joined_at) VALUES (?, ?, ?, ?)")
            .bind(project_id)
            .bind(owner_id)
            .bind(MemberRole::Owner.as_str())
            .bind(now)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(Project {
            id: project_id,
            name: project.name,
            description: project.description,
            status: project.status,
            priority: project.priority,
            deadline: project.deadline,
            team_id: project.team_id,
            created_at: now,
            updated_at: now,
        })
    }

    async fn project_by_id(&self, id: i64) -> StoreResult<Option<Project>> {
        let sql = format!("SELECT {} FROM projects WHERE id = ?", PROJECT_COLUMNS);
        Ok(sqlx::query_as::<_, Project>(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn projects_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<Project>> {
        self.fetch_by_ids(&format!("SELECT {} FROM projects", PROJECT_COLUMNS), ids).await
    }

    async fn project_name_taken(&self, team_id: i64, name: &str, exclude: Option<i64>) -> StoreResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM projects WHERE team_id = ? AND LOWER(name) = LOWER(?) AND id <> ?",
        )
        .bind(team_id)
        .bind(name)
        .bind(exclude.unwrap_or(0))
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    async fn projects_for_user(&self, user_id: i64) -> StoreResult<Vec<Project>> {
        let sql = format!(
            "SELECT {} FROM projects WHERE id IN (SELECT project_id FROM project_members WHERE user_id = ?)",
            PROJECT_COLUMNS
        );
        Ok(sqlx::query_as::<_, Project>(&sql).bind(user_id).fetch_all(&self.pool).await?)
    }

    async fn completed_projects_updated_before(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<Project>> {
        let sql = format!(
            "SELECT {} FROM projects WHERE status = 'completed' AND updated_at < ?",
            PROJECT_COLUMNS
        );
        Ok(sqlx::query_as::<_, Project>(&sql).bind(cutoff).fetch_all(&self.pool).await?)
    }

    async fn update_project(&self, project: &Project) -> StoreResult<Project> {
        sqlx::query(UPDATE_PROJECT_SQL)
            .bind(&project.name)
            .bind(&project.description)
            .bind(project.status.as_str())
            .bind(project.priority.as_str())
            .bind(project.deadline)
            .bind(project.team_id)
            .bind(project.updated_at)
            .bind(project.id)
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_or(e, "A project with this name already exists in this team."))?;
        Ok(project.clone())
    }

    async fn delete_project(&self, id: i64) -> StoreResult<()> {
        sqlx::query("DELETE FROM projects WHERE id = ?").bind(id).execute(&self.pool).await?;
        Ok(())
    }

    async fn project_members(&self, project_id: i64) -> StoreResult<Vec<ProjectMember>> {
        let sql = format!(
            "SELECT {} FROM project_members WHERE project_id = ? ORDER BY joined_at, id",
            PROJECT_MEMBER_COLUMNS
        );
        Ok(sqlx::query_as::<_, ProjectMember>(&sql).bind(project_id).fetch_all(&self.pool).await?)
    }

    async fn project_member(&self, project_id: i64, user_id: i64) -> StoreResult<Option<ProjectMember>> {
        let sql = format!(
            "SELECT {} FROM project_members WHERE project_id = ? AND user_id = ?",
            PROJECT_MEMBER_COLUMNS
        );
        Ok(sqlx::query_as::<_, ProjectMember>(&sql)
            .bind(project_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn add_project_member(
        &self,
        project_id: i64,
        user_id: i64,
        role: MemberRole,
    ) -> StoreResult<ProjectMember> {
        let now = Utc::now();
        let result =
            sqlx::query("INSERT INTO project_members (project_id, user_id, role, joined_at) VALUES (?, ?, ?, ?)")
                .bind(project_id)
                .bind(user_id)
                .bind(role.as_str())
                .bind(now)
                .execute(&self.pool)
                .await
                .map_err(|e| conflict_or(e, "User is already a member of this project"))?;
        Ok(ProjectMember {
            id: result.last_insert_id() as i64,
            project_id,
            user_id,
            role,
            joined_at: now,
        })
    }

    async fn set_project_member_role(
        &self,
        project_id: i64,
        user_id: i64,
        role: MemberRole,
    ) -> StoreResult<ProjectMember> {
        sqlx::query("UPDATE project_members SET role = ? WHERE project_id = ? AND user_id = ?")
            .bind(role.as_str())
            .bind(project_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        self.project_member(project_id, user_id).await?.ok_or(StoreError::NotFound)
    }

    async fn remove_project_member(&self, project_id: i64, user_id: i64) -> StoreResult<()> {
        sqlx::query("DELETE FROM project_members WHERE project_id = ? AND user_id = ?")
            .bind(project_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn create_task(&self, task: NewTask) -> StoreResult<Task> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO tasks (title, description, status, priority, due_date, project_id, assignee_id, \
             created_by, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(task.priority.as_str())
        .bind(task.due_date)
        .bind(task.project_id)
        .bind(task.assignee_id)
        .bind(task.created_by)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Task {
            id: result.last_insert_id() as i64,
            title: task.title,
            description: task.description,
            status: task.status,
            priority: task.priority,
            due_date: task.due_date,
            project_id: task.project_id,
            assignee_id: task.assignee_id,
            created_by: task.created_by,
            created_at: now,
            updated_at: now,
        })
    }

    async fn task_by_id(&self, id: i64) -> StoreResult<Option<Task>> {
        let sql = format!("SELECT {} FROM tasks WHERE id = ?", TASK_COLUMNS);
        Ok(sqlx::query_as::<_, Task>(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn tasks_visible_to(&self, user_id: i64) -> StoreResult<Vec<Task>> {
        let sql = format!(
            "SELECT {} FROM tasks WHERE project_id IN (SELECT project_id FROM project_members WHERE user_id = ?) \
             OR assignee_id = ? OR created_by = ?",
            TASK_COLUMNS
        );
        Ok(sqlx::query_as::<_, Task>(&sql)
            .bind(user_id)
            .bind(user_id)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn tasks_in_project(&self, project_id: i64) -> StoreResult<Vec<Task>> {
        let sql = format!("SELECT {} FROM tasks WHERE project_id = ?", TASK_COLUMNS);
        Ok(sqlx::query_as::<_, Task>(&sql).bind(project_id).fetch_all(&self.pool).await?)
    }

    async fn tasks_involving(&self, user_id: i64) -> StoreResult<Vec<Task>> {
        let sql = format!("SELECT {} FROM tasks WHERE assignee_id = ? OR created_by = ?", TASK_COLUMNS);
        Ok(sqlx::query_as::<_, Task>(&sql)
            .bind(user_id)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_task(&self, task: &Task) -> StoreResult<Task> {
        sqlx::query(UPDATE_TASK_SQL)
            .bind(&task.title)
            .bind(&task.description)
            .bind(task.status.as_str())
            .bind(task.priority.as_str())
            .bind(task.due_date)
            .bind(task.project_id)
            .bind(task.assignee_id)
            .bind(task.updated_at)
            .bind(task.id)
            .execute(&self.pool)
            .await?;
        Ok(task.clone())
    }

    async fn delete_task(&self, id: i64) -> StoreResult<()> {
        sqlx::query("DELETE FROM tasks WHERE id = ?").bind(id).execute(&self.pool).await?;
        Ok(())
    }

    async fn comment_counts(&self, task_ids: &[i64]) -> StoreResult<HashMap<i64, i64>> {
        if task_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let mut builder = QueryBuilder::<MySql>::new("SELECT task_id, COUNT(*) FROM task_comments WHERE task_id IN (");
        let mut separated = builder.separated(", ");
        for id in task_ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") GROUP BY task_id");
        let rows: Vec<(i64, i64)> = builder.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().collect())
    }

    async fn create_comment(&self, comment: NewComment) -> StoreResult<TaskComment> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO task_comments (task_id, author_id, content, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(comment.task_id)
        .bind(comment.author_id)
        .bind(&comment.content)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(TaskComment {
            id: result.last_insert_id() as i64,
            task_id: comment.task_id,
            author_id: comment.author_id,
            content: comment.content,
            created_at: now,
            updated_at: now,
        })
    }

    async fn comment_by_id(&self, id: i64) -> StoreResult<Option<TaskComment>> {
        let sql = format!("SELECT {} FROM task_comments WHERE id = ?", COMMENT_COLUMNS);
        Ok(sqlx::query_as::<_, TaskComment>(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn comments_for_task(&self, task_id: i64) -> StoreResult<Vec<TaskComment>> {
        let sql = format!(
            "SELECT {} FROM task_comments WHERE task_id = ? ORDER BY created_at DESC, id DESC",
            COMMENT_COLUMNS
        );
        Ok(sqlx::query_as::<_, TaskComment>(&sql).bind(task_id).fetch_all(&self.pool).await?)
    }

    async fn update_comment(&self, comment: &TaskComment) -> StoreResult<TaskComment> {
        sqlx::query("UPDATE task_comments SET content = ?, updated_at = ? WHERE id = ?")
            .bind(&comment.content)
            .bind(comment.updated_at)
            .bind(comment.id)
            .execute(&self.pool)
            .await?;
        Ok(comment.clone())
    }

    async fn delete_comment(&self, id: i64) -> StoreResult<()> {
        sqlx::query("DELETE FROM task_comments WHERE id = ?").bind(id).execute(&self.pool).await?;
        Ok(())
    }

    async fn create_notification(&self, notification: NewNotification) -> StoreResult<Notification> {
        let now = Utc::now();
        let related_type = notification.related.as_ref().map(|r| r.object_type.to_string());
        let related_id = notification.related.as_ref().map(|r| r.object_id);
        let result = sqlx::query(
            "INSERT INTO notifications (user_id, message, `type`, `read`, related_object_type, related_object_id, \
             metadata, created_at) VALUES (?, ?, ?, FALSE, ?, ?, ?, ?)",
        )
        .bind(notification.user_id)
        .bind(&notification.message)
        .bind(notification.kind.as_str())
        .bind(&related_type)
        .bind(related_id)
        .bind(notification.metadata.as_ref().map(Json))
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Notification {
            id: result.last_insert_id() as i64,
            user_id: notification.user_id,
            message: notification.message,
            kind: notification.kind,
            read: false,
            read_at: None,
            related_object_type: related_type,
            related_object_id: related_id,
            metadata: notification.metadata,
            created_at: now,
        })
    }

    async fn notification_by_id(&self, id: i64) -> StoreResult<Option<Notification>> {
        let sql = format!("SELECT {} FROM notifications WHERE id = ?", NOTIFICATION_COLUMNS);
        Ok(sqlx::query_as::<_, Notification>(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn notifications_for_user(&self, user_id: i64) -> StoreResult<Vec<Notification>> {
        let sql = format!("SELECT {} FROM notifications WHERE user_id = ?", NOTIFICATION_COLUMNS);
        Ok(sqlx::query_as::<_, Notification>(&sql).bind(user_id).fetch_all(&self.pool).await?)
    }

    async fn mark_notification_read(&self, id: i64, at: DateTime<Utc>) -> StoreResult<()> {
        sqlx::query("UPDATE notifications SET `read` = TRUE, read_at = ? WHERE id = ? AND `read` = FALSE")
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn mark_all_notifications_read(&self, user_id: i64, at: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query("UPDATE notifications SET `read` = TRUE, read_at = ? WHERE user_id = ? AND `read` = FALSE")
            .bind(at)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_read_notifications_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM notifications WHERE `read` = TRUE AND created_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn record_activity(&self, activity: NewActivity) -> StoreResult<ActivityLog> {
        let now = Utc::now();
        let metadata = if activity.metadata.is_null() { json!({}) } else { activity.metadata };
        let object_type = activity.object.as_ref().map(|o| o.object_type.to_string());
        let object_id = activity.object.as_ref().map(|o| o.object_id);
        let result = sqlx::query(
            "INSERT INTO activity_logs (user_id, action, object_type, object_id, metadata, ip_address, \
             user_agent, `timestamp`) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(activity.user_id)
        .bind(activity.action.as_str())
        .bind(&object_type)
        .bind(object_id)
        .bind(Json(&metadata))
        .bind(&activity.ip_address)
        .bind(&activity.user_agent)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(ActivityLog {
            id: result.last_insert_id() as i64,
            user_id: activity.user_id,
            action: activity.action,
            object_type,
            object_id,
            metadata,
            ip_address: activity.ip_address,
            user_agent: activity.user_agent,
            timestamp: now,
        })
    }

    async fn activity_for_user_since(
        &self,
        user_id: i64,
        since: DateTime<Utc>,
        limit: i64,
    ) -> StoreResult<Vec<ActivityLog>> {
        let sql = format!(
            "SELECT {} FROM activity_logs WHERE user_id = ? AND `timestamp` >= ? \
             ORDER BY `timestamp` DESC, id DESC LIMIT ?",
            ACTIVITY_COLUMNS
        );
        Ok(sqlx::query_as::<_, ActivityLog>(&sql)
            .bind(user_id)
            .bind(since)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placeholders(sql: &str) -> usize {
        sql.matches('?').count()
    }

    #[test]
    fn updates_write_the_parent_key() {
        assert!(UPDATE_TASK_SQL.contains("project_id = ?"));
        assert!(UPDATE_PROJECT_SQL.contains("team_id = ?"));
        // one bind per placeholder in update_task and update_project
        assert_eq!(placeholders(UPDATE_TASK_SQL), 9);
        assert_eq!(placeholders(UPDATE_PROJECT_SQL), 8);
    }
}
