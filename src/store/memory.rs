// src/store/memory.rs

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;

use super::{Store, StoreError, StoreResult};
use crate::models::{
    ActivityLog, BlacklistedToken, MemberRole, NewActivity, NewComment, NewNotification, NewProject, NewTask,
    NewTeam, NewUser, Notification, Project, ProjectMember, ProjectStatus, Task, TaskComment, Team, TeamMember,
    User, UserProfile,
};

#[derive(Default)]
struct State {
    next_id: i64,
    users: Vec<User>,
    profiles: HashMap<i64, UserProfile>,
    blacklist: HashMap<String, BlacklistedToken>,
    teams: Vec<Team>,
    team_members: Vec<TeamMember>,
    projects: Vec<Project>,
    project_members: Vec<ProjectMember>,
    tasks: Vec<Task>,
    comments: Vec<TaskComment>,
    notifications: Vec<Notification>,
    activity: Vec<ActivityLog>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn remove_tasks_where(&mut self, keep: impl Fn(&Task) -> bool) {
        let removed: Vec<i64> = self.tasks.iter().filter(|t| !keep(t)).map(|t| t.id).collect();
        self.tasks.retain(|t| keep(t));
        self.comments.retain(|c| !removed.contains(&c.task_id));
    }

    fn remove_projects_where(&mut self, keep: impl Fn(&Project) -> bool) {
        let removed: Vec<i64> = self.projects.iter().filter(|p| !keep(p)).map(|p| p.id).collect();
        self.projects.retain(|p| keep(p));
        self.project_members.retain(|m| !removed.contains(&m.project_id));
        self.remove_tasks_where(|t| !removed.contains(&t.project_id));
    }
}

/// Store kept entirely in process memory. Used by tests and local runs
/// without a database.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Overwrites a notification's creation time, for exercising retention rules.
    pub fn backdate_notification(&self, id: i64, created_at: DateTime<Utc>) {
        if let Some(n) = self.state().notifications.iter_mut().find(|n| n.id == id) {
            n.created_at = created_at;
        }
    }

    /// Overwrites a project's last update time, for exercising archival rules.
    pub fn backdate_project(&self, id: i64, updated_at: DateTime<Utc>) {
        if let Some(p) = self.state().projects.iter_mut().find(|p| p.id == id) {
            p.updated_at = updated_at;
        }
    }

    /// Overwrites a task's timestamps, for exercising report windows.
    pub fn backdate_task(&self, id: i64, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) {
        if let Some(t) = self.state().tasks.iter_mut().find(|t| t.id == id) {
            t.created_at = created_at;
            t.updated_at = updated_at;
        }
    }
}

fn replace<T: Clone>(rows: &mut [T], matches: impl Fn(&T) -> bool, value: &T) -> StoreResult<T> {
    match rows.iter_mut().find(|row| matches(row)) {
        Some(row) => {
            *row = value.clone();
            Ok(value.clone())
        }
        None => Err(StoreError::NotFound),
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut state = self.state();
        if state.users.iter().any(|u| u.username.eq_ignore_ascii_case(&user.username)) {
            return Err(StoreError::Conflict("A user with that username already exists.".into()));
        }
        if state.users.iter().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(StoreError::Conflict("A user with that email already exists.".into()));
        }
        let now = Utc::now();
        let created = User {
            id: state.next_id(),
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
        };
        state.users.push(created.clone());
        Ok(created)
    }

    async fn user_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(self.state().users.iter().find(|u| u.id == id).cloned())
    }

    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self.state().users.iter().find(|u| u.username.eq_ignore_ascii_case(username)).cloned())
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.state().users.iter().find(|u| u.email.eq_ignore_ascii_case(email)).cloned())
    }

    async fn users_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<User>> {
        Ok(self.state().users.iter().filter(|u| ids.contains(&u.id)).cloned().collect())
    }

    async fn active_users(&self) -> StoreResult<Vec<User>> {
        Ok(self.state().users.iter().filter(|u| u.is_active).cloned().collect())
    }

    async fn update_user(&self, user: &User) -> StoreResult<User> {
        replace(&mut self.state().users, |u| u.id == user.id, user)
    }

    async fn profile(&self, user_id: i64) -> StoreResult<Option<UserProfile>> {
        Ok(self.state().profiles.get(&user_id).cloned())
    }

    async fn save_profile(&self, profile: &UserProfile) -> StoreResult<UserProfile> {
        self.state().profiles.insert(profile.user_id, profile.clone());
        Ok(profile.clone())
    }

    async fn blacklist_token(&self, token: BlacklistedToken) -> StoreResult<()> {
        self.state().blacklist.entry(token.jti.clone()).or_insert(token);
        Ok(())
    }

    async fn is_token_blacklisted(&self, jti: &str) -> StoreResult<bool> {
        Ok(self.state().blacklist.contains_key(jti))
    }

    async fn create_team(&self, team: NewTeam, owner_id: i64) -> StoreResult<Team> {
        let mut state = self.state();
        let now = Utc::now();
        let created = Team {
            id: state.next_id(),
            name: team.name,
            description: team.description,
            created_at: now,
            updated_at: now,
        };
        let member = TeamMember {
            id: state.next_id(),
            team_id: created.id,
            user_id: owner_id,
            role: MemberRole::Owner,
            joined_at: now,
        };
        state.teams.push(created.clone());
        state.team_members.push(member);
        Ok(created)
    }

    async fn team_by_id(&self, id: i64) -> StoreResult<Option<Team>> {
        Ok(self.state().teams.iter().find(|t| t.id == id).cloned())
    }

    async fn teams_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<Team>> {
        Ok(self.state().teams.iter().filter(|t| ids.contains(&t.id)).cloned().collect())
    }

    async fn team_name_taken(&self, name: &str, exclude: Option<i64>) -> StoreResult<bool> {
        let name = name.to_lowercase();
        Ok(self
            .state()
            .teams
            .iter()
            .any(|t| t.name.to_lowercase() == name && Some(t.id) != exclude))
    }

    async fn teams_for_user(&self, user_id: i64) -> StoreResult<Vec<Team>> {
        let state = self.state();
        let ids: Vec<i64> = state
            .team_members
            .iter()
            .filter(|m| m.user_id == user_id)
            .map(|m| m.team_id)
            .collect();
        Ok(state.teams.iter().filter(|t| ids.contains(&t.id)).cloned().collect())
    }

    async fn update_team(&self, team: &Team) -> StoreResult<Team> {
        replace(&mut self.state().teams, |t| t.id == team.id, team)
    }

    async fn delete_team(&self, id: i64) -> StoreResult<()> {
        let mut state = self.state();
        state.teams.retain(|t| t.id != id);
        state.team_members.retain(|m| m.team_id != id);
        state.remove_projects_where(|p| p.team_id != id);
        Ok(())
    }

    async fn team_members(&self, team_id: i64) -> StoreResult<Vec<TeamMember>> {
        Ok(self.state().team_members.iter().filter(|m| m.team_id == team_id).cloned().collect())
    }

    async fn team_member(&self, team_id: i64, user_id: i64) -> StoreResult<Option<TeamMember>> {
        Ok(self
            .state()
            .team_members
            .iter()
            .find(|m| m.team_id == team_id && m.user_id == user_id)
            .cloned())
    }

    async fn add_team_member(&self, team_id: i64, user_id: i64, role: MemberRole) -> StoreResult<TeamMember> {
        let mut state = self.state();
        if state.team_members.iter().any(|m| m.team_id == team_id && m.user_id == user_id) {
            return Err(StoreError::Conflict("User is already a member of this team".into()));
        }
        let member = TeamMember {
            id: state.next_id(),
            team_id,
            user_id,
            role,
            joined_at: Utc::now(),
        };
        state.team_members.push(member.clone());
        Ok(member)
    }

    async fn set_team_member_role(&self, team_id: i64, user_id: i64, role: MemberRole) -> StoreResult<TeamMember> {
        let mut state = self.state();
        let member = state
            .team_members
            .iter_mut()
            .find(|m| m.team_id == team_id && m.user_id == user_id)
            .ok_or(StoreError::NotFound)?;
        member.role = role;
        Ok(member.clone())
    }

    async fn remove_team_member(&self, team_id: i64, user_id: i64) -> StoreResult<()> {
        self.state()
            .team_members
            .retain(|m| !(m.team_id == team_id && m.user_id == user_id));
        Ok(())
    }

    async fn create_project(&self, project: NewProject, owner_id: i64) -> StoreResult<Project> {
        let mut state = self.state();
        let now = Utc::now();
        let created = Project {
            id: state.next_id(),
            name: project.name,
            description: project.description,
            status: project.status,
            priority: project.priority,
            deadline: project.deadline,
            team_id: project.team_id,
            created_at: now,
            updated_at: now,
        };
        let member = ProjectMember {
            id: state.next_id(),
            project_id: created.id,
            user_id: owner_id,
            role: MemberRole::Owner,
            joined_at: now,
        };
        state.projects.push(created.clone());
        state.project_members.push(member);
        Ok(created)
    }

    async fn project_by_id(&self, id: i64) -> StoreResult<Option<Project>> {
        Ok(self.state().projects.iter().find(|p| p.id == id).cloned())
    }

    async fn projects_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<Project>> {
        Ok(self.state().projects.iter().filter(|p| ids.contains(&p.id)).cloned().collect())
    }

    async fn project_name_taken(&self, team_id: i64, name: &str, exclude: Option<i64>) -> StoreResult<bool> {
        let name = name.to_lowercase();
        Ok(self
            .state()
            .projects
            .iter()
            .any(|p| p.team_id == team_id && p.name.to_lowercase() == name && Some(p.id) != exclude))
    }

    async fn projects_for_user(&self, user_id: i64) -> StoreResult<Vec<Project>> {
        let state = self.state();
        let ids: Vec<i64> = state
            .project_members
            .iter()
            .filter(|m| m.user_id == user_id)
            .map(|m| m.project_id)
            .collect();
        Ok(state.projects.iter().filter(|p| ids.contains(&p.id)).cloned().collect())
    }

    async fn completed_projects_updated_before(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<Project>> {
        Ok(self
            .state()
            .projects
            .iter()
            .filter(|p| p.status == ProjectStatus::Completed && p.updated_at < cutoff)
            .cloned()
            .collect())
    }

    async fn update_project(&self, project: &Project) -> StoreResult<Project> {
        replace(&mut self.state().projects, |p| p.id == project.id, project)
    }

    async fn delete_project(&self, id: i64) -> StoreResult<()> {
        self.state().remove_projects_where(|p| p.id != id);
        Ok(())
    }

    async fn project_members(&self, project_id: i64) -> StoreResult<Vec<ProjectMember>> {
        Ok(self
            .state()
            .project_members
            .iter()
            .filter(|m| m.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn project_member(&self, project_id: i64, user_id: i64) -> StoreResult<Option<ProjectMember>> {
        Ok(self
            .state()
            .project_members
            .iter()
            .find(|m| m.project_id == project_id && m.user_id == user_id)
            .cloned())
    }

    async fn add_project_member(
        &self,
        project_id: i64,
        user_id: i64,
        role: MemberRole,
    ) -> StoreResult<ProjectMember> {
        let mut state = self.state();
        if state
            .project_members
            .iter()
            .any(|m| m.project_id == project_id && m.user_id == user_id)
        {
            return Err(StoreError::Conflict("User is already a member of this project".into()));
        }
        let member = ProjectMember {
            id: state.next_id(),
            project_id,
            user_id,
            role,
            joined_at: Utc::now(),
        };
        state.project_members.push(member.clone());
        Ok(member)
    }

    async fn set_project_member_role(
        &self,
        project_id: i64,
        user_id: i64,
        role: MemberRole,
    ) -> StoreResult<ProjectMember> {
        let mut state = self.state();
        let member = state
            .project_members
            .iter_mut()
            .find(|m| m.project_id == project_id && m.user_id == user_id)
            .ok_or(StoreError::NotFound)?;
        member.role = role;
        Ok(member.clone())
    }

    async fn remove_project_member(&self, project_id: i64, user_id: i64) -> StoreResult<()> {
        self.state()
            .project_members
            .retain(|m| !(m.project_id == project_id && m.user_id == user_id));
        Ok(())
    }

    async fn create_task(&self, task: NewTask) -> StoreResult<Task> {
        let mut state = self.state();
        let now = Utc::now();
        let created = Task {
            id: state.next_id(),
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
        };
        state.tasks.push(created.clone());
        Ok(created)
    }

    async fn task_by_id(&self, id: i64) -> StoreResult<Option<Task>> {
        Ok(self.state().tasks.iter().find(|t| t.id == id).cloned())
    }

    async fn tasks_visible_to(&self, user_id: i64) -> StoreResult<Vec<Task>> {
        let state = self.state();
        let projects: Vec<i64> = state
            .project_members
            .iter()
            .filter(|m| m.user_id == user_id)
            .map(|m| m.project_id)
            .collect();
        Ok(state
            .tasks
            .iter()
            .filter(|t| projects.contains(&t.project_id) || t.is_assigned_to(user_id) || t.is_created_by(user_id))
            .cloned()
            .collect())
    }

    async fn tasks_in_project(&self, project_id: i64) -> StoreResult<Vec<Task>> {
        Ok(self.state().tasks.iter().filter(|t| t.project_id == project_id).cloned().collect())
    }

    async fn tasks_involving(&self, user_id: i64) -> StoreResult<Vec<Task>> {
        Ok(self
            .state()
            .tasks
            .iter()
            .filter(|t| t.is_assigned_to(user_id) || t.is_created_by(user_id))
            .cloned()
            .collect())
    }

    async fn update_task(&self, task: &Task) -> StoreResult<Task> {
        replace(&mut self.state().tasks, |t| t.id == task.id, task)
    }

    async fn delete_task(&self, id: i64) -> StoreResult<()> {
        self.state().remove_tasks_where(|t| t.id != id);
        Ok(())
    }

    async fn comment_counts(&self, task_ids: &[i64]) -> StoreResult<HashMap<i64, i64>> {
        let mut counts = HashMap::new();
        for comment in self.state().comments.iter().filter(|c| task_ids.contains(&c.task_id)) {
            *counts.entry(comment.task_id).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn create_comment(&self, comment: NewComment) -> StoreResult<TaskComment> {
        let mut state = self.state();
        let now = Utc::now();
        let created = TaskComment {
            id: state.next_id(),
            task_id: comment.task_id,
            author_id: comment.author_id,
            content: comment.content,
            created_at: now,
            updated_at: now,
        };
        state.comments.push(created.clone());
        Ok(created)
    }

    async fn comment_by_id(&self, id: i64) -> StoreResult<Option<TaskComment>> {
        Ok(self.state().comments.iter().find(|c| c.id == id).cloned())
    }

    async fn comments_for_task(&self, task_id: i64) -> StoreResult<Vec<TaskComment>> {
        Ok(self.state().comments.iter().filter(|c| c.task_id == task_id).cloned().collect())
    }

    async fn update_comment(&self, comment: &TaskComment) -> StoreResult<TaskComment> {
        replace(&mut self.state().comments, |c| c.id == comment.id, comment)
    }

    async fn delete_comment(&self, id: i64) -> StoreResult<()> {
        self.state().comments.retain(|c| c.id != id);
        Ok(())
    }

    async fn create_notification(&self, notification: NewNotification) -> StoreResult<Notification> {
        let mut state = self.state();
        let created = Notification {
            id: state.next_id(),
            user_id: notification.user_id,
            message: notification.message,
            kind: notification.kind,
            read: false,
            read_at: None,
            related_object_type: notification.related.as_ref().map(|r| r.object_type.to_string()),
            related_object_id: notification.related.as_ref().map(|r| r.object_id),
            metadata: notification.metadata,
            created_at: Utc::now(),
        };
        state.notifications.push(created.clone());
        Ok(created)
    }

    async fn notification_by_id(&self, id: i64) -> StoreResult<Option<Notification>> {
        Ok(self.state().notifications.iter().find(|n| n.id == id).cloned())
    }

    async fn notifications_for_user(&self, user_id: i64) -> StoreResult<Vec<Notification>> {
        Ok(self
            .state()
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn mark_notification_read(&self, id: i64, at: DateTime<Utc>) -> StoreResult<()> {
        let mut state = self.state();
        let notification = state
            .notifications
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or(StoreError::NotFound)?;
        if !notification.read {
            notification.read = true;
            notification.read_at = Some(at);
        }
        Ok(())
    }

    async fn mark_all_notifications_read(&self, user_id: i64, at: DateTime<Utc>) -> StoreResult<u64> {
        let mut marked = 0;
        for n in self
            .state()
            .notifications
            .iter_mut()
            .filter(|n| n.user_id == user_id && !n.read)
        {
            n.read = true;
            n.read_at = Some(at);
            marked += 1;
        }
        Ok(marked)
    }

    async fn delete_read_notifications_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let mut state = self.state();
        let before = state.notifications.len();
        state.notifications.retain(|n| !(n.read && n.created_at < cutoff));
        Ok((before - state.notifications.len()) as u64)
    }

    async fn record_activity(&self, activity: NewActivity) -> StoreResult<ActivityLog> {
        let mut state = self.state();
        let metadata = if activity.metadata.is_null() { json!({}) } else { activity.metadata };
        let created = ActivityLog {
            id: state.next_id(),
            user_id: activity.user_id,
            action: activity.action,
            object_type: activity.object.as_ref().map(|o| o.object_type.to_string()),
            object_id: activity.object.as_ref().map(|o| o.object_id),
            metadata,
            ip_address: activity.ip_address,
            user_agent: activity.user_agent,
            timestamp: Utc::now(),
        };
        state.activity.push(created.clone());
        Ok(created)
    }

    async fn activity_for_user_since(
        &self,
        user_id: i64,
        since: DateTime<Utc>,
        limit: i64,
    ) -> StoreResult<Vec<ActivityLog>> {
        let mut rows: Vec<ActivityLog> = self
            .state()
            .activity
            .iter()
            .filter(|a| a.user_id == Some(user_id) && a.timestamp >= since)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }
}
