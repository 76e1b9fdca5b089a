// src/services/notifier.rs
//
// In-app notifications raised after mutations. Delivery failures are logged
// and never roll back the change that triggered them.

use log::{error, info};
use serde_json::{json, Value};

use crate::models::{
    MemberRole, NewNotification, NotificationKind, ObjectRef, Project, Task, TaskComment, TaskStatus, Team, User,
};
use crate::services::activity::Changes;
use crate::state::AppState;

const MAX_MESSAGE_CHARS: usize = 500;
const PREVIEW_CHARS: usize = 100;

pub async fn notify(
    state: &AppState,
    user_id: i64,
    kind: NotificationKind,
    message: &str,
    related: Option<ObjectRef>,
    metadata: Value,
) {
    let notification = NewNotification {
        user_id,
        message: message.chars().take(MAX_MESSAGE_CHARS).collect(),
        kind,
        related,
        metadata: Some(metadata),
    };
    if let Err(e) = state.store.create_notification(notification).await {
        error!("Failed to create {} notification for user {}: {}", kind, user_id, e);
    }
}

pub async fn notify_many(
    state: &AppState,
    user_ids: &[i64],
    kind: NotificationKind,
    message: &str,
    related: Option<ObjectRef>,
    metadata: Value,
) {
    for user_id in user_ids {
        notify(state, *user_id, kind, message, related.clone(), metadata.clone()).await;
    }
    if !user_ids.is_empty() {
        info!("Queued {} {} notifications", user_ids.len(), kind);
    }
}

fn preview(content: &str) -> String {
    if content.chars().count() > PREVIEW_CHARS {
        format!("{}...", content.chars().take(PREVIEW_CHARS).collect::<String>())
    } else {
        content.to_string()
    }
}

async fn project_member_ids(state: &AppState, project_id: i64) -> Vec<i64> {
    match state.store.project_members(project_id).await {
        Ok(members) => members.into_iter().map(|m| m.user_id).collect(),
        Err(e) => {
            error!("Failed to load members of project {}: {}", project_id, e);
            Vec::new()
        }
    }
}

pub async fn welcome(state: &AppState, user: &User) {
    let message = format!(
        "Welcome to {}, {}! Create a team or join a project to get started.",
        state.config.mail.site_name,
        user.full_name()
    );
    notify(
        state,
        user.id,
        NotificationKind::Welcome,
        &message,
        Some(ObjectRef::user(user.id)),
        json!({ "username": user.username }),
    )
    .await;
}

pub async fn task_created(state: &AppState, task: &Task, project: &Project, actor: &User) {
    if let Some(assignee_id) = task.assignee_id {
        let message = format!("New task assigned to you: {} in project {}", task.title, project.name);
        notify(
            state,
            assignee_id,
            NotificationKind::TaskAssigned,
            &message,
            Some(ObjectRef::task(task.id)),
            json!({
                "task_title": task.title,
                "project_id": project.id,
                "project_name": project.name,
                "created_by_id": actor.id,
            }),
        )
        .await;
    }
}

/// Fans a task edit out to the assignee and, on completion, the project.
pub async fn task_updated(state: &AppState, before: &Task, after: &Task, project: &Project, actor: &User, changes: &Changes) {
    let related = Some(ObjectRef::task(after.id));

    if changes.contains("assignee") {
        if let Some(assignee_id) = after.assignee_id {
            let message = format!("Task assigned to you: {} in project {}", after.title, project.name);
            notify(
                state,
                assignee_id,
                NotificationKind::TaskAssigned,
                &message,
                related.clone(),
                json!({
                    "task_title": after.title,
                    "project_id": project.id,
                    "project_name": project.name,
                    "assigned_by_id": actor.id,
                }),
            )
            .await;
        }
    }

    if changes.contains("status") {
        let old_status = before.status.as_str();
        let new_status = after.status.as_str();
        if let Some(assignee_id) = after.assignee_id {
            let kind = if after.status == TaskStatus::Done {
                NotificationKind::TaskCompleted
            } else {
                NotificationKind::TaskStatusChanged
            };
            let message = format!("Task status changed: {} ({} → {})", after.title, old_status, new_status);
            notify(
                state,
                assignee_id,
                kind,
                &message,
                related.clone(),
                json!({
                    "task_title": after.title,
                    "old_status": old_status,
                    "new_status": new_status,
                    "project_id": project.id,
                }),
            )
            .await;
        }
        if after.status == TaskStatus::Done {
            let others: Vec<i64> = project_member_ids(state, project.id)
                .await
                .into_iter()
                .filter(|id| Some(*id) != after.assignee_id)
                .collect();
            let message = format!("Task completed: {} in project {}", after.title, project.name);
            notify_many(
                state,
                &others,
                NotificationKind::TaskCompleted,
                &message,
                related.clone(),
                json!({
                    "task_title": after.title,
                    "project_id": project.id,
                    "project_name": project.name,
                    "completed_by_id": after.assignee_id,
                }),
            )
            .await;
        }
    }

    if changes.contains("priority") {
        if let Some(assignee_id) = after.assignee_id {
            let message = format!(
                "Task priority changed: {} ({} → {})",
                after.title,
                before.priority.as_str(),
                after.priority.as_str()
            );
            notify(
                state,
                assignee_id,
                NotificationKind::TaskPriorityChanged,
                &message,
                related.clone(),
                json!({
                    "task_title": after.title,
                    "old_priority": before.priority.as_str(),
                    "new_priority": after.priority.as_str(),
                    "project_id": project.id,
                }),
            )
            .await;
        }
    }

    let specific = ["assignee", "status", "priority"].iter().any(|f| changes.contains(f));
    if !specific && !changes.is_empty() {
        if let Some(assignee_id) = after.assignee_id {
            let message = format!("Task updated: {} in project {}", after.title, project.name);
            notify(
                state,
                assignee_id,
                NotificationKind::TaskUpdated,
                &message,
                related,
                json!({
                    "task_title": after.title,
                    "project_id": project.id,
                    "changes": changes.fields(),
                }),
            )
            .await;
        }
    }
}

pub async fn comment_added(state: &AppState, comment: &TaskComment, task: &Task, project: &Project, author: &User) {
    let related = Some(ObjectRef::task(task.id));
    let preview = preview(&comment.content);
    let assignee_notified = task.assignee_id.filter(|id| *id != author.id);

    if let Some(assignee_id) = assignee_notified {
        let message = format!("New comment on task: {}\n{}", task.title, preview);
        notify(
            state,
            assignee_id,
            NotificationKind::CommentAdded,
            &message,
            related.clone(),
            json!({
                "task_title": task.title,
                "comment_id": comment.id,
                "comment_author_id": author.id,
                "comment_author_username": author.username,
                "project_id": project.id,
            }),
        )
        .await;
    }

    let others: Vec<i64> = project_member_ids(state, project.id)
        .await
        .into_iter()
        .filter(|id| *id != author.id && Some(*id) != assignee_notified)
        .collect();
    let message = format!("New comment on task: {} in project {}\n{}", task.title, project.name, preview);
    notify_many(
        state,
        &others,
        NotificationKind::CommentAdded,
        &message,
        related,
        json!({
            "task_title": task.title,
            "comment_id": comment.id,
            "comment_author_id": author.id,
            "project_id": project.id,
            "project_name": project.name,
        }),
    )
    .await;
}

/// Tells the rest of the team about a new project.
pub async fn project_created(state: &AppState, project: &Project, team: &Team, actor: &User) {
    let team_members = match state.store.team_members(team.id).await {
        Ok(members) => members,
        Err(e) => {
            error!("Failed to load members of team {}: {}", team.id, e);
            return;
        }
    };
    let others: Vec<i64> = team_members
        .into_iter()
        .map(|m| m.user_id)
        .filter(|id| *id != actor.id)
        .collect();
    let message = format!("New project created: {} in team {}", project.name, team.name);
    notify_many(
        state,
        &others,
        NotificationKind::ProjectUpdated,
        &message,
        Some(ObjectRef::project(project.id)),
        json!({
            "project_name": project.name,
            "team_id": team.id,
            "team_name": team.name,
            "created_by_id": actor.id,
        }),
    )
    .await;
}

pub async fn project_updated(state: &AppState, before: &Project, after: &Project, team_name: &str, changes: &Changes) {
    if changes.is_empty() {
        return;
    }
    let members = project_member_ids(state, after.id).await;
    let related = Some(ObjectRef::project(after.id));
    if changes.contains("status") {
        let message = format!(
            "Project status changed: {} ({} → {})",
            after.name,
            before.status.as_str(),
            after.status.as_str()
        );
        notify_many(
            state,
            &members,
            NotificationKind::ProjectStatusChanged,
            &message,
            related,
            json!({
                "project_name": after.name,
                "old_status": before.status.as_str(),
                "new_status": after.status.as_str(),
            }),
        )
        .await;
    } else {
        let message = format!("Project updated: {} in team {}", after.name, team_name);
        notify_many(
            state,
            &members,
            NotificationKind::ProjectUpdated,
            &message,
            related,
            json!({ "project_name": after.name, "changes": changes.fields() }),
        )
        .await;
    }
}

pub async fn project_member_added(state: &AppState, project: &Project, team_name: &str, member: &User, role: MemberRole) {
    let related = Some(ObjectRef::project(project.id));
    let message = format!(
        "You have been added to project: {} in team {} as {}",
        project.name,
        team_name,
        role.label()
    );
    notify(
        state,
        member.id,
        NotificationKind::ProjectMemberAdded,
        &message,
        related.clone(),
        json!({ "project_name": project.name, "role": role.as_str() }),
    )
    .await;

    let others: Vec<i64> = project_member_ids(state, project.id)
        .await
        .into_iter()
        .filter(|id| *id != member.id)
        .collect();
    let message = format!(
        "New member added to project: {}\n{} joined as {}",
        project.name,
        member.full_name(),
        role.label()
    );
    notify_many(
        state,
        &others,
        NotificationKind::ProjectMemberAdded,
        &message,
        related,
        json!({ "project_name": project.name, "member_id": member.id, "role": role.as_str() }),
    )
    .await;
}

pub async fn project_member_removed(state: &AppState, project: &Project, member: &User) {
    let related = Some(ObjectRef::project(project.id));
    let message = format!("You have been removed from project: {}", project.name);
    notify(
        state,
        member.id,
        NotificationKind::ProjectMemberRemoved,
        &message,
        related.clone(),
        json!({ "project_name": project.name }),
    )
    .await;

    let remaining = project_member_ids(state, project.id).await;
    let message = format!("Member removed from project: {}\n{} has been removed", project.name, member.username);
    notify_many(
        state,
        &remaining,
        NotificationKind::ProjectMemberRemoved,
        &message,
        related,
        json!({ "project_name": project.name, "removed_member_id": member.id }),
    )
    .await;
}

pub async fn team_member_added(state: &AppState, team: &Team, member: &User, role: MemberRole) {
    let message = format!("You have been added to team: {} as {}", team.name, role.label());
    notify(
        state,
        member.id,
        NotificationKind::TeamMemberAdded,
        &message,
        Some(ObjectRef::team(team.id)),
        json!({ "team_name": team.name, "role": role.as_str() }),
    )
    .await;
}

pub async fn team_member_removed(state: &AppState, team: &Team, member: &User) {
    let message = format!("You have been removed from team: {}", team.name);
    notify(
        state,
        member.id,
        NotificationKind::TeamMemberRemoved,
        &message,
        Some(ObjectRef::team(team.id)),
        json!({ "team_name": team.name }),
    )
    .await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_comments_are_previewed() {
        let long = "x".repeat(150);
        let p = preview(&long);
        assert_eq!(p.chars().count(), PREVIEW_CHARS + 3);
        assert!(p.ends_with("..."));
        assert_eq!(preview("short"), "short");
    }
}
