// src/jobs/digest.rs

use chrono::{DateTime, Duration, Utc};
use log::{debug, error, info};
use serde::Serialize;

use super::task_lines;
use crate::config::MailConfig;
use crate::mailer::Email;
use crate::models::{Project, ProjectStatus, Task, TaskStatus, User};
use crate::services::emails;
use crate::state::AppState;
use crate::store::StoreResult;

#[derive(Debug, Serialize)]
pub struct DigestSummary {
    pub status: &'static str,
    pub total_users_notified: usize,
    pub total_tasks_completed: usize,
    pub total_tasks_created: usize,
    pub total_projects_active: usize,
    pub errors: usize,
    pub executed_at: DateTime<Utc>,
}

/// One user's last seven days, built from the tasks they are involved in.
#[derive(Debug, Default)]
pub struct WeeklyStats<'a> {
    pub completed: Vec<&'a Task>,
    pub created: Vec<&'a Task>,
    pub assigned: Vec<&'a Task>,
    pub upcoming: Vec<&'a Task>,
    pub active_projects: Vec<&'a Project>,
}

impl WeeklyStats<'_> {
    pub fn has_activity(&self) -> bool {
        !(self.completed.is_empty()
            && self.created.is_empty()
            && self.assigned.is_empty()
            && self.active_projects.is_empty())
    }
}

fn is_pending(task: &Task) -> bool {
    matches!(task.status, TaskStatus::Todo | TaskStatus::InProgress)
}

pub fn weekly_stats<'a>(
    tasks: &'a [Task],
    projects: &'a [Project],
    user_id: i64,
    now: DateTime<Utc>,
) -> WeeklyStats<'a> {
    let week_ago = now - Duration::days(7);
    let week_ahead = now + Duration::days(7);

    WeeklyStats {
        completed: tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Done && t.updated_at >= week_ago)
            .collect(),
        created: tasks.iter().filter(|t| t.created_at >= week_ago).collect(),
        assigned: tasks
            .iter()
            .filter(|t| t.is_assigned_to(user_id) && is_pending(t))
            .collect(),
        upcoming: tasks
            .iter()
            .filter(|t| t.is_assigned_to(user_id) && is_pending(t))
            .filter(|t| matches!(t.due_date, Some(due) if due >= now && due <= week_ahead))
            .collect(),
        active_projects: projects
            .iter()
            .filter(|p| p.status == ProjectStatus::Active)
            .collect(),
    }
}

pub fn digest_email(mail: &MailConfig, user: &User, stats: &WeeklyStats<'_>) -> Email {
    let projects = stats
        .active_projects
        .iter()
        .take(10)
        .map(|p| format!("  - {} [{}]", p.name, p.priority.label()))
        .collect::<Vec<_>>()
        .join("\n");
    let body = format!(
        "Hi {name},\n\n\
         Your week in {site}:\n\
         Tasks completed: {completed}\n\
         Tasks created: {created}\n\
         Open tasks assigned to you: {assigned}\n\
         Active projects: {active}\n\n\
         Due in the next 7 days:\n{upcoming}\n\n\
         Active projects:\n{projects}\n\n\
         Dashboard: {frontend}/dashboard\n\n\
         {site}",
        name = user.full_name(),
        site = mail.site_name,
        completed = stats.completed.len(),
        created = stats.created.len(),
        assigned = stats.assigned.len(),
        active = stats.active_projects.len(),
        upcoming = task_lines(&stats.upcoming, 10),
        projects = projects,
        frontend = mail.frontend_url,
    );
    Email {
        from: mail.default_from_email.clone(),
        to: user.email.clone(),
        subject: format!("Weekly Digest - {} tasks completed", stats.completed.len()),
        body,
    }
}

async fn load_user_week(state: &AppState, user_id: i64) -> StoreResult<(Vec<Task>, Vec<Project>)> {
    let tasks = state.store.tasks_involving(user_id).await?;
    let projects = state.store.projects_for_user(user_id).await?;
    Ok((tasks, projects))
}

pub async fn send_weekly_digest(state: &AppState) -> StoreResult<DigestSummary> {
    info!("Starting weekly digest task");
    let now = Utc::now();
    let mut summary = DigestSummary {
        status: "success",
        total_users_notified: 0,
        total_tasks_completed: 0,
        total_tasks_created: 0,
        total_projects_active: 0,
        errors: 0,
        executed_at: now,
    };

    for user in state.store.active_users().await? {
        if !emails::should_send(state, &user).await {
            continue;
        }
        let (tasks, projects) = match load_user_week(state, user.id).await {
            Ok(loaded) => loaded,
            Err(e) => {
                error!("Error loading weekly digest data for user {}: {}", user.id, e);
                summary.errors += 1;
                continue;
            }
        };

        let stats = weekly_stats(&tasks, &projects, user.id, now);
        if !stats.has_activity() {
            continue;
        }
        if emails::deliver(state, digest_email(&state.config.mail, &user, &stats)).await.is_err() {
            summary.errors += 1;
            continue;
        }
        summary.total_users_notified += 1;
        summary.total_tasks_completed += stats.completed.len();
        summary.total_tasks_created += stats.created.len();
        summary.total_projects_active += stats.active_projects.len();
        debug!("Weekly digest sent to {}", user.email);
    }

    info!(
        "Weekly digest task completed: {} users notified, {} tasks completed",
        summary.total_users_notified, summary.total_tasks_completed
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap()
    }

    fn task(id: i64, status: TaskStatus, assignee: Option<i64>, created_days_ago: i64) -> Task {
        let created = now() - Duration::days(created_days_ago);
        Task {
            id,
            title: format!("Task {}", id),
            description: String::new(),
            status,
            priority: Priority::Low,
            due_date: None,
            project_id: 1,
            assignee_id: assignee,
            created_by: Some(1),
            created_at: created,
            updated_at: created,
        }
    }

    fn project(status: ProjectStatus) -> Project {
        Project {
            id: 1,
            name: "Apollo".into(),
            description: String::new(),
            status,
            priority: Priority::High,
            deadline: None,
            team_id: 1,
            created_at: now(),
            updated_at: now(),
        }
    }

    #[test]
    fn counts_cover_the_last_seven_days() {
        let mut due_soon = task(4, TaskStatus::InProgress, Some(2), 30);
        due_soon.due_date = Some(now() + Duration::days(3));
        let mut due_later = task(5, TaskStatus::Todo, Some(2), 30);
        due_later.due_date = Some(now() + Duration::days(9));
        let tasks = vec![
            task(1, TaskStatus::Done, Some(2), 3),
            task(2, TaskStatus::Done, Some(2), 12),
            task(3, TaskStatus::Blocked, Some(2), 1),
            due_soon,
            due_later,
        ];
        let projects = vec![project(ProjectStatus::Active), project(ProjectStatus::OnHold)];

        let stats = weekly_stats(&tasks, &projects, 2, now());
        let ids = |v: &[&Task]| v.iter().map(|t| t.id).collect::<Vec<_>>();
        assert_eq!(ids(&stats.completed), vec![1]);
        assert_eq!(ids(&stats.created), vec![1, 3]);
        assert_eq!(ids(&stats.assigned), vec![4, 5]);
        assert_eq!(ids(&stats.upcoming), vec![4]);
        assert_eq!(stats.active_projects.len(), 1);
        assert!(stats.has_activity());
    }

    #[test]
    fn quiet_week_has_no_activity() {
        let tasks = vec![task(1, TaskStatus::Done, Some(2), 40)];
        let projects = vec![project(ProjectStatus::Completed)];
        assert!(!weekly_stats(&tasks, &projects, 2, now()).has_activity());
    }
}
