// src/jobs/reminders.rs

use chrono::{DateTime, Duration, Utc};
use log::{debug, error, info};
use serde::Serialize;

use super::{start_of_day, task_lines};
use crate::config::MailConfig;
use crate::mailer::Email;
use crate::models::{Task, User};
use crate::services::emails;
use crate::state::AppState;
use crate::store::StoreResult;

#[derive(Debug, Serialize)]
pub struct ReminderSummary {
    pub status: &'static str,
    pub total_users_notified: usize,
    pub tasks_due_today: usize,
    pub overdue_tasks: usize,
    pub upcoming_tasks: usize,
    pub errors: usize,
    pub executed_at: DateTime<Utc>,
}

/// A user's open assigned tasks, split by due date.
#[derive(Debug, Default)]
pub struct DueBuckets<'a> {
    pub today: Vec<&'a Task>,
    pub overdue: Vec<&'a Task>,
    pub tomorrow: Vec<&'a Task>,
}

impl DueBuckets<'_> {
    pub fn is_empty(&self) -> bool {
        self.today.is_empty() && self.overdue.is_empty() && self.tomorrow.is_empty()
    }
}

/// Overdue means due before today started; done tasks are ignored.
pub fn bucket_tasks(tasks: &[Task], user_id: i64, now: DateTime<Utc>) -> DueBuckets<'_> {
    let today_start = start_of_day(now);
    let today_end = today_start + Duration::days(1);
    let tomorrow_end = today_end + Duration::days(1);

    let mut buckets = DueBuckets::default();
    for task in tasks.iter().filter(|t| t.is_assigned_to(user_id) && t.status.is_open()) {
        match task.due_date {
            Some(due) if due < today_start => buckets.overdue.push(task),
            Some(due) if due < today_end => buckets.today.push(task),
            Some(due) if due < tomorrow_end => buckets.tomorrow.push(task),
            _ => {}
        }
    }
    buckets
}

pub fn reminder_email(mail: &MailConfig, user: &User, buckets: &DueBuckets<'_>) -> Email {
    let attention = buckets.today.len() + buckets.overdue.len();
    let mut sections = Vec::new();
    if !buckets.overdue.is_empty() {
        sections.push(format!("Overdue ({}):\n{}", buckets.overdue.len(), task_lines(&buckets.overdue, 20)));
    }
    if !buckets.today.is_empty() {
        sections.push(format!("Due today ({}):\n{}", buckets.today.len(), task_lines(&buckets.today, 20)));
    }
    if !buckets.tomorrow.is_empty() {
        sections.push(format!("Due tomorrow ({}):\n{}", buckets.tomorrow.len(), task_lines(&buckets.tomorrow, 20)));
    }
    let body = format!(
        "Hi {name},\n\nHere is your daily task summary.\n\n{sections}\n\nDashboard: {frontend}/dashboard\n\n{site}",
        name = user.full_name(),
        sections = sections.join("\n\n"),
        frontend = mail.frontend_url,
        site = mail.site_name,
    );
    Email {
        from: mail.default_from_email.clone(),
        to: user.email.clone(),
        subject: format!("Daily Task Reminder - {} tasks need attention", attention),
        body,
    }
}

pub async fn send_daily_reminders(state: &AppState) -> StoreResult<ReminderSummary> {
    info!("Starting daily reminders task");
    let now = Utc::now();
    let mut summary = ReminderSummary {
        status: "success",
        total_users_notified: 0,
        tasks_due_today: 0,
        overdue_tasks: 0,
        upcoming_tasks: 0,
        errors: 0,
        executed_at: now,
    };

    for user in state.store.active_users().await? {
        if !emails::should_send(state, &user).await {
            continue;
        }
        let tasks = match state.store.tasks_involving(user.id).await {
            Ok(tasks) => tasks,
            Err(e) => {
                error!("Error loading tasks for daily reminder to user {}: {}", user.id, e);
                summary.errors += 1;
                continue;
            }
        };
        let buckets = bucket_tasks(&tasks, user.id, now);
        if buckets.is_empty() {
            continue;
        }

        let email = reminder_email(&state.config.mail, &user, &buckets);
        if emails::deliver(state, email).await.is_err() {
            summary.errors += 1;
            continue;
        }
        summary.total_users_notified += 1;
        summary.tasks_due_today += buckets.today.len();
        summary.overdue_tasks += buckets.overdue.len();
        summary.upcoming_tasks += buckets.tomorrow.len();
        debug!(
            "Daily reminder sent to {}: {} due today, {} overdue",
            user.email,
            buckets.today.len(),
            buckets.overdue.len()
        );
    }

    info!(
        "Daily reminders task completed: {} users notified, {} tasks due today, {} overdue tasks",
        summary.total_users_notified, summary.tasks_due_today, summary.overdue_tasks
    );
    Ok(summary)
}
