// src/services/emails.rs

use log::{error, info, warn};

use crate::config::MailConfig;
use crate::mailer::{Email, MailError};
use crate::models::{Project, Task, User};
use crate::state::AppState;

/// Honors the user's `email_notifications` preference. A missing profile or a
/// failed lookup still sends.
pub async fn should_send(state: &AppState, user: &User) -> bool {
    if user.email.is_empty() {
        return false;
    }
    match state.store.profile(user.id).await {
        Ok(Some(profile)) => profile.email_notifications,
        Ok(None) => true,
        Err(e) => {
            warn!("Error checking email preferences for user {}: {}", user.id, e);
            true
        }
    }
}

pub async fn deliver(state: &AppState, email: Email) -> Result<(), MailError> {
    let to = email.to.clone();
    let subject = email.subject.clone();
    match state.mailer.send(email).await {
        Ok(()) => {
            info!("Email sent to {} with subject: {}", to, subject);
            Ok(())
        }
        Err(e) => {
            error!("Failed to send email to {}: {}", to, e);
            Err(e)
        }
    }
}

pub fn welcome(mail: &MailConfig, user: &User) -> Email {
    let body = format!(
        "Hi {name},\n\n\
         Welcome to {site}! Your account \"{username}\" is ready.\n\n\
         Log in: {frontend}/login\n\
         Dashboard: {frontend}/dashboard\n\n\
         Start by creating a team, then invite your colleagues and set up your first project.\n\n\
         The {site} team",
        name = user.full_name(),
        site = mail.site_name,
        username = user.username,
        frontend = mail.frontend_url,
    );
    Email {
        from: mail.default_from_email.clone(),
        to: user.email.clone(),
        subject: format!("Welcome to {}!", mail.site_name),
        body,
    }
}

pub fn task_assignment(mail: &MailConfig, user: &User, task: &Task, project: &Project, assigner: Option<&User>) -> Email {
    let due = task
        .due_date
        .map(|d| d.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "No due date".to_string());
    let assigned_by = assigner.map(User::full_name).unwrap_or_else(|| "Someone".to_string());
    let body = format!(
        "Hi {name},\n\n\
         {assigned_by} assigned you a task in {project}.\n\n\
         Task: {title}\n\
         Priority: {priority}\n\
         Status: {status}\n\
         Due: {due}\n\n\
         {description}\n\n\
         View task: {frontend}/tasks/{task_id}\n\
         View project: {frontend}/projects/{project_id}\n\n\
         {site}",
        name = user.full_name(),
        assigned_by = assigned_by,
        project = project.name,
        title = task.title,
        priority = task.priority.label(),
        status = task.status.label(),
        due = due,
        description = task.description,
        frontend = mail.frontend_url,
        task_id = task.id,
        project_id = project.id,
        site = mail.site_name,
    );
    Email {
        from: mail.default_from_email.clone(),
        to: user.email.clone(),
        subject: format!("New Task Assigned: {}", task.title),
        body,
    }
}

/// Sends the welcome mail unless the user opted out.
pub async fn send_welcome(state: &AppState, user: &User) {
    if !should_send(state, user).await {
        info!("Email notifications disabled for user {}, skipping welcome email", user.username);
        return;
    }
    if deliver(state, welcome(&state.config.mail, user)).await.is_err() {
        warn!("Welcome email for user {} was not delivered", user.username);
    }
}

pub async fn send_task_assignment(state: &AppState, user: &User, task: &Task, project: &Project, assigner: &User) {
    if !should_send(state, user).await {
        info!(
            "Email notifications disabled for user {}, skipping task assignment email",
            user.username
        );
        return;
    }
    let email = task_assignment(&state.config.mail, user, task, project, Some(assigner));
    if deliver(state, email).await.is_err() {
        warn!(
            "Assignment email for task {} to user {} was not delivered",
            task.id, user.username
        );
    }
}
