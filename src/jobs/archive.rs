// src/jobs/archive.rs

use chrono::{DateTime, Duration, Utc};
use log::{error, info};
use serde::Serialize;
use serde_json::json;

use crate::models::{NotificationKind, ObjectRef, Project, TaskStatus};
use crate::services::notifier;
use crate::state::AppState;
use crate::store::StoreResult;

const ARCHIVE_MARKER: &str = "ARCHIVED";

#[derive(Debug, Serialize)]
pub struct ArchiveSummary {
    pub status: &'static str,
    pub projects_archived: usize,
    pub projects_checked: usize,
    pub days_since_completion: i64,
    pub cutoff_date: DateTime<Utc>,
    pub archived_project_ids: Vec<i64>,
    pub errors: usize,
    pub executed_at: DateTime<Utc>,
}

/// Appends the archive marker unless the description already carries one.
pub fn archived_description(description: &str, now: DateTime<Utc>) -> Option<String> {
    if description.to_uppercase().contains(ARCHIVE_MARKER) {
        return None;
    }
    Some(format!("{}\n\n[{} on {}]", description, ARCHIVE_MARKER, now.format("%Y-%m-%d")))
}

/// Marks completed projects idle for `days` as archived and tells their members.
/// Projects that still have unfinished tasks are left alone.
pub async fn archive_completed_projects(state: &AppState, days: i64) -> StoreResult<ArchiveSummary> {
    info!("Starting archive of projects completed more than {} days ago", days);
    let now = Utc::now();
    let cutoff = now - Duration::days(days);
    let candidates = state.store.completed_projects_updated_before(cutoff).await?;

    let mut archived = Vec::new();
    let mut errors = 0;
    for project in &candidates {
        match archive_project(state, project, now).await {
            Ok(true) => {
                archived.push(project.id);
                notify_members(state, project, now).await;
                info!("Archived project {} ({})", project.name, project.id);
            }
            Ok(false) => {}
            Err(e) => {
                error!("Failed to archive project {}: {}", project.id, e);
                errors += 1;
            }
        }
    }

    info!(
        "Project archive completed: {} of {} projects archived, {} errors",
        archived.len(),
        candidates.len(),
        errors
    );
    Ok(ArchiveSummary {
        status: "success",
        projects_archived: archived.len(),
        projects_checked: candidates.len(),
        days_since_completion: days,
        cutoff_date: cutoff,
        archived_project_ids: archived,
        errors,
        executed_at: now,
    })
}

/// Returns false when the project still has unfinished tasks.
async fn archive_project(state: &AppState, project: &Project, now: DateTime<Utc>) -> StoreResult<bool> {
    let tasks = state.store.tasks_in_project(project.id).await?;
    if tasks.iter().any(|t| t.status != TaskStatus::Done) {
        return Ok(false);
    }
    if let Some(description) = archived_description(&project.description, now) {
        // updated_at stays at the completion time
        let marked = Project { description, ..project.clone() };
        state.store.update_project(&marked).await?;
    }
    Ok(true)
}

async fn notify_members(state: &AppState, project: &Project, now: DateTime<Utc>) {
    let members = match state.store.project_members(project.id).await {
        Ok(members) => members.into_iter().map(|m| m.user_id).collect::<Vec<_>>(),
        Err(e) => {
            error!("Failed to load members of archived project {}: {}", project.id, e);
            return;
        }
    };
    let completed_on = project.updated_at.format("%Y-%m-%d").to_string();
    let message = format!(
        "Project '{}' has been archived. It was completed on {}.",
        project.name, completed_on
    );
    notifier::notify_many(
        state,
        &members,
        NotificationKind::ProjectUpdated,
        &message,
        Some(ObjectRef::project(project.id)),
        json!({
            "archived": true,
            "archived_date": now.format("%Y-%m-%d").to_string(),
            "completion_date": completed_on,
        }),
    )
    .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn marker_is_appended_once() {
        let now = Utc.with_ymd_and_hms(2025, 5, 1, 2, 0, 0).unwrap();
        let marked = archived_description("Launch site", now).unwrap();
        assert_eq!(marked, "Launch site\n\n[ARCHIVED on 2025-05-01]");
        assert_eq!(archived_description(&marked, now), None);
        assert_eq!(archived_description("already archived", now), None);
    }
}
