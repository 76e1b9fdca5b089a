// src/jobs/cleanup.rs

use chrono::{DateTime, Duration, Utc};
use log::info;
use serde::Serialize;

use crate::state::AppState;
use crate::store::StoreResult;

#[derive(Debug, Serialize)]
pub struct CleanupSummary {
    pub status: &'static str,
    pub notifications_deleted: u64,
    pub days_old: i64,
    pub cutoff_date: DateTime<Utc>,
    pub executed_at: DateTime<Utc>,
}

/// Deletes read notifications older than `days_old`. Unread ones are kept.
pub async fn cleanup_old_notifications(state: &AppState, days_old: i64) -> StoreResult<CleanupSummary> {
    info!("Starting notification cleanup for notifications older than {} days", days_old);
    let now = Utc::now();
    let cutoff = now - Duration::days(days_old);
    let deleted = state.store.delete_read_notifications_before(cutoff).await?;
    info!("Notification cleanup completed: {} notifications deleted", deleted);
    Ok(CleanupSummary {
        status: "success",
        notifications_deleted: deleted,
        days_old,
        cutoff_date: cutoff,
        executed_at: now,
    })
}
