// src/jobs/scheduler.rs
//
// Minute-resolution UTC scheduler. One tokio task wakes every minute, records a
// heartbeat for /health/ and runs whichever jobs fell due since the last tick.

use std::sync::Mutex;

use chrono::{DateTime, Datelike, Duration, DurationRound, Timelike, Utc, Weekday};
use log::{error, info, warn};
use serde::Serialize;

use super::{archive, cleanup, digest, reminders};
use crate::state::AppState;

const TICK_SECS: u64 = 60;
/// Missed minutes older than a day are not replayed.
const MAX_CATCH_UP_MINUTES: i64 = 1440;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    DailyReminders,
    WeeklyDigest,
    NotificationCleanup,
    ProjectArchive,
}

impl Job {
    pub const ALL: [Job; 4] = [
        Job::DailyReminders,
        Job::WeeklyDigest,
        Job::NotificationCleanup,
        Job::ProjectArchive,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Job::DailyReminders => "send_daily_reminders",
            Job::WeeklyDigest => "send_weekly_digest",
            Job::NotificationCleanup => "cleanup_old_notifications",
            Job::ProjectArchive => "archive_completed_projects",
        }
    }

    /// Whether the job's schedule matches the minute `at` falls in.
    pub fn is_due_at(&self, at: DateTime<Utc>) -> bool {
        let (hour, minute) = (at.hour(), at.minute());
        match self {
            Job::DailyReminders => hour == 9 && minute == 0,
            Job::WeeklyDigest => at.weekday() == Weekday::Mon && hour == 9 && minute == 0,
            Job::NotificationCleanup => at.weekday() == Weekday::Sun && hour == 2 && minute == 0,
            Job::ProjectArchive => at.day() == 1 && hour == 2 && minute == 0,
        }
    }
}

/// Jobs whose scheduled minute lies in `(from, to]`, each listed once.
pub fn due_between(from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<Job> {
    let minute = Duration::minutes(1);
    let (from, to) = match (from.duration_trunc(minute), to.duration_trunc(minute)) {
        (Ok(from), Ok(to)) => (from, to),
        _ => return Vec::new(),
    };
    let span = (to - from).num_minutes().clamp(0, MAX_CATCH_UP_MINUTES);

    let mut due = Vec::new();
    for step in 1..=span {
        let at = to - Duration::minutes(span - step);
        for job in Job::ALL {
            if job.is_due_at(at) && !due.contains(&job) {
                due.push(job);
            }
        }
    }
    due
}

/// Liveness of the scheduler task, reported by the health endpoint.
#[derive(Debug)]
pub struct SchedulerStatus {
    enabled: bool,
    last_tick: Mutex<Option<DateTime<Utc>>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchedulerSnapshot {
    pub status: &'static str,
    pub last_tick: Option<DateTime<Utc>>,
}

impl SchedulerStatus {
    pub fn new(enabled: bool) -> Self {
        SchedulerStatus {
            enabled,
            last_tick: Mutex::new(None),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Stores `now` and returns the previous tick.
    pub fn heartbeat(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self.last_tick.lock() {
            Ok(mut last) => last.replace(now),
            Err(_) => None,
        }
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> SchedulerSnapshot {
        let last_tick = self.last_tick.lock().ok().and_then(|last| *last);
        let status = if !self.enabled {
            "disabled"
        } else {
            match last_tick {
                Some(tick) if now - tick > Duration::seconds(3 * TICK_SECS as i64) => "stalled",
                _ => "running",
            }
        };
        SchedulerSnapshot { status, last_tick }
    }
}

pub async fn run_job(state: &AppState, job: Job) {
    info!("Running scheduled job {}", job.name());
    let jobs = &state.config.jobs;
    let summary = match job {
        Job::DailyReminders => reminders::send_daily_reminders(state).await.map(serde_json::to_value),
        Job::WeeklyDigest => digest::send_weekly_digest(state).await.map(serde_json::to_value),
        Job::NotificationCleanup => cleanup::cleanup_old_notifications(state, jobs.notification_retention_days)
            .await
            .map(serde_json::to_value),
        Job::ProjectArchive => archive::archive_completed_projects(state, jobs.project_archive_days)
            .await
            .map(serde_json::to_value),
    };
    match summary {
        Ok(Ok(summary)) => info!("Job {} finished: {}", job.name(), summary),
        Ok(Err(e)) => warn!("Job {} finished but its summary could not be encoded: {}", job.name(), e),
        Err(e) => error!("Job {} failed: {}", job.name(), e),
    }
}

/// Starts the scheduler loop unless it is disabled in the config.
pub fn spawn(state: AppState) {
    if !state.scheduler.enabled() {
        info!("Background scheduler disabled");
        return;
    }
    info!("Background scheduler started, ticking every {}s", TICK_SECS);
    let mut ticker = tokio::time::interval(tokio::time::Duration::from_secs(TICK_SECS));
    tokio::spawn(async move {
        loop {
            ticker.tick().await;
            let now = Utc::now();
            let previous = state.scheduler.heartbeat(now).unwrap_or(now);
            for job in due_between(previous, now) {
                run_job(&state, job).await;
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    #[test]
    fn monday_morning_runs_reminders_and_digest() {
        // 2025-06-02 is a Monday
        let due = due_between(at(2025, 6, 2, 8, 59, 30), at(2025, 6, 2, 9, 0, 30));
        assert_eq!(due, vec![Job::DailyReminders, Job::WeeklyDigest]);
    }

    #[test]
    fn first_sunday_of_month_runs_cleanup_and_archive() {
        // 2025-06-01 is a Sunday
        let due = due_between(at(2025, 6, 1, 1, 59, 0), at(2025, 6, 1, 2, 0, 0));
        assert_eq!(due, vec![Job::NotificationCleanup, Job::ProjectArchive]);
    }

    #[test]
    fn same_minute_runs_nothing_twice() {
        let tick = at(2025, 6, 3, 9, 0, 10);
        assert_eq!(due_between(at(2025, 6, 3, 8, 59, 50), tick), vec![Job::DailyReminders]);
        assert!(due_between(tick, at(2025, 6, 3, 9, 0, 50)).is_empty());
    }

    #[test]
    fn missed_minutes_are_caught_up() {
        let due = due_between(at(2025, 6, 3, 8, 55, 0), at(2025, 6, 3, 9, 5, 0));
        assert_eq!(due, vec![Job::DailyReminders]);
        assert!(due_between(at(2025, 6, 3, 9, 5, 0), at(2025, 6, 3, 9, 4, 0)).is_empty());
    }

    #[test]
    fn snapshot_reports_stalled_loop() {
        let status = SchedulerStatus::new(true);
        let now = at(2025, 6, 3, 12, 0, 0);
        assert_eq!(status.snapshot(now).status, "running");
        assert_eq!(status.heartbeat(now - Duration::minutes(10)), None);
        assert_eq!(status.snapshot(now).status, "stalled");
        assert_eq!(SchedulerStatus::new(false).snapshot(now).status, "disabled");
    }
}
