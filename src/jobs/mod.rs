// src/jobs/mod.rs
//
// Periodic background work: reminder and digest emails, notification cleanup
// and project archiving. Each job returns a summary that the scheduler logs.

use chrono::{DateTime, NaiveTime, Utc};

pub mod archive;
pub mod cleanup;
pub mod digest;
pub mod reminders;
pub mod scheduler;

/// Midnight UTC of the day `now` falls on.
pub(crate) fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Tasks listed in a reminder or digest email.
pub(crate) fn task_lines(tasks: &[&crate::models::Task], limit: usize) -> String {
    tasks
        .iter()
        .take(limit)
        .map(|t| {
            let due = t
                .due_date
                .map(|d| format!(" (due {})", d.format("%Y-%m-%d")))
                .unwrap_or_default();
            format!("  - {} [{}]{}", t.title, t.priority.label(), due)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
