use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{MemberRole, Priority};

string_enum! {
    pub enum ProjectStatus {
        Planning => ("planning", "Planning"),
        Active => ("active", "Active"),
        OnHold => ("on_hold", "On Hold"),
        Completed => ("completed", "Completed"),
        Cancelled => ("cancelled", "Cancelled"),
    }
}

impl Default for ProjectStatus {
    fn default() -> Self {
        ProjectStatus::Planning
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub description: String,
    #[sqlx(try_from = "String")]
    pub status: ProjectStatus,
    #[sqlx(try_from = "String")]
    pub priority: Priority,
    pub deadline: Option<DateTime<Utc>>,
    pub team_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Past its deadline and not completed.
    pub fn is_overdue_at(&self, now: DateTime<Utc>) -> bool {
        match self.deadline {
            Some(deadline) => self.status != ProjectStatus::Completed && now > deadline,
            None => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewProject {
    pub name: String,
    pub description: String,
    pub status: ProjectStatus,
    pub priority: Priority,
    pub deadline: Option<DateTime<Utc>>,
    pub team_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProjectMember {
    pub id: i64,
    pub project_id: i64,
    pub user_id: i64,
    #[sqlx(try_from = "String")]
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn project(status: ProjectStatus, deadline: Option<DateTime<Utc>>) -> Project {
        let now = Utc::now();
        Project {
            id: 1,
            name: "Website".into(),
            description: String::new(),
            status,
            priority: Priority::Medium,
            deadline,
            team_id: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn overdue_requires_past_deadline_and_open_status() {
        let now = Utc::now();
        let yesterday = Some(now - Duration::days(1));
        assert!(project(ProjectStatus::Active, yesterday).is_overdue_at(now));
        assert!(!project(ProjectStatus::Completed, yesterday).is_overdue_at(now));
        assert!(!project(ProjectStatus::Active, None).is_overdue_at(now));
        assert!(!project(ProjectStatus::Active, Some(now + Duration::days(1))).is_overdue_at(now));
    }
}
