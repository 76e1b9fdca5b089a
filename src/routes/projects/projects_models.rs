use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Project, Task, TaskStatus};
use crate::routes::nullable;
use crate::routes::teams::teams_models::MemberView;

// structs
#[derive(Debug, Clone, Serialize)]
pub struct ProjectView {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub status: String,
    pub status_display: String,
    pub priority: String,
    pub priority_display: String,
    pub deadline: Option<DateTime<Utc>>,
    pub team: i64,
    pub team_name: String,
    pub member_count: usize,
    pub members: Vec<MemberView>,
    pub task_count: usize,
    pub completed_task_count: usize,
    pub is_overdue: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectView {
    pub fn new(project: Project, team_name: String, members: Vec<MemberView>, tasks: &[Task]) -> Self {
        let is_overdue = project.is_overdue_at(Utc::now());
        ProjectView {
            id: project.id,
            name: project.name,
            description: project.description,
            status: project.status.as_str().to_string(),
            status_display: project.status.label().to_string(),
            priority: project.priority.as_str().to_string(),
            priority_display: project.priority.label().to_string(),
            deadline: project.deadline,
            team: project.team_id,
            team_name,
            member_count: members.len(),
            members,
            task_count: tasks.len(),
            completed_task_count: tasks.iter().filter(|t| t.status == TaskStatus::Done).count(),
            is_overdue,
            created_at: project.created_at,
            updated_at: project.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TaskStatistics {
    pub total: usize,
    pub todo: usize,
    pub in_progress: usize,
    pub done: usize,
    pub blocked: usize,
    pub completion_percentage: f64,
}

#[derive(Debug, Serialize)]
pub struct PriorityDistribution {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

#[derive(Debug, Serialize)]
pub struct StatusTimeline {
    pub created_this_week: usize,
    pub completed_this_week: usize,
    pub created_this_month: usize,
    pub completed_this_month: usize,
}

#[derive(Debug, Serialize)]
pub struct MemberActivity {
    pub user_id: i64,
    pub username: String,
    pub full_name: String,
    pub role: String,
    pub tasks_assigned: usize,
    pub tasks_completed: usize,
}

#[derive(Debug, Serialize)]
pub struct UpcomingDeadline {
    pub task_id: i64,
    pub title: String,
    pub due_date: DateTime<Utc>,
    pub days_until_due: i64,
    pub priority: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ProjectStats {
    pub project_id: i64,
    pub project_name: String,
    pub status: String,
    pub status_display: String,
    pub priority: String,
    pub priority_display: String,
    pub deadline: Option<DateTime<Utc>>,
    pub is_overdue: bool,
    pub days_until_deadline: Option<i64>,
    pub member_count: usize,
    pub task_statistics: TaskStatistics,
    pub priority_distribution: PriorityDistribution,
    pub task_status_timeline: StatusTimeline,
    pub member_activity: Vec<MemberActivity>,
    pub overdue_tasks: usize,
    pub upcoming_deadlines: Vec<UpcomingDeadline>,
}

// json format

#[derive(Debug, Default, Deserialize)]
pub struct ProjectListQuery {
    pub team: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub search: Option<String>,
    pub ordering: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
}

/// Body of POST, PUT and PATCH on projects. PUT requires `name` and `team`.
#[derive(Debug, Default, Deserialize)]
pub struct ProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub deadline: Option<Option<DateTime<Utc>>>,
    pub team: Option<i64>,
}
