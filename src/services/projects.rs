// src/services/projects.rs

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use log::info;
use serde_json::json;

use super::{
    activity, filter_param, notifier, parse_choice, parse_id, parse_member_role, users_by_id, ServiceResult,
};
use crate::auth::Caller;
use crate::error::{ApiError, FieldErrors};
use crate::models::{
    ActivityAction, MemberRole, NewProject, ObjectRef, Priority, Project, ProjectMember, ProjectStatus, Task,
    TaskStatus, User,
};
use crate::pagination::{self, Page, PageLinks, PageRequest};
use crate::permissions;
use crate::routes::projects::projects_models::{
    MemberActivity, PriorityDistribution, ProjectListQuery, ProjectRequest, ProjectStats, ProjectView,
    StatusTimeline, TaskStatistics, UpcomingDeadline,
};
use crate::routes::teams::teams_models::{AddMemberRequest, MemberView, UpdateMemberRequest};
use crate::state::AppState;
use crate::store::StoreResult;
use crate::validation::{self, REQUIRED};

const ORDERING_FIELDS: &[&str] = &["name", "status", "priority", "deadline", "created_at", "updated_at"];
const UPCOMING_LIMIT: usize = 10;

fn member_view(member: &ProjectMember, user: Option<&User>) -> MemberView {
    MemberView::build(member.id, member.user_id, member.role, member.joined_at, user)
}

async fn team_name(state: &AppState, team_id: i64) -> StoreResult<String> {
    Ok(state.store.team_by_id(team_id).await?.map(|t| t.name).unwrap_or_default())
}

pub async fn project_view(state: &AppState, project: Project) -> StoreResult<ProjectView> {
    let members = state.store.project_members(project.id).await?;
    let users = users_by_id(state, members.iter().map(|m| m.user_id).collect()).await?;
    let members = members.iter().map(|m| member_view(m, users.get(&m.user_id))).collect();
    let tasks = state.store.tasks_in_project(project.id).await?;
    let team_name = team_name(state, project.team_id).await?;
    Ok(ProjectView::new(project, team_name, members, &tasks))
}

/// The project and the caller's role on it. Non-members get a 404.
async fn visible_project(state: &AppState, caller: &Caller, project_id: i64) -> ServiceResult<(Project, MemberRole)> {
    let project = state
        .store
        .project_by_id(project_id)
        .await?
        .ok_or_else(ApiError::not_found)?;
    match state.store.project_member(project_id, caller.id()).await? {
        Some(member) => Ok((project, member.role)),
        None => Err(ApiError::not_found()),
    }
}

/// Checks the team exists and the caller belongs to it.
async fn validate_team(state: &AppState, caller: &Caller, errors: &mut FieldErrors, team_id: i64) -> ServiceResult<bool> {
    if state.store.team_by_id(team_id).await?.is_none() {
        errors.add("team", format!("Invalid pk \"{}\" - object does not exist.", team_id));
        return Ok(false);
    }
    if state.store.team_member(team_id, caller.id()).await?.is_none() {
        errors.add("team", "You must be a member of the team to create projects in it.");
        return Ok(false);
    }
    Ok(true)
}

async fn validate_name(
    state: &AppState,
    errors: &mut FieldErrors,
    raw: &str,
    team_id: Option<i64>,
    exclude: Option<i64>,
) -> ServiceResult<String> {
    match validation::trimmed_length(raw, 2, 200, "Project name") {
        Ok(name) => {
            if let Some(team_id) = team_id {
                if state.store.project_name_taken(team_id, &name, exclude).await? {
                    errors.add("name", "A project with this name already exists in this team.");
                }
            }
            Ok(name)
        }
        Err(message) => {
            errors.add("name", message);
            Ok(raw.to_string())
        }
    }
}

fn validate_deadline(errors: &mut FieldErrors, deadline: Option<DateTime<Utc>>) {
    if let Some(deadline) = deadline {
        if deadline < Utc::now() {
            errors.add("deadline", "Project deadline cannot be in the past.");
        }
    }
}


pub async fn list(
    state: &AppState,
    caller: &Caller,
    query: &ProjectListQuery,
    links: &PageLinks,
) -> ServiceResult<Page<ProjectView>> {
    let request = PageRequest::parse(query.page.as_deref(), query.page_size.as_deref())?;

    let mut errors = FieldErrors::new();
    let team_filter = parse_id(&mut errors, "team", filter_param(&query.team));
    let status_filter: Option<ProjectStatus> = parse_choice(&mut errors, "status", filter_param(&query.status));
    let priority_filter: Option<Priority> = parse_choice(&mut errors, "priority", filter_param(&query.priority));
    errors.into_result()?;

    let projects = state.store.projects_for_user(caller.id()).await?;
    let team_ids: Vec<i64> = projects.iter().map(|p| p.team_id).collect();
    let team_names: HashMap<i64, String> = state
        .store
        .teams_by_ids(&team_ids)
        .await?
        .into_iter()
        .map(|t| (t.id, t.name))
        .collect();

    let mut projects: Vec<Project> = projects
        .into_iter()
        .filter(|p| team_filter.map_or(true, |id| p.team_id == id))
        .filter(|p| status_filter.map_or(true, |s| p.status == s))
        .filter(|p| priority_filter.map_or(true, |pr| p.priority == pr))
        .filter(|p| {
            let team = team_names.get(&p.team_id).map(String::as_str).unwrap_or_default();
            pagination::search_matches(query.search.as_deref(), &[p.name.as_str(), p.description.as_str(), team])
        })
        .collect();

    let keys = pagination::ordering(query.ordering.as_deref(), ORDERING_FIELDS, "-created_at");
    pagination::sort_by_keys(&mut projects, &keys, |a, b, field| match field {
        "name" => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        "status" => a.status.as_str().cmp(b.status.as_str()),
        "priority" => a.priority.as_str().cmp(b.priority.as_str()),
        "deadline" => a.deadline.cmp(&b.deadline),
        "updated_at" => a.updated_at.cmp(&b.updated_at),
        _ => a.created_at.cmp(&b.created_at),
    });

    let Page { count, next, previous, results } = pagination::paginate(projects, request, links)?;
    let mut views = Vec::with_capacity(results.len());
    for project in results {
        views.push(project_view(state, project).await?);
    }
    Ok(Page { count, next, previous, results: views })
}

pub async fn create(state: &AppState, caller: &Caller, request: ProjectRequest) -> ServiceResult<ProjectView> {
    let mut errors = FieldErrors::new();

    let team_id = match request.team {
        Some(team_id) => validate_team(state, caller, &mut errors, team_id).await?.then_some(team_id),
        None => {
            errors.add("team", "Team is required.");
            None
        }
    };
    let name = match request.name.as_deref() {
        Some(raw) => validate_name(state, &mut errors, raw, team_id, None).await?,
        None => {
            errors.add("name", REQUIRED);
            String::new()
        }
    };
    let description = request.description.unwrap_or_default();
    if let Err(message) = validation::max_length(&description, 1000) {
        errors.add("description", message);
    }
    let status: ProjectStatus = parse_choice(&mut errors, "status", request.status.as_deref()).unwrap_or_default();
    let priority: Priority = parse_choice(&mut errors, "priority", request.priority.as_deref()).unwrap_or_default();
    let deadline = request.deadline.flatten();
    validate_deadline(&mut errors, deadline);
    errors.into_result()?;

    let team_id = team_id.ok_or_else(|| ApiError::field("team", "Team is required."))?;
    let new_project = NewProject { name, description, status, priority, deadline, team_id };
    let project = state.store.create_project(new_project, caller.id()).await?;
    info!("Project {} created in team {} by user {}", project.id, team_id, caller.id());

    let team = state.store.team_by_id(team_id).await?.ok_or_else(ApiError::not_found)?;
    activity::record(
        state,
        Some(caller.id()),
        &caller.client,
        ActivityAction::Created,
        Some(ObjectRef::project(project.id)),
        json!({
            "name": project.name,
            "status": project.status.as_str(),
            "priority": project.priority.as_str(),
            "team_id": team.id,
            "team_name": team.name,
        }),
    )
    .await;
    activity::record(
        state,
        Some(caller.id()),
        &caller.client,
        ActivityAction::MemberAdded,
        Some(ObjectRef::project(project.id)),
        json!({
            "member_id": caller.id(),
            "member_username": caller.user.username,
            "role": MemberRole::Owner.as_str(),
            "project_name": project.name,
        }),
    )
    .await;
    notifier::project_created(state, &project, &team, &caller.user).await;

    Ok(project_view(state, project).await?)
}

pub async fn get(state: &AppState, caller: &Caller, project_id: i64) -> ServiceResult<ProjectView> {
    let (project, _) = visible_project(state, caller, project_id).await?;
    Ok(project_view(state, project).await?)
}

/// PUT when `partial` is false, which makes `name` and `team` mandatory.
pub async fn update(
    state: &AppState,
    caller: &Caller,
    project_id: i64,
    request: ProjectRequest,
    partial: bool,
) -> ServiceResult<ProjectView> {
    let (project, role) = visible_project(state, caller, project_id).await?;

    // Check if user is admin or owner
    if !permissions::can_manage(Some(role)) {
        return Err(ApiError::forbidden(
            "Only project admins and owners can update project information.",
        ));
    }

    let mut errors = FieldErrors::new();
    let mut updated = project.clone();

    let mut team_valid = true;
    match request.team {
        Some(team_id) => {
            team_valid = validate_team(state, caller, &mut errors, team_id).await?;
            updated.team_id = team_id;
        }
        None if !partial => errors.add("team", "Team is required."),
        None => {}
    }
    let name_team = team_valid.then_some(updated.team_id);
    match request.name.as_deref() {
        Some(raw) => updated.name = validate_name(state, &mut errors, raw, name_team, Some(project.id)).await?,
        None if !partial => errors.add("name", REQUIRED),
        None => {}
    }
    if let Some(description) = request.description {
        if let Err(message) = validation::max_length(&description, 1000) {
            errors.add("description", message);
        }
        updated.description = description;
    }
    if let Some(status) = parse_choice(&mut errors, "status", request.status.as_deref()) {
        updated.status = status;
    }
    if let Some(priority) = parse_choice(&mut errors, "priority", request.priority.as_deref()) {
        updated.priority = priority;
    }
    if let Some(deadline) = request.deadline {
        validate_deadline(&mut errors, deadline);
        updated.deadline = deadline;
    }
    errors.into_result()?;

    let mut changes = activity::Changes::new();
    changes.track("name", &project.name, &updated.name);
    changes.track("description", &project.description, &updated.description);
    changes.track("status", &project.status, &updated.status);
    changes.track("priority", &project.priority, &updated.priority);
    changes.track_opt("deadline", &project.deadline, &updated.deadline);
    changes.track("team", &project.team_id, &updated.team_id);

    updated.updated_at = Utc::now();
    let saved = state.store.update_project(&updated).await?;

    let action = if changes.contains("status") {
        ActivityAction::StatusChanged
    } else if changes.contains("priority") {
        ActivityAction::PriorityChanged
    } else {
        ActivityAction::Updated
    };
    let team_name = team_name(state, saved.team_id).await?;
    notifier::project_updated(state, &project, &saved, &team_name, &changes).await;
    activity::record(
        state,
        Some(caller.id()),
        &caller.client,
        action,
        Some(ObjectRef::project(saved.id)),
        json!({ "name": saved.name, "changes": changes.into_value() }),
    )
    .await;

    Ok(project_view(state, saved).await?)
}

pub async fn delete(state: &AppState, caller: &Caller, project_id: i64) -> ServiceResult<()> {
    let (project, role) = visible_project(state, caller, project_id).await?;

    // Check if user is the owner
    if !permissions::is_owner(Some(role)) {
        return Err(ApiError::forbidden("Only project owners can delete projects."));
    }

    state.store.delete_project(project.id).await?;
    info!("Project {} deleted by user {}", project.id, caller.id());
    activity::record(
        state,
        Some(caller.id()),
        &caller.client,
        ActivityAction::Deleted,
        Some(ObjectRef::project(project.id)),
        json!({ "name": project.name, "status": project.status.as_str(), "team_id": project.team_id }),
    )
    .await;
    Ok(())
}

pub async fn add_member(
    state: &AppState,
    caller: &Caller,
    project_id: i64,
    request: AddMemberRequest,
) -> ServiceResult<MemberView> {
    let (project, role) = visible_project(state, caller, project_id).await?;

    if !permissions::can_manage(Some(role)) {
        return Err(ApiError::forbidden("Only project admins and owners can add members."));
    }

    let user_id = request.user_id.ok_or_else(|| ApiError::field("user_id", REQUIRED))?;
    let new_role = parse_member_role(request.role.as_deref(), Some(MemberRole::Member))?;

    let user = state
        .store
        .user_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::missing("User not found."))?;

    // Check if user is already a member
    if state.store.project_member(project.id, user.id).await?.is_some() {
        return Err(ApiError::bad_request("User is already a member of this project."));
    }

    // Check if user belongs to the project's team
    if state.store.team_member(project.team_id, user.id).await?.is_none() {
        return Err(ApiError::bad_request(
            "User must be a member of the project's team to be added to the project.",
        ));
    }

    if !permissions::can_grant(Some(role), new_role) {
        return Err(ApiError::forbidden("Only project owners can assign owner role."));
    }

    let member = state.store.add_project_member(project.id, user.id, new_role).await?;
    info!("User {} added to project {} as {}", user.id, project.id, new_role);

    activity::record(
        state,
        Some(user.id),
        &caller.client,
        ActivityAction::MemberAdded,
        Some(ObjectRef::project(project.id)),
        json!({
            "member_id": user.id,
            "member_username": user.username,
            "role": new_role.as_str(),
            "project_name": project.name,
        }),
    )
    .await;
    let team_name = team_name(state, project.team_id).await?;
    notifier::project_member_added(state, &project, &team_name, &user, new_role).await;

    Ok(member_view(&member, Some(&user)))
}

pub async fn update_member(
    state: &AppState,
    caller: &Caller,
    project_id: i64,
    user_id: i64,
    request: UpdateMemberRequest,
) -> ServiceResult<MemberView> {
    let (project, role) = visible_project(state, caller, project_id).await?;

    if !permissions::can_manage(Some(role)) {
        return Err(ApiError::forbidden("Only project admins and owners can update member roles."));
    }

    let member = state
        .store
        .project_member(project.id, user_id)
        .await?
        .ok_or_else(|| ApiError::missing("Member not found in this project."))?;

    if member.role.is_owner() {
        return Err(ApiError::bad_request("Cannot change the role of the project owner."));
    }

    let new_role = parse_member_role(request.role.as_deref(), None)?;
    if !permissions::can_grant(Some(role), new_role) {
        return Err(ApiError::forbidden("Only project owners can assign owner role."));
    }

    let updated = state.store.set_project_member_role(project.id, user_id, new_role).await?;
    activity::record(
        state,
        Some(caller.id()),
        &caller.client,
        ActivityAction::Updated,
        Some(ObjectRef::project(project.id)),
        json!({
            "member_id": user_id,
            "changes": { "role": { "old": member.role.as_str(), "new": new_role.as_str() } },
        }),
    )
    .await;

    let user = state.store.user_by_id(user_id).await?;
    Ok(member_view(&updated, user.as_ref()))
}

pub async fn remove_member(state: &AppState, caller: &Caller, project_id: i64, user_id: i64) -> ServiceResult<()> {
    let (project, role) = visible_project(state, caller, project_id).await?;

    if !permissions::can_manage(Some(role)) {
        return Err(ApiError::forbidden("Only project admins and owners can remove members."));
    }

    let member = state
        .store
        .project_member(project.id, user_id)
        .await?
        .ok_or_else(|| ApiError::missing("Member not found in this project."))?;

    if member.role.is_owner() {
        return Err(ApiError::bad_request(
            "Cannot remove the project owner. Transfer ownership first or delete the project.",
        ));
    }
    if member.user_id == caller.id() {
        return Err(ApiError::bad_request(
            "You cannot remove yourself from the project. Please contact another admin or owner.",
        ));
    }

    state.store.remove_project_member(project.id, user_id).await?;
    info!("User {} removed from project {}", user_id, project.id);

    let user = state.store.user_by_id(user_id).await?;
    activity::record(
        state,
        Some(user_id),
        &caller.client,
        ActivityAction::MemberRemoved,
        Some(ObjectRef::project(project.id)),
        json!({
            "member_id": user_id,
            "member_username": user.as_ref().map(|u| u.username.clone()),
            "role": member.role.as_str(),
            "project_name": project.name,
        }),
    )
    .await;
    if let Some(user) = user {
        notifier::project_member_removed(state, &project, &user).await;
    }
    Ok(())
}

pub async fn stats(state: &AppState, caller: &Caller, project_id: i64) -> ServiceResult<ProjectStats> {
    let (project, _) = visible_project(state, caller, project_id).await?;
    let members = state.store.project_members(project.id).await?;
    let users = users_by_id(state, members.iter().map(|m| m.user_id).collect()).await?;
    let tasks = state.store.tasks_in_project(project.id).await?;
    Ok(compute_stats(&project, &members, &users, &tasks, Utc::now()))
}

/// Whole days, rounded towards negative infinity.
fn whole_days(delta: Duration) -> i64 {
    delta.num_seconds().div_euclid(86_400)
}

pub fn compute_stats(
    project: &Project,
    members: &[ProjectMember],
    users: &HashMap<i64, User>,
    tasks: &[Task],
    now: DateTime<Utc>,
) -> ProjectStats {
    let count_status = |status: TaskStatus| tasks.iter().filter(|t| t.status == status).count();
    let count_priority = |priority: Priority| tasks.iter().filter(|t| t.priority == priority).count();

    let total = tasks.len();
    let done = count_status(TaskStatus::Done);
    let completion_percentage = if total > 0 {
        ((done as f64 / total as f64) * 100.0 * 100.0).round() / 100.0
    } else {
        0.0
    };

    let week_ago = now - Duration::days(7);
    let month_ago = now - Duration::days(30);
    let created_since = |since: DateTime<Utc>| tasks.iter().filter(|t| t.created_at >= since).count();
    let completed_since = |since: DateTime<Utc>| {
        tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Done && t.updated_at >= since)
            .count()
    };

    let member_activity = members
        .iter()
        .map(|m| {
            let user = users.get(&m.user_id);
            let assigned: Vec<&Task> = tasks.iter().filter(|t| t.is_assigned_to(m.user_id)).collect();
            MemberActivity {
                user_id: m.user_id,
                username: user.map(|u| u.username.clone()).unwrap_or_default(),
                full_name: user.map(User::full_name).unwrap_or_default(),
                role: m.role.as_str().to_string(),
                tasks_assigned: assigned.len(),
                tasks_completed: assigned.iter().filter(|t| t.status == TaskStatus::Done).count(),
            }
        })
        .collect();

    let horizon = now + Duration::days(7);
    let mut upcoming: Vec<&Task> = tasks
        .iter()
        .filter(|t| matches!(t.status, TaskStatus::Todo | TaskStatus::InProgress))
        .filter(|t| t.due_date.map_or(false, |due| due >= now && due <= horizon))
        .collect();
    upcoming.sort_by_key(|t| t.due_date);
    let upcoming_deadlines = upcoming
        .into_iter()
        .take(UPCOMING_LIMIT)
        .filter_map(|t| {
            let due = t.due_date?;
            Some(UpcomingDeadline {
                task_id: t.id,
                title: t.title.clone(),
                due_date: due,
                days_until_due: whole_days(due - now),
                priority: t.priority.as_str().to_string(),
                status: t.status.as_str().to_string(),
            })
        })
        .collect();

    ProjectStats {
        project_id: project.id,
        project_name: project.name.clone(),
        status: project.status.as_str().to_string(),
        status_display: project.status.label().to_string(),
        priority: project.priority.as_str().to_string(),
        priority_display: project.priority.label().to_string(),
        deadline: project.deadline,
        is_overdue: project.is_overdue_at(now),
        days_until_deadline: project.deadline.map(|d| whole_days(d - now)),
        member_count: members.len(),
        task_statistics: TaskStatistics {
            total,
            todo: count_status(TaskStatus::Todo),
            in_progress: count_status(TaskStatus::InProgress),
            done,
            blocked: count_status(TaskStatus::Blocked),
            completion_percentage,
        },
        priority_distribution: PriorityDistribution {
            high: count_priority(Priority::High),
            medium: count_priority(Priority::Medium),
            low: count_priority(Priority::Low),
        },
        task_status_timeline: StatusTimeline {
            created_this_week: created_since(week_ago),
            completed_this_week: completed_since(week_ago),
            created_this_month: created_since(month_ago),
            completed_this_month: completed_since(month_ago),
        },
        member_activity,
        overdue_tasks: tasks.iter().filter(|t| t.is_overdue_at(now)).count(),
        upcoming_deadlines,
    }
}
