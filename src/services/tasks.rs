// src/services/tasks.rs

use std::collections::HashMap;

use chrono::Utc;
use log::{error, info};
use serde_json::json;

use super::{activity, emails, filter_param, notifier, parse_choice, parse_id, users_by_id, ServiceResult};
use crate::auth::Caller;
use crate::error::{ApiError, FieldErrors};
use crate::models::{
    ActivityAction, MemberRole, NewComment, NewTask, ObjectRef, Priority, Project, Task, TaskComment, TaskStatus, User,
};
use crate::pagination::{self, Page, PageLinks, PageRequest};
use crate::permissions;
use crate::routes::tasks::tasks_models::{
    AssignRequest, CommentRequest, CommentView, PageQuery, StatusRequest, TaskListQuery, TaskRequest, TaskView,
};
use crate::state::AppState;
use crate::store::StoreResult;
use crate::validation::{self, REQUIRED};

const ORDERING_FIELDS: &[&str] = &["title", "status", "priority", "due_date", "created_at", "updated_at"];
const COMMENT_MAX_CHARS: usize = 2000;

/// A task as the caller sees it, with its project and the caller's role there.
struct TaskAccess {
    task: Task,
    project: Project,
    role: Option<MemberRole>,
}

/// Tasks outside the caller's projects are only visible to their assignee and creator.
async fn visible_task(state: &AppState, caller: &Caller, task_id: i64) -> ServiceResult<TaskAccess> {
    let task = state.store.task_by_id(task_id).await?.ok_or_else(ApiError::not_found)?;
    let role = state
        .store
        .project_member(task.project_id, caller.id())
        .await?
        .map(|m| m.role);
    if !permissions::can_view_task(role, &task, caller.id()) {
        return Err(ApiError::not_found());
    }
    let project = state
        .store
        .project_by_id(task.project_id)
        .await?
        .ok_or_else(ApiError::not_found)?;
    Ok(TaskAccess { task, project, role })
}

pub async fn task_views(state: &AppState, tasks: Vec<Task>) -> StoreResult<Vec<TaskView>> {
    let mut project_ids: Vec<i64> = tasks.iter().map(|t| t.project_id).collect();
    project_ids.sort_unstable();
    project_ids.dedup();
    let project_names: HashMap<i64, String> = state
        .store
        .projects_by_ids(&project_ids)
        .await?
        .into_iter()
        .map(|p| (p.id, p.name))
        .collect();

    let user_ids = tasks
        .iter()
        .flat_map(|t| [t.assignee_id, t.created_by])
        .flatten()
        .collect();
    let users = users_by_id(state, user_ids).await?;

    let task_ids: Vec<i64> = tasks.iter().map(|t| t.id).collect();
    let comment_counts = state.store.comment_counts(&task_ids).await?;

    Ok(tasks
        .into_iter()
        .map(|task| {
            let project_name = project_names.get(&task.project_id).cloned().unwrap_or_default();
            let assignee = task.assignee_id.and_then(|id| users.get(&id));
            let creator = task.created_by.and_then(|id| users.get(&id));
            let comments = comment_counts.get(&task.id).copied().unwrap_or(0);
            TaskView::new(task, project_name, assignee, creator, comments)
        })
        .collect())
}

pub async fn task_view(state: &AppState, task: Task) -> StoreResult<TaskView> {
    let mut views = task_views(state, vec![task]).await?;
    views.pop().ok_or(crate::store::StoreError::NotFound)
}

fn validate_title(errors: &mut FieldErrors, raw: &str) -> String {
    match validation::trimmed_length(raw, 2, 200, "Task title") {
        Ok(title) => title,
        Err(message) => {
            errors.add("title", message);
            raw.to_string()
        }
    }
}

/// Resolves the project a task is written to; the caller must belong to it.
async fn validate_project(
    state: &AppState,
    caller: &Caller,
    errors: &mut FieldErrors,
    project_id: i64,
) -> ServiceResult<Option<Project>> {
    let project = match state.store.project_by_id(project_id).await? {
        Some(project) => project,
        None => {
            errors.add("project", format!("Invalid pk \"{}\" - object does not exist.", project_id));
            return Ok(None);
        }
    };
    if state.store.project_member(project.id, caller.id()).await?.is_none() {
        errors.add("project", "You must be a member of the project to create tasks in it.");
        return Ok(None);
    }
    Ok(Some(project))
}

async fn validate_assignee(
    state: &AppState,
    errors: &mut FieldErrors,
    assignee_id: i64,
    project: Option<&Project>,
) -> ServiceResult<()> {
    if state.store.user_by_id(assignee_id).await?.is_none() {
        errors.add("assignee", format!("Invalid pk \"{}\" - object does not exist.", assignee_id));
        return Ok(());
    }
    if let Some(project) = project {
        if state.store.project_member(project.id, assignee_id).await?.is_none() {
            errors.add("assignee", "Assignee must be a member of the project.");
        }
    }
    Ok(())
}

fn parse_status(raw: Option<&str>) -> ServiceResult<TaskStatus> {
    let raw = raw.ok_or_else(|| ApiError::field("status", REQUIRED))?;
    raw.parse::<TaskStatus>().map_err(|_| {
        ApiError::field("status", format!("Invalid status. Must be one of: {}", TaskStatus::choices()))
    })
}

async fn email_new_assignee(state: &AppState, task: &Task, project: &Project, actor: &User) {
    let assignee_id = match task.assignee_id {
        Some(id) if id != actor.id => id,
        _ => return,
    };
    match state.store.user_by_id(assignee_id).await {
        Ok(Some(assignee)) => emails::send_task_assignment(state, &assignee, task, project, actor).await,
        Ok(None) => {}
        Err(e) => error!("Failed to load assignee {} for task {}: {}", assignee_id, task.id, e),
    }
}

fn change_action(changes: &activity::Changes, task: &Task) -> ActivityAction {
    if changes.contains("status") {
        ActivityAction::StatusChanged
    } else if changes.contains("priority") {
        ActivityAction::PriorityChanged
    } else if changes.contains("assignee") {
        if task.assignee_id.is_some() {
            ActivityAction::Assigned
        } else {
            ActivityAction::Unassigned
        }
    } else {
        ActivityAction::Updated
    }
}

/// Writes the edit and raises activity, notifications and the assignment email.
async fn save_task_change(
    state: &AppState,
    caller: &Caller,
    before: &Task,
    mut after: Task,
    project: &Project,
    changes: activity::Changes,
) -> ServiceResult<Task> {
    after.updated_at = Utc::now();
    let saved = state.store.update_task(&after).await?;

    notifier::task_updated(state, before, &saved, project, &caller.user, &changes).await;
    if changes.contains("assignee") {
        email_new_assignee(state, &saved, project, &caller.user).await;
    }
    let action = change_action(&changes, &saved);
    activity::record(
        state,
        Some(caller.id()),
        &caller.client,
        action,
        Some(ObjectRef::task(saved.id)),
        json!({ "title": saved.title, "changes": changes.into_value() }),
    )
    .await;
    Ok(saved)
}

pub async fn list(
    state: &AppState,
    caller: &Caller,
    query: &TaskListQuery,
    links: &PageLinks,
) -> ServiceResult<Page<TaskView>> {
    let request = PageRequest::parse(query.page.as_deref(), query.page_size.as_deref())?;
    let now = Utc::now();
    let assigned_to_me = query.assigned_to_me.as_deref().map_or(false, validation::flag);
    let overdue = query.overdue.as_deref().map_or(false, validation::flag);
    let mut errors = FieldErrors::new();
    let project_filter = parse_id(&mut errors, "project", filter_param(&query.project));
    let assignee_filter = parse_id(&mut errors, "assignee", filter_param(&query.assignee));
    let status_filter: Option<TaskStatus> = parse_choice(&mut errors, "status", filter_param(&query.status));
    let priority_filter: Option<Priority> = parse_choice(&mut errors, "priority", filter_param(&query.priority));
    errors.into_result()?;

    let mut tasks: Vec<Task> = state
        .store
        .tasks_visible_to(caller.id())
        .await?
        .into_iter()
        .filter(|t| project_filter.map_or(true, |id| t.project_id == id))
        .filter(|t| assignee_filter.map_or(true, |id| t.assignee_id == Some(id)))
        .filter(|t| status_filter.map_or(true, |s| t.status == s))
        .filter(|t| priority_filter.map_or(true, |p| t.priority == p))
        .filter(|t| !assigned_to_me || t.is_assigned_to(caller.id()))
        .filter(|t| !overdue || t.is_overdue_at(now))
        .filter(|t| pagination::search_matches(query.search.as_deref(), &[t.title.as_str(), t.description.as_str()]))
        .collect();

    let keys = pagination::ordering(query.ordering.as_deref(), ORDERING_FIELDS, "-created_at");
    pagination::sort_by_keys(&mut tasks, &keys, |a, b, field| match field {
        "title" => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        "status" => a.status.as_str().cmp(b.status.as_str()),
        "priority" => a.priority.as_str().cmp(b.priority.as_str()),
        "due_date" => a.due_date.cmp(&b.due_date),
        "updated_at" => a.updated_at.cmp(&b.updated_at),
        _ => a.created_at.cmp(&b.created_at),
    });

    let Page { count, next, previous, results } = pagination::paginate(tasks, request, links)?;
    let results = task_views(state, results).await?;
    Ok(Page { count, next, previous, results })
}

pub async fn create(state: &AppState, caller: &Caller, request: TaskRequest) -> ServiceResult<TaskView> {
    let mut errors = FieldErrors::new();

    let project = match request.project {
        Some(project_id) => validate_project(state, caller, &mut errors, project_id).await?,
        None => {
            errors.add("project", REQUIRED);
            None
        }
    };
    let title = match request.title.as_deref() {
        Some(raw) => validate_title(&mut errors, raw),
        None => {
            errors.add("title", REQUIRED);
            String::new()
        }
    };
    let description = request.description.unwrap_or_default();
    if let Err(message) = validation::max_length(&description, 2000) {
        errors.add("description", message);
    }
    let status: TaskStatus = parse_choice(&mut errors, "status", request.status.as_deref()).unwrap_or_default();
    let priority: Priority = parse_choice(&mut errors, "priority", request.priority.as_deref()).unwrap_or_default();
    let assignee_id = request.assignee.flatten();
    if let Some(assignee_id) = assignee_id {
        validate_assignee(state, &mut errors, assignee_id, project.as_ref()).await?;
    }
    errors.into_result()?;

    let project = project.ok_or_else(|| ApiError::field("project", REQUIRED))?;
    let new_task = NewTask {
        title,
        description,
        status,
        priority,
        due_date: request.due_date.flatten(),
        project_id: project.id,
        assignee_id,
        created_by: Some(caller.id()),
    };
    let task = state.store.create_task(new_task).await?;
    info!("Task {} created in project {} by user {}", task.id, project.id, caller.id());

    activity::record(
        state,
        Some(caller.id()),
        &caller.client,
        ActivityAction::Created,
        Some(ObjectRef::task(task.id)),
        json!({
            "title": task.title,
            "status": task.status.as_str(),
            "priority": task.priority.as_str(),
            "project_id": project.id,
            "project_name": project.name,
            "assignee_id": task.assignee_id,
        }),
    )
    .await;
    notifier::task_created(state, &task, &project, &caller.user).await;
    email_new_assignee(state, &task, &project, &caller.user).await;

    Ok(task_view(state, task).await?)
}

pub async fn get(state: &AppState, caller: &Caller, task_id: i64) -> ServiceResult<TaskView> {
    let access = visible_task(state, caller, task_id).await?;
    Ok(task_view(state, access.task).await?)
}

/// PUT when `partial` is false, which makes `title` and `project` mandatory.
pub async fn update(
    state: &AppState,
    caller: &Caller,
    task_id: i64,
    request: TaskRequest,
    partial: bool,
) -> ServiceResult<TaskView> {
    let TaskAccess { task, project, role } = visible_task(state, caller, task_id).await?;

    // Check if user can update (project admin/owner or task creator)
    if !permissions::can_edit_task(role, &task, caller.id()) {
        return Err(ApiError::forbidden("Only project admins/owners or task creator can update tasks."));
    }

    let mut errors = FieldErrors::new();
    let mut updated = task.clone();

    let mut target_project = Some(project.clone());
    match request.project {
        Some(project_id) if project_id != project.id => {
            target_project = validate_project(state, caller, &mut errors, project_id).await?;
            updated.project_id = project_id;
        }
        Some(_) => {}
        None if !partial => errors.add("project", REQUIRED),
        None => {}
    }
    match request.title.as_deref() {
        Some(raw) => updated.title = validate_title(&mut errors, raw),
        None if !partial => errors.add("title", REQUIRED),
        None => {}
    }
    if let Some(description) = request.description {
        if let Err(message) = validation::max_length(&description, 2000) {
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
    if let Some(due_date) = request.due_date {
        updated.due_date = due_date;
    }
    if let Some(assignee_id) = request.assignee {
        updated.assignee_id = assignee_id;
    }
    if let Some(assignee_id) = updated.assignee_id {
        if request.assignee.is_some() || request.project.is_some() {
            validate_assignee(state, &mut errors, assignee_id, target_project.as_ref()).await?;
        }
    }
    errors.into_result()?;

    let target_project = target_project.unwrap_or(project);
    let mut changes = activity::Changes::new();
    changes.track("title", &task.title, &updated.title);
    changes.track("description", &task.description, &updated.description);
    changes.track("status", &task.status, &updated.status);
    changes.track("priority", &task.priority, &updated.priority);
    changes.track_opt("due_date", &task.due_date, &updated.due_date);
    changes.track("project", &task.project_id, &updated.project_id);
    changes.track_opt("assignee", &task.assignee_id, &updated.assignee_id);

    let saved = save_task_change(state, caller, &task, updated, &target_project, changes).await?;
    Ok(task_view(state, saved).await?)
}

pub async fn delete(state: &AppState, caller: &Caller, task_id: i64) -> ServiceResult<()> {
    let TaskAccess { task, project, role } = visible_task(state, caller, task_id).await?;

    if !permissions::can_edit_task(role, &task, caller.id()) {
        return Err(ApiError::forbidden("Only project admins/owners or task creator can delete tasks."));
    }

    state.store.delete_task(task.id).await?;
    info!("Task {} deleted by user {}", task.id, caller.id());
    activity::record(
        state,
        Some(caller.id()),
        &caller.client,
        ActivityAction::Deleted,
        Some(ObjectRef::task(task.id)),
        json!({ "title": task.title, "project_id": project.id, "project_name": project.name }),
    )
    .await;
    Ok(())
}

/// Returns the updated task and whether it ended up assigned.
pub async fn assign(
    state: &AppState,
    caller: &Caller,
    task_id: i64,
    request: AssignRequest,
) -> ServiceResult<(TaskView, bool)> {
    let TaskAccess { task, project, role } = visible_task(state, caller, task_id).await?;

    // Check if user can assign tasks (project admin/owner)
    if !permissions::can_manage(role) {
        return Err(ApiError::forbidden("Only project admins and owners can assign tasks."));
    }

    let mut updated = task.clone();
    match request.assignee_id {
        None => updated.assignee_id = None,
        Some(user_id) => {
            let assignee = state
                .store
                .user_by_id(user_id)
                .await?
                .ok_or_else(|| ApiError::missing("User not found."))?;

            // Check if assignee is a project member
            if state.store.project_member(project.id, assignee.id).await?.is_none() {
                return Err(ApiError::bad_request("Assignee must be a member of the project."));
            }
            updated.assignee_id = Some(assignee.id);
        }
    }

    let mut changes = activity::Changes::new();
    changes.track_opt("assignee", &task.assignee_id, &updated.assignee_id);
    let saved = save_task_change(state, caller, &task, updated, &project, changes).await?;
    let assigned = saved.assignee_id.is_some();
    Ok((task_view(state, saved).await?, assigned))
}

pub async fn change_status(
    state: &AppState,
    caller: &Caller,
    task_id: i64,
    request: StatusRequest,
) -> ServiceResult<TaskView> {
    let TaskAccess { task, project, role } = visible_task(state, caller, task_id).await?;
    let new_status = parse_status(request.status.as_deref())?;

    if !permissions::can_change_status(role, &task, caller.id()) {
        return Err(ApiError::forbidden("You do not have permission to update this task status."));
    }
    if new_status == TaskStatus::Done && !permissions::can_complete(role, &task, caller.id()) {
        return Err(ApiError::forbidden(
            "Only the task assignee or project admins/owners can mark tasks as done.",
        ));
    }

    let mut updated = task.clone();
    updated.status = new_status;
    let mut changes = activity::Changes::new();
    changes.track("status", &task.status, &updated.status);
    let saved = save_task_change(state, caller, &task, updated, &project, changes).await?;
    Ok(task_view(state, saved).await?)
}

fn validate_content(raw: Option<&str>) -> ServiceResult<String> {
    let raw = raw.ok_or_else(|| ApiError::field("content", REQUIRED))?;
    let content = raw.trim();
    if content.is_empty() {
        return Err(ApiError::field("content", "Comment content cannot be empty."));
    }
    if content.chars().count() > COMMENT_MAX_CHARS {
        return Err(ApiError::field("content", "Comment content must not exceed 2000 characters."));
    }
    Ok(content.to_string())
}

async fn comment_views(state: &AppState, task: &Task, comments: Vec<TaskComment>) -> StoreResult<Vec<CommentView>> {
    let users = users_by_id(state, comments.iter().filter_map(|c| c.author_id).collect()).await?;
    Ok(comments
        .into_iter()
        .map(|c| {
            let author = c.author_id.and_then(|id| users.get(&id));
            CommentView::new(c, &task.title, author)
        })
        .collect())
}

async fn comment_on(state: &AppState, task: &Task, comment_id: i64) -> ServiceResult<TaskComment> {
    match state.store.comment_by_id(comment_id).await? {
        Some(comment) if comment.task_id == task.id => Ok(comment),
        _ => Err(ApiError::not_found()),
    }
}

/// Newest first.
pub async fn list_comments(
    state: &AppState,
    caller: &Caller,
    task_id: i64,
    query: &PageQuery,
    links: &PageLinks,
) -> ServiceResult<Page<CommentView>> {
    let request = PageRequest::parse(query.page.as_deref(), query.page_size.as_deref())?;
    let access = visible_task(state, caller, task_id).await?;
    let mut comments = state.store.comments_for_task(access.task.id).await?;
    comments.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

    let Page { count, next, previous, results } = pagination::paginate(comments, request, links)?;
    let results = comment_views(state, &access.task, results).await?;
    Ok(Page { count, next, previous, results })
}

pub async fn create_comment(
    state: &AppState,
    caller: &Caller,
    task_id: i64,
    request: CommentRequest,
) -> ServiceResult<CommentView> {
    let TaskAccess { task, project, .. } = visible_task(state, caller, task_id).await?;
    let content = validate_content(request.content.as_deref())?;

    let comment = state
        .store
        .create_comment(NewComment { task_id: task.id, author_id: Some(caller.id()), content })
        .await?;
    info!("Comment {} added to task {} by user {}", comment.id, task.id, caller.id());

    let preview: String = comment.content.chars().take(100).collect();
    activity::record(
        state,
        Some(caller.id()),
        &caller.client,
        ActivityAction::CommentAdded,
        Some(ObjectRef::task(task.id)),
        json!({ "comment_id": comment.id, "task_title": task.title, "comment_preview": preview }),
    )
    .await;
    notifier::comment_added(state, &comment, &task, &project, &caller.user).await;

    Ok(CommentView::new(comment, &task.title, Some(&caller.user)))
}

pub async fn get_comment(state: &AppState, caller: &Caller, task_id: i64, comment_id: i64) -> ServiceResult<CommentView> {
    let access = visible_task(state, caller, task_id).await?;
    let comment = comment_on(state, &access.task, comment_id).await?;
    let mut views = comment_views(state, &access.task, vec![comment]).await?;
    views.pop().ok_or_else(ApiError::not_found)
}

/// A PATCH without `content` leaves the comment untouched.
pub async fn update_comment(
    state: &AppState,
    caller: &Caller,
    task_id: i64,
    comment_id: i64,
    request: CommentRequest,
    partial: bool,
) -> ServiceResult<CommentView> {
    let TaskAccess { task, role, .. } = visible_task(state, caller, task_id).await?;
    let comment = comment_on(state, &task, comment_id).await?;

    if !permissions::can_edit_comment(role, &comment, caller.id()) {
        return Err(ApiError::forbidden(
            "Only comment author or project admins/owners can update comments.",
        ));
    }

    if request.content.is_none() && partial {
        let mut views = comment_views(state, &task, vec![comment]).await?;
        return views.pop().ok_or_else(ApiError::not_found);
    }

    let content = validate_content(request.content.as_deref())?;
    let mut updated = comment.clone();
    updated.content = content;
    updated.updated_at = Utc::now();
    let saved = state.store.update_comment(&updated).await?;

    let mut changes = activity::Changes::new();
    changes.track("content", &comment.content, &saved.content);
    activity::record(
        state,
        Some(caller.id()),
        &caller.client,
        ActivityAction::Updated,
        Some(ObjectRef::comment(saved.id)),
        json!({ "task_id": task.id, "task_title": task.title, "changes": changes.into_value() }),
    )
    .await;

    let mut views = comment_views(state, &task, vec![saved]).await?;
    views.pop().ok_or_else(ApiError::not_found)
}

pub async fn delete_comment(state: &AppState, caller: &Caller, task_id: i64, comment_id: i64) -> ServiceResult<()> {
    let TaskAccess { task, role, .. } = visible_task(state, caller, task_id).await?;
    let comment = comment_on(state, &task, comment_id).await?;

    if !permissions::can_delete_comment(role, &comment, &task, caller.id()) {
        return Err(ApiError::forbidden(
            "Only comment author, project admins/owners, or task creator can delete comments.",
        ));
    }

    state.store.delete_comment(comment.id).await?;
    activity::record(
        state,
        Some(caller.id()),
        &caller.client,
        ActivityAction::Deleted,
        Some(ObjectRef::comment(comment.id)),
        json!({ "comment_id": comment.id, "task_id": task.id, "task_title": task.title }),
    )
    .await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_errors_list_the_choices() {
        assert_eq!(parse_status(Some("done")).unwrap(), TaskStatus::Done);
        match parse_status(Some("finished")) {
            Err(ApiError::Validation(errors)) => assert_eq!(
                errors.get("status").unwrap()[0],
                "Invalid status. Must be one of: todo, in_progress, done, blocked"
            ),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(parse_status(None), Err(ApiError::Validation(_))));
    }

    #[test]
    fn comment_content_is_trimmed_and_bounded() {
        assert_eq!(validate_content(Some("  looks good  ")).unwrap(), "looks good");
        assert!(validate_content(Some("   ")).is_err());
        assert!(validate_content(Some(&"x".repeat(2001))).is_err());
        assert!(validate_content(Some(&"x".repeat(2000))).is_ok());
    }

    #[test]
    fn activity_action_prefers_status_then_priority() {
        let now = Utc::now();
        let task = Task {
            id: 1,
            title: "Ship".into(),
            description: String::new(),
            status: TaskStatus::Todo,
            priority: Priority::Low,
            due_date: None,
            project_id: 1,
            assignee_id: None,
            created_by: Some(1),
            created_at: now,
            updated_at: now,
        };
        let mut changes = activity::Changes::new();
        changes.track_opt("assignee", &Some(2), &None);
        assert_eq!(change_action(&changes, &task), ActivityAction::Unassigned);
        changes.track("priority", &Priority::Low, &Priority::High);
        assert_eq!(change_action(&changes, &task), ActivityAction::PriorityChanged);
        changes.track("status", &TaskStatus::Todo, &TaskStatus::Done);
        assert_eq!(change_action(&changes, &task), ActivityAction::StatusChanged);
    }
}
