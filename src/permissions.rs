// src/permissions.rs
//
// Role checks on team/project memberships. `role` is the caller's membership
// role on the team or project in question, `None` when not a member.

use crate::models::{MemberRole, Task, TaskComment};

pub fn is_member(role: Option<MemberRole>) -> bool {
    role.is_some()
}

/// Admins and owners.
pub fn can_manage(role: Option<MemberRole>) -> bool {
    role.map_or(false, |r| r.is_admin())
}

pub fn is_owner(role: Option<MemberRole>) -> bool {
    role.map_or(false, |r| r.is_owner())
}

/// Only owners may hand out the owner role.
pub fn can_grant(role: Option<MemberRole>, requested: MemberRole) -> bool {
    !requested.is_owner() || is_owner(role)
}

/// Full edit and delete of a task.
pub fn can_edit_task(project_role: Option<MemberRole>, task: &Task, user_id: i64) -> bool {
    can_manage(project_role) || task.is_created_by(user_id)
}

pub fn can_change_status(project_role: Option<MemberRole>, task: &Task, user_id: i64) -> bool {
    task.is_assigned_to(user_id) || task.is_created_by(user_id) || can_manage(project_role)
}

/// Moving a task to `done` is narrower than other status changes.
pub fn can_complete(project_role: Option<MemberRole>, task: &Task, user_id: i64) -> bool {
    task.is_assigned_to(user_id) || can_manage(project_role)
}

pub fn can_view_task(project_role: Option<MemberRole>, task: &Task, user_id: i64) -> bool {
    is_member(project_role) || task.is_assigned_to(user_id) || task.is_created_by(user_id)
}

pub fn can_edit_comment(project_role: Option<MemberRole>, comment: &TaskComment, user_id: i64) -> bool {
    comment.author_id == Some(user_id) || can_manage(project_role)
}

pub fn can_delete_comment(
    project_role: Option<MemberRole>,
    comment: &TaskComment,
    task: &Task,
    user_id: i64,
) -> bool {
    can_edit_comment(project_role, comment, user_id) || task.is_created_by(user_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Priority, TaskStatus};
    use chrono::Utc;

    const CREATOR: i64 = 1;
    const ASSIGNEE: i64 = 2;
    const OUTSIDER: i64 = 3;

    fn task() -> Task {
        let now = Utc::now();
        Task {
            id: 10,
            title: "Ship it".into(),
            description: String::new(),
            status: TaskStatus::Todo,
            priority: Priority::Medium,
            due_date: None,
            project_id: 4,
            assignee_id: Some(ASSIGNEE),
            created_by: Some(CREATOR),
            created_at: now,
            updated_at: now,
        }
    }

    fn comment(author: i64) -> TaskComment {
        let now = Utc::now();
        TaskComment {
            id: 20,
            task_id: 10,
            author_id: Some(author),
            content: "Looks good".into(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn only_owners_grant_ownership() {
        assert!(can_grant(Some(MemberRole::Owner), MemberRole::Owner));
        assert!(!can_grant(Some(MemberRole::Admin), MemberRole::Owner));
        assert!(can_grant(Some(MemberRole::Admin), MemberRole::Admin));
        assert!(!can_manage(Some(MemberRole::Member)));
        assert!(!can_manage(None));
    }

    #[test]
    fn task_edit_is_for_admins_and_creator() {
        let task = task();
        assert!(can_edit_task(Some(MemberRole::Member), &task, CREATOR));
        assert!(can_edit_task(Some(MemberRole::Admin), &task, OUTSIDER));
        assert!(!can_edit_task(Some(MemberRole::Member), &task, ASSIGNEE));
    }

    #[test]
    fn creator_cannot_complete_unless_assignee_or_admin() {
        let task = task();
        assert!(can_change_status(Some(MemberRole::Member), &task, CREATOR));
        assert!(!can_complete(Some(MemberRole::Member), &task, CREATOR));
        assert!(can_complete(None, &task, ASSIGNEE));
        assert!(can_complete(Some(MemberRole::Owner), &task, OUTSIDER));
        assert!(!can_change_status(Some(MemberRole::Member), &task, OUTSIDER));
    }

    #[test]
    fn visibility_follows_membership_or_involvement() {
        let task = task();
        assert!(can_view_task(None, &task, ASSIGNEE));
        assert!(can_view_task(None, &task, CREATOR));
        assert!(can_view_task(Some(MemberRole::Member), &task, OUTSIDER));
        assert!(!can_view_task(None, &task, OUTSIDER));
    }

    #[test]
    fn task_creator_may_delete_but_not_edit_comments() {
        let task = task();
        let comment = comment(ASSIGNEE);
        assert!(can_edit_comment(None, &comment, ASSIGNEE));
        assert!(!can_edit_comment(Some(MemberRole::Member), &comment, CREATOR));
        assert!(can_delete_comment(Some(MemberRole::Member), &comment, &task, CREATOR));
        assert!(!can_delete_comment(Some(MemberRole::Member), &comment, &task, OUTSIDER));
        assert!(can_delete_comment(Some(MemberRole::Admin), &comment, &task, OUTSIDER));
    }
}
