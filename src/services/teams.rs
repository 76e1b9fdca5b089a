// src/services/teams.rs

use chrono::Utc;
use log::info;
use serde_json::json;

use super::{activity, notifier, parse_member_role, users_by_id, ServiceResult};
use crate::auth::Caller;
use crate::error::{ApiError, FieldErrors};
use crate::models::{ActivityAction, MemberRole, NewTeam, ObjectRef, Team};
use crate::pagination::{self, Page, PageLinks, PageRequest};
use crate::permissions;
use crate::routes::teams::teams_models::{
    AddMemberRequest, MemberView, TeamListQuery, TeamRequest, TeamView, UpdateMemberRequest,
};
use crate::state::AppState;
use crate::store::StoreResult;
use crate::validation::{self, REQUIRED};

const ORDERING_FIELDS: &[&str] = &["name", "created_at", "updated_at"];

pub async fn team_view(state: &AppState, team: Team) -> StoreResult<TeamView> {
    let members = state.store.team_members(team.id).await?;
    let users = users_by_id(state, members.iter().map(|m| m.user_id).collect()).await?;
    let members = members
        .iter()
        .map(|m| MemberView::from_team_member(m, users.get(&m.user_id)))
        .collect();
    Ok(TeamView::new(team, members))
}

/// The team and the caller's role on it. Non-members get a 404.
async fn visible_team(state: &AppState, caller: &Caller, team_id: i64) -> ServiceResult<(Team, MemberRole)> {
    let team = state.store.team_by_id(team_id).await?.ok_or_else(ApiError::not_found)?;
    match state.store.team_member(team_id, caller.id()).await? {
        Some(member) => Ok((team, member.role)),
        None => Err(ApiError::not_found()),
    }
}

async fn validate_name(state: &AppState, errors: &mut FieldErrors, raw: &str, exclude: Option<i64>) -> ServiceResult<String> {
    match validation::trimmed_length(raw, 2, 100, "Team name") {
        Ok(name) => {
            if state.store.team_name_taken(&name, exclude).await? {
                errors.add("name", "A team with this name already exists.");
            }
            Ok(name)
        }
        Err(message) => {
            errors.add("name", message);
            Ok(raw.to_string())
        }
    }
}

pub async fn list(
    state: &AppState,
    caller: &Caller,
    query: &TeamListQuery,
    links: &PageLinks,
) -> ServiceResult<Page<TeamView>> {
    let request = PageRequest::parse(query.page.as_deref(), query.page_size.as_deref())?;
    let mut teams: Vec<Team> = state
        .store
        .teams_for_user(caller.id())
        .await?
        .into_iter()
        .filter(|t| pagination::search_matches(query.search.as_deref(), &[t.name.as_str(), t.description.as_str()]))
        .collect();

    let keys = pagination::ordering(query.ordering.as_deref(), ORDERING_FIELDS, "-created_at");
    pagination::sort_by_keys(&mut teams, &keys, |a, b, field| match field {
        "name" => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        "updated_at" => a.updated_at.cmp(&b.updated_at),
        _ => a.created_at.cmp(&b.created_at),
    });

    let Page { count, next, previous, results } = pagination::paginate(teams, request, links)?;
    let mut views = Vec::with_capacity(results.len());
    for team in results {
        views.push(team_view(state, team).await?);
    }
    Ok(Page { count, next, previous, results: views })
}

pub async fn create(state: &AppState, caller: &Caller, request: TeamRequest) -> ServiceResult<TeamView> {
    let mut errors = FieldErrors::new();
    let name = match request.name.as_deref() {
        Some(raw) => validate_name(state, &mut errors, raw, None).await?,
        None => {
            errors.add("name", REQUIRED);
            String::new()
        }
    };
    let description = request.description.unwrap_or_default();
    if let Err(message) = validation::max_length(&description, 500) {
        errors.add("description", message);
    }
    errors.into_result()?;

    let team = state.store.create_team(NewTeam { name, description }, caller.id()).await?;
    info!("Team {} created by user {}", team.id, caller.id());

    activity::record(
        state,
        Some(caller.id()),
        &caller.client,
        ActivityAction::Created,
        Some(ObjectRef::team(team.id)),
        json!({ "name": team.name }),
    )
    .await;
    activity::record(
        state,
        Some(caller.id()),
        &caller.client,
        ActivityAction::MemberAdded,
        Some(ObjectRef::team(team.id)),
        json!({
            "member_id": caller.id(),
            "member_username": caller.user.username,
            "role": MemberRole::Owner.as_str(),
            "team_name": team.name,
        }),
    )
    .await;

    Ok(team_view(state, team).await?)
}

pub async fn get(state: &AppState, caller: &Caller, team_id: i64) -> ServiceResult<TeamView> {
    let (team, _) = visible_team(state, caller, team_id).await?;
    Ok(team_view(state, team).await?)
}

/// PUT when `partial` is false, which makes `name` mandatory.
pub async fn update(
    state: &AppState,
    caller: &Caller,
    team_id: i64,
    request: TeamRequest,
    partial: bool,
) -> ServiceResult<TeamView> {
    let (team, role) = visible_team(state, caller, team_id).await?;

    // Check if user is admin or owner
    if !permissions::can_manage(Some(role)) {
        return Err(ApiError::forbidden("Only team admins and owners can update team information."));
    }

    let mut errors = FieldErrors::new();
    let mut updated = team.clone();
    match request.name.as_deref() {
        Some(raw) => updated.name = validate_name(state, &mut errors, raw, Some(team.id)).await?,
        None if !partial => errors.add("name", REQUIRED),
        None => {}
    }
    if let Some(description) = request.description {
        if let Err(message) = validation::max_length(&description, 500) {
            errors.add("description", message);
        }
        updated.description = description;
    }
    errors.into_result()?;

    let mut changes = activity::Changes::new();
    changes.track("name", &team.name, &updated.name);
    changes.track("description", &team.description, &updated.description);

    updated.updated_at = Utc::now();
    let saved = state.store.update_team(&updated).await?;
    activity::record(
        state,
        Some(caller.id()),
        &caller.client,
        ActivityAction::Updated,
        Some(ObjectRef::team(saved.id)),
        json!({ "name": saved.name, "changes": changes.into_value() }),
    )
    .await;

    Ok(team_view(state, saved).await?)
}

pub async fn delete(state: &AppState, caller: &Caller, team_id: i64) -> ServiceResult<()> {
    let (team, role) = visible_team(state, caller, team_id).await?;

    // Check if user is the owner
    if !permissions::is_owner(Some(role)) {
        return Err(ApiError::forbidden("Only team owners can delete teams."));
    }

    state.store.delete_team(team.id).await?;
    info!("Team {} deleted by user {}", team.id, caller.id());
    activity::record(
        state,
        Some(caller.id()),
        &caller.client,
        ActivityAction::Deleted,
        Some(ObjectRef::team(team.id)),
        json!({ "name": team.name }),
    )
    .await;
    Ok(())
}

pub async fn add_member(
    state: &AppState,
    caller: &Caller,
    team_id: i64,
    request: AddMemberRequest,
) -> ServiceResult<MemberView> {
    let (team, role) = visible_team(state, caller, team_id).await?;

    if !permissions::can_manage(Some(role)) {
        return Err(ApiError::forbidden("Only team admins and owners can add members."));
    }

    let user_id = request.user_id.ok_or_else(|| ApiError::field("user_id", REQUIRED))?;
    let new_role = parse_member_role(request.role.as_deref(), Some(MemberRole::Member))?;

    let user = state
        .store
        .user_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::missing("User not found."))?;

    // Check if user is already a member
    if state.store.team_member(team.id, user.id).await?.is_some() {
        return Err(ApiError::bad_request("User is already a member of this team."));
    }

    if !permissions::can_grant(Some(role), new_role) {
        return Err(ApiError::forbidden("Only team owners can assign owner role."));
    }

    let member = state.store.add_team_member(team.id, user.id, new_role).await?;
    info!("User {} added to team {} as {}", user.id, team.id, new_role);

    activity::record(
        state,
        Some(user.id),
        &caller.client,
        ActivityAction::MemberAdded,
        Some(ObjectRef::team(team.id)),
        json!({
            "member_id": user.id,
            "member_username": user.username,
            "role": new_role.as_str(),
            "team_name": team.name,
        }),
    )
    .await;
    notifier::team_member_added(state, &team, &user, new_role).await;

    Ok(MemberView::from_team_member(&member, Some(&user)))
}

pub async fn update_member(
    state: &AppState,
    caller: &Caller,
    team_id: i64,
    user_id: i64,
    request: UpdateMemberRequest,
) -> ServiceResult<MemberView> {
    let (team, role) = visible_team(state, caller, team_id).await?;

    if !permissions::can_manage(Some(role)) {
        return Err(ApiError::forbidden("Only team admins and owners can update member roles."));
    }

    let member = state
        .store
        .team_member(team.id, user_id)
        .await?
        .ok_or_else(|| ApiError::missing("Member not found in this team."))?;

    if member.role.is_owner() {
        return Err(ApiError::bad_request("Cannot change the role of the team owner."));
    }

    let new_role = parse_member_role(request.role.as_deref(), None)?;
    if !permissions::can_grant(Some(role), new_role) {
        return Err(ApiError::forbidden("Only team owners can assign owner role."));
    }

    let updated = state.store.set_team_member_role(team.id, user_id, new_role).await?;
    activity::record(
        state,
        Some(caller.id()),
        &caller.client,
        ActivityAction::Updated,
        Some(ObjectRef::team(team.id)),
        json!({
            "member_id": user_id,
            "changes": { "role": { "old": member.role.as_str(), "new": new_role.as_str() } },
        }),
    )
    .await;

    let user = state.store.user_by_id(user_id).await?;
    Ok(MemberView::from_team_member(&updated, user.as_ref()))
}

pub async fn remove_member(state: &AppState, caller: &Caller, team_id: i64, user_id: i64) -> ServiceResult<()> {
    let (team, role) = visible_team(state, caller, team_id).await?;

    if !permissions::can_manage(Some(role)) {
        return Err(ApiError::forbidden("Only team admins and owners can remove members."));
    }

    let member = state
        .store
        .team_member(team.id, user_id)
        .await?
        .ok_or_else(|| ApiError::missing("Member not found in this team."))?;

    if member.role.is_owner() {
        return Err(ApiError::bad_request(
            "Cannot remove the team owner. Transfer ownership first or delete the team.",
        ));
    }
    if member.user_id == caller.id() {
        return Err(ApiError::bad_request(
            "You cannot remove yourself from the team. Please contact another admin or owner.",
        ));
    }

    state.store.remove_team_member(team.id, user_id).await?;
    info!("User {} removed from team {}", user_id, team.id);

    let user = state.store.user_by_id(user_id).await?;
    activity::record(
        state,
        Some(user_id),
        &caller.client,
        ActivityAction::MemberRemoved,
        Some(ObjectRef::team(team.id)),
        json!({
            "member_id": user_id,
            "member_username": user.as_ref().map(|u| u.username.clone()),
            "role": member.role.as_str(),
            "team_name": team.name,
        }),
    )
    .await;
    if let Some(user) = user {
        notifier::team_member_removed(state, &team, &user).await;
    }
    Ok(())
}
