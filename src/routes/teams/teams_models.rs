use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{MemberRole, Team, TeamMember, User};

// structs
#[derive(Debug, Clone, Serialize)]
pub struct MemberView {
    pub id: i64,
    pub user: i64,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub role_display: String,
    pub joined_at: DateTime<Utc>,
}

impl MemberView {
    pub fn from_team_member(member: &TeamMember, user: Option<&User>) -> Self {
        Self::build(member.id, member.user_id, member.role, member.joined_at, user)
    }

    pub fn build(
        id: i64,
        user_id: i64,
        role: MemberRole,
        joined_at: DateTime<Utc>,
        user: Option<&User>,
    ) -> Self {
        MemberView {
            id,
            user: user_id,
            username: user.map(|u| u.username.clone()).unwrap_or_default(),
            email: user.map(|u| u.email.clone()).unwrap_or_default(),
            full_name: user.map(User::full_name).unwrap_or_default(),
            role: role.as_str().to_string(),
            role_display: role.label().to_string(),
            joined_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamView {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub member_count: usize,
    pub members: Vec<MemberView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TeamView {
    pub fn new(team: Team, members: Vec<MemberView>) -> Self {
        TeamView {
            id: team.id,
            name: team.name,
            description: team.description,
            member_count: members.len(),
            members,
            created_at: team.created_at,
            updated_at: team.updated_at,
        }
    }
}

// json format

#[derive(Debug, Default, Deserialize)]
pub struct TeamListQuery {
    pub search: Option<String>,
    pub ordering: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
}

/// Body of POST, PUT and PATCH on teams. PUT requires `name`.
#[derive(Debug, Default, Deserialize)]
pub struct TeamRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub user_id: Option<i64>,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMemberRequest {
    pub role: Option<String>,
}
