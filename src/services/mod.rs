// src/services/mod.rs
//
// Request level operations. Handlers parse and authenticate, services check
// roles, validate, write through the store and raise side effects (activity
// rows, notifications, emails).

use std::collections::HashMap;
use std::str::FromStr;

use crate::error::{ApiError, FieldErrors};
use crate::models::{MemberRole, User};
use crate::state::AppState;
use crate::store::StoreResult;
use crate::validation::REQUIRED;

pub mod activity;
pub mod emails;
pub mod notifications;
pub mod notifier;
pub mod projects;
pub mod tasks;
pub mod teams;
pub mod tokens;
pub mod users;

pub type ServiceResult<T> = Result<T, ApiError>;

pub(crate) async fn users_by_id(state: &AppState, ids: Vec<i64>) -> StoreResult<HashMap<i64, User>> {
    let mut ids = ids;
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let users = state.store.users_by_ids(&ids).await?;
    Ok(users.into_iter().map(|u| (u.id, u)).collect())
}

/// Parses an optional choice field, recording the error under `field`.
pub(crate) fn parse_choice<T>(errors: &mut FieldErrors, field: &str, raw: Option<&str>) -> Option<T>
where
    T: FromStr<Err = String>,
{
    match raw.map(str::parse::<T>) {
        Some(Ok(value)) => Some(value),
        Some(Err(message)) => {
            errors.add(field, message);
            None
        }
        None => None,
    }
}

/// A list query parameter; blank values mean no filter.
pub(crate) fn filter_param(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().map(str::trim).filter(|value| !value.is_empty())
}

pub(crate) fn parse_id(errors: &mut FieldErrors, field: &str, raw: Option<&str>) -> Option<i64> {
    let raw = raw?;
    match raw.trim().parse() {
        Ok(id) => Some(id),
        Err(_) => {
            errors.add(field, "Enter a whole number.");
            None
        }
    }
}

/// Membership role from a request body; `default` applies when absent.
pub(crate) fn parse_member_role(raw: Option<&str>, default: Option<MemberRole>) -> Result<MemberRole, ApiError> {
    match raw {
        Some(value) => value.parse::<MemberRole>().map_err(|_| {
            ApiError::field("role", format!("Invalid role. Must be one of: {}", MemberRole::choices()))
        }),
        None => default.ok_or_else(|| ApiError::field("role", REQUIRED)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;

    #[test]
    fn member_role_defaults_and_errors() {
        assert_eq!(parse_member_role(None, Some(MemberRole::Member)).unwrap(), MemberRole::Member);
        assert_eq!(parse_member_role(Some("admin"), None).unwrap(), MemberRole::Admin);
        assert!(parse_member_role(None, None).is_err());
        match parse_member_role(Some("boss"), None) {
            Err(ApiError::Validation(errors)) => assert_eq!(
                errors.get("role").unwrap()[0],
                "Invalid role. Must be one of: owner, admin, member"
            ),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn choice_errors_are_collected() {
        let mut errors = FieldErrors::new();
        assert_eq!(parse_choice::<Priority>(&mut errors, "priority", Some("low")), Some(Priority::Low));
        assert_eq!(parse_choice::<Priority>(&mut errors, "priority", Some("urgent")), None);
        assert_eq!(errors.get("priority").unwrap()[0], "\"urgent\" is not a valid choice.");
    }

    #[test]
    fn blank_filters_are_ignored() {
        assert_eq!(filter_param(&Some("  done ".into())), Some("done"));
        assert_eq!(filter_param(&Some("   ".into())), None);
        assert_eq!(filter_param(&None), None);

        let mut errors = FieldErrors::new();
        assert_eq!(parse_id(&mut errors, "team", Some("12")), Some(12));
        assert_eq!(parse_id(&mut errors, "team", Some("twelve")), None);
        assert_eq!(errors.get("team").unwrap()[0], "Enter a whole number.");
    }
}
