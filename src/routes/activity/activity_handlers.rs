use actix_web::{web, HttpResponse};
use log::info;

use super::activity_models::{ActivityQuery, ActivityResponse, ActivityView};
use crate::auth::Caller;
use crate::error::ApiError;
use crate::services::activity;
use crate::state::AppState;

const DEFAULT_HOURS: i64 = 24;
const MAX_HOURS: i64 = 24 * 30;
const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

/// Reads a positive integer parameter, clamped to `max`.
fn bounded_param(raw: Option<&str>, field: &str, default: i64, max: i64) -> Result<i64, ApiError> {
    match raw {
        None => Ok(default),
        Some(value) => match value.trim().parse::<i64>() {
            Ok(n) if n > 0 => Ok(n.min(max)),
            _ => Err(ApiError::field(field, "A positive integer is required.")),
        },
    }
}

// The caller's own recent activity, newest first
pub async fn recent_activity(
    state: web::Data<AppState>,
    caller: Caller,
    query: web::Query<ActivityQuery>,
) -> Result<HttpResponse, ApiError> {
    let hours = bounded_param(query.hours.as_deref(), "hours", DEFAULT_HOURS, MAX_HOURS)?;
    let limit = bounded_param(query.limit.as_deref(), "limit", DEFAULT_LIMIT, MAX_LIMIT)?;
    info!("Received request for activity of user {} in the last {}h", caller.id(), hours);

    let results: Vec<ActivityView> = activity::recent(&state, caller.id(), hours, limit)
        .await?
        .into_iter()
        .map(ActivityView::from)
        .collect();
    Ok(HttpResponse::Ok().json(ActivityResponse {
        hours,
        count: results.len(),
        results,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_default_and_clamp() {
        assert_eq!(bounded_param(None, "hours", 24, 720).unwrap(), 24);
        assert_eq!(bounded_param(Some("48"), "hours", 24, 720).unwrap(), 48);
        assert_eq!(bounded_param(Some("5000"), "limit", 50, 200).unwrap(), 200);
        assert!(bounded_param(Some("0"), "limit", 50, 200).is_err());
        assert!(bounded_param(Some("abc"), "hours", 24, 720).is_err());
    }
}
