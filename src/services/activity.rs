// src/services/activity.rs

use chrono::{Duration, Utc};
use log::error;
use serde_json::{json, Map, Value};

use crate::auth::ClientInfo;
use crate::models::{ActivityAction, ActivityLog, NewActivity, ObjectRef};
use crate::state::AppState;
use crate::store::StoreResult;

/// Field level `{"field": {"old": .., "new": ..}}` diff recorded with updates.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Changes(Map<String, Value>);

impl Changes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track<T: ToString + PartialEq>(&mut self, field: &str, old: &T, new: &T) {
        if old != new {
            self.0
                .insert(field.to_string(), json!({ "old": old.to_string(), "new": new.to_string() }));
        }
    }

    pub fn track_opt<T: ToString + PartialEq>(&mut self, field: &str, old: &Option<T>, new: &Option<T>) {
        if old != new {
            let show = |v: &Option<T>| v.as_ref().map(ToString::to_string);
            self.0.insert(field.to_string(), json!({ "old": show(old), "new": show(new) }));
        }
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// Records an activity row. Failures are logged and never fail the request.
pub async fn record(
    state: &AppState,
    user_id: Option<i64>,
    client: &ClientInfo,
    action: ActivityAction,
    object: Option<ObjectRef>,
    metadata: Value,
) {
    let activity = NewActivity {
        user_id,
        action,
        object,
        metadata,
        ip_address: client.ip_address.clone(),
        user_agent: client.user_agent.clone(),
    };
    if let Err(e) = state.store.record_activity(activity).await {
        error!("Failed to record {} activity for user {:?}: {}", action, user_id, e);
    }
}

/// Newest first, within the last `hours`.
pub async fn recent(state: &AppState, user_id: i64, hours: i64, limit: i64) -> StoreResult<Vec<ActivityLog>> {
    let since = Utc::now() - Duration::hours(hours);
    state.store.activity_for_user_since(user_id, since, limit).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_changed_fields_are_kept() {
        let mut changes = Changes::new();
        changes.track("title", &"Old".to_string(), &"New".to_string());
        changes.track("status", &"todo", &"todo");
        changes.track_opt("assignee", &Some(3), &None::<i64>);
        assert!(changes.contains("title"));
        assert!(!changes.contains("status"));
        assert_eq!(changes.fields(), vec!["assignee".to_string(), "title".to_string()]);
        assert_eq!(
            changes.into_value()["assignee"],
            json!({ "old": "3", "new": null })
        );
    }
}
