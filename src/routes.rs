// src/routes.rs

use serde::{Deserialize, Deserializer, Serialize};

pub mod routes;

pub mod activity {
    pub mod activity_handlers;
    pub mod activity_models;
}

pub mod auth {
    pub mod auth_handlers;
    pub mod auth_models;
}

pub mod health {
    pub mod health_handlers;
    pub mod health_models;
}

pub mod notifications {
    pub mod notifications_handlers;
    pub mod notifications_models;
}

pub mod projects {
    pub mod projects_handlers;
    pub mod projects_models;
}

pub mod tasks {
    pub mod tasks_handlers;
    pub mod tasks_models;
}

pub mod teams {
    pub mod teams_handlers;
    pub mod teams_models;
}

pub mod token {
    pub mod token_handlers;
    pub mod token_models;
}

/// `{"data": ..., "message": ...}` envelope used by create and update endpoints.
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub data: T,
    pub message: String,
}

impl<T> DataResponse<T> {
    pub fn new(data: T, message: impl Into<String>) -> Self {
        Self { data, message: message.into() }
    }
}

/// Tells an explicit `null` apart from an absent field: absent stays `None`
/// through `#[serde(default)]`, `null` becomes `Some(None)`.
pub fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
