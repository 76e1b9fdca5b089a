// src/models/mod.rs

/// Declares a closed set of string-backed choices stored as VARCHAR columns.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($variant:ident => ($value:literal, $label:literal)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $(#[serde(rename = $value)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value),+
                }
            }

            /// Human readable label, as shown in `*_display` fields.
            pub fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            /// Comma separated list of accepted values, for validation messages.
            pub fn choices() -> String {
                Self::ALL.iter().map(|c| c.as_str()).collect::<Vec<_>>().join(", ")
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($value => Ok($name::$variant),)+
                    other => Err(format!("\"{}\" is not a valid choice.", other)),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = String;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub mod activity_log;
pub mod notification;
pub mod project;
pub mod role;
pub mod task;
pub mod task_comment;
pub mod team;
pub mod token;
pub mod user;
pub mod user_profile;

pub use activity_log::{ActivityAction, ActivityLog, NewActivity, ObjectRef};
pub use notification::{NewNotification, Notification, NotificationKind};
pub use project::{NewProject, Project, ProjectMember, ProjectStatus};
pub use role::{MemberRole, Priority, UserRole};
pub use task::{NewTask, Task, TaskStatus};
pub use task_comment::{NewComment, TaskComment};
pub use team::{NewTeam, Team, TeamMember};
pub use token::BlacklistedToken;
pub use user::{NewUser, User};
pub use user_profile::{Location, UserProfile};
