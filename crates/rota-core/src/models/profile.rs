use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Global application role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "profile_role", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum ProfileRole {
    User,
    Owner,
}

/// Application-level identity record, distinct from the auth identity.
/// `id` is what memberships reference; `user_id` is the auth identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct UserProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub role: ProfileRole,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn display_name(&self) -> String {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (Some(first), None) => first.to_string(),
            (None, Some(last)) => last.to_string(),
            (None, None) => self.email.clone(),
        }
    }
}

/// Payload for the idempotent profile upsert keyed on `user_id`
#[derive(Debug, Clone)]
pub struct EnsureProfile {
    pub user_id: Uuid,
    pub email: String,
    pub role: ProfileRole,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}
