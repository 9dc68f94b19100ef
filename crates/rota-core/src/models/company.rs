use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use utoipa::ToSchema;
use uuid::Uuid;

/// Company entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Role within a company
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "member_role", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum MembershipRole {
    Owner,
    Admin,
    Member,
}

impl MembershipRole {
    /// Owners and admins manage invitations.
    pub fn can_manage_invitations(&self) -> bool {
        matches!(self, MembershipRole::Owner | MembershipRole::Admin)
    }
}

impl Display for MembershipRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            MembershipRole::Owner => write!(f, "owner"),
            MembershipRole::Admin => write!(f, "admin"),
            MembershipRole::Member => write!(f, "member"),
        }
    }
}

/// A person's relationship to a company. One row per (company_id, user_profile_id).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CompanyMembership {
    pub company_id: Uuid,
    pub user_profile_id: Uuid,
    pub role: MembershipRole,
    pub is_active: bool,
    pub joined_at: DateTime<Utc>,
}

/// Upsert payload keyed on (company_id, user_profile_id)
#[derive(Debug, Clone)]
pub struct UpsertMembership {
    pub company_id: Uuid,
    pub user_profile_id: Uuid,
    pub role: MembershipRole,
    pub is_active: bool,
    pub joined_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manager_roles() {
        assert!(MembershipRole::Owner.can_manage_invitations());
        assert!(MembershipRole::Admin.can_manage_invitations());
        assert!(!MembershipRole::Member.can_manage_invitations());
    }

    #[test]
    fn test_role_display() {
        assert_eq!(MembershipRole::Owner.to_string(), "owner");
        assert_eq!(MembershipRole::Member.to_string(), "member");
    }
}
