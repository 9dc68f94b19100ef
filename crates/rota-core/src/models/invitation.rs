use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{Company, MembershipRole};

/// Invitation status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "invitation_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Expired,
}

/// Role granted by an invitation. Owners are never invited.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "invitation_role", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum InvitationRole {
    Member,
    Admin,
}

impl Display for InvitationRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            InvitationRole::Member => write!(f, "member"),
            InvitationRole::Admin => write!(f, "admin"),
        }
    }
}

impl From<InvitationRole> for MembershipRole {
    fn from(role: InvitationRole) -> Self {
        match role {
            InvitationRole::Member => MembershipRole::Member,
            InvitationRole::Admin => MembershipRole::Admin,
        }
    }
}

/// An offer for one email address to join one company with one role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Invitation {
    pub id: Uuid,
    pub company_id: Uuid,
    pub invited_email: String,
    pub role: InvitationRole,
    pub message: Option<String>,
    pub invitation_token: String,
    pub status: InvitationStatus,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    /// Profile id of the accepting person
    pub accepted_by: Option<Uuid>,
}

impl Invitation {
    /// `expires_at < now`, independent of the stored status.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }

    /// Classify the row from its own fields.
    pub fn standing(&self, now: DateTime<Utc>) -> InvitationStanding {
        match self.status {
            InvitationStatus::Accepted => InvitationStanding::Accepted,
            InvitationStatus::Expired => InvitationStanding::Expired,
            InvitationStatus::Pending if self.expires_at <= now => InvitationStanding::Expired,
            InvitationStatus::Pending => InvitationStanding::Valid,
        }
    }
}

/// Why an invitation is (un)usable, derived from the row instead of the query filter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStanding {
    Valid,
    Expired,
    Accepted,
}

/// Invitation joined with the company it points at
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct InvitationWithCompany {
    #[serde(flatten)]
    pub invitation: Invitation,
    pub company: Company,
}

/// Insert payload for a new pending invitation
#[derive(Debug, Clone)]
pub struct NewInvitation {
    pub company_id: Uuid,
    pub invited_email: String,
    pub role: InvitationRole,
    pub message: Option<String>,
    pub invitation_token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}
