//! Joining a company from an invitation.
//!
//! The membership write is authoritative. Marking the invitation accepted
//! afterwards is bookkeeping: if it fails the person is still a member and the
//! stale invitation is reported on the `rota::reconcile` log target.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rota_core::models::{AuthUser, CompanyMembership, Invitation, MembershipRole, UpsertMembership};
use rota_core::validation::normalize_email;
use rota_core::{AppError, ErrorMetadata, StoreError};
use rota_db::{MembershipRepository, ProfileRepository};
use serde::Serialize;
use tokio::sync::Mutex;
use utoipa::ToSchema;

use crate::events::{InvitationEvent, InvitationEvents};
use crate::identity::{ensure_profile, IdentityProvider};
use crate::invitations::InvitationService;

/// Where the client goes after a successful join
pub const JOINED_REDIRECT: &str = "/dashboard?joined=true";

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct JoinOutcome {
    pub membership: CompanyMembership,
    pub redirect_to: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JoinAttempt {
    /// Preconditions not met, or another join on the session is in flight.
    Skipped,
    Joined(JoinOutcome),
    Failed(String),
}

/// Shared dependencies of every join.
#[derive(Clone)]
pub struct JoinService {
    identity: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileRepository>,
    memberships: Arc<dyn MembershipRepository>,
    invitations: InvitationService,
    events: InvitationEvents,
    verify_membership: bool,
}

impl JoinService {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        profiles: Arc<dyn ProfileRepository>,
        memberships: Arc<dyn MembershipRepository>,
        invitations: InvitationService,
        events: InvitationEvents,
    ) -> Self {
        Self {
            identity,
            profiles,
            memberships,
            invitations,
            events,
            verify_membership: false,
        }
    }

    /// Re-read the membership after writing it; a failed read fails the join.
    pub fn with_membership_verification(mut self, enabled: bool) -> Self {
        self.verify_membership = enabled;
        self
    }

    pub fn identity(&self) -> &Arc<dyn IdentityProvider> {
        &self.identity
    }

    /// Start a session for one viewer and one (optional) invitation.
    pub fn session(&self, invitation: Option<Invitation>, viewer: Viewer) -> JoinSession {
        JoinSession {
            joiner: self.clone(),
            invitation,
            viewer: Mutex::new(viewer),
            flags: Mutex::new(JoinSnapshot::default()),
        }
    }

    #[tracing::instrument(skip(self, invitation, access_token), fields(invitation_id = %invitation.id, company_id = %invitation.company_id))]
    async fn join(
        &self,
        invitation: &Invitation,
        access_token: &str,
    ) -> Result<JoinOutcome, AppError> {
        let user = self
            .identity
            .get_current_user(access_token)
            .await?
            .ok_or_else(|| AppError::Unauthorized("You must be signed in to join".to_string()))?;

        let email = if user.email.trim().is_empty() {
            invitation.invited_email.as_str()
        } else {
            user.email.as_str()
        };
        let profile = ensure_profile(self.profiles.as_ref(), user.id, email).await?;

        let membership = self
            .memberships
            .upsert(UpsertMembership {
                company_id: invitation.company_id,
                user_profile_id: profile.id,
                role: invitation.role.into(),
                is_active: true,
                joined_at: Utc::now(),
            })
            .await
            .map_err(|e| {
                tracing::error!(error = %e, profile_id = %profile.id, "Failed to create membership");
                AppError::from(e)
            })?;
        if membership.role != MembershipRole::from(invitation.role) {
            tracing::info!(
                profile_id = %profile.id,
                company_id = %invitation.company_id,
                role = ?membership.role,
                "Existing owner kept their role"
            );
        }

        if self.verify_membership {
            self.memberships
                .get(invitation.company_id, profile.id)
                .await
                .map_err(|e| match e {
                    StoreError::NotFound(_) => {
                        AppError::Internal("Membership was not persisted".to_string())
                    }
                    other => AppError::from(other),
                })?;
        }

        if let Err(e) = self.invitations.accept(invitation.id, profile.id, None).await {
            tracing::warn!(
                target: "rota::reconcile",
                invitation_id = %invitation.id,
                company_id = %invitation.company_id,
                profile_id = %profile.id,
                error = %e,
                "Membership created but invitation could not be marked accepted"
            );
        }

        tracing::info!(profile_id = %profile.id, role = %membership.role, "Joined company");
        self.events.publish(InvitationEvent::MembershipJoined {
            invitation_id: invitation.id,
            company_id: invitation.company_id,
            user_profile_id: profile.id,
        });

        Ok(JoinOutcome {
            membership,
            redirect_to: JOINED_REDIRECT.to_string(),
        })
    }
}

/// Who is looking at the join page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Viewer {
    pub access_token: Option<String>,
    pub user: Option<AuthUser>,
}

impl Viewer {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn signed_in(access_token: impl Into<String>, user: AuthUser) -> Self {
        Self {
            access_token: Some(access_token.into()),
            user: Some(user),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some() && self.user.is_some()
    }

    pub fn email(&self) -> Option<String> {
        self.user.as_ref().map(|u| normalize_email(&u.email))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinSnapshot {
    pub is_joining: bool,
    pub error: Option<String>,
    pub has_auto_accepted: bool,
    pub is_auto_accepting: bool,
    pub outcome: Option<JoinOutcome>,
}

pub struct JoinSession {
    joiner: JoinService,
    invitation: Option<Invitation>,
    viewer: Mutex<Viewer>,
    flags: Mutex<JoinSnapshot>,
}

impl JoinSession {
    pub fn invitation(&self) -> Option<&Invitation> {
        self.invitation.as_ref()
    }

    pub async fn viewer(&self) -> Viewer {
        self.viewer.lock().await.clone()
    }

    pub async fn snapshot(&self) -> JoinSnapshot {
        self.flags.lock().await.clone()
    }

    pub async fn is_joining(&self) -> bool {
        self.flags.lock().await.is_joining
    }

    pub async fn error(&self) -> Option<String> {
        self.flags.lock().await.error.clone()
    }

    pub async fn has_auto_accepted(&self) -> bool {
        self.flags.lock().await.has_auto_accepted
    }

    pub async fn is_auto_accepting(&self) -> bool {
        self.flags.lock().await.is_auto_accepting
    }

    /// Join the invitation's company as the viewer. The viewer's email is not
    /// compared with the invited address here.
    pub async fn join_company(&self) -> JoinAttempt {
        let Some(invitation) = self.invitation.as_ref() else {
            return JoinAttempt::Skipped;
        };
        let access_token = {
            let viewer = self.viewer.lock().await;
            match (&viewer.access_token, viewer.is_authenticated()) {
                (Some(token), true) => token.clone(),
                _ => return JoinAttempt::Skipped,
            }
        };
        {
            let mut flags = self.flags.lock().await;
            if flags.is_joining {
                return JoinAttempt::Skipped;
            }
            flags.is_joining = true;
            flags.error = None;
        }

        let result = self.joiner.join(invitation, &access_token).await;

        let mut flags = self.flags.lock().await;
        flags.is_joining = false;
        match result {
            Ok(outcome) => {
                flags.outcome = Some(outcome.clone());
                JoinAttempt::Joined(outcome)
            }
            Err(e) => {
                let message = e.client_message();
                flags.error = Some(message.clone());
                JoinAttempt::Failed(message)
            }
        }
    }

    /// Auto-accept: fires at most once per session, and only when the signed-in
    /// email matches the invited one and the invitation has not expired. A join
    /// already in flight or finished on this session suppresses it.
    pub async fn on_change(&self, now: DateTime<Utc>) -> Option<JoinAttempt> {
        let invitation = self.invitation.as_ref()?;
        if invitation.is_expired_at(now) {
            return None;
        }
        let viewer_email = {
            let viewer = self.viewer.lock().await;
            if !viewer.is_authenticated() {
                return None;
            }
            viewer.email()?
        };
        if viewer_email != normalize_email(&invitation.invited_email) {
            return None;
        }

        {
            let mut flags = self.flags.lock().await;
            if flags.has_auto_accepted || flags.is_joining || flags.outcome.is_some() {
                return None;
            }
            flags.has_auto_accepted = true;
            flags.is_auto_accepting = true;
        }
        tracing::debug!(invitation_id = %invitation.id, "Auto-accepting invitation");

        let attempt = self.join_company().await;
        self.flags.lock().await.is_auto_accepting = false;
        Some(attempt)
    }

    /// Re-query the identity provider and update the viewer.
    pub async fn refresh_auth(&self) -> Result<Option<AuthUser>, AppError> {
        let access_token = self.viewer.lock().await.access_token.clone();
        let user = match access_token.as_deref() {
            Some(token) => self.joiner.identity.get_current_user(token).await?,
            None => None,
        };
        let mut viewer = self.viewer.lock().await;
        viewer.user = user.clone();
        if user.is_none() {
            viewer.access_token = None;
        }
        Ok(user)
    }
}
