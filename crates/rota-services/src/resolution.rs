//! Turns an optional invitation token into a resolved invitation plus company,
//! or a message explaining why it cannot be used.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rota_core::models::{Company, Invitation, InvitationStanding, InvitationStatus};
use rota_core::{token, StoreError};
use rota_db::CompanyRepository;
use serde::Serialize;
use utoipa::ToSchema;

use crate::invitations::InvitationService;

pub const MISSING_TOKEN: &str = "No invitation token provided";
pub const MALFORMED_TOKEN: &str = "Invalid invitation token format";
pub const NOT_FOUND_OR_EXPIRED: &str = "Invitation not found or has expired";
pub const ALREADY_ACCEPTED: &str = "This invitation has already been accepted";
pub const LOAD_FAILED: &str = "Failed to load invitation";

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ResolvedInvitation {
    pub invitation: Invitation,
    pub company: Company,
}

impl ResolvedInvitation {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.invitation.is_expired_at(now) || self.invitation.status == InvitationStatus::Expired
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionState {
    Loading,
    Resolved(ResolvedInvitation),
    Failed(String),
    NotFound(String),
}

fn store_message(err: &StoreError) -> String {
    let message = err.message().trim();
    if message.is_empty() {
        LOAD_FAILED.to_string()
    } else {
        message.to_string()
    }
}

pub struct InvitationResolution {
    token: Option<String>,
    invitations: InvitationService,
    companies: Arc<dyn CompanyRepository>,
    state: ResolutionState,
}

impl InvitationResolution {
    /// Starts in `Loading`; call [`resolve`](Self::resolve) to run.
    pub fn new(
        token: Option<String>,
        invitations: InvitationService,
        companies: Arc<dyn CompanyRepository>,
    ) -> Self {
        Self {
            token,
            invitations,
            companies,
            state: ResolutionState::Loading,
        }
    }

    /// Construct and resolve in one step.
    pub async fn load(
        token: Option<String>,
        invitations: InvitationService,
        companies: Arc<dyn CompanyRepository>,
    ) -> Self {
        let mut resolution = Self::new(token, invitations, companies);
        resolution.resolve().await;
        resolution
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn state(&self) -> &ResolutionState {
        &self.state
    }

    pub fn resolved(&self) -> Option<&ResolvedInvitation> {
        match &self.state {
            ResolutionState::Resolved(resolved) => Some(resolved),
            _ => None,
        }
    }

    pub fn invitation(&self) -> Option<&Invitation> {
        self.resolved().map(|r| &r.invitation)
    }

    pub fn company(&self) -> Option<&Company> {
        self.resolved().map(|r| &r.company)
    }

    pub fn is_loading(&self) -> bool {
        self.state == ResolutionState::Loading
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            ResolutionState::Failed(message) | ResolutionState::NotFound(message) => Some(message),
            _ => None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.resolved().is_some_and(|r| r.is_expired(now))
    }

    /// Re-run the whole resolution.
    pub async fn refresh(&mut self) -> &ResolutionState {
        self.resolve().await
    }

    pub async fn resolve(&mut self) -> &ResolutionState {
        self.state = ResolutionState::Loading;
        let state = self.run().await;
        self.state = state;
        &self.state
    }

    async fn run(&self) -> ResolutionState {
        let token = match self.token.as_deref() {
            None => return ResolutionState::Failed(MISSING_TOKEN.to_string()),
            Some(token) if !token::is_valid(token) => {
                return ResolutionState::Failed(MALFORMED_TOKEN.to_string())
            }
            Some(token) => token,
        };

        let invitation = match self.invitations.get_by_token(token).await {
            Ok(found) => found.invitation,
            Err(StoreError::NotFound(_)) => return self.explain_unusable(token).await,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to resolve invitation");
                return ResolutionState::Failed(store_message(&e));
            }
        };

        self.with_company(invitation).await
    }

    /// The filtered lookup found nothing; classify the raw row.
    async fn explain_unusable(&self, token: &str) -> ResolutionState {
        let invitation = match self.invitations.lookup_by_token(token).await {
            Ok(invitation) => invitation,
            Err(StoreError::NotFound(_)) => {
                return ResolutionState::NotFound(NOT_FOUND_OR_EXPIRED.to_string())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to classify invitation");
                return ResolutionState::NotFound(NOT_FOUND_OR_EXPIRED.to_string());
            }
        };

        match invitation.standing(Utc::now()) {
            InvitationStanding::Accepted => ResolutionState::Failed(ALREADY_ACCEPTED.to_string()),
            // Held so the page can show the expired panel with company details.
            InvitationStanding::Expired => self.with_company(invitation).await,
            InvitationStanding::Valid => {
                ResolutionState::NotFound(NOT_FOUND_OR_EXPIRED.to_string())
            }
        }
    }

    async fn with_company(&self, invitation: Invitation) -> ResolutionState {
        match self.companies.get_by_id(invitation.company_id).await {
            Ok(company) => ResolutionState::Resolved(ResolvedInvitation {
                invitation,
                company,
            }),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    company_id = %invitation.company_id,
                    "Failed to load invitation company"
                );
                ResolutionState::Failed(store_message(&e))
            }
        }
    }
}
