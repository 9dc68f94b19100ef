//! Invitation lifecycle: create, look up, accept, cancel, re-issue, expire.
//!
//! Every operation returns the store's closed error kind so callers can branch
//! on not-found versus transport failures. Emails are sent on a tracked
//! background task and never affect the outcome of `create`.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use rota_core::models::{
    Invitation, InvitationRole, InvitationStatus, InvitationWithCompany, NewInvitation,
};
use rota_core::validation::{clean_message, normalize_email};
use rota_core::{token, StoreError, StoreResult};
use rota_db::InvitationRepository;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

use crate::events::{InvitationEvent, InvitationEvents};
use crate::notifier::{InvitationEmail, Notifier};

pub const DEFAULT_EXPIRY_DAYS: i64 = 7;

#[derive(Debug, Clone)]
pub struct CreateInvitation {
    pub company_id: Uuid,
    pub invited_email: String,
    pub role: InvitationRole,
    pub message: Option<String>,
    /// Defaults to the service's configured expiry
    pub expires_in_days: Option<i64>,
    /// Both names must be present for an email to go out
    pub company_name: Option<String>,
    pub inviter_name: Option<String>,
}

/// `now + days`, or `Conflict` when the result is not a representable time.
fn expiry_after(now: DateTime<Utc>, days: i64) -> StoreResult<DateTime<Utc>> {
    TimeDelta::try_days(days)
        .and_then(|delta| now.checked_add_signed(delta))
        .ok_or_else(|| StoreError::Conflict(format!("Expiry of {} days is out of range", days)))
}

fn not_found() -> StoreError {
    StoreError::NotFound("invitation not found".to_string())
}

#[derive(Clone)]
pub struct InvitationService {
    invitations: Arc<dyn InvitationRepository>,
    notifier: Arc<dyn Notifier>,
    events: InvitationEvents,
    tasks: TaskTracker,
    app_base_url: String,
    default_expiry_days: i64,
}

impl InvitationService {
    pub fn new(
        invitations: Arc<dyn InvitationRepository>,
        notifier: Arc<dyn Notifier>,
        events: InvitationEvents,
        app_base_url: impl Into<String>,
    ) -> Self {
        Self {
            invitations,
            notifier,
            events,
            tasks: TaskTracker::new(),
            app_base_url: app_base_url.into().trim_end_matches('/').to_string(),
            default_expiry_days: DEFAULT_EXPIRY_DAYS,
        }
    }

    pub fn with_default_expiry_days(mut self, days: i64) -> Self {
        self.default_expiry_days = days;
        self
    }

    pub fn events(&self) -> &InvitationEvents {
        &self.events
    }

    /// Link placed in invitation emails
    pub fn invitation_url(&self, token: &str) -> String {
        format!("{}/join?token={}", self.app_base_url, token)
    }

    #[tracing::instrument(skip(self, request), fields(company_id = %request.company_id, role = %request.role))]
    pub async fn create(&self, request: CreateInvitation) -> StoreResult<Invitation> {
        let now = Utc::now();
        let days = request.expires_in_days.unwrap_or(self.default_expiry_days);
        let expires_at = expiry_after(now, days)?;

        let invitation = self
            .invitations
            .insert(NewInvitation {
                company_id: request.company_id,
                invited_email: normalize_email(&request.invited_email),
                role: request.role,
                message: clean_message(request.message),
                invitation_token: token::generate(),
                created_at: now,
                expires_at,
            })
            .await?;

        tracing::info!(
            invitation_id = %invitation.id,
            expires_at = %invitation.expires_at,
            "Invitation created"
        );

        self.events.publish(InvitationEvent::Created {
            invitation_id: invitation.id,
            company_id: invitation.company_id,
            invited_email: invitation.invited_email.clone(),
        });

        if let (Some(company_name), Some(inviter_name)) = (request.company_name, request.inviter_name)
        {
            self.spawn_notification(
                invitation.id,
                InvitationEmail {
                    to: invitation.invited_email.clone(),
                    company_name,
                    inviter_name,
                    invitation_url: self.invitation_url(&invitation.invitation_token),
                    role: invitation.role,
                    message: invitation.message.clone(),
                    expires_at: invitation.expires_at,
                },
            );
        }

        Ok(invitation)
    }

    fn spawn_notification(&self, invitation_id: Uuid, email: InvitationEmail) {
        let notifier = self.notifier.clone();
        self.tasks.spawn(async move {
            let result = notifier.send_invitation_email(&email).await;
            if !result.success {
                tracing::warn!(
                    invitation_id = %invitation_id,
                    error = result.error.as_deref().unwrap_or("unknown error"),
                    "Failed to send invitation email"
                );
            }
        });
    }

    /// Wait for every in-flight notification to finish.
    pub async fn flush_notifications(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }

    /// Pending, unexpired invitation with its company. Malformed tokens are
    /// reported as not found without touching the store.
    pub async fn get_by_token(&self, token: &str) -> StoreResult<InvitationWithCompany> {
        if !token::is_valid(token) {
            return Err(not_found());
        }
        self.invitations
            .get_pending_by_token(token, Utc::now())
            .await
    }

    /// Invitation regardless of status or expiry, for explaining why
    /// `get_by_token` found nothing.
    pub async fn lookup_by_token(&self, token: &str) -> StoreResult<Invitation> {
        if !token::is_valid(token) {
            return Err(not_found());
        }
        self.invitations.get_by_token(token).await
    }

    pub async fn get_by_id(&self, invitation_id: Uuid) -> StoreResult<Invitation> {
        self.invitations.get_by_id(invitation_id).await
    }

    /// All invitations of a company, newest first.
    pub async fn get_by_company(&self, company_id: Uuid) -> StoreResult<Vec<Invitation>> {
        self.invitations.list_by_company(company_id).await
    }

    /// Pending, unexpired invitations for an email, with their companies.
    pub async fn get_by_email(&self, email: &str) -> StoreResult<Vec<InvitationWithCompany>> {
        self.invitations
            .list_pending_by_email(&normalize_email(email), Utc::now())
            .await
    }

    /// Unconditional: accepting twice leaves the row accepted.
    #[tracing::instrument(skip(self, message))]
    pub async fn accept(
        &self,
        invitation_id: Uuid,
        accepted_by: Uuid,
        message: Option<String>,
    ) -> StoreResult<Invitation> {
        let invitation = self
            .invitations
            .mark_accepted(invitation_id, accepted_by, Utc::now(), clean_message(message))
            .await?;
        tracing::info!(invitation_id = %invitation_id, accepted_by = %accepted_by, "Invitation accepted");
        Ok(invitation)
    }

    /// Hard delete regardless of status. Returns whether a row was removed.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, invitation_id: Uuid) -> StoreResult<bool> {
        let removed = self.invitations.delete(invitation_id).await?;
        if removed {
            tracing::info!(invitation_id = %invitation_id, "Invitation cancelled");
            self.events
                .publish(InvitationEvent::Cancelled { invitation_id });
        }
        Ok(removed)
    }

    pub async fn update_message(
        &self,
        invitation_id: Uuid,
        message: Option<String>,
    ) -> StoreResult<Invitation> {
        self.invitations
            .update_message(invitation_id, clean_message(message))
            .await
    }

    /// Move the expiry of a pending invitation to `now + days`. The token is kept.
    #[tracing::instrument(skip(self))]
    pub async fn extend(&self, invitation_id: Uuid, days: i64) -> StoreResult<Invitation> {
        let expires_at = expiry_after(Utc::now(), days)?;
        let invitation = self.invitations.get_by_id(invitation_id).await?;
        if invitation.status != InvitationStatus::Pending {
            return Err(StoreError::Conflict(format!(
                "Only pending invitations can be extended (status: {:?})",
                invitation.status
            )));
        }
        let invitation = self
            .invitations
            .update_expiry(invitation_id, expires_at)
            .await?;
        tracing::info!(invitation_id = %invitation_id, expires_at = %invitation.expires_at, "Invitation extended");
        Ok(invitation)
    }

    /// Mark overdue pending invitations expired. Returns how many changed.
    pub async fn expire_overdue(&self) -> StoreResult<u64> {
        let count = self.invitations.expire_overdue(Utc::now()).await?;
        if count > 0 {
            tracing::info!(count, "Expired overdue invitations");
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use crate::notifier::NotificationResult;
    use rota_core::models::InvitationStanding;
    use rota_db::{CompanyRepository, MemoryStore};
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<InvitationEmail>>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl Notifier for RecordingNotifier {
        async fn send_invitation_email(&self, email: &InvitationEmail) -> NotificationResult {
            self.sent.lock().await.push(email.clone());
            if self.fail {
                NotificationResult::failed("smtp unavailable")
            } else {
                NotificationResult::sent()
            }
        }
    }

    async fn setup(fail: bool) -> (InvitationService, Arc<RecordingNotifier>, MemoryStore, Uuid) {
        let store = MemoryStore::new();
        let (company, _) = store
            .create_with_owner("Acme", Uuid::new_v4(), Utc::now())
            .await
            .unwrap();
        let notifier = Arc::new(RecordingNotifier {
            sent: Mutex::new(Vec::new()),
            fail,
        });
        let service = InvitationService::new(
            Arc::new(store.clone()),
            notifier.clone(),
            InvitationEvents::new(),
            "http://localhost:3000/",
        );
        (service, notifier, store, company.id)
    }

    fn request(company_id: Uuid, email: &str) -> CreateInvitation {
        CreateInvitation {
            company_id,
            invited_email: email.to_string(),
            role: InvitationRole::Member,
            message: None,
            expires_in_days: None,
            company_name: None,
            inviter_name: None,
        }
    }

    #[tokio::test]
    async fn test_create_normalizes_email_and_defaults_expiry() {
        let (service, _, _, company_id) = setup(false).await;

        let invitation = service
            .create(request(company_id, "  Bob@Co.COM "))
            .await
            .unwrap();

        assert_eq!(invitation.invited_email, "bob@co.com");
        assert_eq!(invitation.status, InvitationStatus::Pending);
        assert!(token::is_valid(&invitation.invitation_token));
        let lifetime = invitation.expires_at - invitation.created_at;
        assert_eq!(lifetime, Duration::days(7));
    }

    #[tokio::test]
    async fn test_email_sent_only_with_company_and_inviter_names() {
        let (service, notifier, _, company_id) = setup(false).await;

        service.create(request(company_id, "a@co.com")).await.unwrap();
        let mut with_names = request(company_id, "b@co.com");
        with_names.company_name = Some("Acme".into());
        with_names.inviter_name = Some("Ann".into());
        let invitation = service.create(with_names).await.unwrap();
        service.flush_notifications().await;

        let sent = notifier.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "b@co.com");
        assert_eq!(
            sent[0].invitation_url,
            format!("http://localhost:3000/join?token={}", invitation.invitation_token)
        );
    }

    #[tokio::test]
    async fn test_notifier_failure_does_not_fail_create() {
        let (service, notifier, store, company_id) = setup(true).await;
        let mut req = request(company_id, "bob@co.com");
        req.company_name = Some("Acme".into());
        req.inviter_name = Some("Ann".into());

        let invitation = service.create(req).await.unwrap();
        service.flush_notifications().await;

        assert_eq!(notifier.sent.lock().await.len(), 1);
        assert!(store.invitation(invitation.id).await.is_some());
    }

    #[tokio::test]
    async fn test_malformed_token_skips_store() {
        let (service, _, store, _) = setup(false).await;

        let err = service.get_by_token("not-a-token").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.calls("invitations.get_pending_by_token").await, 0);
    }

    #[tokio::test]
    async fn test_accepted_invitation_not_returned_by_token() {
        let (service, _, _, company_id) = setup(false).await;
        let invitation = service.create(request(company_id, "bob@co.com")).await.unwrap();
        let token = invitation.invitation_token.clone();

        assert!(service.get_by_token(&token).await.is_ok());
        service.accept(invitation.id, Uuid::new_v4(), None).await.unwrap();
        service.accept(invitation.id, Uuid::new_v4(), None).await.unwrap();

        assert!(service.get_by_token(&token).await.unwrap_err().is_not_found());
        let row = service.lookup_by_token(&token).await.unwrap();
        assert_eq!(row.standing(Utc::now()), InvitationStanding::Accepted);
    }

    #[tokio::test]
    async fn test_past_expiry_is_not_found_regardless_of_status() {
        let (service, _, store, company_id) = setup(false).await;
        let invitation = service.create(request(company_id, "bob@co.com")).await.unwrap();
        // Pull the expiry into the past without the sweeper running.
        store
            .update_expiry(invitation.id, Utc::now() - Duration::minutes(1))
            .await
            .unwrap();

        let err = service
            .get_by_token(&invitation.invitation_token)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_cancel_reports_removal_and_publishes() {
        let (service, _, _, company_id) = setup(false).await;
        let mut events = service.events().subscribe();
        let invitation = service.create(request(company_id, "bob@co.com")).await.unwrap();

        assert!(service.cancel(invitation.id).await.unwrap());
        assert!(!service.cancel(invitation.id).await.unwrap());

        assert!(matches!(
            events.recv().await.unwrap(),
            InvitationEvent::Created { .. }
        ));
        assert_eq!(
            events.recv().await.unwrap(),
            InvitationEvent::Cancelled {
                invitation_id: invitation.id
            }
        );
    }

    #[tokio::test]
    async fn test_extend_rejects_accepted_invitations() {
        let (service, _, _, company_id) = setup(false).await;
        let invitation = service.create(request(company_id, "bob@co.com")).await.unwrap();

        let extended = service.extend(invitation.id, 14).await.unwrap();
        assert!(extended.expires_at > invitation.expires_at);
        assert_eq!(extended.invitation_token, invitation.invitation_token);

        service.accept(invitation.id, Uuid::new_v4(), None).await.unwrap();
        let err = service.extend(invitation.id, 14).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_out_of_range_expiry_is_an_error() {
        let (service, _, store, company_id) = setup(false).await;
        let mut req = request(company_id, "bob@co.com");
        req.expires_in_days = Some(1_000_000_000_000);

        let err = service.create(req).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.calls("invitations.insert").await, 0);

        let invitation = service.create(request(company_id, "bob@co.com")).await.unwrap();
        let err = service
            .extend(invitation.id, 1_000_000_000_000)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        let err = service.extend(invitation.id, i64::MAX).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_get_by_email_lists_pending_for_normalized_email() {
        let (service, _, _, company_id) = setup(false).await;
        service.create(request(company_id, "bob@co.com")).await.unwrap();
        service.create(request(company_id, "ann@co.com")).await.unwrap();

        let pending = service.get_by_email(" BOB@co.com").await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].company.name, "Acme");
    }

    #[tokio::test]
    async fn test_update_message_clears_blank() {
        let (service, _, _, company_id) = setup(false).await;
        let mut req = request(company_id, "bob@co.com");
        req.message = Some("Welcome".into());
        let invitation = service.create(req).await.unwrap();
        assert_eq!(invitation.message.as_deref(), Some("Welcome"));

        let updated = service
            .update_message(invitation.id, Some("   ".into()))
            .await
            .unwrap();
        assert_eq!(updated.message, None);
    }
}
