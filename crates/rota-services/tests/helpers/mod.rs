#![allow(dead_code)]

use std::sync::Arc;

use rota_core::models::{Company, Invitation, InvitationRole, UserProfile};
use rota_db::{MemoryStore, ProfileRepository};
use rota_services::{
    AuthSession, CompanyService, CreateInvitation, IdentityProvider, InvitationEmail,
    InvitationEvents, InvitationService, JoinService, LocalIdentityProvider, NotificationResult,
    Notifier, Viewer,
};
use tokio::sync::Mutex;

pub const TEST_JWT_SECRET: &str = "test-secret-that-is-at-least-32-characters-long";
pub const PASSWORD: &str = "correct-horse-battery";

/// Records every email; optionally reports failure.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<InvitationEmail>>,
    pub fail: bool,
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

pub struct TestContext {
    pub store: MemoryStore,
    pub notifier: Arc<RecordingNotifier>,
    pub events: InvitationEvents,
    pub identity: Arc<LocalIdentityProvider>,
    pub invitations: InvitationService,
    pub companies: CompanyService,
    pub joiner: JoinService,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_notifier(RecordingNotifier::default())
    }

    pub fn with_notifier(notifier: RecordingNotifier) -> Self {
        let store = MemoryStore::new();
        let notifier = Arc::new(notifier);
        let events = InvitationEvents::new();
        let identity = Arc::new(LocalIdentityProvider::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            TEST_JWT_SECRET,
            24,
        ));
        let invitations = InvitationService::new(
            Arc::new(store.clone()),
            notifier.clone(),
            events.clone(),
            "https://app.rota.test/",
        );
        let companies = CompanyService::new(Arc::new(store.clone()), Arc::new(store.clone()));
        let joiner = JoinService::new(
            identity.clone(),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            invitations.clone(),
            events.clone(),
        );
        Self {
            store,
            notifier,
            events,
            identity,
            invitations,
            companies,
            joiner,
        }
    }

    pub async fn sign_up(&self, email: &str) -> (AuthSession, UserProfile) {
        let session = self.identity.sign_up(email, PASSWORD).await.unwrap();
        let profile = self
            .store
            .get_by_user_id(session.user.id)
            .await
            .unwrap();
        (session, profile)
    }

    pub fn viewer(session: &AuthSession) -> Viewer {
        Viewer::signed_in(session.access_token.clone(), session.user.clone())
    }

    /// Owner signs up and creates a company.
    pub async fn company(&self, owner_email: &str, name: &str) -> (Company, UserProfile) {
        let (_, owner) = self.sign_up(owner_email).await;
        let (company, _) = self.companies.create_company(name, &owner).await.unwrap();
        (company, owner)
    }

    pub async fn invite(&self, company: &Company, email: &str) -> Invitation {
        self.invitations
            .create(CreateInvitation {
                company_id: company.id,
                invited_email: email.to_string(),
                role: InvitationRole::Member,
                message: Some("Welcome aboard".to_string()),
                expires_in_days: Some(7),
                company_name: Some(company.name.clone()),
                inviter_name: Some("Ann".to_string()),
            })
            .await
            .unwrap()
    }
}
