mod helpers;

use std::sync::Arc;

use helpers::TestContext;
use rota_core::StoreError;
use rota_db::{CompanyRepository, InvitationRepository};
use rota_services::resolution::{
    ALREADY_ACCEPTED, MALFORMED_TOKEN, MISSING_TOKEN, NOT_FOUND_OR_EXPIRED,
};
use rota_services::{InvitationResolution, ResolutionState};

async fn resolve(ctx: &TestContext, token: Option<&str>) -> InvitationResolution {
    let companies: Arc<dyn CompanyRepository> = Arc::new(ctx.store.clone());
    InvitationResolution::load(
        token.map(str::to_string),
        ctx.invitations.clone(),
        companies,
    )
    .await
}

#[tokio::test]
async fn test_new_resolution_starts_loading() {
    let ctx = TestContext::new();
    let companies: Arc<dyn CompanyRepository> = Arc::new(ctx.store.clone());
    let resolution = InvitationResolution::new(None, ctx.invitations.clone(), companies);
    assert!(resolution.is_loading());
    assert!(resolution.error().is_none());
}

#[tokio::test]
async fn test_missing_and_malformed_tokens_skip_the_store() {
    let ctx = TestContext::new();

    let missing = resolve(&ctx, None).await;
    assert_eq!(missing.error(), Some(MISSING_TOKEN));

    for token in ["short".to_string(), "z".repeat(64), "AB".repeat(32)] {
        let malformed = resolve(&ctx, Some(&token)).await;
        assert_eq!(
            malformed.state(),
            &ResolutionState::Failed(MALFORMED_TOKEN.to_string())
        );
    }
    assert_eq!(ctx.store.calls("invitations.get_pending_by_token").await, 0);
}

#[tokio::test]
async fn test_unknown_token_not_found() {
    let ctx = TestContext::new();
    let resolution = resolve(&ctx, Some(&"0".repeat(64))).await;
    assert_eq!(
        resolution.state(),
        &ResolutionState::NotFound(NOT_FOUND_OR_EXPIRED.to_string())
    );
    assert!(resolution.invitation().is_none());
}

#[tokio::test]
async fn test_valid_token_resolves_with_company() {
    let ctx = TestContext::new();
    let (company, _) = ctx.company("ann@co.com", "Acme").await;
    let invitation = ctx.invite(&company, "bob@co.com").await;

    let resolution = resolve(&ctx, Some(&invitation.invitation_token)).await;
    assert_eq!(resolution.token(), Some(invitation.invitation_token.as_str()));
    assert_eq!(resolution.invitation().map(|i| i.id), Some(invitation.id));
    assert_eq!(resolution.company(), Some(&company));
    assert!(!resolution.is_expired(chrono::Utc::now()));
}

#[tokio::test]
async fn test_accepted_invitation_reports_already_accepted() {
    let ctx = TestContext::new();
    let (company, owner) = ctx.company("ann@co.com", "Acme").await;
    let invitation = ctx.invite(&company, "bob@co.com").await;
    ctx.invitations
        .accept(invitation.id, owner.id, None)
        .await
        .unwrap();

    let resolution = resolve(&ctx, Some(&invitation.invitation_token)).await;
    assert_eq!(resolution.error(), Some(ALREADY_ACCEPTED));
}

#[tokio::test]
async fn test_store_failures_surface_their_message() {
    let ctx = TestContext::new();
    let (company, _) = ctx.company("ann@co.com", "Acme").await;
    let invitation = ctx.invite(&company, "bob@co.com").await;

    ctx.store
        .fail_on(
            "invitations.get_pending_by_token",
            StoreError::Transport("connection refused".to_string()),
        )
        .await;
    let mut resolution = resolve(&ctx, Some(&invitation.invitation_token)).await;
    assert_eq!(resolution.error(), Some("connection refused"));

    ctx.store.clear_failures().await;
    ctx.store
        .fail_on(
            "companies.get_by_id",
            StoreError::Transport(String::new()),
        )
        .await;
    resolution.refresh().await;
    assert_eq!(resolution.error(), Some("Failed to load invitation"));

    ctx.store.clear_failures().await;
    resolution.refresh().await;
    assert!(resolution.resolved().is_some());
}

#[tokio::test]
async fn test_overdue_invitations_are_swept() {
    let ctx = TestContext::new();
    let (company, _) = ctx.company("ann@co.com", "Acme").await;
    let invitation = ctx.invite(&company, "bob@co.com").await;
    assert_eq!(ctx.invitations.expire_overdue().await.unwrap(), 0);

    ctx.store
        .update_expiry(invitation.id, chrono::Utc::now() - chrono::Duration::minutes(5))
        .await
        .unwrap();
    assert_eq!(ctx.invitations.expire_overdue().await.unwrap(), 1);

    let resolution = resolve(&ctx, Some(&invitation.invitation_token)).await;
    assert!(resolution.is_expired(chrono::Utc::now()));
    assert_eq!(
        ctx.invitations.get_by_email("BOB@co.com").await.unwrap().len(),
        0
    );
}
