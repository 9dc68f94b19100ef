//! Service and repository wiring

use std::sync::Arc;

use anyhow::Result;
use rota_core::Config;
use rota_db::{MemoryStore, Repositories};
use rota_services::{
    create_notifier, CompanyService, IdentityProvider, InvitationEvents, InvitationService,
    JoinService, LocalIdentityProvider, Notifier,
};
use sqlx::PgPool;

use crate::state::AppState;

pub fn initialize_services(config: &Config, pool: Option<PgPool>) -> Result<Arc<AppState>> {
    let repositories = match &pool {
        Some(pool) => Repositories::postgres(pool.clone()),
        None => Repositories::memory(MemoryStore::new()),
    };
    let notifier = create_notifier(config);
    Ok(build_state(config, repositories, notifier, pool))
}

/// Wire services over the given repositories and notifier.
pub fn build_state(
    config: &Config,
    repositories: Repositories,
    notifier: Arc<dyn Notifier>,
    pool: Option<PgPool>,
) -> Arc<AppState> {
    let events = InvitationEvents::new();

    let identity: Arc<dyn IdentityProvider> = Arc::new(LocalIdentityProvider::new(
        repositories.auth_users.clone(),
        repositories.profiles.clone(),
        config.jwt_secret(),
        config.jwt_expiry_hours(),
    ));

    let invitations = InvitationService::new(
        repositories.invitations.clone(),
        notifier,
        events.clone(),
        config.app_base_url(),
    )
    .with_default_expiry_days(config.invitation_default_expiry_days());

    let companies = CompanyService::new(
        repositories.companies.clone(),
        repositories.memberships.clone(),
    );

    let joiner = JoinService::new(
        identity.clone(),
        repositories.profiles.clone(),
        repositories.memberships.clone(),
        invitations.clone(),
        events.clone(),
    )
    .with_membership_verification(config.join_verify_membership());

    tracing::info!(
        verify_membership = config.join_verify_membership(),
        default_expiry_days = config.invitation_default_expiry_days(),
        "Services initialized"
    );

    Arc::new(AppState {
        config: config.clone(),
        repositories,
        identity,
        invitations,
        companies,
        joiner,
        events,
        pool,
    })
}
