//! Application state shared by every handler.

use std::sync::Arc;

use rota_core::Config;
use rota_db::Repositories;
use rota_services::{
    CompanyService, IdentityProvider, InvitationEvents, InvitationService, JoinService,
};
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub repositories: Repositories,
    pub identity: Arc<dyn IdentityProvider>,
    pub invitations: InvitationService,
    pub companies: CompanyService,
    pub joiner: JoinService,
    pub events: InvitationEvents,
    /// Present only with the Postgres backend
    pub pool: Option<PgPool>,
}
