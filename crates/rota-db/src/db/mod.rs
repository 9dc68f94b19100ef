//! Repositories for the data access layer
//!
//! Each entity family has a trait (the seam services depend on), a PostgreSQL
//! implementation, and an implementation on the shared [`MemoryStore`].

pub mod company;
pub mod invitation;
pub mod memory;
pub mod profile;

use std::sync::Arc;

use sqlx::PgPool;

pub use company::{
    CompanyRepository, MembershipRepository, PostgresCompanyRepository,
    PostgresMembershipRepository,
};
pub use invitation::{InvitationRepository, PostgresInvitationRepository};
pub use memory::MemoryStore;
pub use profile::{
    AuthUserRepository, PostgresAuthUserRepository, PostgresProfileRepository, ProfileRepository,
};

/// Every repository the services need, behind trait objects.
#[derive(Clone)]
pub struct Repositories {
    pub invitations: Arc<dyn InvitationRepository>,
    pub companies: Arc<dyn CompanyRepository>,
    pub memberships: Arc<dyn MembershipRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub auth_users: Arc<dyn AuthUserRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            invitations: Arc::new(PostgresInvitationRepository::new(pool.clone())),
            companies: Arc::new(PostgresCompanyRepository::new(pool.clone())),
            memberships: Arc::new(PostgresMembershipRepository::new(pool.clone())),
            profiles: Arc::new(PostgresProfileRepository::new(pool.clone())),
            auth_users: Arc::new(PostgresAuthUserRepository::new(pool)),
        }
    }

    /// All repositories share `store`'s state.
    pub fn memory(store: MemoryStore) -> Self {
        Self {
            invitations: Arc::new(store.clone()),
            companies: Arc::new(store.clone()),
            memberships: Arc::new(store.clone()),
            profiles: Arc::new(store.clone()),
            auth_users: Arc::new(store),
        }
    }
}
