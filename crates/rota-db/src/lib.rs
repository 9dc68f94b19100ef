//! Rota Database Layer
//!
//! Repository traits for invitations, companies, memberships, profiles and auth
//! identities, with a PostgreSQL (sqlx) implementation and an in-memory one used
//! for local runs and tests.

pub mod db;

pub use db::{
    AuthUserRepository, CompanyRepository, InvitationRepository, MemoryStore,
    MembershipRepository, PostgresAuthUserRepository, PostgresCompanyRepository,
    PostgresInvitationRepository, PostgresMembershipRepository, PostgresProfileRepository,
    ProfileRepository, Repositories,
};
