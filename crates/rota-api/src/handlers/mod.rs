pub mod auth;
pub mod companies;
pub mod events;
pub mod health;
pub mod invitations;
pub mod join;
