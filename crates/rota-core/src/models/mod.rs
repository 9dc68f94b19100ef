//! Data models for the application
//!
//! Each sub-module covers one entity family. Enum types map onto Postgres enum
//! types when the `sqlx` feature is enabled.

mod auth;
mod company;
mod invitation;
mod profile;

pub use auth::*;
pub use company::*;
pub use invitation::*;
pub use profile::*;
