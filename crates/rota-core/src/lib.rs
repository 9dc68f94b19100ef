//! Rota Core Library
//!
//! This crate provides core domain models, error types, configuration, the
//! invitation token codec, and validation helpers shared across all Rota
//! components.

pub mod config;
pub mod error;
pub mod models;
pub mod token;
pub mod validation;

// Re-export commonly used types
pub use config::{Config, EmailConfig, StoreBackend};
pub use error::{AppError, ErrorMetadata, LogLevel, StoreError, StoreResult};
