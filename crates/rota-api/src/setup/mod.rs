//! Application setup and initialization

pub mod database;
pub mod routes;
pub mod server;
pub mod services;
pub mod sweeper;

use std::sync::Arc;

use anyhow::Result;
use rota_core::Config;

use crate::state::AppState;

/// Build the state and router. Telemetry is installed by the caller.
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    tracing::info!(
        environment = config.environment(),
        store = %config.store_backend(),
        "Configuration loaded and validated successfully"
    );

    let pool = database::setup_database(&config).await?;
    let state = services::initialize_services(&config, pool)?;
    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
