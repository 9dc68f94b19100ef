use rota_api::setup;
use rota_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    rota_api::telemetry::init_telemetry(config.json_logs())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    let (state, router) = setup::initialize_app(config.clone()).await?;
    setup::server::start_server(&config, state, router).await?;

    Ok(())
}
