//! # Bridge Service Main Entry Point

use qbwc_bridge::migration::{Migrator, MigratorTrait};
use qbwc_bridge::{config::ConfigLoader, db, server::run_server, telemetry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from layered env files and variables
    let config = ConfigLoader::new().load()?;

    telemetry::init_tracing(&config)?;

    tracing::info!(profile = %config.profile, "Loaded configuration");
    if let Ok(redacted) = config.redacted_json() {
        tracing::debug!(config = %redacted, "Effective configuration");
    }

    let pool = db::init_pool(&config).await?;
    Migrator::up(&pool, None).await?;

    run_server(config, pool).await
}
