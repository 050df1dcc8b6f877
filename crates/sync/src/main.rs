//! Directory-sync process.
//!
//! Periodically rebuilds the endpoint directory from the external
//! validation service and publishes it to the shared store the gateway
//! instances read. Runs either on its own interval timer or as a one-shot
//! invocation under an external scheduler (`--once`).

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use meridian_core::{
    config::AppConfig,
    directory::store::SqliteStore,
    region::CountryRegionTable,
    sync::{SyncEngine, ValidationClient},
};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "meridian-sync")]
#[command(about = "Rebuilds the Meridian endpoint directory from the validation service")]
struct Cli {
    /// Run a single sync and exit (for external schedulers such as cron).
    #[arg(long)]
    once: bool,

    /// Path to the configuration file (overrides MERIDIAN_CONFIG).
    #[arg(long)]
    config: Option<String>,
}

fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.logging.level;
        EnvFilter::new(format!("warn,meridian_core={level},sync={level}"))
    });

    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.format.as_str() == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().pretty().with_target(false))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path),
        None => AppConfig::load(),
    }
    .map_err(|e| anyhow::anyhow!("Configuration loading failed: {e}"))?;

    config
        .validate_sync()
        .map_err(|e| anyhow::anyhow!("Configuration validation failed: {e}"))?;

    init_logging(&config);
    info!(
        mainnet = config.sync.mainnet,
        ssl_only = config.sync.ssl_only,
        interval_seconds = config.sync.interval_seconds,
        "Starting Meridian sync"
    );

    let store = Arc::new(
        SqliteStore::new(&config.store.database_url)
            .await
            .map_err(|e| anyhow::anyhow!("Directory store initialization failed: {e}"))?,
    );
    let client = ValidationClient::new(config.validation_config())
        .map_err(|e| anyhow::anyhow!("Validation client initialization failed: {e}"))?;
    let engine = SyncEngine::new(client, store, Arc::new(CountryRegionTable::standard()));

    if cli.once {
        engine.run().await.map_err(|e| anyhow::anyhow!("Sync run failed: {e}"))?;
        return Ok(());
    }

    let mut interval = tokio::time::interval(config.sync_interval());
    loop {
        tokio::select! {
            _ = interval.tick() => {
                // A failed run is logged and dropped; the next tick retries.
                if let Err(e) = engine.run().await {
                    error!(error = %e, "Sync run failed");
                }
            }
            result = signal::ctrl_c() => {
                if let Err(e) = result {
                    error!(error = %e, "Failed to install Ctrl+C handler");
                }
                info!("Shutdown signal received, stopping sync");
                break;
            }
        }
    }

    Ok(())
}
