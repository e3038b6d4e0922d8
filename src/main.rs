//! # EasyCars Sync Main Entry Point
//!
//! This is the main entry point for the EasyCars sync service: it loads
//! configuration, runs migrations, starts the background scheduler and
//! serves the operational API until shutdown.

use std::sync::Arc;

use easycars_sync::migration::{Migrator, MigratorTrait};
use easycars_sync::repositories::{CredentialRepository, SyncLogRepository};
use easycars_sync::scheduler::Scheduler;
use easycars_sync::server::{build_state, run_server};
use easycars_sync::{config::ConfigLoader, db, logging};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from layered env files and variables
    let config_loader = ConfigLoader::new();
    let config = config_loader.load()?;

    logging::init_subscriber(&config);
    tracing::info!("Loaded configuration for profile: {}", config.profile);
    if let Ok(redacted_json) = config.redacted_json() {
        tracing::info!("Configuration: {}", redacted_json);
    }

    let pool = db::init_pool(&config).await?;
    Migrator::up(&pool, None).await?;

    let shutdown = CancellationToken::new();
    let state = build_state(config, pool, shutdown.clone())?;

    // The scheduler shares the orchestrators and stops on the same token.
    let scheduler = Arc::new(Scheduler::new(
        state.config.scheduler.clone(),
        CredentialRepository::new(state.db.clone(), state.crypto_key.clone()),
        SyncLogRepository::new(state.db.clone()),
        state.stock.clone(),
        state.leads.clone(),
    ));
    let scheduler_handle = tokio::spawn(scheduler.run(shutdown.clone()));

    let shutdown_on_signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            shutdown_on_signal.cancel();
        }
    });

    let result = run_server(state).await;

    shutdown.cancel();
    let _ = scheduler_handle.await;

    result
}
