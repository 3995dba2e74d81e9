//! eventvault-init: prepare a store for use.
//!
//! Connects to the configured backend (retrying while it comes up), creates
//! the namespaced events, snapshots and counters tables with their indexes,
//! seeds the events counter, reports the current state and exits.
//!
//! ## Configuration
//! - `--config <path>` or EVENTVAULT_CONFIG: YAML configuration file
//! - EVENTVAULT_STORAGE__TYPE / EVENTVAULT_STORAGE__ADDRESS / EVENTVAULT_STORAGE__NAMESPACE
//! - EVENTVAULT_LOG: log filter (default "info")

use tracing::{error, info};

use eventvault::config::Config;
use eventvault::storage::{Store, EVENTS_COUNTER};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    eventvault::utils::bootstrap::init_tracing();

    let config_path = eventvault::utils::bootstrap::parse_config_path();
    let config = Config::load(config_path.as_deref()).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        storage_type = ?config.storage.storage_type,
        namespace = %config.storage.namespace,
        "Initializing store"
    );

    let store = Store::initialize(&config.storage).await.map_err(|e| {
        error!(error = %e, "Store initialization failed");
        e
    })?;

    let position = store.sequences().current(EVENTS_COUNTER).await?.unwrap_or(0);
    info!(
        namespace = %store.namespace(),
        position,
        snapshot_interval = config.snapshots.interval,
        "Store ready"
    );

    store.close().await;
    Ok(())
}
