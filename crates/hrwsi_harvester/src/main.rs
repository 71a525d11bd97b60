//! HR-WSI Harvester (Rust)
//!
//! Periodically discovers new upstream raw items and records them exactly
//! once; also consumes the `product_insertion` channel fed by the
//! downstream catalogue.
//!
//! Usage:
//!     hrwsi-harvester --configuration-folder /etc/hrwsi

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use hrwsi_catalog::HttpCatalogClient;
use hrwsi_db::{create_pool, PoolConfig, Store};
use hrwsi_protocol::config::{CatalogConfig, HarvesterConfig, SystemConfig};
use hrwsi_protocol::defaults::DEFAULT_HARVEST_CYCLE_SECS;
use tokio::sync::watch;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "hrwsi-harvester", about = "HR-WSI raw-item discovery loop")]
struct Args {
    /// Directory holding per-rule geometry/auxiliary configuration files.
    #[arg(long, env = "HRWSI_CONFIGURATION_FOLDER")]
    configuration_folder: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    hrwsi_logging::init_logging(hrwsi_logging::LogConfig {
        app_name: "hrwsi_harvester",
        verbose: false,
    })?;

    let args = Args::parse();
    let system = SystemConfig::from_env(args.configuration_folder)?;
    let harvester_config = HarvesterConfig::from_env()?;
    let catalog_config = CatalogConfig::from_env()?;

    info!(mode = ?harvester_config.mode, "starting HR-WSI harvester");

    let pool = create_pool(PoolConfig::new(system.database.connection_url())).await?;
    let store = Store::new(pool);
    store.migrate().await?;

    let catalog = HttpCatalogClient::new(catalog_config.base_url);

    let (cancel_tx, mut cancel_rx_cycle) = watch::channel(false);
    let mut cancel_rx_listener = cancel_rx_cycle.clone();

    let cycle_store = store.clone();
    let cycle_handle = tokio::spawn(async move {
        run_cycle_loop(&cycle_store, &catalog, harvester_config.mode, &mut cancel_rx_cycle).await
    });

    let listener_store = store.clone();
    let listener_handle = tokio::spawn(async move {
        hrwsi_harvester::listener::run(&listener_store, &mut cancel_rx_listener).await
    });

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received, draining activities");
    let _ = cancel_tx.send(true);

    let _ = tokio::join!(cycle_handle, listener_handle);
    Ok(())
}

async fn run_cycle_loop(
    store: &Store,
    catalog: &HttpCatalogClient,
    mode: hrwsi_protocol::HarvestMode,
    cancel: &mut watch::Receiver<bool>,
) -> anyhow::Result<()> {
    loop {
        if let Err(e) = hrwsi_harvester::run_cycle(store, catalog, mode).await {
            tracing::warn!(error = %e, "harvest cycle failed");
        }
        tokio::select! {
            _ = cancel.changed() => {
                if *cancel.borrow() {
                    return Ok(());
                }
            }
            _ = tokio::time::sleep(Duration::from_secs(DEFAULT_HARVEST_CYCLE_SECS)) => {}
        }
    }
}
