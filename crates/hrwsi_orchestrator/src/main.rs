//! HR-WSI Orchestrator (Rust)
//!
//! Maps each trigger validation to at most one processing task (spec.md
//! §4.F). Listens on `raw2valid_insertion` and, on startup, re-queues every
//! validation that has no task yet.
//!
//! Usage:
//!     hrwsi-orchestrator --configuration-folder /etc/hrwsi

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use clap::Parser;
use hrwsi_db::{create_pool, PoolConfig, Store};
use hrwsi_protocol::config::SystemConfig;
use tokio::sync::watch;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "hrwsi-orchestrator", about = "HR-WSI validation-to-task orchestrator")]
struct Args {
    #[arg(long, env = "HRWSI_CONFIGURATION_FOLDER")]
    configuration_folder: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    hrwsi_logging::init_logging(hrwsi_logging::LogConfig {
        app_name: "hrwsi_orchestrator",
        verbose: false,
    })?;

    let args = Args::parse();
    let system = SystemConfig::from_env(args.configuration_folder)?;

    info!("starting HR-WSI orchestrator");
    let pool = create_pool(PoolConfig::new(system.database.connection_url())).await?;
    let store = Store::new(pool);
    store.migrate().await?;

    let in_flight: Arc<Mutex<HashSet<i64>>> = Arc::new(Mutex::new(HashSet::new()));
    hrwsi_orchestrator::worker::requeue_unprocessed(&store, &in_flight).await?;

    let (cancel_tx, cancel_rx) = watch::channel(false);

    let worker_store = store.clone();
    let worker_in_flight = in_flight.clone();
    let mut worker_cancel = cancel_rx.clone();
    let worker_handle = tokio::spawn(async move {
        hrwsi_orchestrator::worker::run(&worker_store, worker_in_flight, &mut worker_cancel).await
    });

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received, draining activities");
    let _ = cancel_tx.send(true);

    let _ = tokio::join!(worker_handle);
    Ok(())
}
