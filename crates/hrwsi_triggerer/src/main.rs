//! HR-WSI Triggerer (Rust)
//!
//! Evaluates per-product triggering conditions and emits trigger
//! validations. Runs four concurrent activities: a notification listener
//! on `input_insertion`, and periodic GRDH, L1C, and scheduled
//! (GFSC/WICS1S2) rule passes.
//!
//! Usage:
//!     hrwsi-triggerer --configuration-folder /etc/hrwsi

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use hrwsi_db::{create_pool, PoolConfig, Store};
use hrwsi_protocol::config::SystemConfig;
use hrwsi_protocol::defaults::{
    DEFAULT_GFSC_CYCLE_SECS, DEFAULT_GRDH_CYCLE_SECS, DEFAULT_L1C_CYCLE_SECS,
    DEFAULT_WICS1S2_CYCLE_SECS,
};
use tokio::sync::watch;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "hrwsi-triggerer", about = "HR-WSI trigger-validation rule engine")]
struct Args {
    #[arg(long, env = "HRWSI_CONFIGURATION_FOLDER")]
    configuration_folder: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    hrwsi_logging::init_logging(hrwsi_logging::LogConfig {
        app_name: "hrwsi_triggerer",
        verbose: false,
    })?;

    let args = Args::parse();
    let system = SystemConfig::from_env(args.configuration_folder)?;

    info!("starting HR-WSI triggerer");
    let pool = create_pool(PoolConfig::new(system.database.connection_url())).await?;
    let store = Store::new(pool);
    store.migrate().await?;

    let (cancel_tx, cancel_rx) = watch::channel(false);

    let listener_store = store.clone();
    let mut listener_cancel = cancel_rx.clone();
    let listener_handle = tokio::spawn(async move {
        hrwsi_triggerer::listener::run(&listener_store, &mut listener_cancel).await
    });

    let grdh_handle = spawn_periodic(
        store.clone(),
        cancel_rx.clone(),
        Duration::from_secs(DEFAULT_GRDH_CYCLE_SECS),
        |store| Box::pin(hrwsi_triggerer::rules::grdh::run_cycle(store)),
    );
    let l1c_handle = spawn_periodic(
        store.clone(),
        cancel_rx.clone(),
        Duration::from_secs(DEFAULT_L1C_CYCLE_SECS),
        |store| Box::pin(hrwsi_triggerer::rules::cc::run_cycle(store)),
    );
    let wics1s2_handle = spawn_periodic(
        store.clone(),
        cancel_rx.clone(),
        Duration::from_secs(DEFAULT_WICS1S2_CYCLE_SECS),
        |store| Box::pin(hrwsi_triggerer::rules::wics1s2::run_cycle(store)),
    );
    let gfsc_handle = spawn_periodic(
        store.clone(),
        cancel_rx.clone(),
        Duration::from_secs(DEFAULT_GFSC_CYCLE_SECS),
        |store| Box::pin(hrwsi_triggerer::rules::gfsc::run_cycle(store)),
    );

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received, draining activities");
    let _ = cancel_tx.send(true);

    let _ = tokio::join!(
        listener_handle,
        grdh_handle,
        l1c_handle,
        wics1s2_handle,
        gfsc_handle
    );
    Ok(())
}

/// Run `cycle` every `period` until `cancel` fires, the way the Harvester
/// runs its own periodic loop.
fn spawn_periodic<F>(
    store: Store,
    mut cancel: watch::Receiver<bool>,
    period: Duration,
    cycle: F,
) -> tokio::task::JoinHandle<()>
where
    F: for<'a> Fn(&'a Store) -> std::pin::Pin<Box<dyn std::future::Future<Output = anyhow::Result<()>> + Send + 'a>>
        + Send
        + 'static,
{
    tokio::spawn(async move {
        loop {
            if let Err(e) = cycle(&store).await {
                warn!(error = %e, "periodic rule cycle failed");
            }
            tokio::select! {
                _ = cancel.changed() => {
                    if *cancel.borrow() {
                        return;
                    }
                }
                _ = tokio::time::sleep(period) => {}
            }
        }
    })
}
