//! HR-WSI Launcher (Rust)
//!
//! One instance per resource "flavour". Dispatches processing tasks to the
//! cluster scheduler, re-drives undispatched and in-error tasks, and
//! sweeps lost jobs. With `--source archive`, replaces the notification
//! listener with the Archive Launcher's sliding-window scan.
//!
//! Usage:
//!     hrwsi-launcher --flavour hma.large --configuration-folder /etc/hrwsi

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::{Parser, ValueEnum};
use hrwsi_db::{create_pool, PoolConfig, Store};
use hrwsi_protocol::config::{LauncherConfig, RendererConfig, SystemConfig};
use hrwsi_protocol::defaults::{DEFAULT_LAUNCHER_CYCLE_SECS, FLAVOURS};
use hrwsi_scheduler::{NomadClient, SchedulerClient};
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Source {
    Notify,
    Archive,
}

#[derive(Parser, Debug)]
#[command(name = "hrwsi-launcher", about = "HR-WSI processing-task dispatcher")]
struct Args {
    #[arg(long, env = "HRWSI_LAUNCHER_FLAVOUR")]
    flavour: String,

    #[arg(long, env = "HRWSI_CONFIGURATION_FOLDER")]
    configuration_folder: PathBuf,

    #[arg(long, value_enum, default_value = "notify")]
    source: Source,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    hrwsi_logging::init_logging(hrwsi_logging::LogConfig {
        app_name: "hrwsi_launcher",
        verbose: false,
    })?;

    let args = Args::parse();
    if !FLAVOURS.contains(&args.flavour.as_str()) {
        anyhow::bail!("unknown flavour '{}', expected one of {:?}", args.flavour, FLAVOURS);
    }

    let system = SystemConfig::from_env(args.configuration_folder)?;
    let launcher_config = LauncherConfig::from_env(args.flavour.clone())?;
    let renderer_config = RendererConfig::from_env()?;

    info!(flavour = %args.flavour, "starting HR-WSI launcher");
    let pool = create_pool(PoolConfig::new(system.database.connection_url())).await?;
    let store = Store::new(pool);
    store.migrate().await?;

    let scheduler: Arc<dyn SchedulerClient> = Arc::new(NomadClient::new(
        launcher_config.scheduler.base_url(),
        launcher_config.scheduler.token.clone(),
    ));
    let probe = hrwsi_launcher::probe::S3AuxiliaryProbe::new(renderer_config.s3_endpoint_url.clone());

    let (cancel_tx, cancel_rx) = watch::channel(false);
    let (queue_tx, queue_rx) = mpsc::channel::<(i64, i64)>(256);
    let in_flight: Arc<Mutex<HashSet<i64>>> = Arc::new(Mutex::new(HashSet::new()));

    let dispatcher_handle = tokio::spawn(hrwsi_launcher::dispatcher::run(
        store.clone(),
        scheduler.clone(),
        renderer_config.clone(),
        launcher_config.vault.clone(),
        probe,
        queue_rx,
        in_flight.clone(),
    ));

    let source_handle = match args.source {
        Source::Notify => {
            let store = store.clone();
            let flavour = args.flavour.clone();
            let in_flight = in_flight.clone();
            let mut cancel = cancel_rx.clone();
            tokio::spawn(async move {
                hrwsi_launcher::listener::run(&store, &flavour, queue_tx, in_flight, &mut cancel).await
            })
        }
        Source::Archive => {
            let store = store.clone();
            let flavour = args.flavour.clone();
            let in_flight = in_flight.clone();
            let mut cancel = cancel_rx.clone();
            tokio::spawn(async move {
                loop {
                    if let Err(e) = hrwsi_launcher::archive::cycle(&store, &flavour, &queue_tx, &in_flight).await {
                        warn!(error = %e, "archive launcher cycle failed");
                    }
                    tokio::select! {
                        _ = cancel.changed() => {
                            if *cancel.borrow() {
                                return Ok(());
                            }
                        }
                        _ = tokio::time::sleep(Duration::from_secs(DEFAULT_LAUNCHER_CYCLE_SECS)) => {}
                    }
                }
            })
        }
    };

    let undispatched_handle = spawn_periodic(store.clone(), args.flavour.clone(), cancel_rx.clone(), |store, flavour| {
        Box::pin(hrwsi_launcher::redriver::undispatched_cycle(store, flavour))
    });
    let in_error_handle = spawn_periodic(store.clone(), args.flavour.clone(), cancel_rx.clone(), |store, flavour| {
        Box::pin(hrwsi_launcher::redriver::in_error_cycle(store, flavour))
    });

    let sweeper_store = store.clone();
    let sweeper_flavour = args.flavour.clone();
    let sweeper_scheduler = scheduler.clone();
    let mut sweeper_cancel = cancel_rx.clone();
    let sweeper_handle = tokio::spawn(async move {
        loop {
            if let Err(e) = hrwsi_launcher::sweeper::cycle(&sweeper_store, sweeper_scheduler.clone(), &sweeper_flavour).await {
                warn!(error = %e, "lost-job sweeper cycle failed");
            }
            tokio::select! {
                _ = sweeper_cancel.changed() => {
                    if *sweeper_cancel.borrow() {
                        return;
                    }
                }
                _ = tokio::time::sleep(Duration::from_secs(DEFAULT_LAUNCHER_CYCLE_SECS)) => {}
            }
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received, draining activities");
    let _ = cancel_tx.send(true);

    let _ = tokio::join!(
        dispatcher_handle,
        source_handle,
        undispatched_handle,
        in_error_handle,
        sweeper_handle
    );
    Ok(())
}

fn spawn_periodic<F>(
    store: Store,
    flavour: String,
    mut cancel: watch::Receiver<bool>,
    cycle: F,
) -> tokio::task::JoinHandle<()>
where
    F: for<'a> Fn(
            &'a Store,
            &'a str,
        ) -> std::pin::Pin<Box<dyn std::future::Future<Output = anyhow::Result<()>> + Send + 'a>>
        + Send
        + 'static,
{
    tokio::spawn(async move {
        loop {
            if let Err(e) = cycle(&store, &flavour).await {
                warn!(error = %e, "periodic launcher cycle failed");
            }
            tokio::select! {
                _ = cancel.changed() => {
                    if *cancel.borrow() {
                        return;
                    }
                }
                _ = tokio::time::sleep(Duration::from_secs(DEFAULT_LAUNCHER_CYCLE_SECS)) => {}
            }
        }
    })
}
