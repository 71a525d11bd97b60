//! `raw2valid_insertion` listener and validation → task mapping (spec.md
//! §4.F).

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hrwsi_db::{NotificationListener, Store};
use hrwsi_protocol::defaults::CHANNEL_RAW2VALID_INSERTION;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::queries;

const POLL_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct Raw2ValidPayload {
    trigger_validation_id: i64,
}

/// Map one validation to a task if it does not already have one.
pub async fn process_validation(store: &Store, validation_id: i64, in_flight: &Mutex<HashSet<i64>>) {
    {
        let mut guard = in_flight.lock().unwrap();
        if !guard.insert(validation_id) {
            return;
        }
    }
    let result = process_validation_inner(store, validation_id).await;
    in_flight.lock().unwrap().remove(&validation_id);
    if let Err(e) = result {
        warn!(validation_id, error = %e, "failed to map validation to a processing task");
    }
}

async fn process_validation_inner(store: &Store, validation_id: i64) -> anyhow::Result<()> {
    let pool = store.pool();
    if queries::task_exists_for_validation(pool, validation_id).await? {
        debug!(validation_id, "validation already has a processing task");
        return Ok(());
    }
    let validation = queries::fetch_validation(pool, validation_id).await?;
    if queries::insert_task(store, &validation).await? {
        info!(validation_id, "created processing task");
    }
    Ok(())
}

/// Requeue every validation without a task, run once at startup (spec.md
/// §4.F: "on restart, all unprocessed validations are re-queued").
pub async fn requeue_unprocessed(store: &Store, in_flight: &Mutex<HashSet<i64>>) -> anyhow::Result<()> {
    let ids = queries::unprocessed_validation_ids(store.pool()).await?;
    if !ids.is_empty() {
        info!(count = ids.len(), "re-queuing unprocessed validations on restart");
    }
    for id in ids {
        process_validation(store, id, in_flight).await;
    }
    Ok(())
}

pub async fn run(
    store: &Store,
    in_flight: Arc<Mutex<HashSet<i64>>>,
    cancel: &mut tokio::sync::watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let mut listener = NotificationListener::connect(store.pool(), &[CHANNEL_RAW2VALID_INSERTION]).await?;
    loop {
        tokio::select! {
            _ = cancel.changed() => {
                if *cancel.borrow() {
                    return Ok(());
                }
            }
            notif = listener.poll(POLL_TIMEOUT) => {
                if let Some(notif) = notif? {
                    match serde_json::from_str::<Raw2ValidPayload>(&notif.payload) {
                        Ok(payload) => process_validation(store, payload.trigger_validation_id, &in_flight).await,
                        Err(e) => warn!(error = %e, "dropping malformed raw2valid_insertion payload"),
                    }
                }
            }
        }
    }
}
