//! `processing_task_insertion` listener (spec.md §4.G, item 1): filters by
//! flavour and enqueues into the dispatcher's work queue, deduplicated by
//! an in-flight set.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hrwsi_db::{NotificationListener, Store};
use hrwsi_protocol::defaults::CHANNEL_PROCESSING_TASK_INSERTION;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::warn;

use crate::queries;

const POLL_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct ProcessingTaskPayload {
    processing_task_id: i64,
    trigger_validation_id: i64,
}

/// Enqueue `task_id` if it is not already queued or being dispatched.
async fn enqueue_if_due(
    store: &Store,
    flavour: &str,
    task_id: i64,
    trigger_validation_id: i64,
    in_flight: &Mutex<HashSet<i64>>,
    queue: &mpsc::Sender<(i64, i64)>,
) {
    match queries::fetch_routine_config_for_task(store.pool(), task_id).await {
        Ok(routine) if routine.flavour == flavour => {}
        Ok(_) => return,
        Err(e) => {
            warn!(task_id, error = %e, "could not resolve routine for processing task");
            return;
        }
    }

    {
        let mut guard = in_flight.lock().unwrap();
        if !guard.insert(task_id) {
            return;
        }
    }
    if queue.send((task_id, trigger_validation_id)).await.is_err() {
        in_flight.lock().unwrap().remove(&task_id);
    }
}

pub async fn run(
    store: &Store,
    flavour: &str,
    queue: mpsc::Sender<(i64, i64)>,
    in_flight: Arc<Mutex<HashSet<i64>>>,
    cancel: &mut tokio::sync::watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let mut listener =
        NotificationListener::connect(store.pool(), &[CHANNEL_PROCESSING_TASK_INSERTION]).await?;
    loop {
        tokio::select! {
            _ = cancel.changed() => {
                if *cancel.borrow() {
                    return Ok(());
                }
            }
            notif = listener.poll(POLL_TIMEOUT) => {
                if let Some(notif) = notif? {
                    match serde_json::from_str::<ProcessingTaskPayload>(&notif.payload) {
                        Ok(payload) => {
                            enqueue_if_due(
                                store,
                                flavour,
                                payload.processing_task_id,
                                payload.trigger_validation_id,
                                &in_flight,
                                &queue,
                            )
                            .await;
                        }
                        Err(e) => warn!(error = %e, "dropping malformed processing_task_insertion payload"),
                    }
                }
            }
        }
    }
}
