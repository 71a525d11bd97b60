//! Undispatched and in-error re-drivers (spec.md §4.G, items 3 and 4):
//! periodically re-notify tasks that should be retried.

use hrwsi_db::Store;
use hrwsi_protocol::defaults::DEFAULT_MEASUREMENT_DAY_CUTOFF;
use tracing::{info, warn};

use crate::queries;

pub async fn undispatched_cycle(store: &Store, flavour: &str) -> anyhow::Result<()> {
    let tasks = queries::undispatched_task_ids(store.pool(), flavour, DEFAULT_MEASUREMENT_DAY_CUTOFF).await?;
    if !tasks.is_empty() {
        info!(flavour, count = tasks.len(), "re-notifying undispatched tasks");
    }
    for (task_id, trigger_validation_id) in tasks {
        if let Err(e) = queries::renotify_task(store, task_id, trigger_validation_id).await {
            warn!(task_id, error = %e, "failed to re-notify undispatched task");
        }
    }
    Ok(())
}

pub async fn in_error_cycle(store: &Store, flavour: &str) -> anyhow::Result<()> {
    let tasks = queries::in_error_task_ids(store.pool(), flavour).await?;
    if !tasks.is_empty() {
        info!(flavour, count = tasks.len(), "re-notifying in-error tasks");
    }
    for (task_id, trigger_validation_id) in tasks {
        if let Err(e) = queries::renotify_task(store, task_id, trigger_validation_id).await {
            warn!(task_id, error = %e, "failed to re-notify in-error task");
        }
    }
    Ok(())
}
