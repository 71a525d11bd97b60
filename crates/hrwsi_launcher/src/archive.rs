//! Archive Launcher variant (spec.md §4.G): instead of listening on a
//! notification channel, periodically scans a sliding measurement-day
//! window and feeds the same dispatcher queue.

use std::collections::HashSet;
use std::sync::Mutex;

use chrono::Duration as ChronoDuration;
use hrwsi_db::Store;
use hrwsi_protocol::defaults::{default_archive_launcher_cap, ARCHIVE_LAUNCHER_WINDOW_DAYS};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::queries;

fn naive_date_from_measurement_day(day: i32) -> Option<chrono::NaiveDate> {
    chrono::NaiveDate::parse_from_str(&day.to_string(), "%Y%m%d").ok()
}

pub async fn cycle(
    store: &Store,
    flavour: &str,
    queue: &mpsc::Sender<(i64, i64)>,
    in_flight: &Mutex<HashSet<i64>>,
) -> anyhow::Result<()> {
    let cap = default_archive_launcher_cap();
    let Some(oldest) = queries::oldest_unprocessed_measurement_day(store.pool(), flavour).await? else {
        return Ok(());
    };
    let Some(window_start) = naive_date_from_measurement_day(oldest) else {
        warn!(oldest, "unparseable measurement day, skipping archive cycle");
        return Ok(());
    };
    if window_start > cap {
        return Ok(());
    }
    let window_end = std::cmp::min(window_start + ChronoDuration::days(ARCHIVE_LAUNCHER_WINDOW_DAYS), cap);

    let tasks = queries::archive_window_task_ids(store.pool(), flavour, window_start, window_end).await?;
    if !tasks.is_empty() {
        info!(flavour, count = tasks.len(), %window_start, %window_end, "enqueuing archive processing tasks");
    }
    for (task_id, trigger_validation_id) in tasks {
        {
            let mut guard = in_flight.lock().unwrap();
            if !guard.insert(task_id) {
                continue;
            }
        }
        if queue.send((task_id, trigger_validation_id)).await.is_err() {
            in_flight.lock().unwrap().remove(&task_id);
            break;
        }
    }
    Ok(())
}
