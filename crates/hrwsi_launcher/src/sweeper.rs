//! Lost-job sweeper (spec.md §4.G, item 5): detect dispatches stuck
//! without progress and relaunch them by recording a synthetic
//! `internal_error` status.

use std::sync::Arc;

use chrono::Utc;
use hrwsi_db::Store;
use hrwsi_protocol::defaults::{
    LOST_JOB_EXIT_CODE, LOST_JOB_MIN_DURATION_MINUTES, LOST_JOB_NO_CALLBACK_SECS,
    LOST_JOB_PAST_STARTED_MULTIPLIER,
};
use hrwsi_protocol::ProcessingStatus;
use hrwsi_scheduler::{SchedulerClient, SchedulerError};
use tracing::{info, warn};

use crate::queries::{self, UnfinishedDispatch};

fn past_started_threshold_secs(routine_duration_minutes: i32) -> i64 {
    LOST_JOB_PAST_STARTED_MULTIPLIER
        * std::cmp::max(LOST_JOB_MIN_DURATION_MINUTES, routine_duration_minutes as i64)
        * 60
}

/// Whether `dispatch` should be relaunched this cycle.
async fn should_relaunch(dispatch: &UnfinishedDispatch, scheduler: &dyn SchedulerClient) -> bool {
    let elapsed = (Utc::now() - dispatch.dispatch_date).num_seconds();
    match dispatch.latest_status {
        None | Some(ProcessingStatus::Pending) => {
            if elapsed > LOST_JOB_NO_CALLBACK_SECS {
                return true;
            }
            matches!(
                scheduler.get_allocation(&dispatch.dispatch_id.to_string()).await,
                Err(SchedulerError::NotFound(_))
            )
        }
        Some(ProcessingStatus::Started) => elapsed > past_started_threshold_secs(dispatch.routine_duration_minutes),
        Some(ProcessingStatus::Processed)
        | Some(ProcessingStatus::Terminated)
        | Some(ProcessingStatus::InternalError)
        | Some(ProcessingStatus::ExternalError) => false,
    }
}

pub async fn cycle(store: &Store, scheduler: Arc<dyn SchedulerClient>, flavour: &str) -> anyhow::Result<()> {
    let dispatches = queries::unfinished_dispatches(store.pool(), flavour).await?;
    for dispatch in dispatches {
        if should_relaunch(&dispatch, scheduler.as_ref()).await {
            info!(task_id = dispatch.task_id, dispatch_id = %dispatch.dispatch_id, "relaunching lost job");
            if let Err(e) = queries::append_status(
                store.pool(),
                dispatch.dispatch_id,
                ProcessingStatus::InternalError,
                Some(LOST_JOB_EXIT_CODE),
                Some("lost-job sweeper: no progress observed"),
            )
            .await
            {
                warn!(task_id = dispatch.task_id, error = %e, "failed to record lost-job status");
            }
        }
    }
    Ok(())
}
