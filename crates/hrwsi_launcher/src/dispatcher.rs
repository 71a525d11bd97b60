//! Dispatcher activity (spec.md §4.G, item 2): pop queued tasks, render
//! their configuration, submit to the scheduler, and persist the
//! resulting dispatch.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use hrwsi_db::Store;
use hrwsi_protocol::config::{RendererConfig, VaultConfig};
use hrwsi_protocol::ProcessingStatus;
use hrwsi_renderer::RenderOutcome;
use hrwsi_scheduler::{AllocationStatus, SchedulerClient};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::job_spec::{render_job_spec, JobTemplateInputs};
use crate::probe::S3AuxiliaryProbe;
use crate::queries;

const ALLOCATION_POLL_INTERVAL: Duration = Duration::from_secs(2);
const ALLOCATION_POLL_MAX_ATTEMPTS: u32 = 30;

/// Build the two tag-replacement blobs the job template needs: a Vault
/// credentials template stanza and the worker bootstrap script location.
fn credentials_and_worker_script(vault: &VaultConfig, renderer: &RendererConfig) -> (String, String) {
    let credentials = format!(
        r#"{{ "DestPath": "secrets/vault_token.env", "EmbeddedTmpl": "{{{{ with secret \"{}\" }}}}VAULT_TOKEN={{{{ .Data.data.token }}}}{{{{ end }}}}" }}"#,
        vault.url
    );
    let worker_script = format!("s3://{}/scripts/worker.sh", renderer.s3_bucket_aux);
    (credentials, worker_script)
}

async fn dispatch_one(
    store: &Store,
    scheduler: &dyn SchedulerClient,
    renderer: &RendererConfig,
    vault: &VaultConfig,
    probe: &S3AuxiliaryProbe,
    task_id: i64,
) -> anyhow::Result<()> {
    if queries::has_live_dispatch(store.pool(), task_id).await? {
        return Ok(());
    }

    let routine = queries::fetch_routine_config_for_task(store.pool(), task_id).await?;
    let ctx = queries::fetch_context(store.pool(), task_id, renderer).await?;

    let outcome = hrwsi_renderer::render(&ctx, probe).await?;
    let config_path = match outcome {
        RenderOutcome::Skip { reason } => {
            info!(task_id, reason, "skipping dispatch, dynamic auxiliary missing");
            return Ok(());
        }
        RenderOutcome::Rendered { config_path } => config_path,
    };

    let dispatch_id = Uuid::new_v4();
    let (credentials_files, worker_script) = credentials_and_worker_script(vault, renderer);
    let job_spec = render_job_spec(&JobTemplateInputs {
        task_id,
        dispatch_id,
        routine: &routine,
        config_path: &config_path,
        credentials_files: &credentials_files,
        worker_script: &worker_script,
    });

    let eval_id = scheduler.submit(&job_spec).await?;
    info!(task_id, %dispatch_id, eval_id, "submitted processing task to scheduler");

    let mut attempts = 0;
    let initial_status = loop {
        attempts += 1;
        let keep_polling = attempts < ALLOCATION_POLL_MAX_ATTEMPTS;
        match scheduler.get_allocation(&dispatch_id.to_string()).await {
            Ok(alloc) if alloc.status == AllocationStatus::Running => break ProcessingStatus::Started,
            Ok(alloc) if alloc.status == AllocationStatus::Pending && keep_polling => {
                tokio::time::sleep(ALLOCATION_POLL_INTERVAL).await;
            }
            Ok(_) => break ProcessingStatus::Pending,
            Err(hrwsi_scheduler::SchedulerError::NotFound(_)) if keep_polling => {
                tokio::time::sleep(ALLOCATION_POLL_INTERVAL).await;
            }
            Err(e) => {
                warn!(task_id, %dispatch_id, error = %e, "giving up on allocation lookup, recording pending");
                break ProcessingStatus::Pending;
            }
        }
    };

    let log_path = format!("s3://{}/logs/{}/{}.log", renderer.s3_bucket_outputs, routine.routine, dispatch_id);
    queries::insert_dispatch(store, task_id, dispatch_id, &log_path, initial_status).await?;
    Ok(())
}

pub async fn run(
    store: Store,
    scheduler: Arc<dyn SchedulerClient>,
    renderer: RendererConfig,
    vault: VaultConfig,
    probe: S3AuxiliaryProbe,
    mut queue: mpsc::Receiver<(i64, i64)>,
    in_flight: Arc<Mutex<std::collections::HashSet<i64>>>,
) {
    while let Some((task_id, _trigger_validation_id)) = queue.recv().await {
        let result = dispatch_one(
            &store,
            scheduler.as_ref(),
            &renderer,
            &vault,
            &probe,
            task_id,
        )
        .await;
        in_flight.lock().unwrap().remove(&task_id);
        if let Err(e) = result {
            warn!(task_id, error = %e, "failed to dispatch processing task");
        }
    }
}
