//! Store access for the Launcher: the `HCL_INFO_REQUEST`-equivalent
//! context join, dispatch bookkeeping, and the re-driver/sweeper scans
//! (spec.md §4.G).

use chrono::{DateTime, NaiveDate, Utc};
use hrwsi_db::{Store, StoreError};
use hrwsi_protocol::defaults::CHANNEL_PROCESSING_TASK_INSERTION;
use hrwsi_protocol::ProcessingStatus;
use hrwsi_renderer::{ContextInput, RenderContext};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// Per-routine launch configuration, `systemparams.routine_config`.
#[derive(Debug, Clone, FromRow)]
pub struct RoutineConfig {
    pub routine: String,
    pub flavour: String,
    pub image: String,
    pub ram_mb: i32,
    pub duration_minutes: i32,
}

pub async fn fetch_routine_config_for_task(
    pool: &PgPool,
    task_id: i64,
) -> Result<RoutineConfig, StoreError> {
    sqlx::query_as::<_, RoutineConfig>(
        r#"
        SELECT rc.routine, rc.flavour, rc.image, rc.ram_mb, rc.duration_minutes
        FROM hrwsi.processing_tasks pt
        JOIN hrwsi.trigger_validation tv ON tv.id = pt.trigger_validation_id
        JOIN hrwsi.triggering_condition tc ON tc.name = tv.triggering_condition
        JOIN systemparams.routine_config rc ON rc.routine = tc.routine
        WHERE pt.id = $1
        "#,
    )
    .bind(task_id)
    .fetch_one(pool)
    .await
    .map_err(StoreError::from)
}

#[derive(FromRow)]
struct RawInputRow {
    identifier: String,
    input_path: String,
    tile: String,
    measurement_day: i32,
}

/// Assemble the renderer context for one task: joins raw_inputs, routine,
/// and its duration (spec.md §4.G: "Fetch rich context (`HCL_INFO_REQUEST`):
/// joins raw_inputs, routines, durations").
pub async fn fetch_context(
    pool: &PgPool,
    task_id: i64,
    renderer: &hrwsi_protocol::config::RendererConfig,
) -> Result<RenderContext, StoreError> {
    #[derive(FromRow)]
    struct TaskRow {
        validation_id: i64,
        routine: String,
        processing_date: Option<i32>,
        duration_minutes: i32,
    }

    let task: TaskRow = sqlx::query_as(
        r#"
        SELECT
            tv.id AS validation_id,
            tc.routine AS routine,
            pt.processing_date AS processing_date,
            rc.duration_minutes AS duration_minutes
        FROM hrwsi.processing_tasks pt
        JOIN hrwsi.trigger_validation tv ON tv.id = pt.trigger_validation_id
        JOIN hrwsi.triggering_condition tc ON tc.name = tv.triggering_condition
        JOIN systemparams.routine_config rc ON rc.routine = tc.routine
        WHERE pt.id = $1
        "#,
    )
    .bind(task_id)
    .fetch_one(pool)
    .await
    .map_err(StoreError::from)?;

    let inputs: Vec<RawInputRow> = sqlx::query_as(
        r#"
        SELECT ri.identifier, ri.input_path, ri.tile, ri.measurement_day
        FROM hrwsi.raw2valid r2v
        JOIN hrwsi.raw_inputs ri ON ri.id = r2v.raw_input_id
        WHERE r2v.trigger_validation_id = $1
        ORDER BY ri.id ASC
        "#,
    )
    .bind(task.validation_id)
    .fetch_all(pool)
    .await
    .map_err(StoreError::from)?;

    let tile = inputs
        .first()
        .map(|i| i.tile.clone())
        .unwrap_or_default();
    let measurement_day = task
        .processing_date
        .or_else(|| inputs.first().map(|i| i.measurement_day))
        .unwrap_or(0);

    Ok(RenderContext {
        task_id,
        validation_id: task.validation_id,
        routine: task.routine.clone(),
        product_type: task.routine,
        tile,
        measurement_day,
        inputs: inputs
            .into_iter()
            .map(|i| ContextInput {
                identifier: i.identifier,
                input_path: i.input_path,
                tile: i.tile,
                measurement_day: i.measurement_day,
            })
            .collect(),
        routine_duration_minutes: task.duration_minutes as i64,
        s3_bucket_inputs: renderer.s3_bucket_inputs.clone(),
        s3_bucket_outputs: renderer.s3_bucket_outputs.clone(),
        s3_bucket_aux: renderer.s3_bucket_aux.clone(),
        config_output_dir: renderer.config_output_dir.to_string_lossy().into_owned(),
    })
}

/// Whether `task_id` is currently deployed: it has a dispatch whose
/// latest status is still live (spec.md §4.G: "Re-check 'not currently
/// deployed'"). A task whose last dispatch ended in error or was swept as
/// lost is *not* currently deployed and may be dispatched again.
pub async fn has_live_dispatch(pool: &PgPool, task_id: i64) -> Result<bool, StoreError> {
    let row: (Option<ProcessingStatus>,) = sqlx::query_as(
        r#"
        SELECT psw.status
        FROM hrwsi.pt2nomad p2n
        JOIN hrwsi.nomad_job_dispatch njd ON njd.id = p2n.nomad_job_dispatch_id
        JOIN hrwsi.processing_status_workflow psw ON psw.nomad_job_dispatch_id = njd.id
        WHERE p2n.processing_task_id = $1
        ORDER BY njd.dispatch_date DESC, psw.status_date DESC
        LIMIT 1
        "#,
    )
    .bind(task_id)
    .fetch_optional(pool)
    .await
    .map_err(StoreError::from)?
    .unwrap_or((None,));
    Ok(row.0.map(ProcessingStatus::is_live).unwrap_or(false))
}

/// Persist `NomadJobDispatch`, `PT2Nomad`, and the initial status row in
/// one transaction.
pub async fn insert_dispatch(
    store: &Store,
    task_id: i64,
    dispatch_id: Uuid,
    log_path: &str,
    initial_status: ProcessingStatus,
) -> Result<(), StoreError> {
    let mut tx = store.begin().await?;
    sqlx::query(
        "INSERT INTO hrwsi.nomad_job_dispatch (id, dispatch_date, log_path) VALUES ($1, $2, $3)",
    )
    .bind(dispatch_id)
    .bind(Utc::now())
    .bind(log_path)
    .execute(&mut *tx)
    .await
    .map_err(StoreError::from)?;

    sqlx::query(
        "INSERT INTO hrwsi.pt2nomad (processing_task_id, nomad_job_dispatch_id) VALUES ($1, $2)
         ON CONFLICT DO NOTHING",
    )
    .bind(task_id)
    .bind(dispatch_id)
    .execute(&mut *tx)
    .await
    .map_err(StoreError::from)?;

    sqlx::query(
        "INSERT INTO hrwsi.processing_status_workflow (nomad_job_dispatch_id, status, status_date)
         VALUES ($1, $2, $3)",
    )
    .bind(dispatch_id)
    .bind(initial_status)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await
    .map_err(StoreError::from)?;

    tx.commit().await.map_err(StoreError::from)
}

/// Append a status row outside a transaction (the sweeper and the
/// dispatcher's later polling both just append one row each).
pub async fn append_status(
    pool: &PgPool,
    dispatch_id: Uuid,
    status: ProcessingStatus,
    exit_code: Option<i32>,
    message: Option<&str>,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO hrwsi.processing_status_workflow
            (nomad_job_dispatch_id, status, status_date, exit_code, message)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(dispatch_id)
    .bind(status)
    .bind(Utc::now())
    .bind(exit_code)
    .bind(message)
    .execute(pool)
    .await
    .map_err(StoreError::from)?;
    Ok(())
}

/// Re-publish `processing_task_insertion` for a task the re-drivers found,
/// the same payload shape the Orchestrator emits on first creation.
pub async fn renotify_task(store: &Store, task_id: i64, trigger_validation_id: i64) -> Result<(), StoreError> {
    let payload = serde_json::json!({
        "processing_task_id": task_id,
        "trigger_validation_id": trigger_validation_id,
    })
    .to_string();
    store
        .notify(CHANNEL_PROCESSING_TASK_INSERTION, &payload)
        .await
}

/// Tasks with no dispatch yet, for this flavour, at or past the
/// measurement-day cutoff (spec.md §4.G, undispatched re-driver).
pub async fn undispatched_task_ids(
    pool: &PgPool,
    flavour: &str,
    measurement_day_cutoff: u32,
) -> Result<Vec<(i64, i64)>, StoreError> {
    let rows: Vec<(i64, i64)> = sqlx::query_as(
        r#"
        SELECT pt.id, pt.trigger_validation_id
        FROM hrwsi.processing_tasks pt
        JOIN hrwsi.trigger_validation tv ON tv.id = pt.trigger_validation_id
        JOIN hrwsi.triggering_condition tc ON tc.name = tv.triggering_condition
        JOIN systemparams.routine_config rc ON rc.routine = tc.routine
        WHERE rc.flavour = $1
          AND pt.processing_date >= $2
          AND NOT EXISTS (SELECT 1 FROM hrwsi.pt2nomad p2n WHERE p2n.processing_task_id = pt.id)
        "#,
    )
    .bind(flavour)
    .bind(measurement_day_cutoff as i32)
    .fetch_all(pool)
    .await
    .map_err(StoreError::from)?;
    Ok(rows)
}

/// Tasks whose latest status (by `status_date`, across their latest
/// dispatch) is `internal_error`/`external_error` (spec.md §4.G, in-error
/// re-driver).
pub async fn in_error_task_ids(pool: &PgPool, flavour: &str) -> Result<Vec<(i64, i64)>, StoreError> {
    let rows: Vec<(i64, i64)> = sqlx::query_as(
        r#"
        WITH latest_dispatch AS (
            SELECT DISTINCT ON (p2n.processing_task_id)
                p2n.processing_task_id, p2n.nomad_job_dispatch_id
            FROM hrwsi.pt2nomad p2n
            JOIN hrwsi.nomad_job_dispatch njd ON njd.id = p2n.nomad_job_dispatch_id
            ORDER BY p2n.processing_task_id, njd.dispatch_date DESC
        ),
        latest_status AS (
            SELECT DISTINCT ON (psw.nomad_job_dispatch_id)
                psw.nomad_job_dispatch_id, psw.status
            FROM hrwsi.processing_status_workflow psw
            ORDER BY psw.nomad_job_dispatch_id, psw.status_date DESC
        )
        SELECT pt.id, pt.trigger_validation_id
        FROM hrwsi.processing_tasks pt
        JOIN hrwsi.trigger_validation tv ON tv.id = pt.trigger_validation_id
        JOIN hrwsi.triggering_condition tc ON tc.name = tv.triggering_condition
        JOIN systemparams.routine_config rc ON rc.routine = tc.routine
        JOIN latest_dispatch ld ON ld.processing_task_id = pt.id
        JOIN latest_status ls ON ls.nomad_job_dispatch_id = ld.nomad_job_dispatch_id
        WHERE rc.flavour = $1
          AND ls.status IN ('internal_error', 'external_error')
        "#,
    )
    .bind(flavour)
    .fetch_all(pool)
    .await
    .map_err(StoreError::from)?;
    Ok(rows)
}

/// One unfinished task's latest dispatch, for the lost-job sweeper.
#[derive(Debug, Clone, FromRow)]
pub struct UnfinishedDispatch {
    pub task_id: i64,
    pub trigger_validation_id: i64,
    pub dispatch_id: Uuid,
    pub dispatch_date: DateTime<Utc>,
    pub latest_status: Option<ProcessingStatus>,
    pub routine_duration_minutes: i32,
}

pub async fn unfinished_dispatches(
    pool: &PgPool,
    flavour: &str,
) -> Result<Vec<UnfinishedDispatch>, StoreError> {
    let rows: Vec<UnfinishedDispatch> = sqlx::query_as(
        r#"
        WITH latest_dispatch AS (
            SELECT DISTINCT ON (p2n.processing_task_id)
                p2n.processing_task_id, p2n.nomad_job_dispatch_id, njd.dispatch_date
            FROM hrwsi.pt2nomad p2n
            JOIN hrwsi.nomad_job_dispatch njd ON njd.id = p2n.nomad_job_dispatch_id
            ORDER BY p2n.processing_task_id, njd.dispatch_date DESC
        ),
        latest_status AS (
            SELECT DISTINCT ON (psw.nomad_job_dispatch_id)
                psw.nomad_job_dispatch_id, psw.status
            FROM hrwsi.processing_status_workflow psw
            ORDER BY psw.nomad_job_dispatch_id, psw.status_date DESC
        )
        SELECT
            pt.id AS task_id,
            pt.trigger_validation_id AS trigger_validation_id,
            ld.nomad_job_dispatch_id AS dispatch_id,
            ld.dispatch_date AS dispatch_date,
            ls.status AS latest_status,
            rc.duration_minutes AS routine_duration_minutes
        FROM hrwsi.processing_tasks pt
        JOIN hrwsi.trigger_validation tv ON tv.id = pt.trigger_validation_id
        JOIN hrwsi.triggering_condition tc ON tc.name = tv.triggering_condition
        JOIN systemparams.routine_config rc ON rc.routine = tc.routine
        JOIN latest_dispatch ld ON ld.processing_task_id = pt.id
        LEFT JOIN latest_status ls ON ls.nomad_job_dispatch_id = ld.nomad_job_dispatch_id
        WHERE rc.flavour = $1 AND pt.has_ended = FALSE
        "#,
    )
    .bind(flavour)
    .fetch_all(pool)
    .await
    .map_err(StoreError::from)?;
    Ok(rows)
}

/// Oldest unprocessed archive measurement day for this flavour, capped at
/// `hrwsi_protocol::defaults::default_archive_launcher_cap()` by the caller.
pub async fn oldest_unprocessed_measurement_day(
    pool: &PgPool,
    flavour: &str,
) -> Result<Option<i32>, StoreError> {
    let row: (Option<i32>,) = sqlx::query_as(
        r#"
        SELECT MIN(pt.processing_date)
        FROM hrwsi.processing_tasks pt
        JOIN hrwsi.trigger_validation tv ON tv.id = pt.trigger_validation_id
        JOIN hrwsi.triggering_condition tc ON tc.name = tv.triggering_condition
        JOIN systemparams.routine_config rc ON rc.routine = tc.routine
        WHERE rc.flavour = $1
          AND pt.processing_date IS NOT NULL
          AND NOT EXISTS (SELECT 1 FROM hrwsi.pt2nomad p2n WHERE p2n.processing_task_id = pt.id)
        "#,
    )
    .bind(flavour)
    .fetch_one(pool)
    .await
    .map_err(StoreError::from)?;
    Ok(row.0)
}

/// Undispatched tasks within `[window_start, window_end]` (inclusive),
/// used by the Archive Launcher's sliding window scan.
pub async fn archive_window_task_ids(
    pool: &PgPool,
    flavour: &str,
    window_start: NaiveDate,
    window_end: NaiveDate,
) -> Result<Vec<(i64, i64)>, StoreError> {
    let start = window_start.format("%Y%m%d").to_string().parse::<i32>().unwrap();
    let end = window_end.format("%Y%m%d").to_string().parse::<i32>().unwrap();
    let rows: Vec<(i64, i64)> = sqlx::query_as(
        r#"
        SELECT pt.id, pt.trigger_validation_id
        FROM hrwsi.processing_tasks pt
        JOIN hrwsi.trigger_validation tv ON tv.id = pt.trigger_validation_id
        JOIN hrwsi.triggering_condition tc ON tc.name = tv.triggering_condition
        JOIN systemparams.routine_config rc ON rc.routine = tc.routine
        WHERE rc.flavour = $1
          AND pt.processing_date BETWEEN $2 AND $3
          AND NOT EXISTS (SELECT 1 FROM hrwsi.pt2nomad p2n WHERE p2n.processing_task_id = pt.id)
        ORDER BY pt.processing_date ASC
        "#,
    )
    .bind(flavour)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await
    .map_err(StoreError::from)?;
    Ok(rows)
}
