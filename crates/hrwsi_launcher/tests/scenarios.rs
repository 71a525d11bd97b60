//! End-to-end scenarios S5 and S7 (spec.md §7, §8): the lost-job sweeper
//! and the undispatched/in-error re-drivers it feeds.

mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use hrwsi_protocol::ProcessingStatus;
use uuid::Uuid;

use common::{seed_processing_task, seed_routine_config, store, NotFoundScheduler};

async fn insert_dispatch_with_age(
    pool: &sqlx::PgPool,
    task_id: i64,
    dispatch_id: Uuid,
    age: Duration,
    status: Option<ProcessingStatus>,
) {
    sqlx::query(
        "INSERT INTO hrwsi.nomad_job_dispatch (id, dispatch_date, log_path) VALUES ($1, $2, 's3://out/log')",
    )
    .bind(dispatch_id)
    .bind(Utc::now() - age)
    .execute(pool)
    .await
    .unwrap();
    sqlx::query("INSERT INTO hrwsi.pt2nomad (processing_task_id, nomad_job_dispatch_id) VALUES ($1, $2)")
        .bind(task_id)
        .bind(dispatch_id)
        .execute(pool)
        .await
        .unwrap();
    if let Some(status) = status {
        sqlx::query(
            "INSERT INTO hrwsi.processing_status_workflow (nomad_job_dispatch_id, status, status_date) VALUES ($1, $2, $3)",
        )
        .bind(dispatch_id)
        .bind(status)
        .bind(Utc::now() - age)
        .execute(pool)
        .await
        .unwrap();
    }
}

#[tokio::test]
async fn s5_lost_job_relaunch_writes_one_internal_error_row() {
    let store = store().await;
    let pool = store.pool();
    seed_routine_config(pool, "CC", "eo1.large", 12).await;
    let task_id = seed_processing_task(pool, "CC_TC", 20260101).await;

    let dispatch_id = Uuid::new_v4();
    insert_dispatch_with_age(pool, task_id, dispatch_id, Duration::minutes(65), None).await;

    let scheduler: Arc<dyn hrwsi_scheduler::SchedulerClient> = Arc::new(NotFoundScheduler);
    hrwsi_launcher::sweeper::cycle(&store, scheduler, "eo1.large").await.unwrap();

    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT status FROM hrwsi.processing_status_workflow WHERE nomad_job_dispatch_id = $1",
    )
    .bind(dispatch_id)
    .fetch_all(pool)
    .await
    .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].0, "internal_error");

    let task_ids = hrwsi_launcher::queries::in_error_task_ids(pool, "eo1.large").await.unwrap();
    assert!(task_ids.iter().any(|(id, _)| *id == task_id));
}

#[tokio::test]
async fn s5_started_job_within_threshold_is_not_relaunched() {
    let store = store().await;
    let pool = store.pool();
    seed_routine_config(pool, "FSC", "hma.large", 20).await;
    let task_id = seed_processing_task(pool, "FSC_TC", 20260101).await;

    let dispatch_id = Uuid::new_v4();
    insert_dispatch_with_age(pool, task_id, dispatch_id, Duration::minutes(30), Some(ProcessingStatus::Started)).await;

    let scheduler: Arc<dyn hrwsi_scheduler::SchedulerClient> = Arc::new(NotFoundScheduler);
    hrwsi_launcher::sweeper::cycle(&store, scheduler, "hma.large").await.unwrap();

    let (count,): (i64,) = sqlx::query_as(
        "SELECT count(*) FROM hrwsi.processing_status_workflow WHERE nomad_job_dispatch_id = $1",
    )
    .bind(dispatch_id)
    .fetch_one(pool)
    .await
    .unwrap();
    assert_eq!(count, 1, "a started job well inside its duration budget is left alone");
}

#[tokio::test]
async fn s5_started_job_past_threshold_is_relaunched() {
    let store = store().await;
    let pool = store.pool();
    seed_routine_config(pool, "WICS2", "eo1.large", 10).await;
    let task_id = seed_processing_task(pool, "WICS2_TC", 20260101).await;

    let dispatch_id = Uuid::new_v4();
    // 3 * max(7, 10) * 60 = 1800s; comfortably past that.
    insert_dispatch_with_age(pool, task_id, dispatch_id, Duration::minutes(90), Some(ProcessingStatus::Started)).await;

    let scheduler: Arc<dyn hrwsi_scheduler::SchedulerClient> = Arc::new(NotFoundScheduler);
    hrwsi_launcher::sweeper::cycle(&store, scheduler, "eo1.large").await.unwrap();

    let (count,): (i64,) = sqlx::query_as(
        "SELECT count(*) FROM hrwsi.processing_status_workflow WHERE nomad_job_dispatch_id = $1 AND status = 'internal_error'",
    )
    .bind(dispatch_id)
    .fetch_one(pool)
    .await
    .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn has_live_dispatch_is_false_after_the_sweeper_relaunches_a_task() {
    let store = store().await;
    let pool = store.pool();
    seed_routine_config(pool, "SWS", "hma.large", 20).await;
    let task_id = seed_processing_task(pool, "SWS_TC", 20260101).await;

    let dispatch_id = Uuid::new_v4();
    insert_dispatch_with_age(pool, task_id, dispatch_id, Duration::minutes(65), Some(ProcessingStatus::Pending)).await;

    assert!(hrwsi_launcher::queries::has_live_dispatch(pool, task_id).await.unwrap());

    let scheduler: Arc<dyn hrwsi_scheduler::SchedulerClient> = Arc::new(NotFoundScheduler);
    hrwsi_launcher::sweeper::cycle(&store, scheduler, "hma.large").await.unwrap();

    assert!(
        !hrwsi_launcher::queries::has_live_dispatch(pool, task_id).await.unwrap(),
        "a swept task is no longer 'currently deployed' and may be dispatched again"
    );
}
