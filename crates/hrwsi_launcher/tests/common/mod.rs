use async_trait::async_trait;
use hrwsi_db::test_support::test_pool;
use hrwsi_db::Store;
use hrwsi_scheduler::{Allocation, AllocationSummary, SchedulerClient, SchedulerError};
use sqlx::PgPool;

pub async fn store() -> Store {
    Store::new(test_pool().await)
}

/// A scheduler double reporting every allocation as gone, matching the
/// `AllocationLost` condition (spec.md §7) without a live Nomad instance.
pub struct NotFoundScheduler;

#[async_trait]
impl SchedulerClient for NotFoundScheduler {
    async fn submit(&self, _job_spec: &str) -> Result<String, SchedulerError> {
        Ok("eval-test".to_string())
    }

    async fn get_allocation(&self, job_id: &str) -> Result<Allocation, SchedulerError> {
        Err(SchedulerError::NotFound(job_id.to_string()))
    }

    async fn list_allocations(&self, _job_name: &str) -> Result<Vec<AllocationSummary>, SchedulerError> {
        Ok(Vec::new())
    }
}

pub async fn seed_routine_config(pool: &PgPool, routine: &str, flavour: &str, duration_minutes: i32) {
    sqlx::query(
        r#"
        INSERT INTO systemparams.routine_config (routine, flavour, image, ram_mb, duration_minutes)
        VALUES ($1, $2, 'registry.test/noop:latest', 1024, $3)
        ON CONFLICT (routine) DO UPDATE SET flavour = $2, duration_minutes = $3
        "#,
    )
    .bind(routine)
    .bind(flavour)
    .bind(duration_minutes)
    .execute(pool)
    .await
    .expect("seed routine_config fixture");
}

/// Insert a processing task wired to `triggering_condition` through a
/// fresh trigger_validation, returning the task id.
pub async fn seed_processing_task(pool: &PgPool, triggering_condition: &str, processing_date: i32) -> i64 {
    let (validation_id,): (i64,) = sqlx::query_as(
        "INSERT INTO hrwsi.trigger_validation (triggering_condition, is_nrt) VALUES ($1, true) RETURNING id",
    )
    .bind(triggering_condition)
    .fetch_one(pool)
    .await
    .expect("seed trigger_validation fixture");

    let (task_id,): (i64,) = sqlx::query_as(
        "INSERT INTO hrwsi.processing_tasks (trigger_validation_id, processing_date, has_ended) VALUES ($1, $2, FALSE) RETURNING id",
    )
    .bind(validation_id)
    .bind(processing_date)
    .fetch_one(pool)
    .await
    .expect("seed processing_task fixture");
    task_id
}
