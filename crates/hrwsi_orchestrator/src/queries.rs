//! Store access for validation → task mapping (spec.md §4.F).

use chrono::Utc;
use hrwsi_db::{Store, StoreError};
use hrwsi_protocol::defaults::CHANNEL_PROCESSING_TASK_INSERTION;
use hrwsi_protocol::TriggerValidation;
use sqlx::PgPool;

pub async fn fetch_validation(pool: &PgPool, id: i64) -> Result<TriggerValidation, StoreError> {
    sqlx::query_as::<_, TriggerValidation>("SELECT * FROM hrwsi.trigger_validation WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(StoreError::from)
}

pub async fn task_exists_for_validation(pool: &PgPool, validation_id: i64) -> Result<bool, StoreError> {
    let row: (bool,) = sqlx::query_as(
        "SELECT EXISTS(SELECT 1 FROM hrwsi.processing_tasks WHERE trigger_validation_id = $1)",
    )
    .bind(validation_id)
    .fetch_one(pool)
    .await
    .map_err(StoreError::from)?;
    Ok(row.0)
}

/// Insert exactly one `ProcessingTask` for `validation` (spec.md invariant
/// 3: at most one task per validation). Returns `false` if a concurrent
/// orchestrator already won the race — the unique constraint on
/// `trigger_validation_id` makes this safe.
pub async fn insert_task(store: &Store, validation: &TriggerValidation) -> Result<bool, StoreError> {
    let processing_date = validation.artificial_measurement_day;

    let mut tx = store.begin().await?;
    let inserted: Option<(i64,)> = match sqlx::query_as(
        r#"
        INSERT INTO hrwsi.processing_tasks
            (trigger_validation_id, creation_date, processing_date, has_ended, intermediate_paths)
        VALUES ($1, $2, $3, FALSE, '[]'::jsonb)
        ON CONFLICT (trigger_validation_id) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(validation.id)
    .bind(Utc::now())
    .bind(processing_date)
    .fetch_optional(&mut *tx)
    .await
    {
        Ok(row) => row,
        Err(e) => {
            tx.rollback().await.ok();
            return match StoreError::from(e) {
                StoreError::Conflict => Ok(false),
                other => Err(other),
            };
        }
    };

    let Some((task_id,)) = inserted else {
        tx.rollback().await.ok();
        return Ok(false);
    };

    let payload = serde_json::json!({
        "processing_task_id": task_id,
        "trigger_validation_id": validation.id,
    })
    .to_string();
    hrwsi_db::Store::notify_in_tx(&mut tx, CHANNEL_PROCESSING_TASK_INSERTION, &payload).await?;
    tx.commit().await.map_err(StoreError::from)?;
    Ok(true)
}

/// Validations with no corresponding task yet, used both for ordinary
/// processing and for the restart re-queue pass (spec.md §4.F: "on
/// restart, all unprocessed validations are re-queued").
pub async fn unprocessed_validation_ids(pool: &PgPool) -> Result<Vec<i64>, StoreError> {
    let rows: Vec<(i64,)> = sqlx::query_as(
        r#"
        SELECT tv.id FROM hrwsi.trigger_validation tv
        WHERE NOT EXISTS (
            SELECT 1 FROM hrwsi.processing_tasks pt WHERE pt.trigger_validation_id = tv.id
        )
        ORDER BY tv.id ASC
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(StoreError::from)?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}
