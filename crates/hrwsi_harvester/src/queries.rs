//! Raw SQL against the `hrwsi` and `systemparams` schemas (spec.md §3, §4.D).

use chrono::{DateTime, NaiveDate, Utc};
use hrwsi_db::StoreError;
use hrwsi_protocol::defaults::CHANNEL_INPUT_INSERTION;
use hrwsi_protocol::{ProductType, RawInput, SystemParams};
use sqlx::{PgPool, Postgres, Transaction};

pub async fn fetch_system_params(pool: &PgPool) -> Result<Vec<SystemParams>, StoreError> {
    sqlx::query_as::<_, SystemParams>(
        r#"
        SELECT product_type, collection, max_day_since_publication_date,
               max_day_since_measurement_date, tiles, geometry, polarisation,
               timeliness, nrt_harvest_start_date, archive_harvest_start_date,
               archive_harvest_end_date
        FROM systemparams.system_params
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(StoreError::from)
}

/// Latest `publishing_date` on record for this product type, used as the
/// NRT window's lower bound when no bookmark is set (spec.md §4.D.2).
pub async fn latest_publishing_date(
    pool: &PgPool,
    product_type: ProductType,
) -> Result<Option<DateTime<Utc>>, StoreError> {
    let row: Option<(Option<DateTime<Utc>>,)> = sqlx::query_as(
        "SELECT max(publishing_date) FROM hrwsi.raw_inputs WHERE product_type = $1",
    )
    .bind(product_type)
    .fetch_optional(pool)
    .await
    .map_err(StoreError::from)?;
    Ok(row.and_then(|(d,)| d))
}

/// Existence check scoped per spec.md §4.D.4: timeliness-bearing products
/// key on `(tile, measurement_start date)`; everything else keys on
/// `input_path`.
pub async fn raw_input_exists(
    pool: &PgPool,
    product_type: ProductType,
    tile: &str,
    measurement_start: DateTime<Utc>,
    input_path: &str,
    has_timeliness: bool,
) -> Result<bool, StoreError> {
    if has_timeliness {
        let row: (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM hrwsi.raw_inputs
                WHERE product_type = $1 AND tile = $2
                  AND measurement_start::date = $3::date
            )
            "#,
        )
        .bind(product_type)
        .bind(tile)
        .bind(measurement_start)
        .fetch_one(pool)
        .await
        .map_err(StoreError::from)?;
        Ok(row.0)
    } else {
        let row: (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM hrwsi.raw_inputs WHERE input_path = $1)",
        )
        .bind(input_path)
        .fetch_one(pool)
        .await
        .map_err(StoreError::from)?;
        Ok(row.0)
    }
}

/// Insert one candidate item, idempotently. Returns the inserted row, or
/// `None` if a concurrent insert already claimed the same `identifier`
/// (spec.md §4.A: "constraint violations are caught by callers and treated
/// as already done").
#[allow(clippy::too_many_arguments)]
pub async fn insert_raw_input(
    tx: &mut Transaction<'_, Postgres>,
    identifier: &str,
    product_type: ProductType,
    measurement_start: DateTime<Utc>,
    publishing_date: DateTime<Utc>,
    tile: &str,
    measurement_day: i32,
    relative_orbit: Option<i32>,
    input_path: &str,
    is_partial: bool,
) -> Result<Option<RawInput>, StoreError> {
    sqlx::query_as::<_, RawInput>(
        r#"
        INSERT INTO hrwsi.raw_inputs
            (identifier, product_type, measurement_start, publishing_date,
             tile, measurement_day, relative_orbit, input_path, is_partial,
             harvesting_date)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now())
        ON CONFLICT (identifier) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(identifier)
    .bind(product_type)
    .bind(measurement_start)
    .bind(publishing_date)
    .bind(tile)
    .bind(measurement_day)
    .bind(relative_orbit)
    .bind(input_path)
    .bind(is_partial)
    .fetch_optional(&mut **tx)
    .await
    .map_err(StoreError::from)
}

pub async fn notify_input_insertion(
    tx: &mut Transaction<'_, Postgres>,
    raw_input: &RawInput,
) -> Result<(), StoreError> {
    let payload = serde_json::to_string(raw_input).map_err(|e| {
        StoreError::Other(sqlx::Error::Decode(Box::new(e)))
    })?;
    hrwsi_db::Store::notify_in_tx(tx, CHANNEL_INPUT_INSERTION, &payload).await
}

pub async fn advance_archive_bookmark(
    pool: &PgPool,
    product_type: ProductType,
    new_start: NaiveDate,
) -> Result<(), StoreError> {
    sqlx::query(
        "UPDATE systemparams.system_params SET archive_harvest_start_date = $1 WHERE product_type = $2",
    )
    .bind(new_start)
    .bind(product_type)
    .execute(pool)
    .await
    .map_err(StoreError::from)?;
    Ok(())
}

pub async fn clear_archive_bookmarks(
    pool: &PgPool,
    product_type: ProductType,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        UPDATE systemparams.system_params
        SET archive_harvest_start_date = NULL, archive_harvest_end_date = NULL
        WHERE product_type = $1
        "#,
    )
    .bind(product_type)
    .execute(pool)
    .await
    .map_err(StoreError::from)?;
    Ok(())
}
