//! Shared store access for the rule engine (spec.md §4.E).

use chrono::{DateTime, NaiveDate, Utc};
use hrwsi_db::{Store, StoreError};
use hrwsi_protocol::defaults::{CHANNEL_RAW2VALID_INSERTION, DEFAULT_N_MEAS_DAYS, DEFAULT_N_PUB_DAYS};
use hrwsi_protocol::{ProductType, RawInput, RuleName};
use sqlx::PgPool;

/// Exactly-once guard: has `rule` already fired for `raw_input_id`
/// (spec.md §4.E: "probe `NOT EXISTS (trigger_validation ∩ raw2valid)` for
/// this `(input_id, rule_name)`").
pub async fn rule_already_fired(
    pool: &PgPool,
    raw_input_id: i64,
    rule: RuleName,
) -> Result<bool, StoreError> {
    let row: (bool,) = sqlx::query_as(
        r#"
        SELECT EXISTS (
            SELECT 1
            FROM hrwsi.raw2valid r2v
            JOIN hrwsi.trigger_validation tv ON tv.id = r2v.trigger_validation_id
            WHERE r2v.raw_input_id = $1 AND tv.triggering_condition = $2
        )
        "#,
    )
    .bind(raw_input_id)
    .bind(rule)
    .fetch_one(pool)
    .await
    .map_err(StoreError::from)?;
    Ok(row.0)
}

/// Insert a `TriggerValidation` with its `Raw2Valid` edges in one
/// transaction (spec.md invariant 2), then `NOTIFY raw2valid_insertion`.
/// Returns `None` if a concurrent evaluation already fired this rule for
/// one of `inputs` (unique-constraint races resolved as "already done").
pub async fn fire_validation(
    store: &Store,
    rule: RuleName,
    inputs: &[i64],
    is_nrt: bool,
    artificial_measurement_day: Option<i32>,
) -> Result<Option<i64>, StoreError> {
    debug_assert!(!inputs.is_empty(), "a validation must have >=1 raw2valid edge");
    let mut tx = store.begin().await?;

    let validation_id: i64 = match sqlx::query_as::<_, (i64,)>(
        r#"
        INSERT INTO hrwsi.trigger_validation
            (triggering_condition, is_nrt, artificial_measurement_day)
        VALUES ($1, $2, $3)
        RETURNING id
        "#,
    )
    .bind(rule)
    .bind(is_nrt)
    .bind(artificial_measurement_day)
    .fetch_one(&mut *tx)
    .await
    {
        Ok((id,)) => id,
        Err(e) => {
            tx.rollback().await.ok();
            return match StoreError::from(e) {
                StoreError::Conflict => Ok(None),
                other => Err(other),
            };
        }
    };

    for raw_input_id in inputs {
        if let Err(e) = sqlx::query(
            "INSERT INTO hrwsi.raw2valid (trigger_validation_id, raw_input_id) VALUES ($1, $2)",
        )
        .bind(validation_id)
        .bind(raw_input_id)
        .execute(&mut *tx)
        .await
        {
            tx.rollback().await.ok();
            return match StoreError::from(e) {
                StoreError::Conflict => Ok(None),
                other => Err(other),
            };
        }
    }

    let payload = serde_json::json!({
        "trigger_validation_id": validation_id,
        "triggering_condition": rule.as_str(),
    })
    .to_string();
    hrwsi_db::Store::notify_in_tx(&mut tx, CHANNEL_RAW2VALID_INSERTION, &payload).await?;

    tx.commit().await.map_err(StoreError::from)?;
    Ok(Some(validation_id))
}

pub async fn fetch_raw_input(pool: &PgPool, id: i64) -> Result<RawInput, StoreError> {
    sqlx::query_as::<_, RawInput>("SELECT * FROM hrwsi.raw_inputs WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(StoreError::from)
}

pub async fn allowed_tiles(pool: &PgPool, product_type: ProductType) -> Result<Vec<String>, StoreError> {
    let row: Option<(Vec<String>,)> =
        sqlx::query_as("SELECT tiles FROM systemparams.system_params WHERE product_type = $1")
            .bind(product_type)
            .fetch_optional(pool)
            .await
            .map_err(StoreError::from)?;
    Ok(row.map(|(t,)| t).unwrap_or_default())
}

/// Per-product-type eligibility window (spec.md §3: `max_day_since_publication_date`
/// / `max_day_since_measurement_date`), `(n_pub, n_meas)`. Falls back to the
/// workspace defaults when `product_type` has no `system_params` row yet.
pub async fn triggering_window(pool: &PgPool, product_type: ProductType) -> Result<(i64, i64), StoreError> {
    let row: Option<(i32, i32)> = sqlx::query_as(
        "SELECT max_day_since_publication_date, max_day_since_measurement_date \
         FROM systemparams.system_params WHERE product_type = $1",
    )
    .bind(product_type)
    .fetch_optional(pool)
    .await
    .map_err(StoreError::from)?;
    Ok(row
        .map(|(n_pub, n_meas)| (n_pub as i64, n_meas as i64))
        .unwrap_or((DEFAULT_N_PUB_DAYS, DEFAULT_N_MEAS_DAYS)))
}

pub async fn nrt_harvest_bookmark(
    pool: &PgPool,
    product_type: ProductType,
) -> Result<Option<DateTime<Utc>>, StoreError> {
    let row: Option<(Option<DateTime<Utc>>,)> = sqlx::query_as(
        "SELECT nrt_harvest_start_date FROM systemparams.system_params WHERE product_type = $1",
    )
    .bind(product_type)
    .fetch_optional(pool)
    .await
    .map_err(StoreError::from)?;
    Ok(row.and_then(|(d,)| d))
}

pub async fn valid_orbits_for_tile(pool: &PgPool, tile: &str) -> Result<Vec<i32>, StoreError> {
    let rows: Vec<(i32,)> = sqlx::query_as(
        "SELECT relative_orbit FROM systemparams.tile_valid_orbits WHERE tile = $1",
    )
    .bind(tile)
    .fetch_all(pool)
    .await
    .map_err(StoreError::from)?;
    Ok(rows.into_iter().map(|(o,)| o).collect())
}

/// Same-`(tile, measurement_day)` inputs of `product_type` published no
/// more than `n_pub` days ago.
pub async fn same_day_partners(
    pool: &PgPool,
    product_type: ProductType,
    tile: &str,
    measurement_day: i32,
    n_pub: i64,
) -> Result<Vec<RawInput>, StoreError> {
    sqlx::query_as::<_, RawInput>(
        r#"
        SELECT * FROM hrwsi.raw_inputs
        WHERE product_type = $1 AND tile = $2 AND measurement_day = $3
          AND publishing_date >= now() - make_interval(days => $4::int)
        ORDER BY publishing_date DESC
        "#,
    )
    .bind(product_type)
    .bind(tile)
    .bind(measurement_day)
    .bind(n_pub as i32)
    .fetch_all(pool)
    .await
    .map_err(StoreError::from)
}

/// Most recent `S2_MAJA_L2A` on `tile` within `window_days` of `naive_day`.
pub async fn latest_l2a_within_window(
    pool: &PgPool,
    tile: &str,
    measurement_day: i32,
    window_days: i64,
) -> Result<Option<RawInput>, StoreError> {
    let day = naive_date_from_yyyymmdd(measurement_day);
    sqlx::query_as::<_, RawInput>(
        r#"
        SELECT * FROM hrwsi.raw_inputs
        WHERE product_type = 'S2_MAJA_L2A' AND tile = $1
          AND (to_date(measurement_day::text, 'YYYYMMDD') BETWEEN $2 - make_interval(days => $3::int) AND $2)
        ORDER BY measurement_day DESC
        LIMIT 1
        "#,
    )
    .bind(tile)
    .bind(day)
    .bind(window_days as i32)
    .fetch_optional(pool)
    .await
    .map_err(StoreError::from)
}

/// True if an open (unfinished) CC task exists on `tile` with
/// `measurement_day` strictly below `before_day` (spec.md §4.E "tile
/// serialization for CC").
pub async fn has_earlier_open_cc_task(
    pool: &PgPool,
    tile: &str,
    before_day: i32,
) -> Result<bool, StoreError> {
    let row: (bool,) = sqlx::query_as(
        r#"
        SELECT EXISTS (
            SELECT 1
            FROM hrwsi.processing_tasks pt
            JOIN hrwsi.trigger_validation tv ON tv.id = pt.trigger_validation_id
            JOIN hrwsi.raw2valid r2v ON r2v.trigger_validation_id = tv.id
            JOIN hrwsi.raw_inputs ri ON ri.id = r2v.raw_input_id
            WHERE tv.triggering_condition = 'CC_TC'
              AND ri.tile = $1
              AND ri.measurement_day < $2
              AND pt.has_ended = FALSE
        )
        "#,
    )
    .bind(tile)
    .bind(before_day)
    .fetch_one(pool)
    .await
    .map_err(StoreError::from)?;
    Ok(row.0)
}

/// Partial `IW_GRDH_1S` inputs with no `Backscatter_10m_TC` validation yet,
/// oldest first (spec.md §4.E "GRDH pair rule").
pub async fn unfired_partial_grdh(pool: &PgPool) -> Result<Vec<RawInput>, StoreError> {
    sqlx::query_as::<_, RawInput>(
        r#"
        SELECT ri.* FROM hrwsi.raw_inputs ri
        WHERE ri.product_type = 'IW_GRDH_1S' AND ri.is_partial = TRUE
          AND NOT EXISTS (
              SELECT 1 FROM hrwsi.raw2valid r2v
              JOIN hrwsi.trigger_validation tv ON tv.id = r2v.trigger_validation_id
              WHERE r2v.raw_input_id = ri.id AND tv.triggering_condition = 'Backscatter_10m_TC'
          )
        ORDER BY ri.harvesting_date ASC
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(StoreError::from)
}

/// Unprocessed `S2MSI1C` inputs with no `CC_TC` validation yet.
pub async fn unfired_l1c(pool: &PgPool) -> Result<Vec<RawInput>, StoreError> {
    sqlx::query_as::<_, RawInput>(
        r#"
        SELECT ri.* FROM hrwsi.raw_inputs ri
        WHERE ri.product_type = 'S2MSI1C'
          AND NOT EXISTS (
              SELECT 1 FROM hrwsi.raw2valid r2v
              JOIN hrwsi.trigger_validation tv ON tv.id = r2v.trigger_validation_id
              WHERE r2v.raw_input_id = ri.id AND tv.triggering_condition = 'CC_TC'
          )
        ORDER BY ri.harvesting_date ASC
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(StoreError::from)
}

/// `WICS1` (`S1_WICS1_L2B`) inputs with no `WICS1S2_TC` validation yet.
pub async fn unfired_wics1(pool: &PgPool) -> Result<Vec<RawInput>, StoreError> {
    sqlx::query_as::<_, RawInput>(
        r#"
        SELECT ri.* FROM hrwsi.raw_inputs ri
        WHERE ri.product_type = 'S1_WICS1_L2B'
          AND NOT EXISTS (
              SELECT 1 FROM hrwsi.raw2valid r2v
              JOIN hrwsi.trigger_validation tv ON tv.id = r2v.trigger_validation_id
              WHERE r2v.raw_input_id = ri.id AND tv.triggering_condition = 'WICS1S2_TC'
          )
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(StoreError::from)
}

/// Same-`(tile, measurement_day)` `WICS2` (`S2_WICS2_L2B`) partners.
pub async fn wics2_partners(
    pool: &PgPool,
    tile: &str,
    measurement_day: i32,
) -> Result<Vec<RawInput>, StoreError> {
    sqlx::query_as::<_, RawInput>(
        "SELECT * FROM hrwsi.raw_inputs WHERE product_type = 'S2_WICS2_L2B' AND tile = $1 AND measurement_day = $2",
    )
    .bind(tile)
    .bind(measurement_day)
    .fetch_all(pool)
    .await
    .map_err(StoreError::from)
}

/// Union of tiles configured for the FSC and SWS product types — the tile
/// population the GFSC daily rule iterates.
pub async fn gfsc_relevant_tiles(pool: &PgPool) -> Result<Vec<String>, StoreError> {
    let mut tiles = allowed_tiles(pool, ProductType::S2FscL2b).await?;
    tiles.extend(allowed_tiles(pool, ProductType::S1SwsL2b).await?);
    tiles.sort_unstable();
    tiles.dedup();
    Ok(tiles)
}

pub async fn gfsc_bookmark(pool: &PgPool) -> Result<Option<NaiveDate>, StoreError> {
    let row: Option<(Option<NaiveDate>,)> =
        sqlx::query_as("SELECT last_processing_date FROM systemparams.gfsc_bookmark WHERE id")
            .fetch_optional(pool)
            .await
            .map_err(StoreError::from)?;
    Ok(row.and_then(|(d,)| d))
}

pub async fn advance_gfsc_bookmark(pool: &PgPool, day: NaiveDate) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO systemparams.gfsc_bookmark (id, last_processing_date)
        VALUES (TRUE, $1)
        ON CONFLICT (id) DO UPDATE SET last_processing_date = EXCLUDED.last_processing_date
        "#,
    )
    .bind(day)
    .execute(pool)
    .await
    .map_err(StoreError::from)?;
    Ok(())
}

pub async fn gfsc_skip_until(pool: &PgPool, tile: &str, day: NaiveDate) -> Result<Option<NaiveDate>, StoreError> {
    let row: Option<(NaiveDate,)> =
        sqlx::query_as("SELECT skip_until FROM systemparams.gfsc_skip WHERE tile = $1 AND day = $2")
            .bind(tile)
            .bind(day)
            .fetch_optional(pool)
            .await
            .map_err(StoreError::from)?;
    Ok(row.map(|(d,)| d))
}

pub async fn set_gfsc_skip(
    pool: &PgPool,
    tile: &str,
    day: NaiveDate,
    skip_until: NaiveDate,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO systemparams.gfsc_skip (tile, day, skip_until)
        VALUES ($1, $2, $3)
        ON CONFLICT (tile, day) DO UPDATE SET skip_until = EXCLUDED.skip_until
        "#,
    )
    .bind(tile)
    .bind(day)
    .bind(skip_until)
    .execute(pool)
    .await
    .map_err(StoreError::from)?;
    Ok(())
}

/// Unfinished `FSC_TC`/`SWS_TC` tasks on `tile` whose raw input's
/// `measurement_day` equals `day`.
pub async fn has_unfinished_fsc_sws(pool: &PgPool, tile: &str, day: i32) -> Result<bool, StoreError> {
    let row: (bool,) = sqlx::query_as(
        r#"
        SELECT EXISTS (
            SELECT 1
            FROM hrwsi.processing_tasks pt
            JOIN hrwsi.trigger_validation tv ON tv.id = pt.trigger_validation_id
            JOIN hrwsi.raw2valid r2v ON r2v.trigger_validation_id = tv.id
            JOIN hrwsi.raw_inputs ri ON ri.id = r2v.raw_input_id
            WHERE tv.triggering_condition IN ('FSC_TC', 'SWS_TC')
              AND ri.tile = $1 AND ri.measurement_day = $2
              AND pt.has_ended = FALSE
        )
        "#,
    )
    .bind(tile)
    .bind(day)
    .fetch_one(pool)
    .await
    .map_err(StoreError::from)?;
    Ok(row.0)
}

/// FSC/SWS raw inputs on `tile` with `measurement_day` in `[day - window,
/// day]` (spec.md §4.E: GFSC's 7-day lookback).
pub async fn gfsc_window_inputs(
    pool: &PgPool,
    tile: &str,
    day: i32,
    window_days: i64,
) -> Result<Vec<RawInput>, StoreError> {
    let day_date = naive_date_from_yyyymmdd(day);
    sqlx::query_as::<_, RawInput>(
        r#"
        SELECT * FROM hrwsi.raw_inputs
        WHERE product_type IN ('S2_FSC_L2B', 'S1_SWS_L2B')
          AND tile = $1
          AND to_date(measurement_day::text, 'YYYYMMDD') BETWEEN $2 - make_interval(days => $3::int) AND $2
        "#,
    )
    .bind(tile)
    .bind(day_date)
    .bind(window_days as i32)
    .fetch_all(pool)
    .await
    .map_err(StoreError::from)
}

/// Raw-input ids of the most recent prior `GFSC_TC` validation for
/// `(tile, artificial_measurement_day = day)`, if any.
pub async fn prior_gfsc_edges(pool: &PgPool, tile: &str, day: i32) -> Result<Option<Vec<i64>>, StoreError> {
    let validation_id: Option<(i64,)> = sqlx::query_as(
        r#"
        SELECT tv.id
        FROM hrwsi.trigger_validation tv
        JOIN hrwsi.raw2valid r2v ON r2v.trigger_validation_id = tv.id
        JOIN hrwsi.raw_inputs ri ON ri.id = r2v.raw_input_id
        WHERE tv.triggering_condition = 'GFSC_TC' AND tv.artificial_measurement_day = $1 AND ri.tile = $2
        ORDER BY tv.validation_date DESC
        LIMIT 1
        "#,
    )
    .bind(day)
    .bind(tile)
    .fetch_optional(pool)
    .await
    .map_err(StoreError::from)?;
    let Some((validation_id,)) = validation_id else {
        return Ok(None);
    };
    let rows: Vec<(i64,)> =
        sqlx::query_as("SELECT raw_input_id FROM hrwsi.raw2valid WHERE trigger_validation_id = $1")
            .bind(validation_id)
            .fetch_all(pool)
            .await
            .map_err(StoreError::from)?;
    Ok(Some(rows.into_iter().map(|(id,)| id).collect()))
}

pub fn naive_date_from_yyyymmdd(day: i32) -> NaiveDate {
    NaiveDate::parse_from_str(&day.to_string(), "%Y%m%d")
        .unwrap_or_else(|_| NaiveDate::from_ymd_opt(1970, 1, 1).unwrap())
}
