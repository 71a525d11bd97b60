//! One Harvester cycle (spec.md §4.D): derive the query window per rule,
//! call the catalog, skip what is already on record, insert the rest.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use hrwsi_catalog::{CatalogClient, CatalogQuery, TileOrGeometry};
use hrwsi_db::Store;
use hrwsi_protocol::defaults::ARCHIVE_CHUNK_DAYS;
use hrwsi_protocol::{HarvestMode, SystemParams};
use tracing::{info, warn};

use crate::queries;

/// Window to query for one rule this cycle, or `None` if the rule has
/// nothing left to do (archive exhausted).
enum Window {
    Query {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    ArchiveExhausted,
}

fn derive_window(mode: HarvestMode, params: &SystemParams, now: DateTime<Utc>) -> Window {
    match mode {
        HarvestMode::Archive => match (
            params.archive_harvest_start_date,
            params.archive_harvest_end_date,
        ) {
            (Some(start), Some(end)) if start < end => {
                let chunk_end = (start + ChronoDuration::days(ARCHIVE_CHUNK_DAYS)).min(end);
                Window::Query {
                    start: start.and_hms_opt(0, 0, 0).unwrap().and_utc(),
                    end: chunk_end.and_hms_opt(0, 0, 0).unwrap().and_utc(),
                }
            }
            _ => Window::ArchiveExhausted,
        },
        HarvestMode::Nrt => {
            let lower = params
                .nrt_harvest_start_date
                .unwrap_or_else(|| now - ChronoDuration::days(params.max_day_since_publication_date as i64));
            Window::Query {
                start: lower,
                end: now,
            }
        }
    }
}

/// Run one full cycle across every configured rule.
pub async fn run_cycle(
    store: &Store,
    catalog: &dyn CatalogClient,
    mode: HarvestMode,
) -> anyhow::Result<()> {
    let pool = store.pool();
    let rules = queries::fetch_system_params(pool).await?;
    for params in rules {
        if let Err(e) = run_rule(store, catalog, mode, &params).await {
            warn!(
                product_type = %params.product_type,
                error = %e,
                "harvest rule failed this cycle; bookmark not advanced"
            );
        }
    }
    Ok(())
}

async fn run_rule(
    store: &Store,
    catalog: &dyn CatalogClient,
    mode: HarvestMode,
    params: &SystemParams,
) -> anyhow::Result<()> {
    let pool = store.pool();
    let now = Utc::now();
    let window = derive_window(mode, params, now);
    let (start, end) = match window {
        Window::Query { start, end } => (start, end),
        Window::ArchiveExhausted => {
            if params.archive_harvest_start_date.is_some() {
                tokio::time::sleep(std::time::Duration::from_secs(
                    hrwsi_protocol::defaults::DEFAULT_ARCHIVE_POST_SLEEP_SECS,
                ))
                .await;
                queries::clear_archive_bookmarks(pool, params.product_type).await?;
                info!(product_type = %params.product_type, "archive harvest complete, bookmarks cleared");
            }
            return Ok(());
        }
    };

    let tile_or_geometry = if !params.tiles.is_empty() {
        TileOrGeometry::Tiles(params.tiles.clone())
    } else {
        TileOrGeometry::Geometry(params.geometry.clone().unwrap_or_default())
    };

    let items = catalog
        .query(&CatalogQuery {
            product_type: params.product_type,
            collection: params.collection.clone(),
            window_start: start,
            window_end: end,
            tile_or_geometry,
            polarisation: params.polarisation.clone(),
            timeliness: params.timeliness.clone(),
        })
        .await?;

    let has_timeliness = params.timeliness.is_some();
    let mut inserted = 0usize;
    for item in items {
        let exists = queries::raw_input_exists(
            pool,
            params.product_type,
            &item.tile,
            item.measurement_start,
            &item.input_path,
            has_timeliness,
        )
        .await?;
        if exists {
            continue;
        }
        let mut tx = store.begin().await?;
        let new_row = queries::insert_raw_input(
            &mut tx,
            &item.identifier,
            params.product_type,
            item.measurement_start,
            item.publishing_date,
            &item.tile,
            item.measurement_day,
            item.relative_orbit,
            &item.input_path,
            item.is_partial,
        )
        .await?;
        if let Some(raw_input) = new_row {
            queries::notify_input_insertion(&mut tx, &raw_input).await?;
            tx.commit().await.map_err(hrwsi_db::StoreError::from)?;
            inserted += 1;
        } else {
            tx.rollback().await.map_err(hrwsi_db::StoreError::from)?;
        }
    }
    if inserted > 0 {
        info!(product_type = %params.product_type, inserted, "harvested new raw inputs");
    }

    if mode == HarvestMode::Archive {
        if let Some(archive_start) = params.archive_harvest_start_date {
            let next = archive_start + ChronoDuration::days(ARCHIVE_CHUNK_DAYS);
            queries::advance_archive_bookmark(pool, params.product_type, next).await?;
        }
    }

    Ok(())
}
