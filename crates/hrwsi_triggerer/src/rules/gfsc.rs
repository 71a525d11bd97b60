//! `GFSC_TC` daily rule (spec.md §4.E): walks days between the last
//! successful processing date and yesterday, gathering the trailing
//! 7-day FSC/SWS window per tile; skips and re-checks in 7 days any day
//! blocked by an unfinished FSC/SWS task; advances the shared bookmark by
//! one day only once every tile has completed that day.

use chrono::{Duration, Utc};
use hrwsi_db::Store;
use hrwsi_protocol::defaults::{earliest_measurement_day, GFSC_LOOKBACK_DAYS, GFSC_SKIP_RECHECK_DAYS};
use hrwsi_protocol::RuleName;
use tracing::info;

use crate::queries;

pub async fn run_cycle(store: &Store) -> anyhow::Result<()> {
    let pool = store.pool();
    let today = Utc::now().date_naive();
    let yesterday = today - Duration::days(1);
    let mut cursor = queries::gfsc_bookmark(pool)
        .await?
        .unwrap_or_else(earliest_measurement_day)
        + Duration::days(1);

    let tiles = queries::gfsc_relevant_tiles(pool).await?;
    if tiles.is_empty() {
        return Ok(());
    }

    while cursor <= yesterday {
        let day_code: i32 = cursor.format("%Y%m%d").to_string().parse()?;
        let mut all_completed = true;

        for tile in &tiles {
            if let Some(skip_until) = queries::gfsc_skip_until(pool, tile, cursor).await? {
                if today < skip_until {
                    all_completed = false;
                    continue;
                }
            }

            if queries::has_unfinished_fsc_sws(pool, tile, day_code).await? {
                queries::set_gfsc_skip(pool, tile, cursor, today + Duration::days(GFSC_SKIP_RECHECK_DAYS))
                    .await?;
                all_completed = false;
                continue;
            }

            let window_inputs =
                queries::gfsc_window_inputs(pool, tile, day_code, GFSC_LOOKBACK_DAYS).await?;
            if window_inputs.is_empty() {
                continue;
            }
            let mut edges: Vec<i64> = window_inputs.iter().map(|i| i.id).collect();
            edges.sort_unstable();

            let prior = queries::prior_gfsc_edges(pool, tile, day_code).await?;
            if prior.as_deref() == Some(edges.as_slice()) {
                continue;
            }

            queries::fire_validation(store, RuleName::GfscTc, &edges, cursor == today, Some(day_code))
                .await?;
            info!(tile = %tile, day = day_code, "fired GFSC_TC");
        }

        if all_completed {
            queries::advance_gfsc_bookmark(pool, cursor).await?;
            cursor += Duration::days(1);
        } else {
            // A blocked day never advances the persistent bookmark, but
            // scanning keeps moving forward so later days/tiles aren't
            // starved behind one permanently stuck day.
            cursor += std::cmp::min(Duration::days(GFSC_SKIP_RECHECK_DAYS), yesterday - cursor + Duration::days(1));
        }
    }
    Ok(())
}
