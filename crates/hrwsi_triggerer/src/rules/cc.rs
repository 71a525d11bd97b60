//! `CC_TC` (spec.md §4.E): periodic scan of unprocessed `S2MSI1C` inputs.
//! INIT mode fires L1C alone when no prior L2A exists in the last 90 days;
//! NOMINAL mode pairs it with the most recent such L2A. Tile serialization
//! blocks firing while an earlier-dated CC task on the same tile is still
//! open.

use chrono::Utc;
use hrwsi_db::Store;
use hrwsi_protocol::defaults::CC_PRIOR_L2A_WINDOW_DAYS;
use hrwsi_protocol::RuleName;
use tracing::{debug, info};

use crate::{nrt, queries};

pub async fn run_cycle(store: &Store) -> anyhow::Result<()> {
    let pool = store.pool();
    let candidates = queries::unfired_l1c(pool).await?;
    let now = Utc::now();

    for l1c in &candidates {
        let allowed_tiles = queries::allowed_tiles(pool, l1c.product_type).await?;
        if !allowed_tiles.iter().any(|t| t == &l1c.tile) {
            continue;
        }
        let (n_pub, n_meas) = queries::triggering_window(pool, l1c.product_type).await?;
        if (now - l1c.publishing_date).num_days() > n_pub {
            continue;
        }
        let measurement_date = queries::naive_date_from_yyyymmdd(l1c.measurement_day);
        if (now.date_naive() - measurement_date).num_days() > n_meas {
            continue;
        }

        if queries::has_earlier_open_cc_task(pool, &l1c.tile, l1c.measurement_day).await? {
            debug!(tile = %l1c.tile, day = l1c.measurement_day, "CC serialized behind an earlier open task");
            continue;
        }

        let prior_l2a =
            queries::latest_l2a_within_window(pool, &l1c.tile, l1c.measurement_day, CC_PRIOR_L2A_WINDOW_DAYS)
                .await?;

        let bookmark = queries::nrt_harvest_bookmark(pool, l1c.product_type).await?;
        let is_nrt = nrt::classify(bookmark, l1c.measurement_day, l1c.publishing_date, l1c.harvesting_date);

        let edges = match &prior_l2a {
            Some(l2a) => vec![l1c.id, l2a.id],
            None => vec![l1c.id],
        };
        queries::fire_validation(store, RuleName::CcTc, &edges, is_nrt, None).await?;
        info!(
            tile = %l1c.tile,
            day = l1c.measurement_day,
            mode = if prior_l2a.is_some() { "NOMINAL" } else { "INIT" },
            "fired CC_TC"
        );
    }
    Ok(())
}
