//! `WICS1S2_TC` pairing rule (spec.md §4.E): every `WICS1` without a prior
//! validation is paired with every same-`(tile, measurement_day)` `WICS2`.

use chrono::Utc;
use hrwsi_db::Store;
use hrwsi_protocol::RuleName;
use tracing::info;

use crate::queries;

pub async fn run_cycle(store: &Store) -> anyhow::Result<()> {
    let pool = store.pool();
    let today: i32 = Utc::now().format("%Y%m%d").to_string().parse()?;

    for wics1 in queries::unfired_wics1(pool).await? {
        let partners = queries::wics2_partners(pool, &wics1.tile, wics1.measurement_day).await?;
        if partners.is_empty() {
            continue;
        }
        let mut edges = vec![wics1.id];
        edges.extend(partners.iter().map(|p| p.id));
        let is_nrt = wics1.measurement_day == today;
        queries::fire_validation(store, RuleName::Wics1s2Tc, &edges, is_nrt, None).await?;
        info!(tile = %wics1.tile, day = wics1.measurement_day, "fired WICS1S2_TC");
    }
    Ok(())
}
