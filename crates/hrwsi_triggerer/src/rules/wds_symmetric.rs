//! `WDS_TC`, symmetric entry point (spec.md §4.E): a newly harvested
//! `S2_FSC_L2B` fires `WDS_TC` if a same-`(tile, measurement_day)`
//! `S1_NRB_L2A` exists within the publication window.

use hrwsi_db::{Store, StoreError};
use hrwsi_protocol::{ProductType, RawInput, RuleName};

use crate::{nrt, queries};

pub async fn evaluate(store: &Store, raw_input: &RawInput) -> Result<(), StoreError> {
    let pool = store.pool();
    if queries::rule_already_fired(pool, raw_input.id, RuleName::WdsTc).await? {
        return Ok(());
    }

    let (s1_n_pub, _s1_n_meas) = queries::triggering_window(pool, ProductType::S1NrbL2a).await?;
    let s1_partners = queries::same_day_partners(
        pool,
        ProductType::S1NrbL2a,
        &raw_input.tile,
        raw_input.measurement_day,
        s1_n_pub,
    )
    .await?;
    let Some(latest_s1) = s1_partners.first() else {
        return Ok(());
    };

    let (fsc_n_pub, _fsc_n_meas) = queries::triggering_window(pool, raw_input.product_type).await?;
    let other_fsc = queries::same_day_partners(
        pool,
        ProductType::S2FscL2b,
        &raw_input.tile,
        raw_input.measurement_day,
        fsc_n_pub,
    )
    .await?;

    let bookmark = queries::nrt_harvest_bookmark(pool, raw_input.product_type).await?;
    let is_nrt = nrt::classify(
        bookmark,
        raw_input.measurement_day,
        raw_input.publishing_date,
        raw_input.harvesting_date,
    );

    let mut edges = vec![raw_input.id, latest_s1.id];
    edges.extend(other_fsc.iter().map(|f| f.id).filter(|id| *id != raw_input.id));
    edges.sort_unstable();
    edges.dedup();
    queries::fire_validation(store, RuleName::WdsTc, &edges, is_nrt, None).await?;
    Ok(())
}
