//! `SWS_TC` / `WICS1_TC` / `WDS_TC` (spec.md §4.E): `S1_NRB_L2A` gated on
//! tile allow-list, valid relative orbit, and publication age; `WDS_TC`
//! additionally requires a same-day FSC partner.

use chrono::Utc;
use hrwsi_db::{Store, StoreError};
use hrwsi_protocol::{ProductType, RawInput, RuleName};

use crate::{nrt, queries};

pub async fn evaluate(store: &Store, raw_input: &RawInput) -> Result<(), StoreError> {
    let pool = store.pool();
    let (n_pub, _n_meas) = queries::triggering_window(pool, raw_input.product_type).await?;
    let published_days_ago = (Utc::now() - raw_input.publishing_date).num_days();
    if published_days_ago > n_pub {
        return Ok(());
    }

    let allowed_tiles = queries::allowed_tiles(pool, raw_input.product_type).await?;
    if !allowed_tiles.iter().any(|t| t == &raw_input.tile) {
        return Ok(());
    }
    let valid_orbits = queries::valid_orbits_for_tile(pool, &raw_input.tile).await?;
    match raw_input.relative_orbit {
        Some(orbit) if valid_orbits.contains(&orbit) => {}
        _ => return Ok(()),
    }

    let bookmark = queries::nrt_harvest_bookmark(pool, raw_input.product_type).await?;
    let is_nrt = nrt::classify(
        bookmark,
        raw_input.measurement_day,
        raw_input.publishing_date,
        raw_input.harvesting_date,
    );

    for rule in [RuleName::SwsTc, RuleName::Wics1Tc] {
        if queries::rule_already_fired(pool, raw_input.id, rule).await? {
            continue;
        }
        queries::fire_validation(store, rule, &[raw_input.id], is_nrt, None).await?;
    }

    if !queries::rule_already_fired(pool, raw_input.id, RuleName::WdsTc).await? {
        let (fsc_n_pub, _fsc_n_meas) = queries::triggering_window(pool, ProductType::S2FscL2b).await?;
        let partners = queries::same_day_partners(
            pool,
            ProductType::S2FscL2b,
            &raw_input.tile,
            raw_input.measurement_day,
            fsc_n_pub,
        )
        .await?;
        if !partners.is_empty() {
            let mut edges = vec![raw_input.id];
            edges.extend(partners.iter().map(|p| p.id));
            queries::fire_validation(store, RuleName::WdsTc, &edges, is_nrt, None).await?;
        }
    }
    Ok(())
}
