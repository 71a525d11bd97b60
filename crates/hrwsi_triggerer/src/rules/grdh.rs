//! `Backscatter_10m_TC` (spec.md §4.E): fires on every non-partial
//! `IW_GRDH_1S` input immediately; partial inputs are paired by same
//! `(tile, measurement_day, relative_orbit)` with contiguous start/stop
//! swath boundaries, or fire alone once orphaned for 2h.

use hrwsi_db::{Store, StoreError};
use hrwsi_protocol::defaults::GRDH_ORPHAN_TIMEOUT_SECS;
use hrwsi_protocol::parsers::grdh_swath_boundary;
use hrwsi_protocol::{ProductType, RawInput, RuleName};
use tracing::info;

use crate::{nrt, queries};

/// Two partials are the adjacent halves of one swath when one's STOP
/// timestamp equals the other's START timestamp (spec.md §4.E), i.e. they
/// are back-to-back acquisitions, not merely close in time. The boundary
/// tokens are compared as the literal strings embedded in `input_path`,
/// matching how they're compared upstream.
fn are_adjacent_swaths(a: &RawInput, b: &RawInput) -> bool {
    let (Some((a_start, a_stop)), Some((b_start, b_stop))) = (
        grdh_swath_boundary(&a.input_path),
        grdh_swath_boundary(&b.input_path),
    ) else {
        return false;
    };
    a_stop == b_start || b_stop == a_start
}

pub async fn fire_single(store: &Store, raw_input: &RawInput) -> Result<(), StoreError> {
    debug_assert_eq!(raw_input.product_type, ProductType::IwGrdh1s);
    if queries::rule_already_fired(store.pool(), raw_input.id, RuleName::Backscatter10mTc).await? {
        return Ok(());
    }
    let bookmark = queries::nrt_harvest_bookmark(store.pool(), raw_input.product_type).await?;
    let is_nrt = nrt::classify(
        bookmark,
        raw_input.measurement_day,
        raw_input.publishing_date,
        raw_input.harvesting_date,
    );
    queries::fire_validation(store, RuleName::Backscatter10mTc, &[raw_input.id], is_nrt, None).await?;
    Ok(())
}

/// Periodic pairing/orphan pass over partial GRDH inputs (spec.md §4.E
/// entry point 2).
pub async fn run_cycle(store: &Store) -> anyhow::Result<()> {
    let pool = store.pool();
    let candidates = queries::unfired_partial_grdh(pool).await?;
    let mut consumed = std::collections::HashSet::new();
    let now = chrono::Utc::now();

    for input in &candidates {
        if consumed.contains(&input.id) {
            continue;
        }
        let partner = candidates.iter().find(|other| {
            other.id != input.id
                && !consumed.contains(&other.id)
                && other.tile == input.tile
                && other.measurement_day == input.measurement_day
                && other.relative_orbit == input.relative_orbit
                && are_adjacent_swaths(input, other)
        });

        if let Some(partner) = partner {
            let bookmark = queries::nrt_harvest_bookmark(pool, input.product_type).await?;
            let is_nrt = nrt::classify(
                bookmark,
                input.measurement_day,
                input.publishing_date,
                input.harvesting_date,
            );
            queries::fire_validation(
                store,
                RuleName::Backscatter10mTc,
                &[input.id, partner.id],
                is_nrt,
                None,
            )
            .await?;
            consumed.insert(input.id);
            consumed.insert(partner.id);
            info!(tile = %input.tile, day = input.measurement_day, "fired GRDH pair");
            continue;
        }

        let age = (now - input.harvesting_date).num_seconds();
        if age >= GRDH_ORPHAN_TIMEOUT_SECS {
            let bookmark = queries::nrt_harvest_bookmark(pool, input.product_type).await?;
            let is_nrt = nrt::classify(
                bookmark,
                input.measurement_day,
                input.publishing_date,
                input.harvesting_date,
            );
            queries::fire_validation(store, RuleName::Backscatter10mTc, &[input.id], is_nrt, None)
                .await?;
            consumed.insert(input.id);
            info!(tile = %input.tile, day = input.measurement_day, "fired orphaned GRDH partial");
        }
    }
    Ok(())
}
