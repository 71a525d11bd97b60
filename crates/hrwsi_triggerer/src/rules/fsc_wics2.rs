//! `FSC_TC` / `WICS2_TC` (spec.md §4.E): one validation per eligible rule
//! for a newly harvested `S2_MAJA_L2A` input.

use chrono::Utc;
use hrwsi_db::{Store, StoreError};
use hrwsi_protocol::{RawInput, RuleName};

use crate::{nrt, queries};

const RULES: &[RuleName] = &[RuleName::FscTc, RuleName::Wics2Tc];

pub async fn evaluate(store: &Store, raw_input: &RawInput) -> Result<(), StoreError> {
    let pool = store.pool();
    let (n_pub, _n_meas) = queries::triggering_window(pool, raw_input.product_type).await?;
    let published_days_ago = (Utc::now() - raw_input.publishing_date).num_days();
    if published_days_ago > n_pub {
        return Ok(());
    }

    let bookmark = queries::nrt_harvest_bookmark(pool, raw_input.product_type).await?;
    let is_nrt = nrt::classify(
        bookmark,
        raw_input.measurement_day,
        raw_input.publishing_date,
        raw_input.harvesting_date,
    );

    for &rule in RULES {
        if queries::rule_already_fired(pool, raw_input.id, rule).await? {
            continue;
        }
        queries::fire_validation(store, rule, &[raw_input.id], is_nrt, None).await?;
    }
    Ok(())
}
