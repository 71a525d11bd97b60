pub mod cc;
pub mod fsc_wics2;
pub mod gfsc;
pub mod grdh;
pub mod s1_nrb;
pub mod wds_symmetric;
pub mod wics1s2;

use hrwsi_db::Store;
use hrwsi_protocol::{ProductType, RawInput};
use tracing::debug;

/// Dispatch a freshly inserted raw input to its per-product-type rule
/// (spec.md §4.E, entry point 1). L1C and partial GRDH are left to their
/// periodic cycles.
pub async fn handle_new_input(store: &Store, raw_input: &RawInput) -> anyhow::Result<()> {
    match raw_input.product_type {
        ProductType::IwGrdh1s if !raw_input.is_partial => {
            grdh::fire_single(store, raw_input).await?
        }
        ProductType::IwGrdh1s => {}
        ProductType::S2MajaL2a => fsc_wics2::evaluate(store, raw_input).await?,
        ProductType::S1NrbL2a => s1_nrb::evaluate(store, raw_input).await?,
        ProductType::S2FscL2b => wds_symmetric::evaluate(store, raw_input).await?,
        ProductType::S2Msi1c
        | ProductType::S1SwsL2b
        | ProductType::S1WdsL2b
        | ProductType::S1Wics1L2b
        | ProductType::S2Wics2L2b
        | ProductType::S2CcL2b
        | ProductType::CombWics1s2
        | ProductType::GfscL2c => {
            debug!(product_type = %raw_input.product_type, "no notification-driven rule for this product type");
        }
    }
    Ok(())
}
