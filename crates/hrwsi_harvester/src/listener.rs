//! Notification-driven ingestion (spec.md §4.D: "the Harvester also listens
//! on channel `product_insertion`").

use std::time::Duration;

use hrwsi_db::{NotificationListener, Store};
use hrwsi_protocol::defaults::CHANNEL_PRODUCT_INSERTION;
use hrwsi_protocol::parsers::parse_identifier;
use hrwsi_protocol::ProductType;
use serde::Deserialize;
use tracing::warn;

const POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// Shape of the `product_insertion` notification payload: everything the
/// Harvester needs except the identifier-derived attributes (tile,
/// measurement day, relative orbit), which are parsed from `identifier`.
#[derive(Debug, Deserialize)]
struct ProductInsertionPayload {
    identifier: String,
    product_type: String,
    measurement_start: chrono::DateTime<chrono::Utc>,
    publishing_date: chrono::DateTime<chrono::Utc>,
    input_path: String,
    #[serde(default)]
    is_partial: bool,
}

/// Product types this channel is eligible to feed into `raw_inputs`
/// (spec.md §4.D: "whose type is on the eligible list").
const ELIGIBLE_PRODUCT_TYPES: &[ProductType] = &[
    ProductType::S2MajaL2a,
    ProductType::S1NrbL2a,
    ProductType::S2FscL2b,
    ProductType::S1SwsL2b,
    ProductType::S1WdsL2b,
    ProductType::S1Wics1L2b,
    ProductType::S2Wics2L2b,
    ProductType::S2CcL2b,
    ProductType::CombWics1s2,
    ProductType::GfscL2c,
];

/// Run the `product_insertion` listener until `cancel` fires.
pub async fn run(store: &Store, cancel: &mut tokio::sync::watch::Receiver<bool>) -> anyhow::Result<()> {
    let mut listener =
        NotificationListener::connect(store.pool(), &[CHANNEL_PRODUCT_INSERTION]).await?;
    loop {
        tokio::select! {
            _ = cancel.changed() => {
                if *cancel.borrow() {
                    return Ok(());
                }
            }
            notif = listener.poll(POLL_TIMEOUT) => {
                if let Some(notif) = notif? {
                    if let Err(e) = handle_payload(store, &notif.payload).await {
                        warn!(error = %e, "dropping malformed product_insertion payload");
                    }
                }
            }
        }
    }
}

async fn handle_payload(store: &Store, payload: &str) -> anyhow::Result<()> {
    let parsed: ProductInsertionPayload = serde_json::from_str(payload)?;
    let product_type: ProductType = parsed.product_type.parse().map_err(|e| {
        anyhow::anyhow!("unknown product type in product_insertion payload: {e}")
    })?;
    if !ELIGIBLE_PRODUCT_TYPES.contains(&product_type) {
        return Ok(());
    }
    let identity = parse_identifier(product_type, &parsed.identifier)?;

    let mut tx = store.begin().await?;
    let new_row = crate::queries::insert_raw_input(
        &mut tx,
        &parsed.identifier,
        product_type,
        parsed.measurement_start,
        parsed.publishing_date,
        &identity.tile,
        identity.measurement_day,
        identity.relative_orbit,
        &parsed.input_path,
        parsed.is_partial,
    )
    .await?;
    match new_row {
        Some(raw_input) => {
            crate::queries::notify_input_insertion(&mut tx, &raw_input).await?;
            tx.commit().await.map_err(hrwsi_db::StoreError::from)?;
        }
        None => {
            tx.rollback().await.map_err(hrwsi_db::StoreError::from)?;
        }
    }
    Ok(())
}
