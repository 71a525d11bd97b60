//! `input_insertion` listener (spec.md §4.E, entry point 1).

use std::time::Duration;

use hrwsi_db::{NotificationListener, Store};
use hrwsi_protocol::defaults::CHANNEL_INPUT_INSERTION;
use hrwsi_protocol::RawInput;
use tracing::warn;

const POLL_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn run(store: &Store, cancel: &mut tokio::sync::watch::Receiver<bool>) -> anyhow::Result<()> {
    let mut listener = NotificationListener::connect(store.pool(), &[CHANNEL_INPUT_INSERTION]).await?;
    loop {
        tokio::select! {
            _ = cancel.changed() => {
                if *cancel.borrow() {
                    return Ok(());
                }
            }
            notif = listener.poll(POLL_TIMEOUT) => {
                if let Some(notif) = notif? {
                    match serde_json::from_str::<RawInput>(&notif.payload) {
                        Ok(raw_input) => {
                            if let Err(e) = crate::rules::handle_new_input(store, &raw_input).await {
                                warn!(error = %e, identifier = %raw_input.identifier, "rule evaluation failed");
                            }
                        }
                        Err(e) => warn!(error = %e, "dropping malformed input_insertion payload"),
                    }
                }
            }
        }
    }
}
