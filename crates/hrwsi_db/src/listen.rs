//! `LISTEN`/poll-notifications primitive (spec.md §4.A, §5).

use std::time::Duration;

use sqlx::postgres::PgListener;
use sqlx::PgPool;

use crate::error::StoreError;

/// One inbound notification: the channel it arrived on plus its JSON
/// payload (spec.md §6, "payload = JSON of the inserted row").
#[derive(Debug, Clone)]
pub struct Notification {
    pub channel: String,
    pub payload: String,
}

/// A non-blocking poller over one or more `LISTEN` channels.
///
/// Activities multiplex this against periodic timers and the shutdown
/// signal inside a `tokio::select!` loop (spec.md §5, "Waiting on the
/// notification bus (poll, yield)").
pub struct NotificationListener {
    listener: PgListener,
}

impl NotificationListener {
    pub async fn connect(pool: &PgPool, channels: &[&str]) -> Result<Self, StoreError> {
        let mut listener = PgListener::connect_with(pool)
            .await
            .map_err(StoreError::from)?;
        listener
            .listen_all(channels.iter().copied())
            .await
            .map_err(StoreError::from)?;
        Ok(Self { listener })
    }

    /// Block until the next notification arrives or `timeout` elapses.
    /// Returns `Ok(None)` on timeout so the caller can re-check its
    /// cancellation token and other timers between polls.
    pub async fn poll(&mut self, timeout: Duration) -> Result<Option<Notification>, StoreError> {
        match tokio::time::timeout(timeout, self.listener.recv()).await {
            Ok(Ok(notif)) => Ok(Some(Notification {
                channel: notif.channel().to_string(),
                payload: notif.payload().to_string(),
            })),
            Ok(Err(e)) => Err(StoreError::from(e)),
            Err(_elapsed) => Ok(None),
        }
    }
}
