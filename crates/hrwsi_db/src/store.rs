//! Store gateway: the one object every component talks to the coordination
//! substrate through.

use sqlx::{PgPool, Postgres, Transaction};

use crate::error::StoreError;

/// Thin wrapper over `PgPool`. Connections are checked out per-call by
/// `sqlx` and released on every exit path (including error paths) as part
/// of its own `Drop` machinery, matching the "every connection is released
/// on all exit paths" contract of spec.md §4.A.
#[derive(Clone)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run the embedded schema migrations. Called once at startup by every
    /// binary before it enters its main loop.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Other(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Begin a transaction. Writes that span multiple rows (validation +
    /// raw2valid edges; task + status row) borrow this directly rather
    /// than going through a generic combinator, the way
    /// `casparian_sentinel::db::queue::JobQueue` claims a job with a plain
    /// `pool.begin() ... tx.commit()` pair.
    pub async fn begin(&self) -> Result<Transaction<'_, Postgres>, StoreError> {
        self.pool.begin().await.map_err(StoreError::from)
    }

    /// `NOTIFY channel, payload` issued outside any particular transaction
    /// (autocommit), for callers that don't need the notification to be
    /// atomic with a preceding write.
    pub async fn notify(&self, channel: &str, payload: &str) -> Result<(), StoreError> {
        sqlx::query("SELECT pg_notify($1, $2)")
            .bind(channel)
            .bind(payload)
            .execute(&self.pool)
            .await
            .map_err(StoreError::from)?;
        Ok(())
    }

    /// `NOTIFY channel, payload` issued inside an open transaction, so a
    /// listener never observes a notification for a row it cannot yet
    /// read (spec.md §4.A.1).
    pub async fn notify_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        channel: &str,
        payload: &str,
    ) -> Result<(), StoreError> {
        sqlx::query("SELECT pg_notify($1, $2)")
            .bind(channel)
            .bind(payload)
            .execute(&mut **tx)
            .await
            .map_err(StoreError::from)?;
        Ok(())
    }
}
