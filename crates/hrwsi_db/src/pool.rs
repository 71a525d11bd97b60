//! Pool creation.
//!
//! Concrete `PgPool` rather than `sqlx::AnyPool`: the coordination substrate
//! is always Postgres (LISTEN/NOTIFY has no portable equivalent), so there
//! is no feature-flagged backend selection to make.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::error::StoreError;

/// Pool sizing configuration.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl PoolConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            acquire_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }
}

/// Create a connection pool from configuration.
pub async fn create_pool(config: PoolConfig) -> Result<PgPool, StoreError> {
    info!(
        max_connections = config.max_connections,
        "connecting to coordination store"
    );
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(&config.url)
        .await
        .map_err(StoreError::from)?;
    Ok(pool)
}
