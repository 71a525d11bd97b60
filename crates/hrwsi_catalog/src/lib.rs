//! Catalog client (spec.md §4.B): given a query window, return candidate
//! upstream items. The core treats pagination as an implementation detail
//! of a single logical call.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hrwsi_protocol::retry::retry_with_backoff;
use hrwsi_protocol::ProductType;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

const DEFAULT_MAX_ATTEMPTS: u32 = 4;
const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog transport error: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("catalog rejected the request: HTTP {0}")]
    Rejected(u16),
    #[error("catalog response did not match the expected shape: {0}")]
    DataShape(String),
}

impl CatalogError {
    fn is_transient(&self) -> bool {
        matches!(self, CatalogError::Transport(e) if e.is_timeout() || e.is_connect())
    }
}

/// Either a tile list or a free-form geometry, as carried by `SystemParams`.
#[derive(Debug, Clone)]
pub enum TileOrGeometry {
    Tiles(Vec<String>),
    Geometry(String),
}

/// Query parameters for one catalog call (spec.md §4.B).
#[derive(Debug, Clone)]
pub struct CatalogQuery {
    pub product_type: ProductType,
    pub collection: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub tile_or_geometry: TileOrGeometry,
    pub polarisation: Option<String>,
    pub timeliness: Option<String>,
}

/// One candidate item returned by the catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogItem {
    pub identifier: String,
    pub measurement_start: DateTime<Utc>,
    pub publishing_date: DateTime<Utc>,
    pub tile: String,
    pub measurement_day: i32,
    pub relative_orbit: Option<i32>,
    pub input_path: String,
    #[serde(default)]
    pub is_partial: bool,
}

#[derive(Debug, Deserialize)]
struct CatalogPage {
    items: Vec<CatalogItem>,
    next_page_token: Option<String>,
}

#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn query(&self, query: &CatalogQuery) -> Result<Vec<CatalogItem>, CatalogError>;
}

/// Production catalog client over the external HTTP catalog API.
pub struct HttpCatalogClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpCatalogClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    async fn fetch_page(
        &self,
        query: &CatalogQuery,
        page_token: Option<&str>,
    ) -> Result<CatalogPage, CatalogError> {
        let (tiles, geometry) = match &query.tile_or_geometry {
            TileOrGeometry::Tiles(tiles) => (Some(tiles.join(",")), None),
            TileOrGeometry::Geometry(geom) => (None, Some(geom.clone())),
        };
        let mut request = self
            .http
            .get(format!("{}/catalog/search", self.base_url))
            .query(&[
                ("product_type", query.product_type.as_str().to_string()),
                ("collection", query.collection.clone()),
                ("window_start", query.window_start.to_rfc3339()),
                ("window_end", query.window_end.to_rfc3339()),
            ]);
        if let Some(tiles) = tiles {
            request = request.query(&[("tiles", tiles)]);
        }
        if let Some(geometry) = geometry {
            request = request.query(&[("geometry", geometry)]);
        }
        if let Some(polarisation) = &query.polarisation {
            request = request.query(&[("polarisation", polarisation)]);
        }
        if let Some(timeliness) = &query.timeliness {
            request = request.query(&[("timeliness", timeliness)]);
        }
        if let Some(token) = page_token {
            request = request.query(&[("page_token", token)]);
        }

        let response = request.send().await.map_err(CatalogError::Transport)?;
        if !response.status().is_success() {
            return Err(CatalogError::Rejected(response.status().as_u16()));
        }
        response
            .json::<CatalogPage>()
            .await
            .map_err(|e| CatalogError::DataShape(e.to_string()))
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    /// The core treats this as a single call; pagination is walked
    /// internally and each page's transport call is retried independently.
    async fn query(&self, query: &CatalogQuery) -> Result<Vec<CatalogItem>, CatalogError> {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let page = retry_with_backoff(
                DEFAULT_MAX_ATTEMPTS,
                DEFAULT_BASE_DELAY,
                CatalogError::is_transient,
                || self.fetch_page(query, page_token.as_deref()),
            )
            .await?;
            items.extend(page.items);
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        if items.is_empty() {
            warn!(
                product_type = %query.product_type,
                "catalog returned no candidate items for this window"
            );
        }
        Ok(items)
    }
}
