//! Object-store existence probe used to gate routines that need dynamic
//! auxiliaries (spec.md §4.H: "checks existence of required dynamic
//! auxiliaries (CAMS / FMI)").

use async_trait::async_trait;
use hrwsi_renderer::AuxiliaryProbe;
use tracing::warn;

/// Translates an `s3://bucket/key` path into an HTTP HEAD request against
/// an S3-compatible endpoint.
pub struct S3AuxiliaryProbe {
    http: reqwest::Client,
    endpoint: String,
}

impl S3AuxiliaryProbe {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    fn http_url(&self, s3_path: &str) -> Option<String> {
        let rest = s3_path.strip_prefix("s3://")?;
        Some(format!("{}/{}", self.endpoint.trim_end_matches('/'), rest))
    }
}

#[async_trait]
impl AuxiliaryProbe for S3AuxiliaryProbe {
    async fn exists(&self, path: &str) -> bool {
        let Some(url) = self.http_url(path) else {
            warn!(path, "auxiliary path is not an s3:// URL");
            return false;
        };
        match self.http.head(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!(path, error = %e, "auxiliary existence check failed");
                false
            }
        }
    }
}
