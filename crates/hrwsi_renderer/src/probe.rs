//! Existence probe for dynamic auxiliaries (CAMS, FMI). Kept behind a
//! trait so renderer unit tests can inject a stub reporting specific paths
//! present/missing without touching the object store.

use async_trait::async_trait;

#[async_trait]
pub trait AuxiliaryProbe: Send + Sync {
    async fn exists(&self, path: &str) -> bool;
}
