//! The artifact storage seam.

use async_trait::async_trait;

use crate::error::StorageResult;

/// Remote storage for finished artifacts.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store `data` under `key` and return its public locator.
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<String>;

    /// Remove the object under `key`.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Public URL for `key`.
    fn public_url(&self, key: &str) -> String;
}
