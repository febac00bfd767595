use async_trait::async_trait;

use crate::error::Result;
use crate::models::StoredUpload;

/// Ephemeral store for accepted uploads awaiting deployment
#[async_trait]
pub trait UploadStore: Send + Sync {
    /// Save an upload under its id
    async fn put(&self, upload: StoredUpload) -> Result<()>;

    /// Fetch an upload; missing or expired ids are `NotFound`
    async fn get(&self, id: &str) -> Result<StoredUpload>;

    /// Remove an upload. Removing an unknown id is not an error.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Drop every expired upload, returning how many were removed
    async fn purge_expired(&self) -> Result<usize>;

    /// Get the storage type name
    fn store_type(&self) -> &'static str;
}
