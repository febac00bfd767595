use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::{AppError, Result};
use crate::models::StoredUpload;
use crate::storage::UploadStore;

/// In-process upload store; contents vanish on restart
pub struct MemoryUploadStore {
    uploads: RwLock<HashMap<String, StoredUpload>>,
    ttl: Duration,
}

impl MemoryUploadStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            uploads: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    fn is_expired(&self, upload: &StoredUpload) -> bool {
        upload.created_at + self.ttl <= Utc::now()
    }
}

#[async_trait]
impl UploadStore for MemoryUploadStore {
    async fn put(&self, upload: StoredUpload) -> Result<()> {
        tracing::debug!("Holding upload {} ({} bytes) in memory", upload.id, upload.data.len());
        self.uploads.write().await.insert(upload.id.clone(), upload);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<StoredUpload> {
        let uploads = self.uploads.read().await;
        match uploads.get(id) {
            Some(upload) if !self.is_expired(upload) => Ok(upload.clone()),
            _ => Err(AppError::NotFound("Upload not found or expired".to_string())),
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.uploads.write().await.remove(id);
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize> {
        let mut uploads = self.uploads.write().await;
        let before = uploads.len();
        let now = Utc::now();
        uploads.retain(|_, upload| upload.created_at + self.ttl > now);
        Ok(before - uploads.len())
    }

    fn store_type(&self) -> &'static str {
        "memory"
    }
}
