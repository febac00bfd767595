use async_trait::async_trait;
use bytes::Bytes;
use chrono::{Duration, Utc};
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{StoredUpload, StoredUploadMeta};
use crate::storage::UploadStore;

/// Local file system upload store.
/// Each upload is `<id>.zip` plus a `<id>.json` metadata sidecar.
pub struct LocalUploadStore {
    base_path: PathBuf,
    ttl: Duration,
}

impl LocalUploadStore {
    pub fn new(base_path: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            base_path: base_path.into(),
            ttl,
        }
    }

    fn data_path(&self, id: &str) -> PathBuf {
        self.base_path.join(format!("{}.zip", id))
    }

    fn meta_path(&self, id: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", id))
    }

    async fn read_meta(&self, id: &str) -> Result<Option<StoredUploadMeta>> {
        let raw = match fs::read(self.meta_path(id)).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let meta = serde_json::from_slice(&raw)
            .map_err(|e| AppError::Internal(format!("Corrupt upload metadata for {}: {}", id, e)))?;
        Ok(Some(meta))
    }

    async fn remove_if_exists(path: PathBuf) -> Result<()> {
        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!("Deleted file {:?}", path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl UploadStore for LocalUploadStore {
    async fn put(&self, upload: StoredUpload) -> Result<()> {
        fs::create_dir_all(&self.base_path).await?;

        let data_path = self.data_path(&upload.id);
        let mut file = fs::File::create(&data_path).await?;
        file.write_all(&upload.data).await?;
        file.flush().await?;

        // Metadata goes last so a half-written upload is never visible
        let meta = serde_json::to_vec(&upload.meta())
            .map_err(|e| AppError::Internal(format!("Failed to encode upload metadata: {}", e)))?;
        fs::write(self.meta_path(&upload.id), meta).await?;

        tracing::debug!("Saved upload to {:?}", data_path);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<StoredUpload> {
        let not_found = || AppError::NotFound("Upload not found or expired".to_string());

        let meta = self.read_meta(id).await?.ok_or_else(not_found)?;
        if meta.created_at + self.ttl <= Utc::now() {
            return Err(not_found());
        }

        let data = fs::read(self.data_path(id)).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                not_found()
            } else {
                AppError::Io(e)
            }
        })?;

        Ok(StoredUpload {
            id: meta.id,
            file_name: meta.file_name,
            data: Bytes::from(data),
            created_at: meta.created_at,
        })
    }

    async fn delete(&self, id: &str) -> Result<()> {
        Self::remove_if_exists(self.meta_path(id)).await?;
        Self::remove_if_exists(self.data_path(id)).await
    }

    async fn purge_expired(&self) -> Result<usize> {
        let mut entries = match fs::read_dir(&self.base_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let now = Utc::now();
        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };

            let expired = match self.read_meta(&id).await {
                Ok(Some(meta)) => meta.created_at + self.ttl <= now,
                Ok(None) => false,
                Err(e) => {
                    tracing::warn!("Removing unreadable upload {}: {}", id, e);
                    true
                }
            };
            if expired {
                self.delete(&id).await?;
                removed += 1;
            }
        }

        Ok(removed)
    }

    fn store_type(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(id: &str) -> StoredUpload {
        StoredUpload {
            id: id.to_string(),
            file_name: "my site.zip".to_string(),
            data: Bytes::from_static(b"PK\x03\x04zip"),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalUploadStore::new(dir.path(), Duration::minutes(5));

        store.put(upload("upload_a")).await.unwrap();
        assert!(dir.path().join("upload_a.zip").exists());

        let got = store.get("upload_a").await.unwrap();
        assert_eq!(got.file_name, "my site.zip");
        assert_eq!(&got.data[..], b"PK\x03\x04zip");

        store.delete("upload_a").await.unwrap();
        assert!(!dir.path().join("upload_a.zip").exists());
        assert!(matches!(store.get("upload_a").await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalUploadStore::new(dir.path(), Duration::minutes(5));

        let mut old = upload("upload_old");
        old.created_at = Utc::now() - Duration::hours(1);
        store.put(old).await.unwrap();
        store.put(upload("upload_new")).await.unwrap();

        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert!(!dir.path().join("upload_old.zip").exists());
        assert!(store.get("upload_new").await.is_ok());
    }
}
