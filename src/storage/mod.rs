pub mod local;
pub mod memory;
pub mod provider;

pub use local::*;
pub use memory::*;
pub use provider::*;

use chrono::Duration;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::{StorageBackend, StorageConfig, UploadConfig};
use crate::error::{AppError, Result};

const UPLOAD_ID_PREFIX: &str = "upload_";

/// Build the upload store selected by configuration
pub fn create_upload_store(storage: &StorageConfig, upload: &UploadConfig) -> Arc<dyn UploadStore> {
    let ttl = Duration::seconds(upload.ttl_seconds as i64);
    match storage.backend {
        StorageBackend::Memory => Arc::new(MemoryUploadStore::new(ttl)),
        StorageBackend::Local => Arc::new(LocalUploadStore::new(&storage.local_path, ttl)),
    }
}

pub fn new_upload_id() -> String {
    format!("{}{}", UPLOAD_ID_PREFIX, Uuid::new_v4().simple())
}

/// Reject anything that is not an id we generated before it reaches a backend
pub fn check_upload_id(id: &str) -> Result<()> {
    let valid = id
        .strip_prefix(UPLOAD_ID_PREFIX)
        .map(|hex| hex.len() == 32 && hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()))
        .unwrap_or(false);

    if valid {
        Ok(())
    } else {
        Err(AppError::BadRequest("Invalid file id".to_string()))
    }
}
