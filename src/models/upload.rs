use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Archive received by the upload gate; lives for one request
#[derive(Debug, Clone)]
pub struct UploadedArchive {
    pub file_name: String,
    pub mime_type: String,
    pub size: u64,
    pub data: Bytes,
}

/// Accepted archive kept until it is deployed or expires
#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub id: String,
    pub file_name: String,
    pub data: Bytes,
    pub created_at: DateTime<Utc>,
}

/// Sidecar metadata for uploads kept on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredUploadMeta {
    pub id: String,
    pub file_name: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
}

impl StoredUpload {
    pub fn new(id: String, archive: UploadedArchive) -> Self {
        Self {
            id,
            file_name: archive.file_name,
            data: archive.data,
            created_at: Utc::now(),
        }
    }

    pub fn meta(&self) -> StoredUploadMeta {
        StoredUploadMeta {
            id: self.id.clone(),
            file_name: self.file_name.clone(),
            size: self.data.len() as u64,
            created_at: self.created_at,
        }
    }
}

/// POST /api/upload response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub file_id: String,
    pub file_name: String,
    pub file_size: u64,
    pub files: Vec<String>,
    pub message: String,
}
