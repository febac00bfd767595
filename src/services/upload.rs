use crate::config::UploadConfig;
use crate::error::{AppError, Result};
use crate::models::{StoredUpload, UploadResponse, UploadedArchive};
use crate::services::ArchiveService;
use crate::storage::{new_upload_id, UploadStore};

/// Multipart field that carries the archive
pub const UPLOAD_FIELD: &str = "zipFile";

/// Upload gate checks and hand-off to the upload store
pub struct UploadService;

impl UploadService {
    /// Reject content types outside the configured allow-list
    pub fn check_mime(config: &UploadConfig, content_type: Option<&str>) -> Result<String> {
        let mime = content_type.unwrap_or("").trim().to_string();
        if config.allowed_mime_types.iter().any(|m| m.eq_ignore_ascii_case(&mime)) {
            Ok(mime)
        } else {
            Err(AppError::MimeType(mime))
        }
    }

    /// Reject once the received byte count passes the ceiling
    pub fn check_size(config: &UploadConfig, received: u64) -> Result<()> {
        if received > config.max_file_size {
            return Err(AppError::SizeExceeded {
                max_bytes: config.max_file_size,
            });
        }
        Ok(())
    }

    /// Keep only the final path component of a client supplied file name
    pub fn display_name(file_name: Option<&str>) -> String {
        file_name
            .and_then(|n| n.rsplit(['/', '\\']).next())
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or("upload.zip")
            .to_string()
    }

    /// Validate the archive and park it in the upload store
    pub async fn accept(store: &dyn UploadStore, archive: UploadedArchive) -> Result<UploadResponse> {
        let files = ArchiveService::inspect_in_background(archive.data.clone()).await?;

        let file_id = new_upload_id();
        let file_name = archive.file_name.clone();
        let file_size = archive.size;
        store.put(StoredUpload::new(file_id.clone(), archive)).await?;

        tracing::info!(
            "Accepted upload {} ({}, {} bytes, {} entries) into {} store",
            file_id,
            file_name,
            file_size,
            files.len(),
            store.store_type()
        );

        Ok(UploadResponse {
            success: true,
            file_id,
            file_name,
            file_size,
            files,
            message: "ZIP file uploaded successfully".to_string(),
        })
    }
}
