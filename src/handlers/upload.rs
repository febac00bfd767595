use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use bytes::BytesMut;

use crate::error::{AppError, Result};
use crate::models::{UploadResponse, UploadedArchive};
use crate::services::upload::UPLOAD_FIELD;
use crate::services::UploadService;
use crate::AppState;

/// Upload a ZIP archive
/// POST /api/upload (multipart field `zipFile`)
pub async fn upload_zip(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let limits = &state.config.upload;
    let mut archive: Option<UploadedArchive> = None;

    // Process multipart fields
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limits.max_file_size))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        if archive.is_some() {
            return Err(AppError::BadRequest("Only one file may be uploaded".to_string()));
        }

        let mime_type = UploadService::check_mime(limits, field.content_type())?;
        let file_name = UploadService::display_name(field.file_name());

        let mut data = BytesMut::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| multipart_error(e, limits.max_file_size))?
        {
            UploadService::check_size(limits, (data.len() + chunk.len()) as u64)?;
            data.extend_from_slice(&chunk);
        }

        archive = Some(UploadedArchive {
            file_name,
            mime_type,
            size: data.len() as u64,
            data: data.freeze(),
        });
    }

    let archive = archive.ok_or(AppError::NoFile)?;
    let response = UploadService::accept(state.uploads.as_ref(), archive).await?;
    Ok(Json(response))
}

/// The body limit layer surfaces as a multipart error; report it as the size check would
fn multipart_error(e: MultipartError, max_file_size: u64) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::SizeExceeded {
            max_bytes: max_file_size,
        }
    } else {
        AppError::BadRequest(format!("Failed to process multipart: {}", e.body_text()))
    }
}
