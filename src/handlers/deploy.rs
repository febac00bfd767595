use axum::{extract::State, Extension, Json};

use crate::error::{AppError, Result};
use crate::middleware::auth::GitHubToken;
use crate::models::{DeployRequest, DeployResponse};
use crate::services::DeployService;
use crate::AppState;

/// Push an uploaded archive to GitHub and deploy it
/// POST /api/deploy
pub async fn deploy(
    State(state): State<AppState>,
    Extension(token): Extension<GitHubToken>,
    payload: std::result::Result<Json<DeployRequest>, axum::extract::rejection::JsonRejection>,
) -> Result<Json<DeployResponse>> {
    let Json(req) = payload
        .map_err(|_| AppError::BadRequest("Missing required parameters".to_string()))?;

    let response = DeployService::deploy(
        &state.config,
        &state.http,
        state.uploads.as_ref(),
        &token.0,
        req,
    )
    .await?;
    Ok(Json(response))
}
