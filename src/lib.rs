//! Backend for the ZIP upload and deploy wizard.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod session;
pub mod storage;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::session::SessionStore;
use crate::storage::UploadStore;

/// Room for multipart boundaries and headers on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub uploads: Arc<dyn UploadStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub http: reqwest::Client,
}

/// Periodically drop expired uploads and sessions
pub fn spawn_sweeper(state: &AppState) {
    let uploads = state.uploads.clone();
    let sessions = state.sessions.clone();
    let every = std::time::Duration::from_secs(state.config.storage.sweep_interval_seconds.max(1));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            match uploads.purge_expired().await {
                Ok(0) => {}
                Ok(n) => tracing::info!("Purged {} expired uploads", n),
                Err(e) => tracing::error!("Failed to purge uploads: {}", e),
            }
            if let Err(e) = sessions.purge_expired().await {
                tracing::error!("Failed to purge sessions: {}", e);
            }
        }
    });
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = state.config.upload.max_file_size as usize + MULTIPART_OVERHEAD;

    // Public routes
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/csrf-token", get(handlers::session::csrf_token));

    let upload_routes = Router::new()
        .route("/upload", post(handlers::upload::upload_zip))
        .layer(DefaultBodyLimit::max(body_limit));

    // Deploy needs the caller's GitHub token
    let deploy_routes = Router::new()
        .route("/deploy", post(handlers::deploy::deploy))
        .route_layer(axum::middleware::from_fn(
            middleware::auth::github_auth_middleware,
        ));

    // State-changing routes (CSRF protected)
    let protected_routes = upload_routes
        .merge(deploy_routes)
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::csrf::csrf_middleware,
        ));

    Router::new()
        .nest("/api", public_routes.merge(protected_routes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
