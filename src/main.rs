use chrono::Duration;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use zip2deploy::config::Config;
use zip2deploy::session::{MemorySessionStore, SessionStore};
use zip2deploy::{create_router, spawn_sweeper, storage, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "zip2deploy=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting zip2deploy...");

    // Load configuration
    let config = Config::load()?;
    let config = Arc::new(config);
    tracing::info!("Configuration loaded");

    if config.vercel.token.is_none() {
        tracing::warn!("No Vercel token configured; deployments will fail");
    }

    let uploads = storage::create_upload_store(&config.storage, &config.upload);
    tracing::info!("Upload store initialized ({})", uploads.store_type());

    let sessions: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new(Duration::seconds(
        config.session.ttl_seconds as i64,
    )));

    let http = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(60))
        .build()?;

    // Create app state
    let state = AppState {
        config: config.clone(),
        uploads,
        sessions,
        http,
    };

    spawn_sweeper(&state);

    // Build router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
