mod analysis;
mod config;
mod errors;
mod extraction;
mod llm_client;
mod routes;
mod session;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::analysis::orchestrator::Orchestrator;
use crate::config::Config;
use crate::extraction::FileExtractor;
use crate::llm_client::GeminiClient;
use crate::routes::build_router;
use crate::session::SessionManager;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing or inconsistent env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Compass API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize generation client
    let client = GeminiClient::new(config.gemini_api_key.clone())?;
    info!("Generation client initialized (model: {})", llm_client::MODEL);

    let orchestrator_config = config.orchestrator_config();
    info!(
        "Orchestrator: timeout {}s, {} retries, backoff {}ms",
        orchestrator_config.generation_timeout.as_secs(),
        orchestrator_config.retry.max_retries,
        orchestrator_config.retry.base_delay.as_millis()
    );

    let session_config = config.session_config();
    info!(
        "Sessions: ttl {}s, capacity {}, history cap {}",
        session_config.ttl.as_secs(),
        session_config.capacity,
        session_config.history_cap
    );

    // Build app state
    let state = AppState {
        orchestrator: Arc::new(Orchestrator::new(Arc::new(client), orchestrator_config)),
        sessions: Arc::new(SessionManager::new(session_config)),
        extractor: Arc::new(FileExtractor),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web client has a fixed domain

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
