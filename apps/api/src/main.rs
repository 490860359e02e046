mod config;
mod errors;
mod llm_client;
mod noa;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::noa::sessions::SessionStore;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={},tower_http={}",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log,
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting NOA API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client
    let llm = LlmClient::new(
        config.anthropic_api_key.clone(),
        config.llm_model.clone(),
        config.llm_max_tokens,
    )?;
    info!(
        "LLM client initialized (model: {}, max_tokens: {})",
        llm.model(),
        config.llm_max_tokens
    );

    // Session store with idle expiry
    let sessions = SessionStore::with_ttl(chrono::Duration::seconds(config.session_ttl_secs));
    sessions.spawn_sweeper(Duration::from_secs(config.session_sweep_secs));
    info!(
        "Session store initialized (ttl: {}s, sweep every {}s)",
        config.session_ttl_secs, config.session_sweep_secs
    );

    // Build app state
    let state = AppState {
        llm: Arc::new(llm),
        sessions,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict CORS to the case-management frontend origin

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
