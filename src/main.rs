//! Starlab server - hosts the graph store, the conversation store, the
//! publication index and the AI chat function over HTTP.
//!
//! - `graphs`: saved knowledge-graph snapshots
//! - `conversations`: chat conversations and their messages
//! - `publications`: documents used to ground answers
//! - `ai_chat`: retrieval, prompt composition and streaming relay

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use starlab::{router::build_router, AppState, Config};

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("starlab=info,tower_http=info")),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };

    let state = match AppState::open(config.clone()) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            error!(error = %e, path = %config.db_path.display(), "failed to open database");
            std::process::exit(1);
        }
    };

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("Failed to bind listen address");

    info!("Starlab server running at http://{}", config.bind_addr);
    info!(path = %config.db_path.display(), "database opened");
    info!(url = %config.gateway.url, model = %config.gateway.model, "AI gateway");
    if config.gateway.api_key.is_none() {
        warn!("AI_GATEWAY_API_KEY is not set; the chat function will reject requests");
    }

    axum::serve(listener, app).await.expect("Server error");
}
