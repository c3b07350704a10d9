//! Axum router: maps URL paths to handlers.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{ai_chat, conversations, graphs, publications, AppState};

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Knowledge graphs
        .route("/api/graphs", get(graphs::list_graphs).post(graphs::create_graph))
        .route("/api/graphs/{id}", get(graphs::get_graph))
        // Conversations
        .route(
            "/api/conversations",
            get(conversations::list_conversations).post(conversations::create_conversation),
        )
        .route("/api/conversations/{id}", get(conversations::get_conversation))
        .route(
            "/api/conversations/{id}/messages",
            get(conversations::list_messages).post(conversations::append_message),
        )
        // Publications
        .route("/api/publications", post(publications::create_publication))
        .route("/api/publications/search", get(publications::search_publications))
        // Chat function
        .route("/functions/ai-chat", post(ai_chat::ai_chat))
        // Middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
