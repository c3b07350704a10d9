//! Starlab library - knowledge-graph editing and grounded AI chat for space
//! biology research.
//!
//! The crate serves two audiences. Client code uses `GraphEditor` and
//! `ChatSession` against any implementation of the store and backend traits;
//! the server binary hosts those collaborators over HTTP through `AppState`
//! and `router::build_router`.

use std::sync::Arc;

use sled::Db;

pub mod ai_chat;
pub mod chat;
pub mod config;
pub mod conversations;
pub mod editor;
pub mod error;
pub mod gateway;
pub mod graph_store;
pub mod graphs;
pub mod layout;
pub mod models;
pub mod notify;
pub mod prompt;
pub mod publications;
pub mod router;
pub mod sse;

// ============================================================================
// Configuration
// ============================================================================

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DB_PATH: &str = ".starlab_db";
pub const DEFAULT_GATEWAY_URL: &str = "https://ai.gateway.lovable.dev/v1/chat/completions";
pub const DEFAULT_GATEWAY_MODEL: &str = "google/gemini-2.5-flash";
pub const GRAPH_STORAGE_KEY: &str = "starlab_kg_v1";

// ============================================================================
// Application State
// ============================================================================

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub config: Config,
    pub graphs: SledGraphStore,
    pub conversations: SledConversationStore,
    pub publications: SledPublicationStore,
    pub retriever: Arc<dyn DocumentRetriever>,
    pub gateway: ModelGateway,
}

impl AppState {
    /// Open the database at the configured path.
    pub fn open(config: Config) -> Result<Self, StoreError> {
        let db = sled::open(&config.db_path)?;
        Self::with_db(db, config)
    }

    /// Build state around an already opened database.
    pub fn with_db(db: Db, config: Config) -> Result<Self, StoreError> {
        let publications = SledPublicationStore::open(&db)?;
        Ok(Self {
            graphs: SledGraphStore::open(&db)?,
            conversations: SledConversationStore::open(&db)?,
            retriever: Arc::new(publications.clone()),
            publications,
            gateway: ModelGateway::new(&config.gateway),
            db,
            config,
        })
    }

    /// Replace the document retriever used by the chat function.
    pub fn with_retriever(mut self, retriever: Arc<dyn DocumentRetriever>) -> Self {
        self.retriever = retriever;
        self
    }

    /// An editor bound to this server's cache and graph store, using the
    /// configured storage key.
    pub fn open_editor(
        &self,
        notifier: Arc<dyn Notifier>,
        initial: GraphDocument,
    ) -> Result<GraphEditor, StoreError> {
        let cache = SledGraphCache::open(&self.db)?;
        let config = EditorConfig::new(self.config.graph_storage_key.clone());
        Ok(GraphEditor::new(config, Arc::new(cache), notifier, initial)
            .with_remote(Arc::new(self.graphs.clone())))
    }
}

// Re-export commonly used types
pub use models::{
    ChatRequest, Conversation, ConversationMessage, GraphDocument, GraphLink, GraphNode,
    GraphSummary, Position, RetrievedDocument, Role, StoredGraph,
};

pub use config::{Config, GatewayConfig};
pub use error::{AppError, ChatError, ConfigError, StoreError};

pub use editor::{EditorConfig, GraphEditor, NodeClick};
pub use graph_store::{GraphCache, GraphRemote, HttpGraphClient, SledGraphCache, SledGraphStore};
pub use layout::{ForceLayout, Scene, ViewTransform};

pub use chat::{ChatBackend, ChatSession, HttpChatBackend, SendOutcome, SendPhase};
pub use conversations::{ConversationStore, HttpConversationStore, SledConversationStore};
pub use gateway::ModelGateway;
pub use notify::{LogNotifier, MemoryNotifier, Notice, Notifier};
pub use publications::{DocumentRetriever, SledPublicationStore};
pub use sse::{SseDecoder, SseEvent};
