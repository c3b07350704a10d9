//! Publication store used to ground assistant answers.
//!
//! Documents are kept in the `pub:publications` tree under big-endian ids from
//! `sled::Db::generate_id`, so scans return them in ingestion order. Retrieval is
//! a case-insensitive substring match against title and abstract.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::error::{AppError, StoreError};
use crate::models::{CreatedResponse, RetrievedDocument};
use crate::AppState;

const PUBLICATIONS_TREE: &str = "pub:publications";

/// Upper bound on documents handed to the prompt.
pub const MAX_RESULTS: usize = 5;

#[async_trait]
pub trait DocumentRetriever: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<RetrievedDocument>, StoreError>;
}

#[derive(Clone)]
pub struct SledPublicationStore {
    db: sled::Db,
    tree: sled::Tree,
}

impl SledPublicationStore {
    pub fn open(db: &sled::Db) -> Result<Self, StoreError> {
        Ok(Self {
            db: db.clone(),
            tree: db.open_tree(PUBLICATIONS_TREE)?,
        })
    }

    pub fn insert(&self, doc: &RetrievedDocument) -> Result<String, StoreError> {
        let id = self.db.generate_id()?;
        self.tree.insert(id.to_be_bytes(), serde_json::to_vec(doc)?)?;
        tracing::info!(id, title = %doc.title, "publication stored");
        Ok(format!("{:016x}", id))
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}

fn matches(doc: &RetrievedDocument, needle: &str) -> bool {
    doc.title.to_lowercase().contains(needle)
        || doc
            .abstract_text
            .as_deref()
            .map(|a| a.to_lowercase().contains(needle))
            .unwrap_or(false)
}

#[async_trait]
impl DocumentRetriever for SledPublicationStore {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<RetrievedDocument>, StoreError> {
        let needle = query.to_lowercase();
        let limit = limit.min(MAX_RESULTS);
        let mut found = Vec::new();
        for entry in self.tree.iter() {
            if found.len() >= limit {
                break;
            }
            let (_k, v) = entry?;
            let doc: RetrievedDocument = serde_json::from_slice(&v)?;
            if matches(&doc, &needle) {
                found.push(doc);
            }
        }
        Ok(found)
    }
}

// ============================================================================
// HTTP Handlers
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub limit: Option<usize>,
}

pub async fn create_publication(
    State(state): State<Arc<AppState>>,
    Json(doc): Json<RetrievedDocument>,
) -> Result<(StatusCode, Json<CreatedResponse>), AppError> {
    if doc.title.trim().is_empty() {
        return Err(AppError::BadRequest("title is required".into()));
    }
    let id = state.publications.insert(&doc)?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

pub async fn search_publications(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<RetrievedDocument>>, AppError> {
    let limit = query.limit.unwrap_or(MAX_RESULTS);
    Ok(Json(state.retriever.search(&query.q, limit).await?))
}
