//! HTTP routes for saved knowledge-graph snapshots.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::error::AppError;
use crate::models::{CreateGraphRequest, CreatedResponse, GraphSummary, StoredGraph};
use crate::AppState;

pub async fn create_graph(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateGraphRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), AppError> {
    let title = req.title.trim();
    if title.is_empty() {
        return Err(AppError::BadRequest("title is required".into()));
    }
    let stored = state.graphs.insert(title, &req.data)?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id: stored.id })))
}

pub async fn list_graphs(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<GraphSummary>>, AppError> {
    let summaries = state
        .graphs
        .list()?
        .into_iter()
        .map(|g| GraphSummary {
            id: g.id,
            title: g.title,
        })
        .collect();
    Ok(Json(summaries))
}

pub async fn get_graph(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<StoredGraph>, AppError> {
    Ok(Json(state.graphs.get(&id)?))
}
