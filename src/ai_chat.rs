//! The chat function: ground the conversation in stored publications and relay
//! the model's streamed answer.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};

use crate::error::AppError;
use crate::models::{ChatRequest, ConversationMessage, RetrievedDocument, Role};
use crate::prompt::build_system_prompt;
use crate::publications::{DocumentRetriever, MAX_RESULTS};
use crate::AppState;

/// Content of the most recent user turn, if any.
pub fn latest_user_message(messages: &[ConversationMessage]) -> Option<&str> {
    messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.as_str())
}

/// Documents matching the query. Retrieval never fails the request: errors are
/// logged and yield no context.
pub async fn retrieve_context(
    retriever: &dyn DocumentRetriever,
    query: Option<&str>,
) -> Vec<RetrievedDocument> {
    let Some(query) = query.map(str::trim).filter(|q| !q.is_empty()) else {
        return Vec::new();
    };
    match retriever.search(query, MAX_RESULTS).await {
        Ok(docs) => docs,
        Err(e) => {
            tracing::warn!(error = %e, "publication search failed; answering without context");
            Vec::new()
        }
    }
}

pub async fn ai_chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    if !state.gateway.has_credential() {
        return Err(AppError::MissingCredential);
    }
    let Json(req) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let docs = retrieve_context(
        state.retriever.as_ref(),
        latest_user_message(&req.messages),
    )
    .await;
    let system_prompt = build_system_prompt(&docs);
    tracing::debug!(
        conversation = ?req.conversation_id,
        model = state.gateway.model(),
        documents = docs.len(),
        prompt_len = system_prompt.len(),
        "forwarding chat to gateway"
    );

    let upstream = state
        .gateway
        .stream_completion(&system_prompt, &req.messages)
        .await?;

    Ok((
        [(header::CONTENT_TYPE, "text/event-stream")],
        Body::from_stream(upstream.bytes_stream()),
    )
        .into_response())
}
