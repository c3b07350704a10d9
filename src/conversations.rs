//! Conversation persistence.
//!
//! Conversations live in the `chat:conversations` tree keyed by id. Messages live
//! in `chat:messages` under `<conversation id> \0 <sequence>`, where the sequence
//! is a big-endian id from `sled::Db::generate_id`, so a prefix scan returns a
//! conversation's turns in append order.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use url::Url;

use crate::error::{AppError, StoreError};
use crate::graph_store::{check_store_response, endpoint, generate_token};
use crate::models::{
    Conversation, ConversationMessage, CreateConversationRequest, CreatedResponse, Role,
};
use crate::AppState;

const CONVERSATIONS_TREE: &str = "chat:conversations";
const MESSAGES_TREE: &str = "chat:messages";

#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn create_conversation(&self, owner_id: &str, title: &str) -> Result<String, StoreError>;
    async fn append_message(
        &self,
        conversation_id: &str,
        role: Role,
        content: &str,
    ) -> Result<(), StoreError>;
    async fn list_messages(&self, conversation_id: &str)
        -> Result<Vec<ConversationMessage>, StoreError>;
    async fn list_conversations(&self, owner_id: &str) -> Result<Vec<Conversation>, StoreError>;
}

// ============================================================================
// Sled Store
// ============================================================================

#[derive(Clone)]
pub struct SledConversationStore {
    db: sled::Db,
    conversations: sled::Tree,
    messages: sled::Tree,
}

fn message_prefix(conversation_id: &str) -> Vec<u8> {
    let mut prefix = conversation_id.as_bytes().to_vec();
    prefix.push(0);
    prefix
}

impl SledConversationStore {
    pub fn open(db: &sled::Db) -> Result<Self, StoreError> {
        Ok(Self {
            db: db.clone(),
            conversations: db.open_tree(CONVERSATIONS_TREE)?,
            messages: db.open_tree(MESSAGES_TREE)?,
        })
    }

    pub fn get(&self, id: &str) -> Result<Conversation, StoreError> {
        let bytes = self
            .conversations
            .get(id.as_bytes())?
            .ok_or_else(|| StoreError::NotFound(format!("Conversation {}", id)))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// A conversation together with its messages.
    pub fn get_with_messages(&self, id: &str) -> Result<Conversation, StoreError> {
        let mut conversation = self.get(id)?;
        conversation.messages = self.messages_of(id)?;
        Ok(conversation)
    }

    fn messages_of(&self, id: &str) -> Result<Vec<ConversationMessage>, StoreError> {
        let mut messages = Vec::new();
        for entry in self.messages.scan_prefix(message_prefix(id)) {
            let (_k, v) = entry?;
            messages.push(serde_json::from_slice(&v)?);
        }
        Ok(messages)
    }
}

#[async_trait]
impl ConversationStore for SledConversationStore {
    async fn create_conversation(&self, owner_id: &str, title: &str) -> Result<String, StoreError> {
        let conversation = Conversation {
            id: generate_token(),
            owner_id: owner_id.to_string(),
            title: title.to_string(),
            created_at: Utc::now(),
            messages: Vec::new(),
        };
        self.conversations
            .insert(conversation.id.as_bytes(), serde_json::to_vec(&conversation)?)?;
        tracing::info!(id = %conversation.id, owner = %owner_id, "conversation created");
        Ok(conversation.id)
    }

    async fn append_message(
        &self,
        conversation_id: &str,
        role: Role,
        content: &str,
    ) -> Result<(), StoreError> {
        if !self.conversations.contains_key(conversation_id.as_bytes())? {
            return Err(StoreError::NotFound(format!("Conversation {}", conversation_id)));
        }
        let mut key = message_prefix(conversation_id);
        key.extend_from_slice(&self.db.generate_id()?.to_be_bytes());
        let message = ConversationMessage::new(role, content);
        self.messages.insert(key, serde_json::to_vec(&message)?)?;
        Ok(())
    }

    async fn list_messages(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<ConversationMessage>, StoreError> {
        if !self.conversations.contains_key(conversation_id.as_bytes())? {
            return Err(StoreError::NotFound(format!("Conversation {}", conversation_id)));
        }
        self.messages_of(conversation_id)
    }

    /// The owner's conversations, newest first, without messages.
    async fn list_conversations(&self, owner_id: &str) -> Result<Vec<Conversation>, StoreError> {
        let mut conversations = Vec::new();
        for entry in self.conversations.iter() {
            let (_k, v) = entry?;
            match serde_json::from_slice::<Conversation>(&v) {
                Ok(conversation) if conversation.owner_id == owner_id => {
                    conversations.push(conversation)
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "skipping unreadable conversation"),
            }
        }
        conversations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(conversations)
    }
}

// ============================================================================
// HTTP Client
// ============================================================================

/// Talks to the `/api/conversations` routes of a starlab server.
#[derive(Clone)]
pub struct HttpConversationStore {
    client: reqwest::Client,
    base: Url,
}

impl HttpConversationStore {
    pub fn new(base: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            base,
        }
    }

    fn messages_url(&self, conversation_id: &str) -> Result<Url, StoreError> {
        endpoint(&self.base, &["api", "conversations", conversation_id, "messages"])
    }
}

#[async_trait]
impl ConversationStore for HttpConversationStore {
    async fn create_conversation(&self, owner_id: &str, title: &str) -> Result<String, StoreError> {
        let body = CreateConversationRequest {
            owner_id: owner_id.to_string(),
            title: title.to_string(),
        };
        let response = self
            .client
            .post(endpoint(&self.base, &["api", "conversations"])?)
            .json(&body)
            .send()
            .await?;
        let created: CreatedResponse = check_store_response(response).await?.json().await?;
        Ok(created.id)
    }

    async fn append_message(
        &self,
        conversation_id: &str,
        role: Role,
        content: &str,
    ) -> Result<(), StoreError> {
        let response = self
            .client
            .post(self.messages_url(conversation_id)?)
            .json(&ConversationMessage::new(role, content))
            .send()
            .await?;
        check_store_response(response).await?;
        Ok(())
    }

    async fn list_messages(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<ConversationMessage>, StoreError> {
        let response = self
            .client
            .get(self.messages_url(conversation_id)?)
            .send()
            .await?;
        Ok(check_store_response(response).await?.json().await?)
    }

    async fn list_conversations(&self, owner_id: &str) -> Result<Vec<Conversation>, StoreError> {
        let response = self
            .client
            .get(endpoint(&self.base, &["api", "conversations"])?)
            .query(&[("ownerId", owner_id)])
            .send()
            .await?;
        Ok(check_store_response(response).await?.json().await?)
    }
}

// ============================================================================
// HTTP Handlers
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerQuery {
    pub owner_id: String,
}

pub async fn create_conversation(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateConversationRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), AppError> {
    if req.owner_id.trim().is_empty() {
        return Err(AppError::BadRequest("ownerId is required".into()));
    }
    let id = state
        .conversations
        .create_conversation(&req.owner_id, &req.title)
        .await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<Vec<Conversation>>, AppError> {
    Ok(Json(
        state.conversations.list_conversations(&query.owner_id).await?,
    ))
}

pub async fn get_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Conversation>, AppError> {
    Ok(Json(state.conversations.get_with_messages(&id)?))
}

pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ConversationMessage>>, AppError> {
    Ok(Json(state.conversations.list_messages(&id).await?))
}

pub async fn append_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(message): Json<ConversationMessage>,
) -> Result<StatusCode, AppError> {
    state
        .conversations
        .append_message(&id, message.role, &message.content)
        .await?;
    Ok(StatusCode::CREATED)
}
