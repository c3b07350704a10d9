//! Data models for the starlab application.
//!
//! This module contains the serializable structures shared by the graph editor,
//! the chat pipeline and the HTTP API: graph documents, conversations and the
//! documents used to ground assistant answers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Knowledge Graph
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// JSON has no representation for NaN or infinity.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    /// Owned by the layout simulation; absent until the node has been placed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

impl GraphNode {
    /// Label as drawn on the canvas: the first 12 characters.
    pub fn short_label(&self) -> String {
        self.label.chars().take(12).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphLink {
    pub id: String,
    #[serde(rename = "sourceId", alias = "source")]
    pub source_id: String,
    #[serde(rename = "targetId", alias = "target")]
    pub target_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl GraphLink {
    pub fn touches(&self, node_id: &str) -> bool {
        self.source_id == node_id || self.target_id == node_id
    }
}

/// The unit of persistence for the graph editor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GraphDocument {
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub links: Vec<GraphLink>,
}

impl GraphDocument {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    /// Pretty-printed JSON in the export file format.
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphSummary {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredGraph {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub data: GraphDocument,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGraphRequest {
    pub title: String,
    pub data: GraphDocument,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: String,
}

// ============================================================================
// Conversations
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::System => write!(f, "system"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationMessage {
    pub role: Role,
    pub content: String,
}

impl ConversationMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    /// Empty in listings; filled when a single conversation is fetched.
    #[serde(default)]
    pub messages: Vec<ConversationMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversationRequest {
    pub owner_id: String,
    pub title: String,
}

// ============================================================================
// Chat Function Contract
// ============================================================================

/// Body of a request to the chat function.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub messages: Vec<ConversationMessage>,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

/// Error envelope returned by every failing API call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

// ============================================================================
// Retrieval
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedDocument {
    pub title: String,
    #[serde(rename = "abstract", default)]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_field_order_in_export() {
        let node = GraphNode {
            id: "n_1".into(),
            label: "Tardigrade".into(),
            node_type: Some("organism".into()),
            position: Some(Position::new(1.5, -2.0)),
        };
        let json = serde_json::to_string(&node).unwrap();
        assert_eq!(
            json,
            r#"{"id":"n_1","label":"Tardigrade","type":"organism","position":{"x":1.5,"y":-2.0}}"#
        );
    }

    #[test]
    fn test_optional_node_fields_omitted() {
        let node = GraphNode {
            id: "n_1".into(),
            label: "New node".into(),
            node_type: None,
            position: None,
        };
        assert_eq!(
            serde_json::to_string(&node).unwrap(),
            r#"{"id":"n_1","label":"New node"}"#
        );
    }

    #[test]
    fn test_link_accepts_legacy_source_target_names() {
        let link: GraphLink =
            serde_json::from_str(r#"{"id":"l1","source":"a","target":"b","label":""}"#).unwrap();
        assert_eq!(link.source_id, "a");
        assert_eq!(link.target_id, "b");
        assert_eq!(link.label.as_deref(), Some(""));

        let json = serde_json::to_string(&link).unwrap();
        assert!(json.contains(r#""sourceId":"a""#));
        assert!(json.contains(r#""targetId":"b""#));
    }

    #[test]
    fn test_short_label_counts_chars() {
        let node = GraphNode {
            id: "n".into(),
            label: "Microgravidade óssea".into(),
            node_type: None,
            position: None,
        };
        assert_eq!(node.short_label(), "Microgravida");
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let msg = ConversationMessage::assistant("hi");
        assert_eq!(
            serde_json::to_string(&msg).unwrap(),
            r#"{"role":"assistant","content":"hi"}"#
        );
    }

    #[test]
    fn test_chat_request_uses_camel_case() {
        let req: ChatRequest = serde_json::from_str(
            r#"{"messages":[{"role":"user","content":"x"}],"conversationId":"c1"}"#,
        )
        .unwrap();
        assert_eq!(req.conversation_id.as_deref(), Some("c1"));
        assert_eq!(req.messages[0].role, Role::User);
    }

    #[test]
    fn test_document_abstract_field_name() {
        let doc: RetrievedDocument = serde_json::from_str(
            r#"{"title":"T","abstract":"A","authors":["X"],"year":2020,"keywords":[]}"#,
        )
        .unwrap();
        assert_eq!(doc.abstract_text.as_deref(), Some("A"));
        assert_eq!(doc.year, Some(2020));
    }
}
