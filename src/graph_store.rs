//! Graph persistence.
//!
//! Two collaborators back the editor:
//! - a local cache holding the working document under a storage key
//!   (`kg:cache` tree), overwritten wholesale on every change;
//! - a remote store of independent, titled snapshots (`kg:graphs` tree), reached
//!   either directly through sled on the server or over HTTP from a client.

use async_trait::async_trait;
use chrono::Utc;
use url::Url;

use crate::error::StoreError;
use crate::models::{
    CreateGraphRequest, CreatedResponse, ErrorBody, GraphDocument, GraphSummary, StoredGraph,
};

const CACHE_TREE: &str = "kg:cache";
const GRAPHS_TREE: &str = "kg:graphs";

// ============================================================================
// Collaborator Traits
// ============================================================================

/// Synchronous keyed cache for the editor's working document.
pub trait GraphCache: Send + Sync {
    fn save(&self, key: &str, doc: &GraphDocument) -> Result<(), StoreError>;
    fn load(&self, key: &str) -> Result<Option<GraphDocument>, StoreError>;
}

#[async_trait]
pub trait GraphRemote: Send + Sync {
    async fn create_graph(&self, title: &str, doc: &GraphDocument) -> Result<String, StoreError>;
    async fn list_graphs(&self) -> Result<Vec<GraphSummary>, StoreError>;
    async fn get_graph(&self, id: &str) -> Result<GraphDocument, StoreError>;
}

// ============================================================================
// Sled Helpers
// ============================================================================

/// Random 32-character hex identifier for stored records.
pub fn generate_token() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let bytes: [u8; 16] = rng.gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

// ============================================================================
// Local Cache
// ============================================================================

#[derive(Clone)]
pub struct SledGraphCache {
    tree: sled::Tree,
}

impl SledGraphCache {
    pub fn open(db: &sled::Db) -> Result<Self, StoreError> {
        Ok(Self {
            tree: db.open_tree(CACHE_TREE)?,
        })
    }
}

impl GraphCache for SledGraphCache {
    fn save(&self, key: &str, doc: &GraphDocument) -> Result<(), StoreError> {
        let json = serde_json::to_vec(doc)?;
        self.tree.insert(key.as_bytes(), json)?;
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<GraphDocument>, StoreError> {
        match self.tree.get(key.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

// ============================================================================
// Remote Store (sled)
// ============================================================================

#[derive(Clone)]
pub struct SledGraphStore {
    tree: sled::Tree,
}

impl SledGraphStore {
    pub fn open(db: &sled::Db) -> Result<Self, StoreError> {
        Ok(Self {
            tree: db.open_tree(GRAPHS_TREE)?,
        })
    }

    pub fn insert(&self, title: &str, data: &GraphDocument) -> Result<StoredGraph, StoreError> {
        let stored = StoredGraph {
            id: generate_token(),
            title: title.to_string(),
            created_at: Utc::now(),
            data: data.clone(),
        };
        let json = serde_json::to_vec(&stored)?;
        self.tree.insert(stored.id.as_bytes(), json)?;
        tracing::info!(id = %stored.id, title = %stored.title, "graph saved");
        Ok(stored)
    }

    /// All stored graphs, newest first.
    pub fn list(&self) -> Result<Vec<StoredGraph>, StoreError> {
        let mut graphs = Vec::new();
        for entry in self.tree.iter() {
            let (_k, v) = entry?;
            match serde_json::from_slice::<StoredGraph>(&v) {
                Ok(graph) => graphs.push(graph),
                Err(e) => tracing::warn!(error = %e, "skipping unreadable stored graph"),
            }
        }
        graphs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(graphs)
    }

    pub fn get(&self, id: &str) -> Result<StoredGraph, StoreError> {
        let bytes = self
            .tree
            .get(id.as_bytes())?
            .ok_or_else(|| StoreError::NotFound(format!("Graph {}", id)))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl GraphRemote for SledGraphStore {
    async fn create_graph(&self, title: &str, doc: &GraphDocument) -> Result<String, StoreError> {
        Ok(self.insert(title, doc)?.id)
    }

    async fn list_graphs(&self) -> Result<Vec<GraphSummary>, StoreError> {
        Ok(self
            .list()?
            .into_iter()
            .map(|g| GraphSummary {
                id: g.id,
                title: g.title,
            })
            .collect())
    }

    async fn get_graph(&self, id: &str) -> Result<GraphDocument, StoreError> {
        Ok(self.get(id)?.data)
    }
}

// ============================================================================
// Remote Store (HTTP)
// ============================================================================

/// Talks to the `/api/graphs` routes of a starlab server.
#[derive(Clone)]
pub struct HttpGraphClient {
    client: reqwest::Client,
    base: Url,
}

impl HttpGraphClient {
    pub fn new(base: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            base,
        }
    }
}

/// `base` extended by path segments. Each segment is percent-encoded, so ids
/// containing `/`, `?` or `#` stay inside a single segment.
pub(crate) fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, StoreError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| StoreError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Message of a `{"error": ...}` envelope, or the raw text when there is none.
fn error_message(text: String) -> String {
    serde_json::from_str::<ErrorBody>(&text)
        .map(|b| b.error)
        .unwrap_or(text)
}

/// Turn a non-success response into a `StoreError`, keeping the server's
/// error message when it sent the JSON envelope.
pub(crate) async fn check_store_response(
    response: reqwest::Response,
) -> Result<reqwest::Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let code = status.as_u16();
    let message = error_message(response.text().await.unwrap_or_default());
    if code == 404 {
        return Err(StoreError::NotFound(message));
    }
    Err(StoreError::Remote {
        status: code,
        message,
    })
}

#[async_trait]
impl GraphRemote for HttpGraphClient {
    async fn create_graph(&self, title: &str, doc: &GraphDocument) -> Result<String, StoreError> {
        let url = endpoint(&self.base, &["api", "graphs"])?;
        let body = CreateGraphRequest {
            title: title.to_string(),
            data: doc.clone(),
        };
        let response = self.client.post(url).json(&body).send().await?;
        let created: CreatedResponse = check_store_response(response).await?.json().await?;
        Ok(created.id)
    }

    async fn list_graphs(&self) -> Result<Vec<GraphSummary>, StoreError> {
        let url = endpoint(&self.base, &["api", "graphs"])?;
        let response = self.client.get(url).send().await?;
        Ok(check_store_response(response).await?.json().await?)
    }

    async fn get_graph(&self, id: &str) -> Result<GraphDocument, StoreError> {
        let url = endpoint(&self.base, &["api", "graphs", id])?;
        let response = self.client.get(url).send().await?;
        let stored: StoredGraph = check_store_response(response).await?.json().await?;
        Ok(stored.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GraphLink, GraphNode, Position};

    fn temp_db() -> sled::Db {
        sled::Config::new().temporary(true).open().unwrap()
    }

    fn sample_doc() -> GraphDocument {
        GraphDocument {
            nodes: vec![
                GraphNode {
                    id: "n_a".into(),
                    label: "Arabidopsis".into(),
                    node_type: Some("organism".into()),
                    position: Some(Position::new(10.0, 20.0)),
                },
                GraphNode {
                    id: "n_b".into(),
                    label: "Microgravity".into(),
                    node_type: None,
                    position: None,
                },
            ],
            links: vec![GraphLink {
                id: "link_1".into(),
                source_id: "n_a".into(),
                target_id: "n_b".into(),
                label: Some("exposed to".into()),
            }],
        }
    }

    #[test]
    fn test_cache_round_trip_and_overwrite() {
        let db = temp_db();
        let cache = SledGraphCache::open(&db).unwrap();
        assert!(cache.load("starlab_kg_v1").unwrap().is_none());

        cache.save("starlab_kg_v1", &sample_doc()).unwrap();
        assert_eq!(cache.load("starlab_kg_v1").unwrap(), Some(sample_doc()));

        cache.save("starlab_kg_v1", &GraphDocument::default()).unwrap();
        assert_eq!(
            cache.load("starlab_kg_v1").unwrap(),
            Some(GraphDocument::default())
        );
    }

    #[test]
    fn test_cache_keys_are_isolated() {
        let db = temp_db();
        let cache = SledGraphCache::open(&db).unwrap();
        cache.save("one", &sample_doc()).unwrap();
        assert!(cache.load("two").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remote_create_list_get() {
        let db = temp_db();
        let store = SledGraphStore::open(&db).unwrap();
        let id = store.create_graph("My graph", &sample_doc()).await.unwrap();

        let list = store.list_graphs().await.unwrap();
        assert_eq!(
            list,
            vec![GraphSummary {
                id: id.clone(),
                title: "My graph".into()
            }]
        );
        assert_eq!(store.get_graph(&id).await.unwrap(), sample_doc());
    }

    #[tokio::test]
    async fn test_remote_unknown_id() {
        let db = temp_db();
        let store = SledGraphStore::open(&db).unwrap();
        let err = store.get_graph("missing").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn test_endpoint_escapes_ids() {
        let base = Url::parse("http://h/").unwrap();
        let url = endpoint(&base, &["api", "graphs", "abc?x=1"]).unwrap();
        assert_eq!(url.as_str(), "http://h/api/graphs/abc%3Fx=1");
        assert!(url.query().is_none());

        let url = endpoint(&base, &["api", "graphs", "../conversations"]).unwrap();
        assert_eq!(url.as_str(), "http://h/api/graphs/..%2Fconversations");

        let url = endpoint(&base, &["api", "graphs", "a#b"]).unwrap();
        assert_eq!(url.as_str(), "http://h/api/graphs/a%23b");
        assert!(url.fragment().is_none());

        let nested = Url::parse("http://h/starlab/").unwrap();
        let url = endpoint(&nested, &["api", "graphs"]).unwrap();
        assert_eq!(url.as_str(), "http://h/starlab/api/graphs");
    }

    #[test]
    fn test_error_message_unwraps_envelope() {
        assert_eq!(
            error_message(r#"{"error":"Graph x not found"}"#.to_string()),
            "Graph x not found"
        );
        assert_eq!(error_message("plain".to_string()), "plain");
    }

    #[test]
    fn test_generate_token_shape() {
        let token = generate_token();
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_token());
    }
}
