//! Interactive knowledge-graph editor session.
//!
//! `GraphEditor` owns a `GraphDocument`, the force layout that places its nodes,
//! and the interaction state of the canvas: a single-selection cursor and the
//! edge-pending mode used to draw links. Every mutation writes the whole document
//! to the local cache under the editor's storage key and fires the optional
//! change callback. Remote save/list/load go through a `GraphRemote`; their
//! failures become notifications instead of errors.

use rand::Rng;
use std::sync::Arc;

use crate::graph_store::{GraphCache, GraphRemote};
use crate::layout::{ForceLayout, Scene, ViewTransform, DRAG_ALPHA_TARGET};
use crate::models::{GraphDocument, GraphLink, GraphNode, GraphSummary, Position};
use crate::notify::{Notice, Notifier};

pub const DEFAULT_NODE_LABEL: &str = "New node";
pub const DEFAULT_WIDTH: f64 = 900.0;
pub const DEFAULT_HEIGHT: f64 = 600.0;

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

pub type ChangeCallback = Box<dyn FnMut(&GraphDocument) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct EditorConfig {
    /// Cache slot for this editor instance.
    pub storage_key: String,
    pub width: f64,
    pub height: f64,
}

impl EditorConfig {
    pub fn new(storage_key: impl Into<String>) -> Self {
        Self {
            storage_key: storage_key.into(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

/// What a click on a node did.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeClick {
    /// Selection toggled; holds the new selection.
    Selected(Option<String>),
    /// Edge-pending mode committed a link with this id.
    Linked(String),
    /// Edge-pending mode aborted without creating a link.
    Cancelled,
}

fn uid(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..7)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("{}{}", prefix, suffix)
}

pub struct GraphEditor {
    config: EditorConfig,
    doc: GraphDocument,
    layout: ForceLayout,
    view: ViewTransform,
    selected: Option<String>,
    edge_from: Option<String>,
    cache: Arc<dyn GraphCache>,
    remote: Option<Arc<dyn GraphRemote>>,
    notifier: Arc<dyn Notifier>,
    on_change: Option<ChangeCallback>,
}

impl GraphEditor {
    /// Open an editor, restoring the document cached under the storage key or
    /// falling back to `initial` when the cache slot is empty or unreadable.
    pub fn new(
        config: EditorConfig,
        cache: Arc<dyn GraphCache>,
        notifier: Arc<dyn Notifier>,
        initial: GraphDocument,
    ) -> Self {
        let doc = match cache.load(&config.storage_key) {
            Ok(Some(doc)) => doc,
            Ok(None) => initial,
            Err(e) => {
                tracing::warn!(key = %config.storage_key, error = %e, "cached graph unreadable");
                initial
            }
        };
        let mut layout = ForceLayout::new(config.width, config.height);
        layout.sync(&doc);

        let mut editor = Self {
            config,
            doc,
            layout,
            view: ViewTransform::default(),
            selected: None,
            edge_from: None,
            cache,
            remote: None,
            notifier,
            on_change: None,
        };
        editor.write_back_positions();
        editor
    }

    pub fn with_remote(mut self, remote: Arc<dyn GraphRemote>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn on_change(mut self, callback: ChangeCallback) -> Self {
        self.on_change = Some(callback);
        self
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn document(&self) -> &GraphDocument {
        &self.doc
    }

    pub fn storage_key(&self) -> &str {
        &self.config.storage_key
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn edge_pending_from(&self) -> Option<&str> {
        self.edge_from.as_deref()
    }

    pub fn layout(&self) -> &ForceLayout {
        &self.layout
    }

    pub fn view(&self) -> &ViewTransform {
        &self.view
    }

    pub fn scene(&self) -> Scene {
        Scene::build(&self.doc, &self.layout, &self.view, self.selected())
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    fn fresh_id(&self, prefix: &str) -> String {
        loop {
            let id = uid(prefix);
            let taken = self.doc.nodes.iter().any(|n| n.id == id)
                || self.doc.links.iter().any(|l| l.id == id);
            if !taken {
                return id;
            }
        }
    }

    /// Add a node at a graph-space position. A non-finite position leaves the
    /// node unplaced and the layout picks a spot for it.
    pub fn create_node(&mut self, position: Position) -> String {
        let id = self.fresh_id("n_");
        self.doc.nodes.push(GraphNode {
            id: id.clone(),
            label: DEFAULT_NODE_LABEL.to_string(),
            node_type: None,
            position: Some(position).filter(Position::is_finite),
        });
        self.commit();
        id
    }

    /// Canvas double-click: create a node under the pointer.
    pub fn double_click(&mut self, screen: Position) -> String {
        let at = self.view.invert(screen);
        self.create_node(at)
    }

    /// Add a link. Self-loops and links to unknown nodes are rejected; repeated
    /// calls for the same pair create parallel links.
    pub fn create_link(&mut self, source_id: &str, target_id: &str) -> Option<String> {
        if source_id == target_id
            || !self.doc.contains_node(source_id)
            || !self.doc.contains_node(target_id)
        {
            return None;
        }
        let id = self.fresh_id("link_");
        self.doc.links.push(GraphLink {
            id: id.clone(),
            source_id: source_id.to_string(),
            target_id: target_id.to_string(),
            label: None,
        });
        self.commit();
        Some(id)
    }

    /// Toggle selection of a node. Losing the selection aborts edge-pending mode.
    pub fn select_node(&mut self, id: &str) {
        if !self.doc.contains_node(id) {
            return;
        }
        if self.selected.as_deref() == Some(id) {
            self.clear_selection();
        } else {
            self.selected = Some(id.to_string());
            self.edge_from = None;
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
        self.edge_from = None;
    }

    /// Enter edge-pending mode anchored at the selected node.
    pub fn begin_edge_from_selection(&mut self) -> bool {
        match &self.selected {
            Some(id) => {
                self.edge_from = Some(id.clone());
                true
            }
            None => false,
        }
    }

    pub fn click_node(&mut self, id: &str) -> NodeClick {
        if let Some(anchor) = self.edge_from.take() {
            if anchor == id {
                return NodeClick::Cancelled;
            }
            return match self.create_link(&anchor, id) {
                Some(link_id) => NodeClick::Linked(link_id),
                None => NodeClick::Cancelled,
            };
        }
        self.select_node(id);
        NodeClick::Selected(self.selected.clone())
    }

    /// Remove the selected node together with every link touching it.
    pub fn delete_selected(&mut self) -> bool {
        let Some(id) = self.selected.take() else {
            return false;
        };
        self.edge_from = None;
        self.doc.links.retain(|l| !l.touches(&id));
        self.doc.nodes.retain(|n| n.id != id);
        self.commit();
        true
    }

    pub fn rename_selected(&mut self, label: &str) -> bool {
        let Some(id) = self.selected.as_deref() else {
            return false;
        };
        let Some(node) = self.doc.nodes.iter_mut().find(|n| n.id == id) else {
            return false;
        };
        node.label = label.to_string();
        self.commit();
        true
    }

    /// Remove all nodes. Links are left in place; see [`GraphEditor::clear_links`].
    pub fn clear_nodes(&mut self) {
        self.doc.nodes.clear();
        self.clear_selection();
        self.commit();
    }

    pub fn clear_links(&mut self) {
        self.doc.links.clear();
        self.commit();
    }

    /// Pretty-printed JSON snapshot for download.
    pub fn export_document(&self) -> serde_json::Result<String> {
        self.doc.to_pretty_json()
    }

    /// Replace the whole graph. References are not validated.
    pub fn import_document(&mut self, mut doc: GraphDocument) {
        for node in &mut doc.nodes {
            node.position = node.position.filter(Position::is_finite);
        }
        self.doc = doc;
        self.clear_selection();
        self.commit();
    }

    /// Import an uploaded file; an unparsable file is reported, not applied.
    pub fn import_json(&mut self, json: &str) -> bool {
        match GraphDocument::from_json(json) {
            Ok(doc) => {
                self.import_document(doc);
                true
            }
            Err(e) => {
                self.notifier
                    .notify(Notice::error("Invalid file", format!("Could not read graph: {}", e)));
                false
            }
        }
    }

    fn commit(&mut self) {
        self.layout.sync(&self.doc);
        self.layout.reheat();
        self.write_back_positions();
        self.persist();
    }

    fn persist(&mut self) {
        if let Err(e) = self.cache.save(&self.config.storage_key, &self.doc) {
            tracing::warn!(key = %self.config.storage_key, error = %e, "failed to cache graph");
        }
        if let Some(callback) = self.on_change.as_mut() {
            callback(&self.doc);
        }
    }

    fn write_back_positions(&mut self) {
        for node in &mut self.doc.nodes {
            if let Some(pos) = self.layout.position(&node.id) {
                node.position = Some(pos);
            }
        }
    }

    // ------------------------------------------------------------------------
    // Simulation & Gestures
    // ------------------------------------------------------------------------

    /// Step the layout by `dt` ticks and copy positions into the document.
    pub fn advance(&mut self, dt: f64) -> bool {
        let moved = self.layout.advance(dt);
        if moved {
            self.write_back_positions();
        }
        moved
    }

    pub fn drag_start(&mut self, id: &str) -> bool {
        let Some(pos) = self.layout.position(id) else {
            return false;
        };
        self.layout.set_alpha_target(DRAG_ALPHA_TARGET);
        self.layout.pin(id, pos)
    }

    pub fn drag_move(&mut self, id: &str, screen: Position) -> bool {
        let at = self.view.invert(screen);
        if !at.is_finite() {
            return false;
        }
        let pinned = self.layout.is_pinned(id) && self.layout.pin(id, at);
        if pinned {
            self.write_back_positions();
        }
        pinned
    }

    pub fn drag_end(&mut self, id: &str) -> bool {
        self.layout.set_alpha_target(0.0);
        let released = self.layout.unpin(id);
        if released {
            self.write_back_positions();
            self.persist();
        }
        released
    }

    pub fn zoom_at(&mut self, anchor: Position, factor: f64) {
        self.view.zoom_at(anchor, factor);
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.view.pan_by(dx, dy);
    }

    // ------------------------------------------------------------------------
    // Remote Persistence
    // ------------------------------------------------------------------------

    fn remote_or_notify(&self) -> Option<Arc<dyn GraphRemote>> {
        if self.remote.is_none() {
            self.notifier
                .notify(Notice::error("Error", "Remote graph storage is not configured"));
        }
        self.remote.clone()
    }

    pub async fn save_remote(&self, title: &str) -> Option<String> {
        let title = title.trim();
        if title.is_empty() {
            return None;
        }
        let remote = self.remote_or_notify()?;
        match remote.create_graph(title, &self.doc).await {
            Ok(id) => {
                self.notifier
                    .notify(Notice::info("Saved", format!("Saved with id: {}", id)));
                Some(id)
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to save graph");
                self.notifier
                    .notify(Notice::error("Error", format!("Could not save graph: {}", e)));
                None
            }
        }
    }

    pub async fn list_remote(&self) -> Vec<GraphSummary> {
        let Some(remote) = self.remote_or_notify() else {
            return Vec::new();
        };
        match remote.list_graphs().await {
            Ok(list) => list,
            Err(e) => {
                tracing::error!(error = %e, "failed to list graphs");
                self.notifier
                    .notify(Notice::error("Error", format!("Could not list graphs: {}", e)));
                Vec::new()
            }
        }
    }

    pub async fn load_remote(&mut self, id: &str) -> bool {
        let Some(remote) = self.remote_or_notify() else {
            return false;
        };
        match remote.get_graph(id).await {
            Ok(doc) => {
                self.import_document(doc);
                true
            }
            Err(e) => {
                tracing::error!(id, error = %e, "failed to load graph");
                self.notifier
                    .notify(Notice::error("Error", "Error loading graph"));
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_store::{SledGraphCache, SledGraphStore};
    use crate::notify::MemoryNotifier;
    use std::sync::Mutex;

    struct Fixture {
        db: sled::Db,
        cache: Arc<SledGraphCache>,
        notifier: Arc<MemoryNotifier>,
    }

    fn fixture() -> Fixture {
        let db = sled::Config::new().temporary(true).open().unwrap();
        let cache = Arc::new(SledGraphCache::open(&db).unwrap());
        Fixture {
            db,
            cache,
            notifier: Arc::new(MemoryNotifier::new()),
        }
    }

    fn editor(fx: &Fixture) -> GraphEditor {
        GraphEditor::new(
            EditorConfig::new("test_kg"),
            fx.cache.clone(),
            fx.notifier.clone(),
            GraphDocument::default(),
        )
    }

    fn three_nodes(ed: &mut GraphEditor) -> (String, String, String) {
        let a = ed.create_node(Position::new(100.0, 100.0));
        let b = ed.create_node(Position::new(300.0, 100.0));
        let c = ed.create_node(Position::new(200.0, 300.0));
        (a, b, c)
    }

    #[test]
    fn test_create_node_defaults() {
        let fx = fixture();
        let mut ed = editor(&fx);
        let id = ed.create_node(Position::new(10.0, 20.0));
        assert!(id.starts_with("n_"));
        assert_eq!(id.len(), 9);
        let node = ed.document().node(&id).unwrap();
        assert_eq!(node.label, DEFAULT_NODE_LABEL);
        assert_eq!(node.position, Some(Position::new(10.0, 20.0)));
    }

    #[test]
    fn test_delete_cascades_links() {
        let fx = fixture();
        let mut ed = editor(&fx);
        let (a, b, c) = three_nodes(&mut ed);
        ed.create_link(&a, &b).unwrap();
        ed.create_link(&c, &a).unwrap();
        let bc = ed.create_link(&b, &c).unwrap();

        ed.select_node(&a);
        assert!(ed.delete_selected());

        let doc = ed.document();
        assert_eq!(doc.nodes.len(), 2);
        assert_eq!(doc.links.len(), 1);
        assert_eq!(doc.links[0].id, bc);
        for link in &doc.links {
            assert!(doc.contains_node(&link.source_id));
            assert!(doc.contains_node(&link.target_id));
        }
        assert!(ed.selected().is_none());
    }

    #[test]
    fn test_delete_without_selection_is_noop() {
        let fx = fixture();
        let mut ed = editor(&fx);
        three_nodes(&mut ed);
        assert!(!ed.delete_selected());
        assert_eq!(ed.document().nodes.len(), 3);
    }

    #[test]
    fn test_select_twice_clears() {
        let fx = fixture();
        let mut ed = editor(&fx);
        let (a, b, _) = three_nodes(&mut ed);
        ed.select_node(&a);
        assert_eq!(ed.selected(), Some(a.as_str()));
        ed.select_node(&b);
        assert_eq!(ed.selected(), Some(b.as_str()));
        ed.select_node(&b);
        assert_eq!(ed.selected(), None);
    }

    #[test]
    fn test_edge_mode_commits_link() {
        let fx = fixture();
        let mut ed = editor(&fx);
        let (a, b, _) = three_nodes(&mut ed);
        assert_eq!(ed.click_node(&a), NodeClick::Selected(Some(a.clone())));
        assert!(ed.begin_edge_from_selection());
        match ed.click_node(&b) {
            NodeClick::Linked(id) => assert!(id.starts_with("link_")),
            other => panic!("expected link, got {:?}", other),
        }
        assert!(ed.edge_pending_from().is_none());
        let link = &ed.document().links[0];
        assert_eq!((link.source_id.as_str(), link.target_id.as_str()), (a.as_str(), b.as_str()));
    }

    #[test]
    fn test_edge_mode_cancelled_by_anchor_click() {
        let fx = fixture();
        let mut ed = editor(&fx);
        let (a, _, _) = three_nodes(&mut ed);
        ed.click_node(&a);
        ed.begin_edge_from_selection();
        assert_eq!(ed.click_node(&a), NodeClick::Cancelled);
        assert!(ed.edge_pending_from().is_none());
        assert!(ed.document().links.is_empty());
    }

    #[test]
    fn test_edge_mode_requires_selection_and_aborts_on_deselect() {
        let fx = fixture();
        let mut ed = editor(&fx);
        let (a, _, _) = three_nodes(&mut ed);
        assert!(!ed.begin_edge_from_selection());

        ed.select_node(&a);
        ed.begin_edge_from_selection();
        ed.clear_selection();
        assert!(ed.edge_pending_from().is_none());
    }

    #[test]
    fn test_selecting_another_node_leaves_edge_mode() {
        let fx = fixture();
        let mut ed = editor(&fx);
        let (a, b, c) = three_nodes(&mut ed);

        ed.select_node(&a);
        ed.begin_edge_from_selection();
        ed.select_node(&b);
        assert!(ed.edge_pending_from().is_none());

        assert_eq!(ed.click_node(&c), NodeClick::Selected(Some(c.clone())));
        assert!(ed.document().links.is_empty());
    }

    #[test]
    fn test_non_finite_input_keeps_cache_loadable() {
        let fx = fixture();
        let mut ed = editor(&fx);
        let (a, _, _) = three_nodes(&mut ed);
        let far = ed.create_node(Position::new(f64::INFINITY, 0.0));
        ed.double_click(Position::new(f64::NAN, 10.0));
        ed.zoom_at(Position::new(0.0, 0.0), f64::NAN);
        ed.pan_by(f64::INFINITY, 0.0);
        ed.drag_start(&a);
        assert!(!ed.drag_move(&a, Position::new(f64::NEG_INFINITY, 1.0)));
        ed.drag_end(&a);
        for _ in 0..5 {
            ed.advance(1.0);
        }

        assert!(ed
            .document()
            .nodes
            .iter()
            .all(|n| n.position.map(|p| p.is_finite()).unwrap_or(false)));
        let exported = ed.export_document().unwrap();
        assert_eq!(&GraphDocument::from_json(&exported).unwrap(), ed.document());

        let reopened = editor(&fx);
        assert_eq!(reopened.document().nodes.len(), 5);
        assert!(reopened.document().contains_node(&far));
    }

    #[test]
    fn test_import_drops_non_finite_positions() {
        let fx = fixture();
        let mut ed = editor(&fx);
        let mut doc = GraphDocument::default();
        doc.nodes.push(GraphNode {
            id: "n_x".into(),
            label: "Spore".into(),
            node_type: None,
            position: Some(Position::new(f64::NAN, 3.0)),
        });
        ed.import_document(doc);
        let placed = ed.document().node("n_x").unwrap().position.unwrap();
        assert!(placed.is_finite());
        assert!(fx.cache.load("test_kg").unwrap().is_some());
    }

    #[test]
    fn test_link_policy_rejects_self_loops_and_allows_parallel_links() {
        let fx = fixture();
        let mut ed = editor(&fx);
        let (a, b, _) = three_nodes(&mut ed);

        assert!(ed.create_link(&a, &a).is_none());
        assert!(ed.create_link(&a, "ghost").is_none());

        let first = ed.create_link(&a, &b).unwrap();
        let second = ed.create_link(&a, &b).unwrap();
        assert_ne!(first, second);
        assert_eq!(ed.document().links.len(), 2);
    }

    #[test]
    fn test_rename_selected_only() {
        let fx = fixture();
        let mut ed = editor(&fx);
        let (a, b, _) = three_nodes(&mut ed);
        assert!(!ed.rename_selected("nothing selected"));
        ed.select_node(&b);
        assert!(ed.rename_selected("Bone loss"));
        assert_eq!(ed.document().node(&b).unwrap().label, "Bone loss");
        assert_eq!(ed.document().node(&a).unwrap().label, DEFAULT_NODE_LABEL);
    }

    #[test]
    fn test_clear_operations_are_independent() {
        let fx = fixture();
        let mut ed = editor(&fx);
        let (a, b, _) = three_nodes(&mut ed);
        ed.create_link(&a, &b);

        ed.clear_nodes();
        assert!(ed.document().nodes.is_empty());
        assert_eq!(ed.document().links.len(), 1);

        ed.clear_links();
        assert!(ed.document().links.is_empty());
    }

    #[test]
    fn test_export_import_round_trip() {
        let fx = fixture();
        let mut ed = editor(&fx);
        let (a, b, c) = three_nodes(&mut ed);
        ed.create_link(&a, &b);
        ed.create_link(&b, &c);
        ed.select_node(&c);
        ed.rename_selected("Radiação");
        for _ in 0..20 {
            ed.advance(1.0);
        }

        let exported = ed.export_document().unwrap();
        assert!(exported.contains("\n  \"nodes\": ["));
        let before = ed.document().clone();

        let mut other = GraphEditor::new(
            EditorConfig::new("other_kg"),
            fx.cache.clone(),
            fx.notifier.clone(),
            GraphDocument::default(),
        );
        assert!(other.import_json(&exported));
        assert_eq!(other.document(), &before);
    }

    #[test]
    fn test_import_does_not_validate_references() {
        let fx = fixture();
        let mut ed = editor(&fx);
        let doc: GraphDocument = serde_json::from_str(
            r#"{"nodes":[{"id":"a","label":"A"}],"links":[{"id":"l","sourceId":"a","targetId":"gone"}]}"#,
        )
        .unwrap();
        ed.import_document(doc);
        assert_eq!(ed.document().links.len(), 1);
        assert!(ed.document().nodes[0].position.is_some());
    }

    #[test]
    fn test_invalid_import_notifies() {
        let fx = fixture();
        let mut ed = editor(&fx);
        let a = ed.create_node(Position::new(0.0, 0.0));
        assert!(!ed.import_json("not json"));
        assert!(ed.document().contains_node(&a));
        assert_eq!(fx.notifier.errors()[0].title, "Invalid file");
    }

    #[test]
    fn test_every_change_hits_cache_and_callback() {
        let fx = fixture();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut ed = editor(&fx).on_change(Box::new(move |doc| {
            sink.lock().unwrap().push(doc.nodes.len());
        }));

        let a = ed.create_node(Position::new(0.0, 0.0));
        ed.create_node(Position::new(50.0, 0.0));
        ed.select_node(&a);
        ed.delete_selected();

        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 1]);
        let cached = fx.cache.load("test_kg").unwrap().unwrap();
        assert_eq!(&cached, ed.document());
    }

    #[test]
    fn test_restores_from_cache_on_open() {
        let fx = fixture();
        let id = {
            let mut ed = editor(&fx);
            ed.create_node(Position::new(5.0, 5.0))
        };
        let reopened = editor(&fx);
        assert!(reopened.document().contains_node(&id));

        let isolated = GraphEditor::new(
            EditorConfig::new("another_key"),
            fx.cache.clone(),
            fx.notifier.clone(),
            GraphDocument::default(),
        );
        assert!(isolated.document().nodes.is_empty());
    }

    #[test]
    fn test_double_click_uses_view_transform() {
        let fx = fixture();
        let mut ed = editor(&fx);
        ed.pan_by(100.0, 50.0);
        ed.zoom_at(Position::new(100.0, 50.0), 2.0);
        let id = ed.double_click(Position::new(300.0, 250.0));
        assert_eq!(
            ed.document().node(&id).unwrap().position,
            Some(Position::new(100.0, 100.0))
        );
    }

    #[test]
    fn test_drag_pins_and_releases() {
        let fx = fixture();
        let mut ed = editor(&fx);
        let (a, b, _) = three_nodes(&mut ed);
        ed.create_link(&a, &b);

        assert!(ed.drag_start(&a));
        assert!(ed.drag_move(&a, Position::new(42.0, 24.0)));
        for _ in 0..10 {
            ed.advance(1.0);
        }
        assert_eq!(
            ed.document().node(&a).unwrap().position,
            Some(Position::new(42.0, 24.0))
        );

        assert!(ed.drag_end(&a));
        assert!(!ed.layout().is_pinned(&a));
        assert!(!ed.drag_move(&a, Position::new(0.0, 0.0)));
    }

    #[test]
    fn test_simulation_runs_after_mutation() {
        let fx = fixture();
        let mut ed = editor(&fx);
        ed.create_node(Position::new(450.0, 300.0));
        ed.create_node(Position::new(451.0, 300.0));
        let before = ed.document().nodes[1].position.unwrap();
        assert!(ed.advance(1.0));
        let after = ed.document().nodes[1].position.unwrap();
        assert_ne!(before, after);
    }

    #[tokio::test]
    async fn test_remote_save_list_load() {
        let fx = fixture();
        let store = Arc::new(SledGraphStore::open(&fx.db).unwrap());
        let mut ed = editor(&fx).with_remote(store.clone());
        let (a, b, _) = three_nodes(&mut ed);
        ed.create_link(&a, &b);
        let snapshot = ed.document().clone();

        let id = ed.save_remote("Space biology").await.unwrap();
        let list = ed.list_remote().await;
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].title, "Space biology");

        ed.clear_links();
        ed.clear_nodes();
        assert!(ed.load_remote(&id).await);
        assert_eq!(ed.document().links, snapshot.links);
        assert_eq!(ed.document().nodes.len(), 3);
    }

    #[tokio::test]
    async fn test_remote_failures_become_notices() {
        let fx = fixture();
        let ed = editor(&fx);
        assert!(ed.save_remote("no remote").await.is_none());
        assert_eq!(fx.notifier.errors().len(), 1);

        let store = Arc::new(SledGraphStore::open(&fx.db).unwrap());
        let mut ed = editor(&fx).with_remote(store);
        assert!(!ed.load_remote("missing").await);
        let errors = fx.notifier.errors();
        assert_eq!(errors.last().unwrap().description, "Error loading graph");
    }

    #[tokio::test]
    async fn test_blank_title_skips_save() {
        let fx = fixture();
        let store = Arc::new(SledGraphStore::open(&fx.db).unwrap());
        let ed = editor(&fx).with_remote(store.clone());
        assert!(ed.save_remote("   ").await.is_none());
        assert!(store.list().unwrap().is_empty());
    }
}
