//! Canonical node/edge collections and their mutation primitives.
//!
//! The store applies changes without knowing why they happen: history, selection and connect
//! mode live in [`crate::Editor`]. Removing a node here never touches edges; callers that want
//! cascading removal use [`GraphStore::incident_edge_ids`].

use crate::config::EditorConfig;
use crate::model::{Edge, EdgeDataPatch, Node, NodeDataPatch, Position, SignalData, Viewport};
use indexmap::IndexSet;
use rand::Rng;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Length of generated node ids (hex characters taken from a v4 UUID).
const NODE_ID_LEN: usize = 9;

/// Where a new node goes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    At(Position),
    /// Near the top-left of the visible area, with random jitter.
    Around(Viewport),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

/// One entry of a batched node update coming from the rendering surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeChange {
    Add {
        item: Node,
    },
    Position {
        id: String,
        #[serde(default)]
        position: Option<Position>,
        #[serde(default)]
        dragging: Option<bool>,
    },
    Dimensions {
        id: String,
        #[serde(default)]
        dimensions: Option<Dimensions>,
    },
    Select {
        id: String,
        selected: bool,
    },
    Remove {
        id: String,
    },
    Replace {
        id: String,
        item: Node,
    },
}

impl NodeChange {
    pub fn is_remove(&self) -> bool {
        matches!(self, NodeChange::Remove { .. })
    }

    fn target_id(&self) -> Option<&str> {
        match self {
            NodeChange::Add { .. } => None,
            NodeChange::Position { id, .. }
            | NodeChange::Dimensions { id, .. }
            | NodeChange::Select { id, .. }
            | NodeChange::Remove { id }
            | NodeChange::Replace { id, .. } => Some(id),
        }
    }
}

/// One entry of a batched edge update coming from the rendering surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EdgeChange {
    Add { item: Edge },
    Select { id: String, selected: bool },
    Remove { id: String },
    Replace { id: String, item: Edge },
}

impl EdgeChange {
    pub fn is_remove(&self) -> bool {
        matches!(self, EdgeChange::Remove { .. })
    }

    fn target_id(&self) -> Option<&str> {
        match self {
            EdgeChange::Add { .. } => None,
            EdgeChange::Select { id, .. }
            | EdgeChange::Remove { id }
            | EdgeChange::Replace { id, .. } => Some(id),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphStore {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    pub fn into_parts(self) -> (Vec<Node>, Vec<Edge>) {
        (self.nodes, self.edges)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    pub fn contains_edge(&self, id: &str) -> bool {
        self.edge(id).is_some()
    }

    /// Creates a signal node with a fresh id and default data, then appends it.
    ///
    /// `initial` is merged over the defaults (`config.default_label`, empty content,
    /// `config.default_color`).
    pub fn add_node(
        &mut self,
        rng: &mut impl Rng,
        config: &EditorConfig,
        placement: Placement,
        initial: &NodeDataPatch,
    ) -> &Node {
        let id = self.fresh_node_id(rng);
        let position = match placement {
            Placement::At(position) => position,
            Placement::Around(viewport) => spawn_position(rng, config, &viewport),
        };
        let mut data = SignalData {
            label: config.default_label.clone(),
            content: Some(String::new()),
            image: None,
            color: Some(config.default_color.clone()),
            ..SignalData::default()
        };
        data.apply(initial);

        tracing::debug!(node_id = %id, x = position.x, y = position.y, "add node");
        self.nodes.push(Node::signal(id, position, data));
        &self.nodes[self.nodes.len() - 1]
    }

    pub fn insert_node(&mut self, node: Node) {
        tracing::debug!(node_id = %node.id, "insert node");
        self.nodes.push(node);
    }

    pub fn insert_edge(&mut self, edge: Edge) {
        tracing::debug!(
            edge_id = %edge.id,
            source = %edge.source,
            target = %edge.target,
            "insert edge"
        );
        self.edges.push(edge);
    }

    /// Removes the node with `id`. Edges referencing it are left in place.
    pub fn remove_node(&mut self, id: &str) -> Option<Node> {
        let idx = self.nodes.iter().position(|n| n.id == id)?;
        tracing::debug!(node_id = %id, "remove node");
        Some(self.nodes.remove(idx))
    }

    pub fn remove_edge(&mut self, id: &str) -> Option<Edge> {
        let idx = self.edges.iter().position(|e| e.id == id)?;
        tracing::debug!(edge_id = %id, "remove edge");
        Some(self.edges.remove(idx))
    }

    /// Removes every edge whose id is in `ids`, keeping the order of the rest.
    pub fn remove_edges(&mut self, ids: &FxHashSet<String>) -> usize {
        let before = self.edges.len();
        self.edges.retain(|e| !ids.contains(&e.id));
        before - self.edges.len()
    }

    /// Shallow-merges `patch` into the node's data. Returns `false` for an unknown id.
    pub fn patch_node_data(&mut self, id: &str, patch: &NodeDataPatch) -> bool {
        let Some(node) = self.nodes.iter_mut().find(|n| n.id == id) else {
            return false;
        };
        node.kind.apply_patch(patch);
        true
    }

    pub fn patch_edge_data(&mut self, id: &str, patch: &EdgeDataPatch) -> bool {
        let Some(edge) = self.edges.iter_mut().find(|e| e.id == id) else {
            return false;
        };
        edge.kind.apply_patch(patch);
        true
    }

    pub fn set_node_position(&mut self, id: &str, position: Position) -> bool {
        let Some(node) = self.nodes.iter_mut().find(|n| n.id == id) else {
            return false;
        };
        node.set_position(position);
        true
    }

    pub fn replace_all(&mut self, nodes: Vec<Node>, edges: Vec<Edge>) {
        tracing::debug!(nodes = nodes.len(), edges = edges.len(), "replace graph");
        self.nodes = nodes;
        self.edges = edges;
    }

    /// Applies a batch of node changes in one pass.
    ///
    /// Surviving nodes keep their relative order; added nodes are appended in batch order.
    /// Changes naming an unknown id are ignored. Returns the ids actually removed.
    pub fn apply_node_changes(&mut self, changes: Vec<NodeChange>) -> Vec<String> {
        let mut by_id: FxHashMap<String, Vec<NodeChange>> = FxHashMap::default();
        let mut added = Vec::new();
        for change in changes {
            match change.target_id() {
                Some(id) => by_id.entry(id.to_string()).or_default().push(change),
                None => {
                    if let NodeChange::Add { item } = change {
                        added.push(item);
                    }
                }
            }
        }

        let mut removed = Vec::new();
        let mut next = Vec::with_capacity(self.nodes.len() + added.len());
        for mut node in std::mem::take(&mut self.nodes) {
            let Some(node_changes) = by_id.remove(&node.id) else {
                next.push(node);
                continue;
            };
            let mut keep = true;
            for change in node_changes {
                match change {
                    NodeChange::Position {
                        position, dragging, ..
                    } => {
                        if let Some(position) = position {
                            node.set_position(position);
                        }
                        if let Some(dragging) = dragging {
                            node.extra.insert("dragging".to_string(), Value::Bool(dragging));
                        }
                    }
                    NodeChange::Dimensions { dimensions, .. } => {
                        if let Some(d) = dimensions {
                            node.extra.insert(
                                "measured".to_string(),
                                json!({ "width": d.width, "height": d.height }),
                            );
                        }
                    }
                    NodeChange::Select { selected, .. } => node.selected = Some(selected),
                    NodeChange::Replace { item, .. } => node = item,
                    NodeChange::Remove { .. } => keep = false,
                    NodeChange::Add { .. } => {}
                }
            }
            if keep {
                next.push(node);
            } else {
                removed.push(node.id);
            }
        }
        next.extend(added);
        self.nodes = next;

        if !removed.is_empty() {
            tracing::debug!(removed = ?removed, "node batch removed nodes");
        }
        removed
    }

    /// Edge counterpart of [`GraphStore::apply_node_changes`].
    pub fn apply_edge_changes(&mut self, changes: Vec<EdgeChange>) -> Vec<String> {
        let mut by_id: FxHashMap<String, Vec<EdgeChange>> = FxHashMap::default();
        let mut added = Vec::new();
        for change in changes {
            match change.target_id() {
                Some(id) => by_id.entry(id.to_string()).or_default().push(change),
                None => {
                    if let EdgeChange::Add { item } = change {
                        added.push(item);
                    }
                }
            }
        }

        let mut removed = Vec::new();
        let mut next = Vec::with_capacity(self.edges.len() + added.len());
        for mut edge in std::mem::take(&mut self.edges) {
            let Some(edge_changes) = by_id.remove(&edge.id) else {
                next.push(edge);
                continue;
            };
            let mut keep = true;
            for change in edge_changes {
                match change {
                    EdgeChange::Select { selected, .. } => edge.selected = Some(selected),
                    EdgeChange::Replace { item, .. } => edge = item,
                    EdgeChange::Remove { .. } => keep = false,
                    EdgeChange::Add { .. } => {}
                }
            }
            if keep {
                next.push(edge);
            } else {
                removed.push(edge.id);
            }
        }
        next.extend(added);
        self.edges = next;
        removed
    }

    /// Ids of edges that have `node_id` as source or target.
    pub fn incident_edge_ids(&self, node_id: &str) -> FxHashSet<String> {
        self.edges
            .iter()
            .filter(|e| e.touches(node_id))
            .map(|e| e.id.clone())
            .collect()
    }

    /// Edges whose source or target is not a live node.
    pub fn dangling_edges(&self) -> Vec<&Edge> {
        let live: FxHashSet<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();
        self.edges
            .iter()
            .filter(|e| !live.contains(e.source.as_str()) || !live.contains(e.target.as_str()))
            .collect()
    }

    pub fn self_loops(&self) -> Vec<&Edge> {
        self.edges.iter().filter(|e| e.is_self_loop()).collect()
    }

    /// Node ids that occur more than once, in first-occurrence order.
    pub fn duplicate_node_ids(&self) -> Vec<&str> {
        let mut seen = FxHashSet::default();
        let mut dupes = IndexSet::new();
        for node in &self.nodes {
            if !seen.insert(node.id.as_str()) {
                dupes.insert(node.id.as_str());
            }
        }
        dupes.into_iter().collect()
    }

    fn fresh_node_id(&self, rng: &mut impl Rng) -> String {
        loop {
            let bytes: [u8; 16] = rng.r#gen();
            let uuid = uuid::Builder::from_random_bytes(bytes).into_uuid();
            let mut id = uuid.simple().to_string();
            id.truncate(NODE_ID_LEN);
            if !self.contains_node(&id) {
                return id;
            }
        }
    }
}

/// Picks a spawn point near the top-left of the visible area.
pub fn spawn_position(rng: &mut impl Rng, config: &EditorConfig, viewport: &Viewport) -> Position {
    let zoom = viewport.effective_zoom();
    let jitter = config.spawn_jitter.max(0.0);
    let mut offset = || config.spawn_offset + rng.r#gen::<f64>() * jitter;
    let x = -viewport.x / zoom + offset();
    let y = -viewport.y / zoom + offset();
    Position::new(x, y)
}
