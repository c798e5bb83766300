//! The editor: one owned container for store, history, connect mode, selection and viewport.
//!
//! Every write goes through [`Editor::dispatch`]. Rendering surfaces read back through the
//! accessors after each command; editing panels send [`Command::PatchNode`] and
//! [`Command::PatchEdge`] only.

use crate::Result;
use crate::backup::{self, BackupDocument};
use crate::config::EditorConfig;
use crate::connect::{self, ConnectMode, ConnectStep};
use crate::history::History;
use crate::model::{
    Edge, EdgeDataPatch, LinkData, Node, NodeDataPatch, Position, SignalData, Viewport,
};
use crate::selection::Selection;
use crate::store::{EdgeChange, GraphStore, NodeChange, Placement};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// An interaction event or editing request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Command {
    /// Adds a signal node. Without `position` it spawns near the visible area.
    AddNode {
        #[serde(default)]
        position: Option<Position>,
        #[serde(default)]
        data: NodeDataPatch,
    },
    ToggleConnectMode,
    ClickNode {
        id: String,
    },
    ClickEdge {
        id: String,
    },
    /// Click on the empty canvas background.
    ClickPane,
    Escape,
    /// Delete/Backspace on the current selection.
    DeleteSelection,
    DragStart {
        id: String,
    },
    Drag {
        id: String,
        position: Position,
    },
    DragEnd {
        id: String,
        position: Position,
    },
    NodesChanged {
        changes: Vec<NodeChange>,
    },
    EdgesChanged {
        changes: Vec<EdgeChange>,
    },
    PatchNode {
        id: String,
        patch: NodeDataPatch,
    },
    PatchEdge {
        id: String,
        patch: EdgeDataPatch,
    },
    Undo,
    Redo,
    SetViewport {
        viewport: Viewport,
    },
    /// Replaces the whole graph with a backup document.
    Import {
        text: String,
    },
}

/// What a command did, for the rendering surface.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Nothing changed (unknown id, empty history, ignored click, ...).
    None,
    NodeAdded { id: String },
    EdgeCreated { id: String },
    Removed { nodes: usize, edges: usize },
    /// Undo or redo replaced the graph.
    Restored,
    Imported { nodes: usize, edges: usize },
    /// Mode, selection, positions, data or viewport changed.
    Changed,
}

pub struct Editor {
    config: EditorConfig,
    store: GraphStore,
    history: History,
    mode: ConnectMode,
    selection: Selection,
    viewport: Viewport,
    rng: StdRng,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("nodes", &self.store.nodes().len())
            .field("edges", &self.store.edges().len())
            .field("mode", &self.mode)
            .field("selection", &self.selection)
            .field("viewport", &self.viewport)
            .field("undo_depth", &self.history.undo_depth())
            .field("redo_depth", &self.history.redo_depth())
            .finish()
    }
}

/// The graph a new editor starts with.
pub fn initial_store() -> GraphStore {
    let start = Node::signal(
        "start",
        Position::new(250.0, 100.0),
        SignalData {
            label: "Landing Site".to_string(),
            content: Some("The ship is intact.".to_string()),
            image: None,
            color: Some("#1d4ed8".to_string()),
            ..SignalData::default()
        },
    );
    GraphStore::from_parts(vec![start], Vec::new())
}

impl Editor {
    pub fn new(config: EditorConfig) -> Self {
        Self::with_store(config, initial_store())
    }

    pub fn with_store(config: EditorConfig, store: GraphStore) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            history: History::new(config.history_limit),
            config,
            store,
            mode: ConnectMode::Idle,
            selection: Selection::None,
            viewport: Viewport::default(),
            rng,
        }
    }

    /// Starts from a backup document instead of the initial graph. History starts empty.
    pub fn from_backup(config: EditorConfig, text: &str) -> Result<Self> {
        let backup = backup::import(text)?;
        let store = GraphStore::from_parts(backup.nodes, backup.edges);
        let mut editor = Self::with_store(config, store);
        if let Some(viewport) = backup.viewport {
            editor.viewport = viewport;
        }
        Ok(editor)
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn nodes(&self) -> &[Node] {
        self.store.nodes()
    }

    pub fn edges(&self) -> &[Edge] {
        self.store.edges()
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn mode(&self) -> &ConnectMode {
        &self.mode
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// The node whose panel should be open. Panels are closed while connecting.
    pub fn inspected_node(&self) -> Option<&Node> {
        if self.mode.is_active() {
            return None;
        }
        self.store.node(self.selection.node_id()?)
    }

    pub fn inspected_edge(&self) -> Option<&Edge> {
        if self.mode.is_active() {
            return None;
        }
        self.store.edge(self.selection.edge_id()?)
    }

    pub fn export(&self) -> BackupDocument {
        backup::export(self.store.nodes(), self.store.edges(), self.viewport)
    }

    pub fn backup_file_name(&self) -> String {
        backup::file_name_for_today(&self.config.backup_file_prefix)
    }

    pub fn dispatch(&mut self, command: Command) -> Result<Effect> {
        tracing::debug!(?command, "dispatch");
        let effect = match command {
            Command::AddNode { position, data } => self.add_node(position, &data),
            Command::ToggleConnectMode => {
                self.mode = std::mem::take(&mut self.mode).toggle();
                self.selection = Selection::None;
                tracing::debug!(mode = ?self.mode, "connect mode toggled");
                Effect::Changed
            }
            Command::ClickNode { id } => self.click_node(&id),
            Command::ClickEdge { id } => {
                if !self.store.contains_edge(&id) || self.mode.is_active() {
                    return Ok(Effect::None);
                }
                self.selection = std::mem::take(&mut self.selection).click_edge(&id, &self.mode);
                Effect::Changed
            }
            Command::ClickPane => {
                self.selection = Selection::None;
                self.mode = std::mem::take(&mut self.mode).cancel();
                Effect::Changed
            }
            Command::Escape => {
                if !self.mode.is_active() {
                    return Ok(Effect::None);
                }
                self.mode = std::mem::take(&mut self.mode).cancel();
                Effect::Changed
            }
            Command::DeleteSelection => self.delete_selection(),
            Command::DragStart { id } => {
                if !self.store.contains_node(&id) {
                    return Ok(Effect::None);
                }
                self.snapshot();
                Effect::Changed
            }
            Command::Drag { id, position } => self.move_node(id, position, true),
            Command::DragEnd { id, position } => self.move_node(id, position, false),
            Command::NodesChanged { changes } => self.apply_node_changes(changes),
            Command::EdgesChanged { changes } => self.apply_edge_changes(changes),
            Command::PatchNode { id, patch } => {
                if self.store.patch_node_data(&id, &patch) {
                    Effect::Changed
                } else {
                    Effect::None
                }
            }
            Command::PatchEdge { id, patch } => {
                if self.store.patch_edge_data(&id, &patch) {
                    Effect::Changed
                } else {
                    Effect::None
                }
            }
            Command::Undo => self.undo(),
            Command::Redo => self.redo(),
            Command::SetViewport { viewport } => {
                self.viewport = viewport;
                Effect::Changed
            }
            Command::Import { text } => return self.import(&text),
        };
        Ok(effect)
    }

    /// Convenience for `dispatch(Command::Import { .. })` that borrows the text.
    pub fn import(&mut self, text: &str) -> Result<Effect> {
        let backup = match backup::import(text) {
            Ok(backup) => backup,
            Err(err) => {
                tracing::warn!(error = %err, "backup rejected; graph left untouched");
                return Err(err);
            }
        };
        self.snapshot();
        let (nodes, edges) = (backup.nodes.len(), backup.edges.len());
        self.store.replace_all(backup.nodes, backup.edges);
        if let Some(viewport) = backup.viewport {
            self.viewport = viewport;
        }
        self.reconcile();
        Ok(Effect::Imported { nodes, edges })
    }

    fn snapshot(&mut self) {
        self.history.take_snapshot(self.store.nodes(), self.store.edges());
    }

    fn add_node(&mut self, position: Option<Position>, data: &NodeDataPatch) -> Effect {
        self.snapshot();
        let placement = match position {
            Some(position) => Placement::At(position),
            None => Placement::Around(self.viewport),
        };
        let id = self
            .store
            .add_node(&mut self.rng, &self.config, placement, data)
            .id
            .clone();
        if !self.mode.is_active() {
            self.selection = Selection::Node(id.clone());
        }
        Effect::NodeAdded { id }
    }

    fn click_node(&mut self, id: &str) -> Effect {
        if !self.store.contains_node(id) {
            return Effect::None;
        }
        let (mode, step) = std::mem::take(&mut self.mode).click_node(id);
        self.mode = mode;
        match step {
            ConnectStep::NotConnecting => {
                self.selection = std::mem::take(&mut self.selection).click_node(id, &self.mode);
                Effect::Changed
            }
            ConnectStep::SourcePicked | ConnectStep::Cancelled => {
                tracing::debug!(mode = ?self.mode, "connect step");
                Effect::Changed
            }
            ConnectStep::Connect { source, target } => {
                self.snapshot();
                let id = self.fresh_edge_id(&source, &target);
                self.store
                    .insert_edge(Edge::link(id.clone(), source, target, LinkData::fresh()));
                Effect::EdgeCreated { id }
            }
        }
    }

    fn fresh_edge_id(&self, source: &str, target: &str) -> String {
        let base = connect::edge_id(source, target, crate::runtime::now_millis());
        if !self.store.contains_edge(&base) {
            return base;
        }
        let mut n = 1;
        loop {
            let candidate = format!("{base}-{n}");
            if !self.store.contains_edge(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    fn delete_selection(&mut self) -> Effect {
        if self.mode.is_active() {
            return Effect::None;
        }
        match self.selection.clone() {
            Selection::None => Effect::None,
            Selection::Node(id) => {
                if !self.store.contains_node(&id) {
                    return Effect::None;
                }
                self.snapshot();
                self.remove_nodes_cascading(&[id])
            }
            Selection::Edge(id) => {
                if !self.store.contains_edge(&id) {
                    return Effect::None;
                }
                self.snapshot();
                self.store.remove_edge(&id);
                self.reconcile();
                Effect::Removed { nodes: 0, edges: 1 }
            }
        }
    }

    /// Removes nodes and every edge touching them, then fixes up selection and mode.
    fn remove_nodes_cascading(&mut self, ids: &[String]) -> Effect {
        let mut incident = FxHashSet::default();
        let mut nodes = 0;
        for id in ids {
            incident.extend(self.store.incident_edge_ids(id));
            if self.store.remove_node(id).is_some() {
                nodes += 1;
            }
        }
        let edges = self.store.remove_edges(&incident);
        self.reconcile();
        Effect::Removed { nodes, edges }
    }

    fn move_node(&mut self, id: String, position: Position, dragging: bool) -> Effect {
        if !self.store.contains_node(&id) {
            return Effect::None;
        }
        self.store.apply_node_changes(vec![NodeChange::Position {
            id,
            position: Some(position),
            dragging: Some(dragging),
        }]);
        Effect::Changed
    }

    fn apply_node_changes(&mut self, changes: Vec<NodeChange>) -> Effect {
        if changes.is_empty() {
            return Effect::None;
        }
        if changes.iter().any(NodeChange::is_remove) {
            self.snapshot();
        }
        let removed = self.store.apply_node_changes(changes);
        if removed.is_empty() {
            return Effect::Changed;
        }
        let mut incident = FxHashSet::default();
        for id in &removed {
            incident.extend(self.store.incident_edge_ids(id));
        }
        let edges = self.store.remove_edges(&incident);
        self.reconcile();
        Effect::Removed {
            nodes: removed.len(),
            edges,
        }
    }

    fn apply_edge_changes(&mut self, changes: Vec<EdgeChange>) -> Effect {
        if changes.is_empty() {
            return Effect::None;
        }
        if changes.iter().any(EdgeChange::is_remove) {
            self.snapshot();
        }
        let removed = self.store.apply_edge_changes(changes);
        if removed.is_empty() {
            return Effect::Changed;
        }
        self.reconcile();
        Effect::Removed {
            nodes: 0,
            edges: removed.len(),
        }
    }

    fn undo(&mut self) -> Effect {
        let Some(snapshot) = self.history.undo(self.store.nodes(), self.store.edges()) else {
            return Effect::None;
        };
        let (nodes, edges) = snapshot.into_parts();
        self.store.replace_all(nodes, edges);
        self.reconcile();
        Effect::Restored
    }

    fn redo(&mut self) -> Effect {
        let Some(snapshot) = self.history.redo(self.store.nodes(), self.store.edges()) else {
            return Effect::None;
        };
        let (nodes, edges) = snapshot.into_parts();
        self.store.replace_all(nodes, edges);
        self.reconcile();
        Effect::Restored
    }

    /// Clears selection and pending source that point at elements no longer in the store.
    fn reconcile(&mut self) {
        let store = &self.store;
        self.selection = std::mem::take(&mut self.selection)
            .retain(|id| store.contains_node(id), |id| store.contains_edge(id));
        self.mode =
            std::mem::take(&mut self.mode).forget_source_unless(|id| store.contains_node(id));
    }
}

