use crate::connect::ConnectMode;
use serde::Serialize;

/// The single node or edge open for inspection. Node and edge selection exclude each other.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum Selection {
    #[default]
    None,
    Node(String),
    Edge(String),
}

impl Selection {
    pub fn node_id(&self) -> Option<&str> {
        match self {
            Selection::Node(id) => Some(id),
            _ => None,
        }
    }

    pub fn edge_id(&self) -> Option<&str> {
        match self {
            Selection::Edge(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Selection::None)
    }

    /// Node click. Ignored while connecting.
    pub fn click_node(self, id: &str, mode: &ConnectMode) -> Self {
        if mode.is_active() {
            return self;
        }
        Selection::Node(id.to_string())
    }

    /// Edge click. Ignored while connecting.
    pub fn click_edge(self, id: &str, mode: &ConnectMode) -> Self {
        if mode.is_active() {
            return self;
        }
        Selection::Edge(id.to_string())
    }

    pub fn clear(self) -> Self {
        Selection::None
    }

    /// Drops the selection if its target no longer exists.
    pub fn retain(
        self,
        has_node: impl FnOnce(&str) -> bool,
        has_edge: impl FnOnce(&str) -> bool,
    ) -> Self {
        match self {
            Selection::Node(id) if !has_node(&id) => Selection::None,
            Selection::Edge(id) if !has_edge(&id) => Selection::None,
            other => other,
        }
    }
}
