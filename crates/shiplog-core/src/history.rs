//! Bounded undo/redo stacks of whole-graph snapshots.

use crate::config::DEFAULT_HISTORY_LIMIT;
use crate::model::{Edge, Node};
use std::collections::VecDeque;

/// Immutable capture of the node and edge collections at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl Snapshot {
    pub fn capture(nodes: &[Node], edges: &[Edge]) -> Self {
        Self {
            nodes: nodes.to_vec(),
            edges: edges.to_vec(),
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn into_parts(self) -> (Vec<Node>, Vec<Edge>) {
        (self.nodes, self.edges)
    }
}

/// Undo/redo history.
///
/// `past` is ordered oldest to newest; `future` is ordered nearest to farthest, so the next
/// redo is always at its front. Both stacks hold at most `limit` entries. On overflow `past`
/// drops its oldest entry and `future` its farthest.
#[derive(Debug, Clone)]
pub struct History {
    past: VecDeque<Snapshot>,
    future: VecDeque<Snapshot>,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self {
            past: VecDeque::new(),
            future: VecDeque::new(),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.past.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.future.len()
    }

    /// Records the state as it is right before a destructive change.
    ///
    /// Any redo path is discarded.
    pub fn take_snapshot(&mut self, nodes: &[Node], edges: &[Edge]) {
        self.past.push_back(Snapshot::capture(nodes, edges));
        self.future.clear();
        self.trim_past();
        tracing::debug!(depth = self.past.len(), "history snapshot");
    }

    /// Steps back. `nodes`/`edges` are the current (pre-undo) state, which becomes the next redo.
    ///
    /// Returns the snapshot to restore, or `None` when there is nothing to undo.
    pub fn undo(&mut self, nodes: &[Node], edges: &[Edge]) -> Option<Snapshot> {
        let previous = self.past.pop_back()?;
        self.future.push_front(Snapshot::capture(nodes, edges));
        self.future.truncate(self.limit);
        tracing::debug!(
            undo_depth = self.past.len(),
            redo_depth = self.future.len(),
            "history undo"
        );
        Some(previous)
    }

    /// Steps forward. `nodes`/`edges` are the current (pre-redo) state, which becomes the next
    /// undo.
    pub fn redo(&mut self, nodes: &[Node], edges: &[Edge]) -> Option<Snapshot> {
        let next = self.future.pop_front()?;
        self.past.push_back(Snapshot::capture(nodes, edges));
        self.trim_past();
        tracing::debug!(
            undo_depth = self.past.len(),
            redo_depth = self.future.len(),
            "history redo"
        );
        Some(next)
    }

    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }

    fn trim_past(&mut self) {
        while self.past.len() > self.limit {
            self.past.pop_front();
        }
    }
}
