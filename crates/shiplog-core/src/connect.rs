//! Click-to-connect state machine.
//!
//! Transitions are pure: each method consumes the current mode and returns the next one plus
//! what the caller has to do. Creating the edge (and snapshotting before it) is the caller's job.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum ConnectMode {
    #[default]
    Idle,
    AwaitingSource,
    AwaitingTarget {
        source: String,
    },
}

/// Result of a node click while connecting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectStep {
    /// Connect mode is off; the click belongs to selection.
    NotConnecting,
    SourcePicked,
    /// The pending source was clicked again; the link is aborted.
    Cancelled,
    Connect { source: String, target: String },
}

impl ConnectMode {
    pub fn is_active(&self) -> bool {
        !matches!(self, ConnectMode::Idle)
    }

    pub fn pending_source(&self) -> Option<&str> {
        match self {
            ConnectMode::AwaitingTarget { source } => Some(source),
            _ => None,
        }
    }

    /// Flips connect mode. Leaving it always drops the pending source.
    pub fn toggle(self) -> Self {
        match self {
            ConnectMode::Idle => ConnectMode::AwaitingSource,
            ConnectMode::AwaitingSource | ConnectMode::AwaitingTarget { .. } => ConnectMode::Idle,
        }
    }

    /// Escape key or background click.
    pub fn cancel(self) -> Self {
        ConnectMode::Idle
    }

    pub fn click_node(self, id: &str) -> (Self, ConnectStep) {
        match self {
            ConnectMode::Idle => (ConnectMode::Idle, ConnectStep::NotConnecting),
            ConnectMode::AwaitingSource => (
                ConnectMode::AwaitingTarget {
                    source: id.to_string(),
                },
                ConnectStep::SourcePicked,
            ),
            ConnectMode::AwaitingTarget { source } if source == id => {
                (ConnectMode::AwaitingSource, ConnectStep::Cancelled)
            }
            ConnectMode::AwaitingTarget { source } => (
                ConnectMode::Idle,
                ConnectStep::Connect {
                    source,
                    target: id.to_string(),
                },
            ),
        }
    }

    /// Drops a pending source that no longer exists (e.g. after undo).
    pub fn forget_source_unless(self, exists: impl FnOnce(&str) -> bool) -> Self {
        match self {
            ConnectMode::AwaitingTarget { source } if !exists(&source) => {
                ConnectMode::AwaitingSource
            }
            other => other,
        }
    }
}

/// Builds the id of an edge created at `millis`.
pub fn edge_id(source: &str, target: &str, millis: i64) -> String {
    format!("e{source}-{target}-{millis}")
}
