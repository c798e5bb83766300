#![forbid(unsafe_code)]

//! Headless editing state for a node-and-edge "ship log" graph.
//!
//! Design goals:
//! - one owned [`Editor`] holds the graph, undo/redo history, connect mode and selection
//! - every mutation is a serializable [`Command`], so sessions can be replayed and tested
//! - backups round-trip losslessly, including keys the editor does not understand

pub mod backup;
pub mod config;
pub mod connect;
pub mod editor;
pub mod error;
pub mod history;
pub mod model;
mod runtime;
pub mod selection;
pub mod store;
pub mod time;

pub use backup::{BACKUP_VERSION, BackupDocument, ImportedBackup};
pub use config::EditorConfig;
pub use connect::{ConnectMode, ConnectStep};
pub use editor::{Command, Editor, Effect};
pub use error::{Error, Result};
pub use history::{History, Snapshot};
pub use model::{
    Edge, EdgeDataPatch, EdgeDirection, EdgeKind, LinkData, Node, NodeDataPatch, NodeKind,
    Position, SignalData, Viewport,
};
pub use selection::Selection;
pub use store::{EdgeChange, GraphStore, NodeChange, Placement};

#[cfg(test)]
mod tests;
