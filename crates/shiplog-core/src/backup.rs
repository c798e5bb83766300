//! Backup document: the portable JSON form of the whole graph plus viewport.
//!
//! ```json
//! {
//!   "nodes": [...],
//!   "edges": [...],
//!   "viewport": { "x": 0, "y": 0, "zoom": 1 },
//!   "version": "1.0.0"
//! }
//! ```
//!
//! Import only insists on `nodes` and `edges` being arrays. It does not check id uniqueness or
//! edge endpoints; [`crate::GraphStore::dangling_edges`] and
//! [`crate::GraphStore::duplicate_node_ids`] report those after the fact.

use crate::model::{Edge, Node, Viewport};
use crate::{Error, Result};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

/// Version tag written on export. Import does not enforce it.
pub const BACKUP_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackupDocument {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub viewport: Viewport,
    pub version: String,
}

impl BackupDocument {
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Encode {
            message: e.to_string(),
        })
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Encode {
            message: e.to_string(),
        })
    }
}

/// A parsed backup, ready to replace the store contents.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedBackup {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    /// `None` when the document has no usable viewport; the current one is kept.
    pub viewport: Option<Viewport>,
    pub version: Option<String>,
}

pub fn export(nodes: &[Node], edges: &[Edge], viewport: Viewport) -> BackupDocument {
    tracing::info!(nodes = nodes.len(), edges = edges.len(), "export backup");
    BackupDocument {
        nodes: nodes.to_vec(),
        edges: edges.to_vec(),
        viewport,
        version: BACKUP_VERSION.to_string(),
    }
}

pub fn import(text: &str) -> Result<ImportedBackup> {
    let value: Value = serde_json::from_str(text).map_err(|e| Error::InvalidJson {
        message: e.to_string(),
    })?;
    import_value(value)
}

pub fn import_bytes(bytes: &[u8]) -> Result<ImportedBackup> {
    let value: Value = serde_json::from_slice(bytes).map_err(|e| Error::InvalidJson {
        message: e.to_string(),
    })?;
    import_value(value)
}

pub fn import_value(value: Value) -> Result<ImportedBackup> {
    let Value::Object(mut obj) = value else {
        return Err(Error::MissingCollection { field: "nodes" });
    };
    let Some(Value::Array(raw_nodes)) = obj.remove("nodes") else {
        return Err(Error::MissingCollection { field: "nodes" });
    };
    let Some(Value::Array(raw_edges)) = obj.remove("edges") else {
        return Err(Error::MissingCollection { field: "edges" });
    };

    let nodes = raw_nodes
        .into_iter()
        .enumerate()
        .map(|(index, raw)| {
            serde_json::from_value::<Node>(raw).map_err(|e| Error::InvalidNode {
                index,
                message: e.to_string(),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let edges = raw_edges
        .into_iter()
        .enumerate()
        .map(|(index, raw)| {
            serde_json::from_value::<Edge>(raw).map_err(|e| Error::InvalidEdge {
                index,
                message: e.to_string(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let viewport = match obj.remove("viewport") {
        None | Some(Value::Null) => None,
        Some(raw) => match serde_json::from_value::<Viewport>(raw) {
            Ok(vp) => Some(vp),
            Err(err) => {
                tracing::warn!(error = %err, "ignoring malformed viewport in backup");
                None
            }
        },
    };
    let version = obj
        .remove("version")
        .and_then(|v| v.as_str().map(str::to_string));

    tracing::info!(
        nodes = nodes.len(),
        edges = edges.len(),
        version = version.as_deref().unwrap_or("<none>"),
        "import backup"
    );
    Ok(ImportedBackup {
        nodes,
        edges,
        viewport,
        version,
    })
}

/// `{prefix}-YYYY-MM-DD.json`
pub fn file_name(prefix: &str, date: NaiveDate) -> String {
    format!("{prefix}-{}.json", date.format("%Y-%m-%d"))
}

/// Date-stamped backup name for today (UTC), honoring [`crate::time::with_fixed_now`].
pub fn file_name_for_today(prefix: &str) -> String {
    file_name(prefix, crate::runtime::today_utc())
}
