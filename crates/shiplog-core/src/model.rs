//! Typed node/edge model.
//!
//! Nodes and edges serialize to the same object shape the canvas library uses
//! (`{ id, position, type, data, ... }`). The `type` string selects the payload variant; kinds
//! this crate does not model are carried opaquely so a backup survives a round trip untouched.
//! Keys outside the modeled set (`measured`, `dragging`, `width`, ...) are kept in `extra`.

use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

pub const SIGNAL_NODE_TYPE: &str = "universal";
pub const LINK_EDGE_TYPE: &str = "universal-edge";

const NODE_KEYS: &[&str] = &["id", "position", "data"];
const EDGE_KEYS: &[&str] = &["id", "source", "target", "data"];

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Pan/zoom state of the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        }
    }
}

impl Viewport {
    /// Zoom used for coordinate conversion; a zero or non-finite zoom counts as `1`.
    pub fn effective_zoom(&self) -> f64 {
        if self.zoom.is_finite() && self.zoom != 0.0 {
            self.zoom
        } else {
            1.0
        }
    }

    /// Converts a screen-space offset from the canvas origin into canvas space.
    pub fn screen_to_canvas(&self, sx: f64, sy: f64) -> Position {
        let zoom = self.effective_zoom();
        Position::new((sx - self.x) / zoom, (sy - self.y) / zoom)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SignalData {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Keys this editor does not model, kept in order.
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl SignalData {
    pub fn apply(&mut self, patch: &NodeDataPatch) {
        if let Some(label) = &patch.label {
            self.label = label.clone();
        }
        if let Some(content) = &patch.content {
            self.content = Some(content.clone());
        }
        if let Some(image) = &patch.image {
            self.image = Some(image.clone());
        }
        if let Some(color) = &patch.color {
            self.color = Some(color.clone());
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeDirection {
    #[default]
    None,
    Forward,
    Reverse,
    Bidirectional,
}

impl EdgeDirection {
    /// Whether an arrow marker belongs at the `source` end.
    pub fn marks_source(self) -> bool {
        matches!(self, Self::Reverse | Self::Bidirectional)
    }

    /// Whether an arrow marker belongs at the `target` end.
    pub fn marks_target(self) -> bool {
        matches!(self, Self::Forward | Self::Bidirectional)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LinkData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<EdgeDirection>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl LinkData {
    /// Data attached to an edge created by connect mode.
    pub fn fresh() -> Self {
        Self {
            content: Some(String::new()),
            direction: Some(EdgeDirection::None),
            extra: IndexMap::new(),
        }
    }

    pub fn direction(&self) -> EdgeDirection {
        self.direction.unwrap_or_default()
    }

    pub fn apply(&mut self, patch: &EdgeDataPatch) {
        if let Some(content) = &patch.content {
            self.content = Some(content.clone());
        }
        if let Some(direction) = patch.direction {
            self.direction = Some(direction);
        }
    }
}

/// Field-level update for node data. `None` fields are left untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeDataPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl NodeDataPatch {
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Default::default()
        }
    }

    pub fn color(color: impl Into<String>) -> Self {
        Self {
            color: Some(color.into()),
            ..Default::default()
        }
    }

    fn entries(&self) -> impl Iterator<Item = (&'static str, &String)> {
        [
            ("label", self.label.as_ref()),
            ("content", self.content.as_ref()),
            ("image", self.image.as_ref()),
            ("color", self.color.as_ref()),
        ]
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| (k, v)))
    }
}

/// Field-level update for edge data. `None` fields are left untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeDataPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<EdgeDirection>,
}

impl EdgeDataPatch {
    pub fn direction(direction: EdgeDirection) -> Self {
        Self {
            direction: Some(direction),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// `type: "universal"`, the annotated node this editor creates.
    Signal(SignalData),
    /// Any other `type` (or none). Carried verbatim.
    Foreign {
        kind: Option<String>,
        data: Option<Value>,
    },
}

impl NodeKind {
    pub fn type_name(&self) -> Option<&str> {
        match self {
            NodeKind::Signal(_) => Some(SIGNAL_NODE_TYPE),
            NodeKind::Foreign { kind, .. } => kind.as_deref(),
        }
    }

    /// Shallow-merges `patch` into the payload.
    ///
    /// Foreign payloads are treated as plain objects, so the patch still lands on them.
    pub fn apply_patch(&mut self, patch: &NodeDataPatch) {
        match self {
            NodeKind::Signal(data) => data.apply(patch),
            NodeKind::Foreign { data, .. } => {
                let Some(obj) = object_slot(data) else {
                    return;
                };
                for (key, value) in patch.entries() {
                    obj.insert(key.to_string(), Value::String(value.clone()));
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EdgeKind {
    /// `type: "universal-edge"`, the annotated relation this editor creates.
    Link(LinkData),
    Foreign {
        kind: Option<String>,
        data: Option<Value>,
    },
}

impl EdgeKind {
    pub fn type_name(&self) -> Option<&str> {
        match self {
            EdgeKind::Link(_) => Some(LINK_EDGE_TYPE),
            EdgeKind::Foreign { kind, .. } => kind.as_deref(),
        }
    }

    pub fn apply_patch(&mut self, patch: &EdgeDataPatch) {
        match self {
            EdgeKind::Link(data) => data.apply(patch),
            EdgeKind::Foreign { data, .. } => {
                let Some(obj) = object_slot(data) else {
                    return;
                };
                if let Some(content) = &patch.content {
                    obj.insert("content".to_string(), Value::String(content.clone()));
                }
                if let Some(direction) = patch.direction {
                    if let Ok(v) = serde_json::to_value(direction) {
                        obj.insert("direction".to_string(), v);
                    }
                }
            }
        }
    }
}

fn object_slot(data: &mut Option<Value>) -> Option<&mut Map<String, Value>> {
    let slot = data.get_or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    slot.as_object_mut()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "IndexMap<String, Value>")]
pub struct Node {
    pub id: String,
    /// Origin when the source document had no usable position. A malformed one is kept raw
    /// in `extra` and written back until the node is moved.
    pub position: Position,
    pub kind: NodeKind,
    pub selected: Option<bool>,
    pub extra: IndexMap<String, Value>,
}

impl Node {
    pub fn signal(id: impl Into<String>, position: Position, data: SignalData) -> Self {
        Self {
            id: id.into(),
            position,
            kind: NodeKind::Signal(data),
            selected: None,
            extra: IndexMap::new(),
        }
    }

    pub fn signal_data(&self) -> Option<&SignalData> {
        match &self.kind {
            NodeKind::Signal(data) => Some(data),
            NodeKind::Foreign { .. } => None,
        }
    }

    /// Display label: the signal label, or a string `label` inside a foreign payload.
    pub fn label(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Signal(data) => Some(&data.label),
            NodeKind::Foreign { data, .. } => data.as_ref()?.get("label")?.as_str(),
        }
    }

    pub fn is_selected(&self) -> bool {
        self.selected.unwrap_or(false)
    }

    /// Moves the node, dropping any malformed position carried over from import.
    pub fn set_position(&mut self, position: Position) {
        self.position = position;
        self.extra.shift_remove("position");
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "IndexMap<String, Value>")]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
    pub selected: Option<bool>,
    pub extra: IndexMap<String, Value>,
}

impl Edge {
    pub fn link(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        data: LinkData,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            kind: EdgeKind::Link(data),
            selected: None,
            extra: IndexMap::new(),
        }
    }

    pub fn link_data(&self) -> Option<&LinkData> {
        match &self.kind {
            EdgeKind::Link(data) => Some(data),
            EdgeKind::Foreign { .. } => None,
        }
    }

    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

/// Takes a string field out of a raw element, or explains why it cannot.
fn take_string(
    raw: &mut IndexMap<String, Value>,
    key: &str,
    what: &str,
) -> std::result::Result<String, String> {
    match raw.shift_remove(key) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(format!("{what} `{key}` must be a string, got {other}")),
        None => Err(format!("{what} has no `{key}`")),
    }
}

/// Moves `key` out of `raw` only when it decodes as `T`; otherwise the raw value stays put.
fn take_typed<T: serde::de::DeserializeOwned>(
    raw: &mut IndexMap<String, Value>,
    key: &str,
) -> Option<T> {
    let value = raw.get(key)?;
    let typed = T::deserialize(value).ok()?;
    raw.shift_remove(key);
    Some(typed)
}

impl TryFrom<IndexMap<String, Value>> for Node {
    type Error = String;

    fn try_from(mut raw: IndexMap<String, Value>) -> std::result::Result<Self, Self::Error> {
        let id = take_string(&mut raw, "id", "node")?;
        let position = take_typed::<Position>(&mut raw, "position");
        if position.is_none() && raw.contains_key("position") {
            tracing::warn!(node_id = %id, "keeping malformed node position as-is");
        }
        let kind = take_typed::<String>(&mut raw, "type");
        let data = raw.shift_remove("data");
        let selected = take_typed::<bool>(&mut raw, "selected");

        let kind = match (kind, data) {
            (Some(kind), Some(data)) if kind == SIGNAL_NODE_TYPE => {
                match SignalData::deserialize(&data) {
                    Ok(signal) => NodeKind::Signal(signal),
                    Err(err) => {
                        tracing::warn!(node_id = %id, error = %err, "signal data kept as-is");
                        NodeKind::Foreign {
                            kind: Some(kind),
                            data: Some(data),
                        }
                    }
                }
            }
            (kind, data) => NodeKind::Foreign { kind, data },
        };
        Ok(Self {
            id,
            position: position.unwrap_or_default(),
            kind,
            selected,
            extra: raw,
        })
    }
}

impl TryFrom<IndexMap<String, Value>> for Edge {
    type Error = String;

    fn try_from(mut raw: IndexMap<String, Value>) -> std::result::Result<Self, Self::Error> {
        let id = take_string(&mut raw, "id", "edge")?;
        let source = take_string(&mut raw, "source", "edge")?;
        let target = take_string(&mut raw, "target", "edge")?;
        let kind = take_typed::<String>(&mut raw, "type");
        let data = raw.shift_remove("data");
        let selected = take_typed::<bool>(&mut raw, "selected");

        let kind = match (kind, data) {
            (Some(kind), None | Some(Value::Null)) if kind == LINK_EDGE_TYPE => {
                EdgeKind::Link(LinkData::default())
            }
            (Some(kind), Some(data)) if kind == LINK_EDGE_TYPE => {
                match LinkData::deserialize(&data) {
                    Ok(link) => EdgeKind::Link(link),
                    Err(err) => {
                        tracing::warn!(edge_id = %id, error = %err, "link data kept as-is");
                        EdgeKind::Foreign {
                            kind: Some(kind),
                            data: Some(data),
                        }
                    }
                }
            }
            (kind, data) => EdgeKind::Foreign { kind, data },
        };
        Ok(Self {
            id,
            source,
            target,
            kind,
            selected,
            extra: raw,
        })
    }
}

/// Whether a leftover raw key in `extra` should be written after the typed fields.
///
/// `type` and `selected` only survive in `extra` when they did not decode; the typed value wins
/// once one is set.
fn writes_extra(key: &str, typed_kind: bool, typed_selected: bool, reserved: &[&str]) -> bool {
    match key {
        "type" => !typed_kind,
        "selected" => !typed_selected,
        _ => !reserved.contains(&key),
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("id", &self.id)?;
        match self.extra.get("position") {
            Some(raw) => map.serialize_entry("position", raw)?,
            None => map.serialize_entry("position", &self.position)?,
        }
        match &self.kind {
            NodeKind::Signal(data) => {
                map.serialize_entry("type", SIGNAL_NODE_TYPE)?;
                map.serialize_entry("data", data)?;
            }
            NodeKind::Foreign { kind, data } => {
                if let Some(kind) = kind {
                    map.serialize_entry("type", kind)?;
                }
                if let Some(data) = data {
                    map.serialize_entry("data", data)?;
                }
            }
        }
        if let Some(selected) = self.selected {
            map.serialize_entry("selected", &selected)?;
        }
        let typed_kind = self.kind.type_name().is_some();
        let typed_selected = self.selected.is_some();
        for (key, value) in self
            .extra
            .iter()
            .filter(|(k, _)| writes_extra(k, typed_kind, typed_selected, NODE_KEYS))
        {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl Serialize for Edge {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry("source", &self.source)?;
        map.serialize_entry("target", &self.target)?;
        match &self.kind {
            EdgeKind::Link(data) => {
                map.serialize_entry("type", LINK_EDGE_TYPE)?;
                map.serialize_entry("data", data)?;
            }
            EdgeKind::Foreign { kind, data } => {
                if let Some(kind) = kind {
                    map.serialize_entry("type", kind)?;
                }
                if let Some(data) = data {
                    map.serialize_entry("data", data)?;
                }
            }
        }
        if let Some(selected) = self.selected {
            map.serialize_entry("selected", &selected)?;
        }
        let typed_kind = self.kind.type_name().is_some();
        let typed_selected = self.selected.is_some();
        for (key, value) in self
            .extra
            .iter()
            .filter(|(k, _)| writes_extra(k, typed_kind, typed_selected, EDGE_KEYS))
        {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
