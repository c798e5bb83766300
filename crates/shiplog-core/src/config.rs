use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_HISTORY_LIMIT: usize = 50;
pub const DEFAULT_NODE_LABEL: &str = "New Signal";
pub const DEFAULT_BACKUP_PREFIX: &str = "ship-log-backup";

/// Swatches offered by the node editing panel.
pub const COLOR_PRESETS: &[(&str, &str)] = &[
    ("#15803d", "Probe Green"),
    ("#c2410c", "Rumor Orange"),
    ("#1d4ed8", "Nomai Blue"),
    ("#7e22ce", "Quantum Purple"),
    ("#b91c1c", "Bramble Red"),
    ("#374151", "Slate Grey"),
];

/// Color a renderer should fall back to for nodes without an explicit `color`.
pub const RENDER_FALLBACK_COLOR: &str = "#15803d";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Maximum number of entries kept on each history stack.
    pub history_limit: usize,
    pub default_label: String,
    pub default_color: String,
    /// Offset (canvas units) from the top-left of the visible area where new nodes spawn.
    pub spawn_offset: f64,
    /// Upper bound of the random jitter added to each spawn coordinate.
    pub spawn_jitter: f64,
    /// Seeds id generation and spawn jitter. `None` draws from OS entropy.
    pub seed: Option<u64>,
    pub backup_file_prefix: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            default_label: DEFAULT_NODE_LABEL.to_string(),
            default_color: "#c2410c".to_string(),
            spawn_offset: 150.0,
            spawn_jitter: 50.0,
            seed: None,
            backup_file_prefix: DEFAULT_BACKUP_PREFIX.to_string(),
        }
    }
}

impl EditorConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builds a config by deep-merging `overrides` onto the defaults.
    pub fn from_overrides(overrides: &Value) -> Result<Self> {
        Self::default().with_overrides(overrides)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let overrides: Value = serde_json::from_str(text).map_err(|e| Error::InvalidConfig {
            message: e.to_string(),
        })?;
        Self::from_overrides(&overrides)
    }

    /// Returns a copy of `self` with `overrides` deep-merged on top.
    ///
    /// Unknown keys are ignored; a known key with the wrong JSON type is an error.
    pub fn with_overrides(&self, overrides: &Value) -> Result<Self> {
        if !overrides.is_object() {
            return Err(Error::InvalidConfig {
                message: "overrides must be a JSON object".to_string(),
            });
        }
        let mut base = serde_json::to_value(self).map_err(|e| Error::InvalidConfig {
            message: e.to_string(),
        })?;
        deep_merge_value(&mut base, overrides);
        serde_json::from_value(base).map_err(|e| Error::InvalidConfig {
            message: e.to_string(),
        })
    }
}

fn deep_merge_value(base: &mut Value, incoming: &Value) {
    match (base, incoming) {
        (Value::Object(base_map), Value::Object(in_map)) => {
            for (key, in_value) in in_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge_value(base_value, in_value),
                    None => {
                        base_map.insert(key.clone(), in_value.clone());
                    }
                }
            }
        }
        (base_slot, in_value) => {
            *base_slot = in_value.clone();
        }
    }
}
