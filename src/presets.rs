//! Named parameter presets, stored as JSON:
//!
//! ```json
//! {"presets": [{"id": "small", "name": "Smallest file", "tool_id": "compress_images",
//!               "params": {"dpi": 96, "jpeg_quality": 50}}]}
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ToolboxError;
use crate::job::{JobSpec, Params};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub tool_id: String,
    #[serde(default)]
    pub params: Params,
}

impl Preset {
    /// Point `spec` at this preset's tool and fill in parameters it doesn't set.
    pub fn apply(&self, spec: &mut JobSpec) {
        spec.tool_id = self.tool_id.clone();
        spec.params.merge_defaults(&self.params);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PresetStore {
    #[serde(default)]
    presets: Vec<Preset>,
}

impl PresetStore {
    pub fn load(path: &Path) -> Result<Self, ToolboxError> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    /// Parse preset JSON. A leading byte-order mark is ignored.
    pub fn from_json_str(contents: &str) -> Result<Self, ToolboxError> {
        let contents = contents.strip_prefix('\u{feff}').unwrap_or(contents);
        Ok(serde_json::from_str(contents)?)
    }

    pub fn presets(&self) -> &[Preset] {
        &self.presets
    }

    pub fn find(&self, id: &str) -> Result<&Preset, ToolboxError> {
        self.presets
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| ToolboxError::PresetNotFound(id.to_string()))
    }
}
