use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dom::types::ElementId;
use crate::errors::{MapError, MapResult};
use crate::image_map::scale::{ScaleMode, ScaleRatio};

/// A point of interest in the map image's natural pixel space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateConfig {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl GateConfig {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, label: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMapConfig {
    /// URL or path of the background image.
    #[serde(rename = "mapImage", alias = "map_image")]
    pub map_image: String,
    pub gates: Vec<GateConfig>,
}

impl ImageMapConfig {
    /// Parse the JSON map config format: `{"mapImage": "...", "gates": [...]}`.
    pub fn parse(json: &str) -> MapResult<Self> {
        let root: serde_json::Value = serde_json::from_str(json)?;
        let Some(object) = root.as_object() else {
            return Err(MapError::ConfigParse("root object is invalid".into()));
        };
        let Some(map_image) = object.get("mapImage").and_then(|v| v.as_str()) else {
            return Err(MapError::ConfigParse("mapImage key is invalid".into()));
        };
        let Some(gates) = object.get("gates").filter(|v| v.is_array()) else {
            return Err(MapError::ConfigParse("gates key is invalid".into()));
        };
        let gates: Vec<GateConfig> = serde_json::from_value(gates.clone())?;
        Ok(Self {
            map_image: map_image.to_string(),
            gates,
        })
    }

    /// Read and parse a JSON map config. `Ok(None)` when the file cannot be opened.
    pub fn open_from_file(path: &Path) -> MapResult<Option<Self>> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "map config not readable");
                return Ok(None);
            }
        };
        Self::parse(&content).map(Some)
    }

    /// The gate list as the JSON array the browser side consumes.
    pub fn gates_json(&self) -> MapResult<String> {
        Ok(serde_json::to_string(&self.gates)?)
    }
}

/// Layout knobs for the wrapper and the recomputation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutOptions {
    #[serde(default = "default_max_width")]
    pub max_width: f64,
    #[serde(default = "default_class_name")]
    pub class_name: String,
    #[serde(default)]
    pub scale_mode: ScaleMode,
}

fn default_max_width() -> f64 {
    1000.0
}

fn default_class_name() -> String {
    "image-map".to_string()
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            max_width: default_max_width(),
            class_name: default_class_name(),
            scale_mode: ScaleMode::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapState {
    /// Image element created, waiting for the load to finish.
    Loading,
    Attached,
    /// The image never loaded; nothing was attached.
    Failed,
    Disposed,
}

/// Where one binding element was put by a recomputation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub index: usize,
    pub element: ElementId,
    pub left: f64,
    pub top: f64,
}

/// Result of one recomputation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reposition {
    pub ratio: ScaleRatio,
    pub placements: Vec<Placement>,
}
