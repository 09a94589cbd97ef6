use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::dom::types::Size;
use crate::errors::{MapError, MapResult};
use crate::image_map::types::{ImageMapConfig, LayoutOptions};

pub const CONFIG_FILE_NAME: &str = "gatemap.toml";
pub const CONFIG_ENV_VAR: &str = "GATEMAP_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub map: ImageMapConfig,
    #[serde(default)]
    pub layout: LayoutOptions,
    #[serde(default)]
    pub viewport: ViewportConfig,
}

/// Initial viewport plus the sizes the CLI replays as resize events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewportConfig {
    #[serde(default = "default_width")]
    pub width: f64,
    #[serde(default = "default_height")]
    pub height: f64,
    /// `[width, height]` pairs, applied in order.
    #[serde(default)]
    pub resize_steps: Vec<[f64; 2]>,
}

fn default_width() -> f64 {
    1280.0
}

fn default_height() -> f64 {
    800.0
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            resize_steps: Vec::new(),
        }
    }
}

impl ViewportConfig {
    pub fn initial(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn steps(&self) -> impl Iterator<Item = Size> + '_ {
        self.resize_steps.iter().map(|[w, h]| Size::new(*w, *h))
    }
}

pub fn resolve_config_path() -> MapResult<PathBuf> {
    if let Ok(explicit) = std::env::var(CONFIG_ENV_VAR) {
        let candidate = PathBuf::from(explicit);
        if candidate.exists() {
            tracing::debug!(path = %candidate.display(), "config from {CONFIG_ENV_VAR}");
            return Ok(candidate);
        }
        return Err(MapError::Config(format!(
            "{CONFIG_ENV_VAR} points at {} which does not exist",
            candidate.display()
        )));
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join(CONFIG_FILE_NAME);
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Ok(candidate);
            }
        }
    }

    let cwd = std::env::current_dir()?;
    let candidate = cwd.join(CONFIG_FILE_NAME);
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in working directory");
        return Ok(candidate);
    }

    if let Some(config_dir) = dirs::config_dir() {
        let candidate = config_dir.join("gatemap").join(CONFIG_FILE_NAME);
        if candidate.exists() {
            tracing::debug!(path = %candidate.display(), "config found in user config directory");
            return Ok(candidate);
        }
    }

    Err(MapError::Config(format!(
        "{CONFIG_FILE_NAME} not found via {CONFIG_ENV_VAR}, next to executable, in working directory or user config directory"
    )))
}

pub fn load_config() -> MapResult<(AppConfig, PathBuf)> {
    let path = resolve_config_path()?;
    let config = load_config_from(&path)?;
    Ok((config, path))
}

pub fn load_config_from(path: &Path) -> MapResult<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    tracing::info!(
        path = %path.display(),
        image = %config.map.map_image,
        gates = config.map.gates.len(),
        "config loaded"
    );
    Ok(config)
}

pub fn save_config(config: &AppConfig, path: &Path) -> MapResult<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    tracing::info!(path = %path.display(), "config saved");
    Ok(())
}
