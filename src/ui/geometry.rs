//! Window size persistence (`$XDG_CONFIG_HOME/thingy/window.json`).

use crate::config::WindowConfig;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Smallest size restored from disk; anything below is treated as junk.
const MIN_SIZE: i32 = 200;

#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The window size saved when the window closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowGeometry {
    pub width: i32,
    pub height: i32,
    #[serde(default)]
    pub maximized: bool,
}

impl WindowGeometry {
    pub fn from_config(config: &WindowConfig) -> Self {
        Self {
            width: config.default_width,
            height: config.default_height,
            maximized: false,
        }
    }

    pub fn load(path: &Path) -> Result<Self, GeometryError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// The saved geometry, or the configured default when there is none
    /// or it is unusable.
    pub fn load_or_default(path: &Path, config: &WindowConfig) -> Self {
        match Self::load(path) {
            Ok(g) if g.width >= MIN_SIZE && g.height >= MIN_SIZE => {
                debug!("restoring window {}x{}", g.width, g.height);
                g
            }
            Ok(g) => {
                info!("ignoring saved window size {}x{}", g.width, g.height);
                Self::from_config(config)
            }
            Err(e) => {
                debug!("no saved window size ({})", e);
                Self::from_config(config)
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), GeometryError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
