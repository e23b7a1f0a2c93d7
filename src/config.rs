//! Application configuration.
//!
//! The configuration is loaded from `$XDG_CONFIG_HOME/thingy/config.json`.
//! Every key is optional; a missing file or a minimal `{}` yields the
//! compiled-in defaults, which list Xreader documents from the XApp
//! favorites and the GTK recent files.
//!
//! # Example
//!
//! ```json
//! {
//!   "applications": ["xreader", "libreoffice-writer"],
//!   "hidden_mime_types": { "libreoffice-writer.desktop": ["text/plain"] },
//!   "favorites": { "backend": "file" },
//!   "viewer_command": "xreader",
//!   "window": { "default_width": 900, "default_height": 600 }
//! }
//! ```

use crate::command::ApplicationId;
use crate::library::LibrarySettings;
use crate::mime::{self, HiddenMimeTable};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Applications offered in the selector, most preferred first.  The
    /// first installed one is selected at startup.
    pub applications: Vec<ApplicationId>,

    /// Mime types listed when the selected application is not installed
    /// or declares none.
    pub fallback_mime_types: Vec<String>,

    /// Mime types never listed for a given application.
    pub hidden_mime_types: HiddenMimeTable,

    pub favorites: FavoritesConfig,

    /// Last-resort command for opening a document; the file path is
    /// appended.
    pub viewer_command: Option<String>,

    /// Directory holding the `doc.svg` / `doc-<ext>.svg` fallback icons.
    pub icon_dir: PathBuf,

    /// Query reading progress for every document.  Costs one `gio`
    /// process per tile and rebuild.
    pub read_progress: bool,

    pub window: WindowConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            applications: vec![ApplicationId(mime::DEFAULT_APPLICATION.to_string())],
            fallback_mime_types: mime::default_fallback(),
            hidden_mime_types: HiddenMimeTable::default(),
            favorites: FavoritesConfig::default(),
            viewer_command: Some("xreader".into()),
            icon_dir: PathBuf::from("/usr/share/thingy"),
            read_progress: true,
            window: WindowConfig::default(),
        }
    }
}

/// Where favorites are stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FavoritesBackend {
    /// The XApp favorites shared with the file manager.
    #[default]
    GSettings,
    /// A JSON file owned by this application.
    File,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FavoritesConfig {
    pub backend: FavoritesBackend,
    /// Path of the favorites file for the `file` backend.  Defaults to
    /// `$XDG_DATA_HOME/thingy/favorites.json`.
    pub path: Option<PathBuf>,
}

impl FavoritesConfig {
    pub fn file_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| paths::data_home().join("thingy").join("favorites.json"))
    }
}

/// Initial window size, used until a size has been saved.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub default_width: i32,
    pub default_height: i32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            default_width: 800,
            default_height: 600,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| ConfigError(format!("failed to parse {}: {}", path.display(), e)))?;
        Ok(config)
    }

    /// The part of the configuration the library needs for rebuilds.
    pub fn library_settings(&self) -> LibrarySettings {
        let applications = if self.applications.is_empty() {
            LibrarySettings::default().applications
        } else {
            self.applications.clone()
        };
        LibrarySettings {
            applications,
            fallback_mime_types: self.fallback_mime_types.clone(),
            hidden_mime_types: self.hidden_mime_types.clone(),
        }
    }
}

/// Error from loading or parsing a configuration file.
#[derive(Debug, thiserror::Error)]
#[error("config error: {0}")]
pub struct ConfigError(String);
