//! Data types shared by the aggregator, the backends and the view.

use crate::command::ApplicationId;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// A document reported by one of the source registries.
///
/// Produced by a reader and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentCandidate {
    pub uri: String,
    pub mime_type: String,
    pub is_favorite: bool,
    /// Last modification time in seconds since the Unix epoch, when the
    /// store records one.
    pub last_modified: Option<i64>,
}

impl DocumentCandidate {
    /// A candidate coming from the favorites store.
    pub fn favorite(uri: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            mime_type: mime_type.into(),
            is_favorite: true,
            last_modified: None,
        }
    }

    /// A candidate coming from the recent-files store.
    pub fn recent(
        uri: impl Into<String>,
        mime_type: impl Into<String>,
        last_modified: Option<i64>,
    ) -> Self {
        Self {
            uri: uri.into(),
            mime_type: mime_type.into(),
            is_favorite: false,
            last_modified,
        }
    }
}

/// An installed desktop application as described by its desktop entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppInfo {
    pub id: ApplicationId,
    pub name: String,
    /// The raw `Exec=` line, field codes included.
    pub exec: Option<String>,
    pub mime_types: Vec<String>,
    /// `NoDisplay=true`: usable, but not offered in the selector.
    pub no_display: bool,
}

/// The application whose documents are listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveApplicationContext {
    pub application_id: ApplicationId,
    pub display_name: String,
    pub supported_mime_types: BTreeSet<String>,
    pub hidden_mime_types: BTreeSet<String>,
    #[serde(skip)]
    pub exec: Option<String>,
}

impl ActiveApplicationContext {
    /// Whether a document of `mime_type` may appear in the list.
    pub fn accepts(&self, mime_type: &str) -> bool {
        self.supported_mime_types.contains(mime_type)
            && !self.hidden_mime_types.contains(mime_type)
    }
}

/// Outcome of probing a URI for locality and existence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    /// Not a `file://` URI.
    NonLocal,
    /// Local, but nothing exists at the path.
    Missing,
    /// An existing local file.
    Local(PathBuf),
}

/// Per-document display metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileDetails {
    pub display_name: String,
    pub thumbnail: Option<PathBuf>,
    pub fallback_icon: PathBuf,
    /// Reading progress in `0.0..=1.0`, when the viewer tracks it.
    pub progress: Option<f64>,
}

/// One entry of a published list: the candidate plus what the view needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tile {
    #[serde(flatten)]
    pub document: DocumentCandidate,
    pub path: PathBuf,
    pub details: FileDetails,
}

impl Tile {
    pub fn uri(&self) -> &str {
        &self.document.uri
    }

    pub fn is_favorite(&self) -> bool {
        self.document.is_favorite
    }
}

/// An application the user can switch to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationChoice {
    pub id: ApplicationId,
    pub name: String,
}

/// An immutable snapshot of the aggregated list, as handed to the view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Shelf {
    /// Generation of the rebuild that produced this snapshot.
    pub generation: u64,
    pub context: ActiveApplicationContext,
    /// Configured applications that are installed, in configuration order.
    pub applications: Vec<ApplicationChoice>,
    pub tiles: Vec<Tile>,
}

impl Shelf {
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Look up a tile by URI.
    pub fn get(&self, uri: &str) -> Option<&Tile> {
        self.tiles.iter().find(|t| t.uri() == uri)
    }
}
