//! Commands understood by the library.
//!
//! A [`Command`] is either a user action coming from the view or the
//! command socket (open, reveal, favorite, trash, reselect) or a change
//! notification coming from one of the watched registries.  Every command
//! ends up in [`Library::handle`](crate::library::Library::handle) on the
//! owning thread.
//!
//! Application ids on the wire may omit the `.desktop` suffix; the daemon
//! normalises them (see [`ApplicationId`]).

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Identifier of a desktop application, i.e. the desktop-entry file name
/// (`xreader.desktop`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ApplicationId(pub(crate) String);

impl ApplicationId {
    /// Build an id, appending `.desktop` when the suffix is missing.
    ///
    /// Returns `None` for empty (or whitespace-only) input.
    pub fn parse(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.ends_with(".desktop") {
            Some(Self(trimmed.to_string()))
        } else {
            Some(Self(format!("{}.desktop", trimmed)))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ApplicationId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ApplicationId::parse(&s)
            .ok_or_else(|| DeError::custom(format!("invalid application id: {:?}", s)))
    }
}

/// Everything the library can be asked to do.
///
/// # Wire format
///
/// Externally tagged JSON, one command per line:
///
/// ```json
/// {"Open":"file:///home/me/book.pdf"}
/// {"SelectApplication":"libreoffice-writer"}
/// "Refresh"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Open the document with the default handler (or the viewer).
    Open(String),
    /// Show the document in the file manager.
    Reveal(String),
    /// Add the document to the favorites, or remove it if already there.
    ToggleFavorite(String),
    /// Move the document to the trash.
    Trash(String),
    /// Switch the active application and rebuild the list.
    SelectApplication(ApplicationId),
    /// Rebuild the list from scratch.
    Refresh,
    /// The favorites store reported a change.
    FavoritesChanged,
    /// The recent-files store reported a change.
    RecentChanged,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Open(uri) => write!(f, "open {}", uri),
            Command::Reveal(uri) => write!(f, "reveal {}", uri),
            Command::ToggleFavorite(uri) => write!(f, "toggle favorite {}", uri),
            Command::Trash(uri) => write!(f, "trash {}", uri),
            Command::SelectApplication(id) => write!(f, "select application {}", id),
            Command::Refresh => write!(f, "refresh"),
            Command::FavoritesChanged => write!(f, "favorites changed"),
            Command::RecentChanged => write!(f, "recent files changed"),
        }
    }
}
