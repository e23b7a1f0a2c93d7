//! Favorites store.
//!
//! Two backends are supported:
//!
//! * [`GSettingsFavorites`]: the XApp favorites shared with the Cinnamon
//!   and MATE file managers, stored in the `list` key of the
//!   `org.x.apps.favorites` schema as `"<uri>::<mime type>"` strings.  The
//!   key is read and written through the `gsettings` tool.
//! * [`FileFavorites`]: a private JSON file, for desktops without XApp.
//!
//! Both keep favorites in insertion order, which is the order the library
//! shows them in.

use crate::document::DocumentCandidate;
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;

pub const SCHEMA: &str = "org.x.apps.favorites";
pub const KEY: &str = "list";

/// Errors produced by a favorites backend.
#[derive(Debug, thiserror::Error)]
pub enum FavoritesError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("gsettings failed: {0}")]
    GSettings(String),
    #[error("unexpected gsettings output: {0}")]
    Parse(String),
}

/// The configured favorites backend.
#[derive(Debug, Clone)]
pub enum Favorites {
    GSettings(GSettingsFavorites),
    File(FileFavorites),
}

impl Favorites {
    pub fn list(&self) -> Result<Vec<DocumentCandidate>, FavoritesError> {
        match self {
            Favorites::GSettings(store) => store.list(),
            Favorites::File(store) => store.list(),
        }
    }

    pub fn add(&self, uri: &str, mime_type: &str) -> Result<(), FavoritesError> {
        match self {
            Favorites::GSettings(store) => store.add(uri, mime_type),
            Favorites::File(store) => store.add(uri, mime_type),
        }
    }

    pub fn remove(&self, uri: &str) -> Result<(), FavoritesError> {
        match self {
            Favorites::GSettings(store) => store.remove(uri),
            Favorites::File(store) => store.remove(uri),
        }
    }
}

//  GSettings

/// XApp favorites through `gsettings`.
#[derive(Debug, Clone, Default)]
pub struct GSettingsFavorites;

impl GSettingsFavorites {
    pub fn new() -> Self {
        Self
    }

    pub fn list(&self) -> Result<Vec<DocumentCandidate>, FavoritesError> {
        let raw = self.read()?;
        Ok(raw.iter().filter_map(|item| parse_item(item)).collect())
    }

    pub fn add(&self, uri: &str, mime_type: &str) -> Result<(), FavoritesError> {
        let mut raw = self.read()?;
        if raw.iter().any(|item| item_uri(item) == uri) {
            return Ok(());
        }
        raw.push(format!("{}::{}", uri, mime_type));
        self.write(&raw)
    }

    pub fn remove(&self, uri: &str) -> Result<(), FavoritesError> {
        let mut raw = self.read()?;
        let before = raw.len();
        raw.retain(|item| item_uri(item) != uri);
        if raw.len() == before {
            return Ok(());
        }
        self.write(&raw)
    }

    fn read(&self) -> Result<Vec<String>, FavoritesError> {
        let output = Command::new("gsettings")
            .args(["get", SCHEMA, KEY])
            .output()?;
        if !output.status.success() {
            return Err(FavoritesError::GSettings(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        let text = String::from_utf8_lossy(&output.stdout);
        parse_string_array(&text).ok_or_else(|| FavoritesError::Parse(text.trim().to_string()))
    }

    fn write(&self, items: &[String]) -> Result<(), FavoritesError> {
        let value = format_string_array(items);
        debug!("gsettings set {} {} {}", SCHEMA, KEY, value);
        let output = Command::new("gsettings")
            .args(["set", SCHEMA, KEY, &value])
            .output()?;
        if output.status.success() {
            Ok(())
        } else {
            Err(FavoritesError::GSettings(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ))
        }
    }
}

/// Split `"<uri>::<mime>"`.  Items without a mime type are dropped.
fn parse_item(item: &str) -> Option<DocumentCandidate> {
    let (uri, mime) = item.rsplit_once("::")?;
    if uri.is_empty() || mime.is_empty() {
        return None;
    }
    Some(DocumentCandidate::favorite(uri, mime))
}

fn item_uri(item: &str) -> &str {
    item.rsplit_once("::").map(|(uri, _)| uri).unwrap_or(item)
}

/// Parse the text form of a GVariant `as` value, e.g. `['a', "b'c"]` or
/// `@as []`.
pub fn parse_string_array(text: &str) -> Option<Vec<String>> {
    let text = text.trim();
    let text = text.strip_prefix("@as").map(str::trim_start).unwrap_or(text);
    let inner = text.strip_prefix('[')?.strip_suffix(']')?;

    let mut items = Vec::new();
    let mut chars = inner.chars().peekable();
    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace() || *c == ',') {
            chars.next();
        }
        let Some(quote) = chars.next() else {
            break;
        };
        if quote != '\'' && quote != '"' {
            return None;
        }
        let mut item = String::new();
        loop {
            match chars.next()? {
                '\\' => item.push(chars.next()?),
                c if c == quote => break,
                c => item.push(c),
            }
        }
        items.push(item);
    }
    Some(items)
}

/// Format a GVariant `as` value that `gsettings set` accepts.
pub fn format_string_array(items: &[String]) -> String {
    let quoted: Vec<String> = items
        .iter()
        .map(|item| format!("'{}'", item.replace('\\', "\\\\").replace('\'', "\\'")))
        .collect();
    format!("[{}]", quoted.join(", "))
}

//  JSON file

#[derive(Debug, Serialize, Deserialize)]
struct FavoriteRecord {
    uri: String,
    mime_type: String,
}

/// Favorites in a JSON file owned by this application.
#[derive(Debug, Clone)]
pub struct FileFavorites {
    path: PathBuf,
}

impl FileFavorites {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// The filesystem path of the favorites file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn list(&self) -> Result<Vec<DocumentCandidate>, FavoritesError> {
        Ok(self
            .read()?
            .into_iter()
            .map(|r| DocumentCandidate::favorite(r.uri, r.mime_type))
            .collect())
    }

    pub fn add(&self, uri: &str, mime_type: &str) -> Result<(), FavoritesError> {
        let mut records = self.read()?;
        if records.iter().any(|r| r.uri == uri) {
            return Ok(());
        }
        records.push(FavoriteRecord {
            uri: uri.to_string(),
            mime_type: mime_type.to_string(),
        });
        self.write(&records)
    }

    pub fn remove(&self, uri: &str) -> Result<(), FavoritesError> {
        let mut records = self.read()?;
        records.retain(|r| r.uri != uri);
        self.write(&records)
    }

    fn read(&self) -> Result<Vec<FavoriteRecord>, FavoritesError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the file atomically so watchers never see a partial write.
    fn write(&self, records: &[FavoriteRecord]) -> Result<(), FavoritesError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(records)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
