//! Mime-type resolution for the active application.
//!
//! The set of documents shown depends on which application the library is
//! built for: its desktop entry declares the mime types it can open.  When
//! the entry is missing the built-in Xreader list is used instead.
//!
//! Some applications declare types that make poor library entries (an
//! office suite opens plain text, but a shelf full of log files is not
//! useful).  [`HiddenMimeTable`] lists those exceptions per application.

use crate::command::ApplicationId;
use crate::document::{ActiveApplicationContext, AppInfo};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Document types Xreader opens, used when no desktop entry is found.
pub const XREADER_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "application/x-bzpdf",
    "application/x-gzpdf",
    "application/x-xzpdf",
    "application/postscript",
    "application/x-bzpostscript",
    "application/x-gzpostscript",
    "image/x-eps",
    "image/x-bzeps",
    "image/x-gzeps",
    "application/x-dvi",
    "application/x-bzdvi",
    "application/x-gzdvi",
    "image/vnd.djvu",
    "image/vnd.djvu+multipage",
    "image/tiff",
    "application/x-cbr",
    "application/x-cbz",
    "application/x-cb7",
    "application/x-cbt",
    "application/vnd.comicbook+zip",
    "application/vnd.comicbook-rar",
    "application/oxps",
    "application/vnd.ms-xpsdocument",
    "application/epub+zip",
];

/// The application used when nothing else is configured.
pub const DEFAULT_APPLICATION: &str = "xreader.desktop";

/// `XREADER_MIME_TYPES` as owned strings.
pub fn default_fallback() -> Vec<String> {
    XREADER_MIME_TYPES.iter().map(|s| s.to_string()).collect()
}

/// Return the mime types supported by `app`.
///
/// Falls back to `fallback` when the application is not installed or its
/// entry declares no types.
pub fn resolve(app: Option<&AppInfo>, fallback: &[String]) -> BTreeSet<String> {
    match app {
        Some(info) if !info.mime_types.is_empty() => info.mime_types.iter().cloned().collect(),
        _ => fallback.iter().cloned().collect(),
    }
}

/// Per-application exceptions: `(application, mime type)` pairs that never
/// appear in the list even though the application supports them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HiddenMimeTable(BTreeMap<ApplicationId, BTreeSet<String>>);

impl Default for HiddenMimeTable {
    fn default() -> Self {
        let mut table = Self::empty();
        table.insert(
            ApplicationId("libreoffice-writer.desktop".to_string()),
            "text/plain",
        );
        table
    }
}

impl HiddenMimeTable {
    /// An empty table.
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, app: ApplicationId, mime_type: impl Into<String>) {
        self.0.entry(app).or_default().insert(mime_type.into());
    }

    pub fn is_hidden(&self, app: &ApplicationId, mime_type: &str) -> bool {
        self.0.get(app).is_some_and(|set| set.contains(mime_type))
    }

    /// The hidden set for `app` (empty when it has no exceptions).
    pub fn hidden_for(&self, app: &ApplicationId) -> BTreeSet<String> {
        self.0.get(app).cloned().unwrap_or_default()
    }
}

/// Build the context for `id` from its (optional) desktop entry.
pub fn context_for(
    id: &ApplicationId,
    app: Option<&AppInfo>,
    fallback: &[String],
    hidden: &HiddenMimeTable,
) -> ActiveApplicationContext {
    let display_name = app
        .map(|a| a.name.clone())
        .unwrap_or_else(|| id.as_str().trim_end_matches(".desktop").to_string());
    ActiveApplicationContext {
        application_id: id.clone(),
        display_name,
        supported_mime_types: resolve(app, fallback),
        hidden_mime_types: hidden.hidden_for(id),
        exec: app.and_then(|a| a.exec.clone()),
    }
}

/// Pick the application to start with: the first configured candidate
/// that is installed, else the first candidate, else Xreader.
pub fn default_application(
    candidates: &[ApplicationId],
    is_installed: impl Fn(&ApplicationId) -> bool,
) -> ApplicationId {
    candidates
        .iter()
        .find(|id| is_installed(id))
        .or_else(|| candidates.first())
        .cloned()
        .unwrap_or_else(|| ApplicationId(DEFAULT_APPLICATION.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ApplicationId {
        ApplicationId::parse(s).unwrap()
    }

    fn app(name: &str, mimes: &[&str]) -> AppInfo {
        AppInfo {
            id: id(name),
            name: name.to_string(),
            exec: None,
            mime_types: mimes.iter().map(|s| s.to_string()).collect(),
            no_display: false,
        }
    }

    #[test]
    fn resolve_uses_declared_types() {
        let a = app("writer", &["application/vnd.oasis.opendocument.text", "text/plain"]);
        let set = resolve(Some(&a), &default_fallback());
        assert_eq!(set.len(), 2);
        assert!(set.contains("text/plain"));
        assert!(!set.contains("application/pdf"));
    }

    #[test]
    fn resolve_falls_back_when_missing_or_empty() {
        let fallback = default_fallback();
        assert_eq!(resolve(None, &fallback).len(), XREADER_MIME_TYPES.len());
        let bare = app("bare", &[]);
        assert!(resolve(Some(&bare), &fallback).contains("application/epub+zip"));
    }

    #[test]
    fn default_table_hides_plain_text_for_writer() {
        let table = HiddenMimeTable::default();
        assert!(table.is_hidden(&id("libreoffice-writer"), "text/plain"));
        assert!(!table.is_hidden(&id("xreader"), "text/plain"));
        assert!(table.hidden_for(&id("xreader")).is_empty());
    }

    #[test]
    fn context_hides_exceptions() {
        let writer = app("libreoffice-writer", &["text/plain", "application/msword"]);
        let ctx = context_for(
            &id("libreoffice-writer"),
            Some(&writer),
            &default_fallback(),
            &HiddenMimeTable::default(),
        );
        assert!(ctx.supported_mime_types.contains("text/plain"));
        assert!(!ctx.accepts("text/plain"));
        assert!(ctx.accepts("application/msword"));
    }

    #[test]
    fn context_without_entry_uses_id_as_name() {
        let ctx = context_for(&id("xreader"), None, &default_fallback(), &HiddenMimeTable::empty());
        assert_eq!(ctx.display_name, "xreader");
        assert!(ctx.accepts("application/pdf"));
    }

    #[test]
    fn default_application_prefers_installed() {
        let candidates = vec![id("xreader"), id("evince"), id("okular")];
        let picked = default_application(&candidates, |a| a.as_str() == "evince.desktop");
        assert_eq!(picked, id("evince"));
        let none_installed = default_application(&candidates, |_| false);
        assert_eq!(none_installed, id("xreader"));
        assert_eq!(default_application(&[], |_| true), id(DEFAULT_APPLICATION));
    }

    #[test]
    fn hidden_table_deserializes_from_map() {
        let json = r#"{ "xreader": ["image/tiff"] }"#;
        let table: HiddenMimeTable = serde_json::from_str(json).unwrap();
        assert!(table.is_hidden(&id("xreader"), "image/tiff"));
    }
}
