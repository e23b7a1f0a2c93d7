//! Merging the two document sources into one ordered list.
//!
//! The [`build`] function is the heart of the library.  It takes a snapshot
//! of both registries, filters it against the active application, and
//! produces the ordered, deduplicated list the view renders:
//!
//! 1. favorites, in the order the favorites store reports them;
//! 2. recent documents, most recently modified first.
//!
//! A URI appears at most once.  When a document is both a favorite and a
//! recent entry, the favorite wins because it is scanned first.
//!
//! Everything here is pure: locality and existence checks are delegated to
//! the `probe` callback so the ordering rules can be tested without a
//! filesystem.

use crate::document::{ActiveApplicationContext, DocumentCandidate, FileStatus};
use log::trace;
use std::cmp::Reverse;
use std::collections::HashSet;
use std::path::PathBuf;

/// One accepted document and the local path it resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedEntry {
    pub document: DocumentCandidate,
    pub path: PathBuf,
}

/// The ordered result of [`build`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregatedList {
    entries: Vec<AggregatedEntry>,
}

impl AggregatedList {
    pub fn entries(&self) -> &[AggregatedEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<AggregatedEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The URIs in list order.
    pub fn uris(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.document.uri.as_str()).collect()
    }
}

/// Sort recent documents by modification time, newest first.
///
/// The sort is stable, so documents sharing a timestamp keep the order the
/// store reported them in.  Documents without a timestamp go last.
pub fn sort_recent(recent: &mut [DocumentCandidate]) {
    recent.sort_by_key(|d| Reverse(d.last_modified));
}

/// Build the list for `context` from a snapshot of both registries.
pub fn build(
    context: &ActiveApplicationContext,
    favorites: &[DocumentCandidate],
    mut recent: Vec<DocumentCandidate>,
    probe: impl Fn(&str) -> FileStatus,
) -> AggregatedList {
    let mut seen: HashSet<String> = HashSet::new();
    let mut entries = Vec::new();

    let mut accept = |candidate: &DocumentCandidate, is_favorite: bool| {
        if !context.accepts(&candidate.mime_type) {
            trace!("skip {} ({})", candidate.uri, candidate.mime_type);
            return;
        }
        if seen.contains(&candidate.uri) {
            trace!("skip duplicate {}", candidate.uri);
            return;
        }
        let path = match probe(&candidate.uri) {
            FileStatus::Local(path) => path,
            status => {
                trace!("skip {}: {:?}", candidate.uri, status);
                return;
            }
        };
        seen.insert(candidate.uri.clone());
        entries.push(AggregatedEntry {
            document: DocumentCandidate {
                is_favorite,
                ..candidate.clone()
            },
            path,
        });
    };

    for favorite in favorites {
        accept(favorite, true);
    }

    sort_recent(&mut recent);
    for item in &recent {
        accept(item, false);
    }

    AggregatedList { entries }
}
