//! Recent-files store backed by `recently-used.xbel`.
//!
//! GTK applications record every document they open in an XBEL bookmark
//! file under `$XDG_DATA_HOME`.  Each `<bookmark>` carries the document URI
//! in `href`, timestamps as RFC 3339 attributes, and the mime type inside
//! its `<info><metadata>` block:
//!
//! ```xml
//! <bookmark href="file:///home/me/book.pdf" added="2024-01-02T10:00:00Z"
//!           modified="2024-01-03T08:30:00.123456Z" visited="...">
//!   <info>
//!     <metadata owner="http://freedesktop.org">
//!       <mime:mime-type type="application/pdf"/>
//!     </metadata>
//!   </info>
//! </bookmark>
//! ```

use crate::document::DocumentCandidate;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::path::{Path, PathBuf};

/// Errors produced while reading the recent-files store.
#[derive(Debug, thiserror::Error)]
pub enum RecentError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("xbel parse error: {0}")]
    Xml(#[from] quick_xml::Error),
}

/// The recent-files store at a given path.
#[derive(Debug, Clone)]
pub struct RecentFiles {
    path: PathBuf,
}

impl RecentFiles {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// The filesystem path of the bookmark file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every bookmark in file order.  A missing file is an empty store.
    pub fn list(&self) -> Result<Vec<DocumentCandidate>, RecentError> {
        let xml = match std::fs::read_to_string(&self.path) {
            Ok(xml) => xml,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        parse(&xml)
    }
}

/// Parse an XBEL document.
///
/// Bookmarks without a mime type are skipped, since nothing could match
/// them against an application.
pub fn parse(xml: &str) -> Result<Vec<DocumentCandidate>, RecentError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut current: Option<(String, Option<i64>)> = None;
    let mut mime_type: Option<String> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"bookmark" => {
                mime_type = None;
                current = match attribute(&e, b"href")? {
                    Some(href) => Some((href, timestamp(&e)?)),
                    None => None,
                };
            }
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"mime:mime-type" => {
                if current.is_some() {
                    mime_type = attribute(&e, b"type")?;
                }
            }
            Event::End(e) if e.name().as_ref() == b"bookmark" => {
                if let (Some((href, modified)), Some(mime)) = (current.take(), mime_type.take()) {
                    items.push(DocumentCandidate::recent(href, mime, modified));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(items)
}

fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, RecentError> {
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// `modified`, falling back to `added`, as Unix seconds.
fn timestamp(e: &BytesStart<'_>) -> Result<Option<i64>, RecentError> {
    for key in [&b"modified"[..], &b"added"[..]] {
        if let Some(value) = attribute(e, key)? {
            if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(&value) {
                return Ok(Some(dt.timestamp()));
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    const XBEL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xbel version="1.0"
      xmlns:bookmark="http://www.freedesktop.org/standards/desktop-bookmarks"
      xmlns:mime="http://www.freedesktop.org/standards/shared-mime-info">
  <bookmark href="file:///home/me/a.pdf" added="2024-01-01T10:00:00Z" modified="2024-01-03T08:30:00.123456Z" visited="2024-01-03T08:30:00Z">
    <info>
      <metadata owner="http://freedesktop.org">
        <mime:mime-type type="application/pdf"/>
        <bookmark:applications>
          <bookmark:application name="Xreader" exec="&apos;xreader %u&apos;" modified="2024-01-03T08:30:00Z" count="2"/>
        </bookmark:applications>
      </metadata>
    </info>
  </bookmark>
  <bookmark href="file:///home/me/Tom%20%26%20Jerry.epub" added="2024-01-02T10:00:00Z">
    <info>
      <metadata owner="http://freedesktop.org">
        <mime:mime-type type="application/epub+zip"/>
      </metadata>
    </info>
  </bookmark>
  <bookmark href="file:///home/me/nomime.bin" modified="2024-01-02T10:00:00Z"/>
  <bookmark href="sftp://server/b.pdf" modified="not a date">
    <info>
      <metadata owner="http://freedesktop.org">
        <mime:mime-type type="application/pdf"/>
      </metadata>
    </info>
  </bookmark>
</xbel>
"#;

    #[test]
    fn parse_bookmarks() {
        let items = parse(XBEL).unwrap();
        assert_eq!(items.len(), 3);

        assert_eq!(items[0].uri, "file:///home/me/a.pdf");
        assert_eq!(items[0].mime_type, "application/pdf");
        assert_eq!(items[0].last_modified, Some(1704270600));
        assert!(!items[0].is_favorite);

        // No `modified`: falls back to `added`.
        assert_eq!(items[1].uri, "file:///home/me/Tom%20%26%20Jerry.epub");
        assert_eq!(items[1].last_modified, Some(1704189600));

        // Remote entries are kept here; locality is decided later.
        assert_eq!(items[2].uri, "sftp://server/b.pdf");
        assert_eq!(items[2].last_modified, None);
    }

    #[test]
    fn missing_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecentFiles::new(dir.path().join("recently-used.xbel"));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recently-used.xbel");
        std::fs::write(&path, "<xbel><bookmark href=\"file:///a\"></xbel>").unwrap();
        assert!(RecentFiles::new(&path).list().is_err());
    }
}
