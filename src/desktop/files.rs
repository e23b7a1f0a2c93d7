//! Per-file queries: locality and existence, display name, thumbnail and
//! reading progress.
//!
//! Thumbnails come from the shared freedesktop thumbnail cache, where a
//! file's thumbnail is named after the MD5 of its URI.  Reading progress is
//! the page Xreader remembers for each document, stored as GVfs metadata
//! and read back with `gio info`.

use crate::document::{FileDetails, FileStatus};
use crate::uri;
use log::trace;
use md5::{Digest, Md5};
use std::path::{Path, PathBuf};
use std::process::Command;

pub const PAGE_ATTRIBUTE: &str = "metadata::xreader::page";
pub const PAGES_ATTRIBUTE: &str = "metadata::xreader::num-pages";

/// Thumbnail sizes, largest first.
const THUMBNAIL_SIZES: &[&str] = &["xx-large", "x-large", "large", "normal"];

/// Answers file questions for the library.
#[derive(Debug, Clone)]
pub struct FileInspector {
    thumbnail_root: PathBuf,
    icon_dir: PathBuf,
    read_progress: bool,
}

impl FileInspector {
    /// `thumbnail_root` is the `thumbnails` directory of the cache;
    /// `icon_dir` holds the `doc*.svg` fallback icons.
    pub fn new(thumbnail_root: PathBuf, icon_dir: PathBuf, read_progress: bool) -> Self {
        Self {
            thumbnail_root,
            icon_dir,
            read_progress,
        }
    }

    /// Whether `uri` is an existing local file.
    pub fn probe(&self, uri: &str) -> FileStatus {
        match uri::to_path(uri) {
            None => FileStatus::NonLocal,
            Some(path) if path.exists() => FileStatus::Local(path),
            Some(_) => FileStatus::Missing,
        }
    }

    pub fn details(&self, uri: &str, path: &Path) -> FileDetails {
        FileDetails {
            display_name: display_name(uri, path),
            thumbnail: self.thumbnail(uri),
            fallback_icon: fallback_icon(&self.icon_dir, path),
            progress: if self.read_progress {
                read_progress(uri)
            } else {
                None
            },
        }
    }

    /// The largest cached thumbnail for `uri`, if one exists.
    pub fn thumbnail(&self, uri: &str) -> Option<PathBuf> {
        let name = thumbnail_name(uri);
        THUMBNAIL_SIZES
            .iter()
            .map(|size| self.thumbnail_root.join(size).join(&name))
            .find(|p| p.is_file())
    }
}

fn display_name(uri: &str, path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| uri::display_name(uri))
}

/// `<md5 of uri>.png`.
pub fn thumbnail_name(uri: &str) -> String {
    format!("{:x}.png", Md5::digest(uri.as_bytes()))
}

/// `doc-<ext>.svg` when the icon directory has one for the extension,
/// `doc.svg` otherwise.
pub fn fallback_icon(icon_dir: &Path, path: &Path) -> PathBuf {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().trim().to_lowercase())
        .unwrap_or_default();
    if !ext.is_empty() {
        let specific = icon_dir.join(format!("doc-{}.svg", ext));
        if specific.is_file() {
            return specific;
        }
    }
    icon_dir.join("doc.svg")
}

/// Reading progress from the two page attributes.
///
/// Absent, unparsable or zero values mean "not tracked".
pub fn progress(page: Option<&str>, pages: Option<&str>) -> Option<f64> {
    let page: u32 = page?.trim().parse().ok()?;
    let pages: u32 = pages?.trim().parse().ok()?;
    if page == 0 || pages == 0 {
        return None;
    }
    Some((f64::from(page) / f64::from(pages)).min(1.0))
}

/// Extract an attribute value from `gio info` output.
pub fn gio_attribute<'a>(output: &'a str, name: &str) -> Option<&'a str> {
    output.lines().find_map(|line| {
        let (key, value) = line.trim().split_once(": ")?;
        (key == name).then_some(value)
    })
}

fn read_progress(uri: &str) -> Option<f64> {
    let attributes = format!("{},{}", PAGE_ATTRIBUTE, PAGES_ATTRIBUTE);
    let output = match Command::new("gio")
        .args(["info", "-a", &attributes, uri])
        .output()
    {
        Ok(o) if o.status.success() => o,
        Ok(_) | Err(_) => {
            trace!("no metadata for {}", uri);
            return None;
        }
    };
    let text = String::from_utf8_lossy(&output.stdout);
    progress(
        gio_attribute(&text, PAGE_ATTRIBUTE),
        gio_attribute(&text, PAGES_ATTRIBUTE),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn probe_classifies_uris() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a b.pdf");
        fs::write(&file, b"%PDF").unwrap();
        let inspector = FileInspector::new(dir.path().join("thumbs"), dir.path().into(), false);

        assert_eq!(inspector.probe(&uri::from_path(&file)), FileStatus::Local(file.clone()));
        assert_eq!(
            inspector.probe(&uri::from_path(&dir.path().join("gone.pdf"))),
            FileStatus::Missing
        );
        assert_eq!(inspector.probe("smb://nas/a.pdf"), FileStatus::NonLocal);
    }

    #[test]
    fn thumbnail_name_is_md5_of_uri() {
        assert_eq!(
            thumbnail_name("file:///home/jens/photos/me.png"),
            "c6ee772d9e49320e97ec29a7eb5b1697.png"
        );
    }

    #[test]
    fn largest_thumbnail_wins() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("thumbnails");
        let uri = "file:///docs/a.pdf";
        for size in ["normal", "large"] {
            fs::create_dir_all(root.join(size)).unwrap();
            fs::write(root.join(size).join(thumbnail_name(uri)), b"png").unwrap();
        }
        let inspector = FileInspector::new(root.clone(), dir.path().into(), false);
        assert_eq!(
            inspector.thumbnail(uri),
            Some(root.join("large").join(thumbnail_name(uri)))
        );
        assert_eq!(inspector.thumbnail("file:///docs/other.pdf"), None);
    }

    #[test]
    fn fallback_icon_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("doc-epub.svg"), b"<svg/>").unwrap();
        assert_eq!(
            fallback_icon(dir.path(), Path::new("/b/Book.EPUB")),
            dir.path().join("doc-epub.svg")
        );
        assert_eq!(
            fallback_icon(dir.path(), Path::new("/b/paper.pdf")),
            dir.path().join("doc.svg")
        );
        assert_eq!(
            fallback_icon(dir.path(), Path::new("/b/README")),
            dir.path().join("doc.svg")
        );
    }

    #[test]
    fn progress_rules() {
        assert_eq!(progress(Some("25"), Some("100")), Some(0.25));
        assert_eq!(progress(Some("120"), Some("100")), Some(1.0));
        assert_eq!(progress(Some("0"), Some("100")), None);
        assert_eq!(progress(Some("5"), Some("0")), None);
        assert_eq!(progress(Some("five"), Some("10")), None);
        assert_eq!(progress(None, Some("10")), None);
        assert_eq!(progress(Some("3"), None), None);
    }

    #[test]
    fn parse_gio_info_output() {
        let output = "\
uri: file:///home/me/a.pdf
local path: /home/me/a.pdf
attributes:
  metadata::xreader::page: 12
  metadata::xreader::num-pages: 48
";
        assert_eq!(gio_attribute(output, PAGE_ATTRIBUTE), Some("12"));
        assert_eq!(gio_attribute(output, PAGES_ATTRIBUTE), Some("48"));
        assert_eq!(
            progress(gio_attribute(output, PAGE_ATTRIBUTE), gio_attribute(output, PAGES_ATTRIBUTE)),
            Some(0.25)
        );
        assert_eq!(gio_attribute(output, "standard::size"), None);
    }
}
