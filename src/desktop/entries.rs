//! Desktop-entry registry.
//!
//! Applications are identified by the file name of their desktop entry.
//! Lookup walks the application directories in priority order and parses
//! the first file with that name; a user entry therefore shadows the system
//! one, and a `Hidden=true` entry hides the application entirely.
//!
//! Entries in subdirectories get an id with `-` in place of `/`, so
//! `kde4/okular.desktop` is found as `kde4-okular.desktop`.

use crate::command::ApplicationId;
use crate::document::AppInfo;
use log::debug;
use std::path::{Path, PathBuf};

/// Read-only view of the installed applications.
#[derive(Debug, Clone)]
pub struct DesktopEntries {
    dirs: Vec<PathBuf>,
}

impl DesktopEntries {
    /// Search `dirs` in order.
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    /// Look up `id`.
    ///
    /// Returns `Ok(None)` when no directory contains the entry or the entry
    /// is hidden.
    pub fn find(&self, id: &ApplicationId) -> std::io::Result<Option<AppInfo>> {
        for dir in &self.dirs {
            let Some(path) = resolve(dir, id.as_str()) else {
                continue;
            };
            debug!("desktop entry {}", path.display());
            let contents = std::fs::read_to_string(&path)?;
            return Ok(parse(id, &contents));
        }
        Ok(None)
    }
}

/// Find the file for desktop-file id `name` under `dir`, trying each `-`
/// as a possible directory separator.
fn resolve(dir: &Path, name: &str) -> Option<PathBuf> {
    let direct = dir.join(name);
    if direct.is_file() {
        return Some(direct);
    }
    name.match_indices('-').find_map(|(i, _)| {
        let sub = dir.join(&name[..i]);
        if sub.is_dir() {
            resolve(&sub, &name[i + 1..])
        } else {
            None
        }
    })
}

/// Parse the `[Desktop Entry]` group of a desktop file.
///
/// Only unlocalised keys are read.  Returns `None` for hidden entries and
/// for entries that are not applications.
pub fn parse(id: &ApplicationId, contents: &str) -> Option<AppInfo> {
    let mut in_group = false;
    let mut name = None;
    let mut exec = None;
    let mut mime_types = Vec::new();
    let mut kind = None;
    let mut hidden = false;
    let mut no_display = false;

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with('[') {
            in_group = line == "[Desktop Entry]";
            continue;
        }
        if !in_group {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "Name" => name = Some(value.to_string()),
            "Exec" => exec = Some(value.to_string()),
            "Type" => kind = Some(value.to_string()),
            "Hidden" => hidden = value == "true",
            "NoDisplay" => no_display = value == "true",
            "MimeType" => {
                mime_types = value
                    .split(';')
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            _ => {}
        }
    }

    if hidden || kind.as_deref().is_some_and(|k| k != "Application") {
        return None;
    }

    Some(AppInfo {
        id: id.clone(),
        name: name.unwrap_or_else(|| id.as_str().trim_end_matches(".desktop").to_string()),
        exec,
        mime_types,
        no_display,
    })
}

/// Expand the field codes of an `Exec` line for a single file.
///
/// `%f`/`%F` become the path, `%u`/`%U` the URI, `%%` a literal percent;
/// every other field code is dropped.  Quoting is honoured for arguments
/// wrapped in double quotes.
pub fn expand_exec(exec: &str, path: &Path, uri: &str) -> Vec<String> {
    let mut args = Vec::new();
    for word in split_exec(exec) {
        match word.as_str() {
            "%f" | "%F" => args.push(path.to_string_lossy().into_owned()),
            "%u" | "%U" => args.push(uri.to_string()),
            "%i" | "%c" | "%k" => {}
            _ => {
                let mut out = String::with_capacity(word.len());
                let mut chars = word.chars();
                while let Some(c) = chars.next() {
                    if c != '%' {
                        out.push(c);
                        continue;
                    }
                    match chars.next() {
                        Some('%') => out.push('%'),
                        Some('f') | Some('F') => out.push_str(&path.to_string_lossy()),
                        Some('u') | Some('U') => out.push_str(uri),
                        _ => {}
                    }
                }
                if !out.is_empty() {
                    args.push(out);
                }
            }
        }
    }
    args
}

fn split_exec(exec: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = exec.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => quoted = !quoted,
            '\\' if quoted => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            c if c.is_whitespace() && !quoted => {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const XREADER: &str = "\
[Desktop Entry]
Name=Xreader
Name[fr]=Lecteur
Exec=xreader %U
Type=Application
MimeType=application/pdf;application/epub+zip;

[Desktop Action New]
Name=New Window
MimeType=text/plain;
";

    fn id(s: &str) -> ApplicationId {
        ApplicationId::parse(s).unwrap()
    }

    #[test]
    fn parse_reads_main_group_only() {
        let app = parse(&id("xreader"), XREADER).unwrap();
        assert_eq!(app.name, "Xreader");
        assert_eq!(app.exec.as_deref(), Some("xreader %U"));
        assert_eq!(app.mime_types, vec!["application/pdf", "application/epub+zip"]);
        assert!(!app.no_display);
    }

    #[test]
    fn no_display_entries_are_still_applications() {
        let entry = "[Desktop Entry]\nName=Helper\nType=Application\nNoDisplay=true\nMimeType=application/pdf;\n";
        let app = parse(&id("helper"), entry).unwrap();
        assert!(app.no_display);
        assert_eq!(app.mime_types, vec!["application/pdf"]);
    }

    #[test]
    fn subdirectory_entries_found_by_dashed_id() {
        let dir = tempfile::tempdir().unwrap();
        let kde = dir.path().join("kde4");
        fs::create_dir_all(&kde).unwrap();
        fs::write(kde.join("okular.desktop"), "[Desktop Entry]\nName=Okular\nType=Application\n").unwrap();
        fs::write(dir.path().join("my-viewer.desktop"), "[Desktop Entry]\nName=Mine\nType=Application\n").unwrap();

        let entries = DesktopEntries::new(vec![dir.path().to_path_buf()]);
        assert_eq!(entries.find(&id("kde4-okular")).unwrap().unwrap().name, "Okular");
        assert_eq!(entries.find(&id("my-viewer")).unwrap().unwrap().name, "Mine");
        assert!(entries.find(&id("kde4-missing")).unwrap().is_none());
    }

    #[test]
    fn hidden_and_non_application_entries_ignored() {
        let hidden = "[Desktop Entry]\nName=X\nType=Application\nHidden=true\n";
        assert!(parse(&id("x"), hidden).is_none());
        let link = "[Desktop Entry]\nName=Site\nType=Link\nURL=https://example.org\n";
        assert!(parse(&id("site"), link).is_none());
    }

    #[test]
    fn user_entry_shadows_system_entry() {
        let user = tempfile::tempdir().unwrap();
        let system = tempfile::tempdir().unwrap();
        fs::write(system.path().join("xreader.desktop"), XREADER).unwrap();
        fs::write(
            user.path().join("xreader.desktop"),
            "[Desktop Entry]\nName=My Reader\nType=Application\nMimeType=application/pdf;\n",
        )
        .unwrap();

        let entries = DesktopEntries::new(vec![
            user.path().to_path_buf(),
            system.path().to_path_buf(),
        ]);
        let app = entries.find(&id("xreader")).unwrap().unwrap();
        assert_eq!(app.name, "My Reader");
        assert_eq!(app.mime_types, vec!["application/pdf"]);
        assert!(entries.find(&id("missing")).unwrap().is_none());
    }

    #[test]
    fn expand_exec_field_codes() {
        let path = Path::new("/home/me/My Book.pdf");
        let uri = "file:///home/me/My%20Book.pdf";
        assert_eq!(
            expand_exec("xreader %U", path, uri),
            vec!["xreader", "file:///home/me/My%20Book.pdf"]
        );
        assert_eq!(
            expand_exec("soffice --writer %F %i", path, uri),
            vec!["soffice", "--writer", "/home/me/My Book.pdf"]
        );
        assert_eq!(
            expand_exec(r#""/opt/My Viewer/bin" --pct=100%% %f"#, path, uri),
            vec!["/opt/My Viewer/bin", "--pct=100%", "/home/me/My Book.pdf"]
        );
    }
}
