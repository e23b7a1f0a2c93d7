//! Moving documents to the trash.
//!
//! Files are moved into the home trash (`$XDG_DATA_HOME/Trash`) as laid out
//! by the freedesktop Trash specification: the file goes to `files/` and a
//! `.trashinfo` record with its original path and the deletion date goes to
//! `info/`, so the file manager can restore it.  Files on another
//! filesystem cannot be renamed into the home trash; those are handed to
//! `gio trash`, which knows about per-volume trash directories.

use crate::uri;
use log::{debug, info};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Errors produced while trashing.
#[derive(Debug, thiserror::Error)]
pub enum TrashError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a local file: {0}")]
    NotLocal(String),
    #[error("gio trash failed: {0}")]
    Gio(String),
}

/// The home trash directory.
#[derive(Debug, Clone)]
pub struct HomeTrash {
    root: PathBuf,
}

impl HomeTrash {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Trash the document at `uri`.
    pub fn trash_uri(&self, uri: &str) -> Result<(), TrashError> {
        let path = uri::to_path(uri).ok_or_else(|| TrashError::NotLocal(uri.to_string()))?;
        match self.trash(&path) {
            Ok(name) => {
                info!("trashed {} as {}", path.display(), name);
                Ok(())
            }
            Err(TrashError::Io(e)) if crosses_devices(&e) => {
                debug!("{} is on another device, using gio", path.display());
                gio_trash(uri)
            }
            Err(e) => Err(e),
        }
    }

    /// Move `path` into the trash and return the name it got there.
    pub fn trash(&self, path: &Path) -> Result<String, TrashError> {
        let files = self.root.join("files");
        let info = self.root.join("info");
        std::fs::create_dir_all(&files)?;
        std::fs::create_dir_all(&info)?;

        let original = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| TrashError::NotLocal(path.display().to_string()))?;

        // Creating the info file exclusively reserves the name.
        let mut n = 1u32;
        let (name, info_path, mut info_file) = loop {
            let name = candidate_name(&original, n);
            n += 1;
            if files.join(&name).exists() {
                continue;
            }
            let info_path = info.join(format!("{}.trashinfo", name));
            match OpenOptions::new().write(true).create_new(true).open(&info_path) {
                Ok(f) => break (name, info_path, f),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        };

        let deleted_at = chrono::Local::now().format("%Y-%m-%dT%H:%M:%S").to_string();
        let record = trash_info(path, &deleted_at);
        if let Err(e) = info_file.write_all(record.as_bytes()) {
            let _ = std::fs::remove_file(&info_path);
            return Err(e.into());
        }

        if let Err(e) = std::fs::rename(path, files.join(&name)) {
            let _ = std::fs::remove_file(&info_path);
            return Err(e.into());
        }
        Ok(name)
    }
}

fn crosses_devices(e: &std::io::Error) -> bool {
    e.kind() == std::io::ErrorKind::CrossesDevices
}

/// `name`, then `stem.2.ext`, `stem.3.ext`, …
fn candidate_name(original: &str, n: u32) -> String {
    if n == 1 {
        return original.to_string();
    }
    match original.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}.{}.{}", stem, n, ext),
        _ => format!("{}.{}", original, n),
    }
}

/// The contents of a `.trashinfo` file.
pub fn trash_info(original: &Path, deleted_at: &str) -> String {
    let escaped = uri::from_path(original);
    let escaped = escaped.strip_prefix("file://").unwrap_or(&escaped);
    format!("[Trash Info]\nPath={}\nDeletionDate={}\n", escaped, deleted_at)
}

fn gio_trash(uri: &str) -> Result<(), TrashError> {
    let output = Command::new("gio").args(["trash", uri]).output()?;
    if output.status.success() {
        Ok(())
    } else {
        Err(TrashError::Gio(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn trash_info_escapes_path() {
        assert_eq!(
            trash_info(Path::new("/home/me/My Book.pdf"), "2024-01-02T03:04:05"),
            "[Trash Info]\nPath=/home/me/My%20Book.pdf\nDeletionDate=2024-01-02T03:04:05\n"
        );
    }

    #[test]
    fn cross_device_errors_recognised() {
        let exdev = std::io::Error::from(std::io::ErrorKind::CrossesDevices);
        assert!(crosses_devices(&exdev));
        // EXDEV, as rename(2) reports it.
        assert!(crosses_devices(&std::io::Error::from_raw_os_error(18)));
        let missing = std::io::Error::from(std::io::ErrorKind::NotFound);
        assert!(!crosses_devices(&missing));
    }

    #[test]
    fn candidate_names() {
        assert_eq!(candidate_name("a.pdf", 1), "a.pdf");
        assert_eq!(candidate_name("a.pdf", 2), "a.2.pdf");
        assert_eq!(candidate_name("README", 3), "README.3");
        assert_eq!(candidate_name(".hidden", 2), ".hidden.2");
    }

    #[test]
    fn trash_moves_file_and_writes_info() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("paper.pdf");
        fs::write(&doc, b"%PDF").unwrap();
        let trash = HomeTrash::new(dir.path().join("Trash"));

        trash.trash_uri(&uri::from_path(&doc)).unwrap();

        assert!(!doc.exists());
        assert!(dir.path().join("Trash/files/paper.pdf").exists());
        let info = fs::read_to_string(dir.path().join("Trash/info/paper.pdf.trashinfo")).unwrap();
        assert!(info.starts_with("[Trash Info]\n"));
        assert!(info.contains(&format!("Path={}\n", doc.display())));
        assert!(info.contains("DeletionDate="));
    }

    #[test]
    fn name_collisions_get_numbered() {
        let dir = tempfile::tempdir().unwrap();
        let trash = HomeTrash::new(dir.path().join("Trash"));
        for sub in ["one", "two"] {
            let d = dir.path().join(sub);
            fs::create_dir_all(&d).unwrap();
            fs::write(d.join("paper.pdf"), sub).unwrap();
        }
        assert_eq!(trash.trash(&dir.path().join("one/paper.pdf")).unwrap(), "paper.pdf");
        assert_eq!(trash.trash(&dir.path().join("two/paper.pdf")).unwrap(), "paper.2.pdf");
        assert_eq!(
            fs::read_to_string(dir.path().join("Trash/files/paper.2.pdf")).unwrap(),
            "two"
        );
    }

    #[test]
    fn missing_file_leaves_no_info_behind() {
        let dir = tempfile::tempdir().unwrap();
        let trash = HomeTrash::new(dir.path().join("Trash"));
        assert!(trash.trash(&dir.path().join("ghost.pdf")).is_err());
        assert_eq!(fs::read_dir(dir.path().join("Trash/info")).unwrap().count(), 0);
    }

    #[test]
    fn remote_uri_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let trash = HomeTrash::new(dir.path().join("Trash"));
        assert!(matches!(
            trash.trash_uri("sftp://host/a.pdf"),
            Err(TrashError::NotLocal(_))
        ));
    }
}
