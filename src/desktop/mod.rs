//! The freedesktop implementation of [`Desktop`].
//!
//! Each concern has its own submodule; [`FreedesktopDesktop`] bundles them
//! behind the trait the library talks to.

pub mod entries;
pub mod favorites;
pub mod files;
pub mod recent;
pub mod shell;
pub mod trash;
pub mod watch;

use crate::command::ApplicationId;
use crate::config::{Config, FavoritesBackend};
use crate::document::{ActiveApplicationContext, AppInfo, DocumentCandidate, FileDetails, FileStatus};
use crate::paths;
use crate::traits::Desktop;
use entries::DesktopEntries;
use favorites::{Favorites, FavoritesError, FileFavorites, GSettingsFavorites};
use files::FileInspector;
use recent::{RecentError, RecentFiles};
use shell::{Shell, ShellError};
use std::path::{Path, PathBuf};
use trash::{HomeTrash, TrashError};

/// Errors produced by [`FreedesktopDesktop`].
#[derive(Debug, thiserror::Error)]
pub enum DesktopError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Recent(#[from] RecentError),
    #[error(transparent)]
    Favorites(#[from] FavoritesError),
    #[error(transparent)]
    Trash(#[from] TrashError),
    #[error(transparent)]
    Shell(#[from] ShellError),
}

/// The desktop as seen through the XDG directories, GSettings, GIO and
/// D-Bus.
pub struct FreedesktopDesktop {
    entries: DesktopEntries,
    recent: RecentFiles,
    favorites: Favorites,
    files: FileInspector,
    trash: HomeTrash,
    shell: Shell,
}

impl FreedesktopDesktop {
    /// Resolve every location from the XDG environment.
    pub fn new(config: &Config) -> Self {
        let favorites = match config.favorites.backend {
            FavoritesBackend::GSettings => Favorites::GSettings(GSettingsFavorites::new()),
            FavoritesBackend::File => Favorites::File(FileFavorites::new(config.favorites.file_path())),
        };
        Self {
            entries: DesktopEntries::new(paths::application_dirs()),
            recent: RecentFiles::new(paths::data_home().join("recently-used.xbel")),
            favorites,
            files: FileInspector::new(
                paths::cache_home().join("thumbnails"),
                config.icon_dir.clone(),
                config.read_progress,
            ),
            trash: HomeTrash::new(paths::data_home().join("Trash")),
            shell: Shell::new(config.viewer_command.clone()),
        }
    }

    /// The recent-files store location, for change watching.
    pub fn recent_path(&self) -> &Path {
        self.recent.path()
    }

    /// The favorites file, when favorites live in a file.
    pub fn favorites_path(&self) -> Option<PathBuf> {
        match &self.favorites {
            Favorites::File(store) => Some(store.path().to_path_buf()),
            Favorites::GSettings(_) => None,
        }
    }
}

impl Desktop for FreedesktopDesktop {
    type Error = DesktopError;

    fn favorites(&self) -> Result<Vec<DocumentCandidate>, DesktopError> {
        Ok(self.favorites.list()?)
    }

    fn add_favorite(&self, uri: &str, mime_type: &str) -> Result<(), DesktopError> {
        Ok(self.favorites.add(uri, mime_type)?)
    }

    fn remove_favorite(&self, uri: &str) -> Result<(), DesktopError> {
        Ok(self.favorites.remove(uri)?)
    }

    fn recent(&self) -> Result<Vec<DocumentCandidate>, DesktopError> {
        Ok(self.recent.list()?)
    }

    fn application(&self, id: &ApplicationId) -> Result<Option<AppInfo>, DesktopError> {
        Ok(self.entries.find(id)?)
    }

    fn probe(&self, uri: &str) -> FileStatus {
        self.files.probe(uri)
    }

    fn details(&self, uri: &str, path: &Path, _mime_type: &str) -> FileDetails {
        self.files.details(uri, path)
    }

    fn trash(&self, uri: &str) -> Result<(), DesktopError> {
        Ok(self.trash.trash_uri(uri)?)
    }

    fn reveal(&self, uri: &str) -> Result<(), DesktopError> {
        Ok(self.shell.reveal(uri)?)
    }

    fn launch(
        &self,
        uri: &str,
        context: Option<&ActiveApplicationContext>,
    ) -> Result<(), DesktopError> {
        Ok(self.shell.launch(uri, context)?)
    }
}
