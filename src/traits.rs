//! Core traits that decouple the library from the desktop it runs on.
//!
//! [`Library`](crate::library::Library) only depends on these abstractions.
//! The freedesktop backend lives in [`desktop`](crate::desktop); tests use
//! in-memory doubles.

use crate::command::{ApplicationId, Command};
use crate::document::{ActiveApplicationContext, AppInfo, DocumentCandidate, FileDetails, FileStatus, Shelf};
use std::sync::{mpsc, Arc};

/// Abstraction over every desktop service the library talks to: the two
/// document registries, the application registry, file metadata, trash,
/// the file manager and the default-handler launcher.
///
/// Methods are called from worker threads, hence `Send + Sync`.
pub trait Desktop: Send + Sync + 'static {
    /// The error type produced by this desktop.
    type Error: std::error::Error + Send + 'static;

    /// Favorites in store order.  Entries are not checked for existence.
    fn favorites(&self) -> Result<Vec<DocumentCandidate>, Self::Error>;

    /// Add `uri` to the favorites store.
    fn add_favorite(&self, uri: &str, mime_type: &str) -> Result<(), Self::Error>;

    /// Remove `uri` from the favorites store.
    fn remove_favorite(&self, uri: &str) -> Result<(), Self::Error>;

    /// Recently used documents, in whatever order the store keeps them.
    fn recent(&self) -> Result<Vec<DocumentCandidate>, Self::Error>;

    /// Look up an installed application by desktop-entry id.
    fn application(&self, id: &ApplicationId) -> Result<Option<AppInfo>, Self::Error>;

    /// Whether `uri` is a local file that currently exists.
    fn probe(&self, uri: &str) -> FileStatus;

    /// Display metadata for an existing local document.
    fn details(&self, uri: &str, path: &std::path::Path, mime_type: &str) -> FileDetails;

    /// Move `uri` to the trash.
    fn trash(&self, uri: &str) -> Result<(), Self::Error>;

    /// Show `uri` in the file manager.
    fn reveal(&self, uri: &str) -> Result<(), Self::Error>;

    /// Open `uri`.  `context` is the active application, used when the
    /// default handler cannot be launched.
    fn launch(
        &self,
        uri: &str,
        context: Option<&ActiveApplicationContext>,
    ) -> Result<(), Self::Error>;
}

//  View

/// Events sent from the [`Library`](crate::library::Library) to whatever
/// renders it, over an [`mpsc`](std::sync::mpsc) channel.
///
/// Every [`Show`](ViewEvent::Show) carries a complete snapshot; the view
/// replaces what it displays instead of patching it.
#[derive(Debug, Clone)]
pub enum ViewEvent {
    /// A rebuild finished; display this list.
    Show(Arc<Shelf>),
}

//  Command Source

/// A source of [`Command`]s.
///
/// Implementations watch some external thing (a registry file, a settings
/// key, a Unix socket) and forward commands into the provided
/// [`mpsc::Sender`].
///
/// # Contract
///
/// * [`run`](CommandSource::run) **blocks** until the source is exhausted,
///   the sink is closed, or an unrecoverable error occurs.
/// * Implementations must be [`Send`] so they can run on a dedicated thread.
pub trait CommandSource: Send {
    /// The error type produced by this source.
    type Error: std::error::Error + Send + 'static;

    /// Start listening and forward every [`Command`] into `sink`.
    fn run(&mut self, sink: mpsc::Sender<Command>) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[derive(Debug, thiserror::Error)]
    #[error("mock error")]
    struct MockError;

    //  Mock CommandSource

    /// A test double that emits a fixed sequence of commands.
    struct MockSource {
        commands: Vec<Command>,
    }

    impl CommandSource for MockSource {
        type Error = MockError;

        fn run(&mut self, sink: mpsc::Sender<Command>) -> Result<(), MockError> {
            for cmd in self.commands.drain(..) {
                let _ = sink.send(cmd);
            }
            Ok(())
        }
    }

    #[test]
    fn mock_source_emits_commands() {
        let mut src = MockSource {
            commands: vec![Command::RecentChanged, Command::Trash("file:///a.pdf".into())],
        };
        let (tx, rx) = mpsc::channel();
        src.run(tx).unwrap();
        let cmds: Vec<Command> = rx.try_iter().collect();
        assert_eq!(cmds.len(), 2);
        assert_eq!(cmds[0], Command::RecentChanged);
        assert_eq!(cmds[1], Command::Trash("file:///a.pdf".into()));
    }
}
