//! Change notifications for the two document registries.
//!
//! Both are [`CommandSource`]s meant to run on their own thread:
//!
//! * [`FileWatcher`] watches registry files (the XBEL recent list, the JSON
//!   favorites) through `notify`.  The parent directory is watched rather
//!   than the file itself, because the files are replaced by rename.
//! * [`GSettingsMonitor`] follows the XApp favorites key through
//!   `gsettings monitor`.

use crate::command::Command;
use crate::desktop::favorites::{KEY, SCHEMA};
use crate::traits::CommandSource;
use log::{debug, info, warn};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::collections::BTreeSet;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command as Process, Stdio};
use std::sync::mpsc;
use std::time::{Duration, Instant};

/// Errors produced by the watchers.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("watch error: {0}")]
    Notify(#[from] notify::Error),
}

/// Emits a command whenever one of the watched files changes.
///
/// Bursts of filesystem events within the debounce window collapse into a
/// single command per file.
pub struct FileWatcher {
    targets: Vec<(PathBuf, Command)>,
    debounce: Duration,
}

impl FileWatcher {
    pub fn new(debounce: Duration) -> Self {
        Self {
            targets: Vec::new(),
            debounce,
        }
    }

    /// Send `command` when `path` is created, modified, or removed.
    pub fn watch(mut self, path: impl AsRef<Path>, command: Command) -> Self {
        self.targets.push((path.as_ref().to_path_buf(), command));
        self
    }

    fn commands_for(&self, event: &Event, out: &mut Vec<Command>) {
        if matches!(event.kind, EventKind::Access(_)) {
            return;
        }
        for path in &event.paths {
            for (target, command) in &self.targets {
                if path == target && !out.contains(command) {
                    out.push(command.clone());
                }
            }
        }
    }
}

impl CommandSource for FileWatcher {
    type Error = WatchError;

    fn run(&mut self, sink: mpsc::Sender<Command>) -> Result<(), Self::Error> {
        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.send(res);
        })?;

        let dirs: BTreeSet<&Path> = self.targets.iter().filter_map(|(p, _)| p.parent()).collect();
        for dir in dirs {
            if !dir.is_dir() {
                warn!("not watching {}: no such directory", dir.display());
                continue;
            }
            watcher.watch(dir, RecursiveMode::NonRecursive)?;
            info!("watching {}", dir.display());
        }

        loop {
            let mut pending = Vec::new();
            match rx.recv() {
                Ok(Ok(event)) => self.commands_for(&event, &mut pending),
                Ok(Err(e)) => warn!("watch error: {}", e),
                Err(_) => return Ok(()),
            }
            if pending.is_empty() {
                continue;
            }

            let deadline = Instant::now() + self.debounce;
            while let Some(left) = deadline.checked_duration_since(Instant::now()) {
                match rx.recv_timeout(left) {
                    Ok(Ok(event)) => self.commands_for(&event, &mut pending),
                    Ok(Err(e)) => warn!("watch error: {}", e),
                    Err(mpsc::RecvTimeoutError::Timeout) => break,
                    Err(mpsc::RecvTimeoutError::Disconnected) => return Ok(()),
                }
            }

            for command in pending {
                debug!("{}", command);
                if sink.send(command).is_err() {
                    info!("sink closed, shutting down");
                    return Ok(());
                }
            }
        }
    }
}

/// Emits [`Command::FavoritesChanged`] for every change `gsettings
/// monitor` reports on the XApp favorites key.
#[derive(Debug, Default)]
pub struct GSettingsMonitor;

impl GSettingsMonitor {
    pub fn new() -> Self {
        Self
    }
}

impl CommandSource for GSettingsMonitor {
    type Error = WatchError;

    /// Blocks until the `gsettings` process exits or the sink is closed.
    fn run(&mut self, sink: mpsc::Sender<Command>) -> Result<(), Self::Error> {
        let mut child = Process::new("gsettings")
            .args(["monitor", SCHEMA, KEY])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .spawn()?;
        info!("monitoring {} {}", SCHEMA, KEY);

        let Some(stdout) = child.stdout.take() else {
            return Ok(());
        };
        for line in BufReader::new(stdout).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            if sink.send(Command::FavoritesChanged).is_err() {
                info!("sink closed, shutting down");
                let _ = child.kill();
                break;
            }
        }
        let _ = child.wait();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn burst_of_writes_yields_one_command() {
        let dir = tempfile::tempdir().unwrap();
        let xbel = dir.path().join("recently-used.xbel");
        let favorites = dir.path().join("favorites.json");

        let (tx, rx) = mpsc::channel();
        let mut watcher = FileWatcher::new(Duration::from_millis(200))
            .watch(&xbel, Command::RecentChanged)
            .watch(&favorites, Command::FavoritesChanged);
        let _handle = std::thread::spawn(move || {
            let _ = watcher.run(tx);
        });

        // Give the watcher a moment to register.
        std::thread::sleep(Duration::from_millis(200));

        fs::write(dir.path().join("unrelated.txt"), "x").unwrap();
        for i in 0..5 {
            fs::write(&xbel, format!("<xbel>{}</xbel>", i)).unwrap();
        }

        let first = rx.recv_timeout(Duration::from_secs(3)).unwrap();
        assert_eq!(first, Command::RecentChanged);
        std::thread::sleep(Duration::from_millis(400));
        let rest: Vec<Command> = rx.try_iter().collect();
        assert!(!rest.contains(&Command::FavoritesChanged));
        assert!(rest.len() <= 1, "expected the burst to coalesce, got {:?}", rest);
    }

    #[test]
    fn access_events_ignored() {
        let target = PathBuf::from("/data/recently-used.xbel");
        let watcher = FileWatcher::new(Duration::ZERO).watch(&target, Command::RecentChanged);

        let mut out = Vec::new();
        let access = Event::new(EventKind::Access(notify::event::AccessKind::Any)).add_path(target.clone());
        watcher.commands_for(&access, &mut out);
        assert!(out.is_empty());

        let modify = Event::new(EventKind::Modify(notify::event::ModifyKind::Any)).add_path(target.clone());
        watcher.commands_for(&modify, &mut out);
        watcher.commands_for(&modify, &mut out);
        assert_eq!(out, vec![Command::RecentChanged]);

        let other = Event::new(EventKind::Create(notify::event::CreateKind::File))
            .add_path(PathBuf::from("/data/other.xbel"));
        watcher.commands_for(&other, &mut out);
        assert_eq!(out.len(), 1);
    }
}
