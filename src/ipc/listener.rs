//! Unix-socket [`CommandSource`] implementation.
//!
//! Binds a Unix stream socket and accepts one connection at a time.
//! Each line received is parsed as a JSON-encoded [`Command`].  This is
//! how `thingy-ctl` and scripts drive a running instance.
//!
//! # Wire format
//!
//! Every message is a single line of JSON followed by `\n`:
//!
//! ```json
//! {"Open":"file:///home/me/book.pdf"}
//! {"ToggleFavorite":"file:///home/me/book.pdf"}
//! {"SelectApplication":"libreoffice-writer"}
//! "Refresh"
//! ```
//!
//! # Single instance
//!
//! The socket doubles as the instance lock.  [`run`](CommandSource::run)
//! refuses to replace a socket that still accepts connections, and a new
//! launch uses [`forward`] to hand its request to the running instance.

use crate::command::Command;
use crate::traits::CommandSource;
use log::{debug, error, info};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::mpsc;

/// A [`CommandSource`] that listens on a Unix stream socket for
/// JSON-encoded commands.
///
/// Each accepted connection can send multiple newline-delimited JSON
/// commands.  When the connection closes, the listener waits for the
/// next one.
pub struct UnixSocketListener {
    path: PathBuf,
    bound: bool,
}

/// Errors produced by the Unix socket listener.
#[derive(Debug, thiserror::Error)]
pub enum UnixSocketError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("another instance is listening on {0}")]
    InUse(PathBuf),
}

impl UnixSocketListener {
    /// Create a new listener bound to `path`.
    ///
    /// The socket file is created when [`run`](CommandSource::run) is called
    /// and removed when the source shuts down.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            bound: false,
        }
    }

    /// The filesystem path of the socket.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for UnixSocketListener {
    fn drop(&mut self) {
        // Only the instance that bound the socket may remove it.
        if self.bound {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// Send `command` to the instance listening on `path`.
///
/// Returns `Ok(false)` when nobody is listening there.
pub fn forward(path: &Path, command: &Command) -> Result<bool, UnixSocketError> {
    let mut stream = match UnixStream::connect(path) {
        Ok(stream) => stream,
        Err(e) => {
            debug!("no instance on {}: {}", path.display(), e);
            return Ok(false);
        }
    };
    writeln!(stream, "{}", serde_json::to_string(command)?)?;
    Ok(true)
}

impl CommandSource for UnixSocketListener {
    type Error = UnixSocketError;

    /// Bind the socket and start accepting connections.
    ///
    /// This method **blocks** indefinitely.  Run it on a dedicated thread.
    fn run(&mut self, sink: mpsc::Sender<Command>) -> Result<(), Self::Error> {
        if UnixStream::connect(&self.path).is_ok() {
            return Err(UnixSocketError::InUse(self.path.clone()));
        }
        // Nobody answers, so any socket file left here is stale.
        let _ = std::fs::remove_file(&self.path);

        let listener = UnixListener::bind(&self.path)?;
        self.bound = true;
        info!("listening on {}", self.path.display());

        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    debug!("client connected");
                    let reader = BufReader::new(stream);
                    for line in reader.lines() {
                        match line {
                            Ok(ref text) if text.trim().is_empty() => continue,
                            Ok(text) => match serde_json::from_str::<Command>(&text) {
                                Ok(cmd) => {
                                    debug!("received {:?}", cmd);
                                    if sink.send(cmd).is_err() {
                                        info!("sink closed, shutting down");
                                        return Ok(());
                                    }
                                }
                                Err(e) => {
                                    error!("bad command: {}: {}", text, e);
                                }
                            },
                            Err(e) => {
                                error!("read error: {}", e);
                                break;
                            }
                        }
                    }
                    debug!("client disconnected");
                }
                Err(e) => {
                    error!("accept error: {}", e);
                }
            }
        }
        Ok(())
    }
}

//  Tests 

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ApplicationId;
    use std::io::Write;
    use std::os::unix::net::UnixStream;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Monotonic counter to generate unique socket paths per test.
    static TEST_ID: AtomicU32 = AtomicU32::new(0);

    /// Helper: create a unique temporary socket path for each test.
    fn tmp_socket_path() -> PathBuf {
        let id = TEST_ID.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir();
        dir.join(format!(
            "thingy-test-{}-{}.sock",
            std::process::id(),
            id
        ))
    }

    #[test]
    fn round_trip_commands_over_socket() {
        let path = tmp_socket_path();
        let path_clone = path.clone();

        let (tx, rx) = mpsc::channel();

        // Run listener in a background thread.
        let _handle = std::thread::spawn(move || {
            let mut listener = UnixSocketListener::new(&path_clone);
            let _ = listener.run(tx);
        });

        // Give the listener a moment to bind.
        std::thread::sleep(std::time::Duration::from_millis(150));

        {
            let mut stream = UnixStream::connect(&path).expect("connect");
            writeln!(stream, r#"{{"Open":"file:///tmp/a.pdf"}}"#).unwrap();
            writeln!(stream, r#"{{"SelectApplication":"libreoffice-writer"}}"#).unwrap();
            writeln!(stream).unwrap();
            writeln!(stream, r#""Refresh""#).unwrap();
            stream.shutdown(std::net::Shutdown::Write).unwrap();
        }

        std::thread::sleep(std::time::Duration::from_millis(150));
        let cmds: Vec<Command> = rx.try_iter().collect();

        assert_eq!(cmds.len(), 3);
        assert_eq!(cmds[0], Command::Open("file:///tmp/a.pdf".into()));
        assert_eq!(
            cmds[1],
            Command::SelectApplication(ApplicationId::parse("libreoffice-writer.desktop").unwrap())
        );
        assert_eq!(cmds[2], Command::Refresh);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn malformed_json_does_not_crash() {
        let path = tmp_socket_path();
        let path2 = path.clone();
        let (tx, rx) = mpsc::channel();

        let _handle = std::thread::spawn(move || {
            let mut listener = UnixSocketListener::new(&path2);
            let _ = listener.run(tx);
        });

        std::thread::sleep(std::time::Duration::from_millis(150));

        {
            let mut stream = UnixStream::connect(&path).expect("connect");
            writeln!(stream, "not json at all").unwrap();
            writeln!(stream, r#"{{"SelectApplication":""}}"#).unwrap();
            writeln!(stream, r#"{{"Trash":"file:///tmp/b.pdf"}}"#).unwrap();
            stream.shutdown(std::net::Shutdown::Write).unwrap();
        }

        std::thread::sleep(std::time::Duration::from_millis(150));
        let cmds: Vec<Command> = rx.try_iter().collect();
        // Only the valid command should have arrived.
        assert_eq!(cmds.len(), 1);
        assert_eq!(cmds[0], Command::Trash("file:///tmp/b.pdf".into()));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn sink_closed_stops_listener() {
        let path = tmp_socket_path();
        let path2 = path.clone();
        let (tx, rx) = mpsc::channel();
        drop(rx);

        let handle = std::thread::spawn(move || {
            let mut listener = UnixSocketListener::new(&path2);
            listener.run(tx).is_ok()
        });

        std::thread::sleep(std::time::Duration::from_millis(150));
        {
            let mut stream = UnixStream::connect(&path).expect("connect");
            writeln!(stream, r#""Refresh""#).unwrap();
        }
        assert!(handle.join().unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn second_listener_leaves_running_instance_alone() {
        let path = tmp_socket_path();
        let path2 = path.clone();
        let (first_tx, first_rx) = mpsc::channel();
        let _first = std::thread::spawn(move || {
            let mut listener = UnixSocketListener::new(&path2);
            let _ = listener.run(first_tx);
        });
        std::thread::sleep(std::time::Duration::from_millis(150));

        let (second_tx, second_rx) = mpsc::channel();
        let mut second = UnixSocketListener::new(&path);
        assert!(matches!(second.run(second_tx), Err(UnixSocketError::InUse(_))));
        drop(second);
        assert!(path.exists());

        assert!(forward(&path, &Command::Refresh).unwrap());
        std::thread::sleep(std::time::Duration::from_millis(150));
        assert_eq!(first_rx.try_iter().collect::<Vec<_>>(), vec![Command::Refresh]);
        assert!(second_rx.try_iter().next().is_none());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn stale_socket_file_is_replaced() {
        let path = tmp_socket_path();
        // Bound and dropped: the file stays but nobody accepts.
        drop(UnixListener::bind(&path).unwrap());
        assert!(path.exists());
        assert!(!forward(&path, &Command::Refresh).unwrap());

        let path2 = path.clone();
        let (tx, rx) = mpsc::channel();
        let _handle = std::thread::spawn(move || {
            let mut listener = UnixSocketListener::new(&path2);
            let _ = listener.run(tx);
        });
        std::thread::sleep(std::time::Duration::from_millis(150));

        assert!(forward(&path, &Command::Refresh).unwrap());
        std::thread::sleep(std::time::Duration::from_millis(150));
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![Command::Refresh]);

        let _ = std::fs::remove_file(&path);
    }
}
