//! Launching documents and revealing them in the file manager.

use crate::desktop::entries::expand_exec;
use crate::document::ActiveApplicationContext;
use crate::uri;
use log::{debug, warn};
use std::path::Path;
use std::process::{Command, Stdio};

const FILE_MANAGER_NAME: &str = "org.freedesktop.FileManager1";
const FILE_MANAGER_PATH: &str = "/org/freedesktop/FileManager1";

/// Opens a path with its default handler.
pub type Opener = fn(&Path) -> std::io::Result<()>;

fn open_with_default(path: &Path) -> std::io::Result<()> {
    open::that(path)
}

/// Errors produced while launching or revealing.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a local file: {0}")]
    NotLocal(String),
    #[error("no viewer available for {0}")]
    NoViewer(String),
    #[error("{program} exited with {status}")]
    Failed { program: String, status: String },
}

/// Process launching on behalf of the library.
#[derive(Clone)]
pub struct Shell {
    viewer_command: Option<String>,
    dbus_send: String,
    opener: Opener,
}

impl std::fmt::Debug for Shell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shell")
            .field("viewer_command", &self.viewer_command)
            .field("dbus_send", &self.dbus_send)
            .finish_non_exhaustive()
    }
}

impl Shell {
    /// `viewer_command` is the last resort for opening documents, e.g.
    /// `"xreader"`.
    pub fn new(viewer_command: Option<String>) -> Self {
        Self {
            viewer_command,
            dbus_send: "dbus-send".to_string(),
            opener: open_with_default,
        }
    }

    /// Use `program` instead of `dbus-send` for the file-manager call.
    pub fn with_dbus_send(mut self, program: impl Into<String>) -> Self {
        self.dbus_send = program.into();
        self
    }

    /// Use `opener` instead of the desktop's default handler.
    pub fn with_opener(mut self, opener: Opener) -> Self {
        self.opener = opener;
        self
    }

    /// Open `uri` with its default handler, falling back to the active
    /// application and then the configured viewer.
    pub fn launch(
        &self,
        uri: &str,
        context: Option<&ActiveApplicationContext>,
    ) -> Result<(), ShellError> {
        let path = uri::to_path(uri).ok_or_else(|| ShellError::NotLocal(uri.to_string()))?;
        match (self.opener)(&path) {
            Ok(()) => return Ok(()),
            Err(e) => warn!("default handler failed for {}: {}", path.display(), e),
        }

        let argv = viewer_argv(uri, &path, context, self.viewer_command.as_deref())
            .ok_or_else(|| ShellError::NoViewer(uri.to_string()))?;
        debug!("launching {:?}", argv);
        Command::new(&argv[0])
            .args(&argv[1..])
            .stdin(Stdio::null())
            .spawn()?;
        Ok(())
    }

    /// Select `uri` in the file manager; open its folder if no file manager
    /// answers.
    pub fn reveal(&self, uri: &str) -> Result<(), ShellError> {
        match run(&self.dbus_send, &show_items_args(uri)) {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!("file manager did not answer ({}), opening the folder", e);
                let path = uri::to_path(uri).ok_or_else(|| ShellError::NotLocal(uri.to_string()))?;
                let parent = path.parent().unwrap_or(Path::new("/"));
                (self.opener)(parent)?;
                Ok(())
            }
        }
    }
}

/// Arguments for `dbus-send` calling `ShowItems([uri], "")`.
pub fn show_items_args(uri: &str) -> Vec<String> {
    vec![
        "--session".into(),
        "--print-reply".into(),
        format!("--dest={}", FILE_MANAGER_NAME),
        "--type=method_call".into(),
        FILE_MANAGER_PATH.into(),
        format!("{}.ShowItems", FILE_MANAGER_NAME),
        format!("array:string:{}", uri),
        "string:".into(),
    ]
}

/// The command line used when the default handler fails: the active
/// application's `Exec` line, else `viewer <path>`.
pub fn viewer_argv(
    uri: &str,
    path: &Path,
    context: Option<&ActiveApplicationContext>,
    viewer: Option<&str>,
) -> Option<Vec<String>> {
    if let Some(exec) = context.and_then(|c| c.exec.as_deref()) {
        let argv = expand_exec(exec, path, uri);
        if !argv.is_empty() {
            return Some(argv);
        }
    }
    let mut argv: Vec<String> = viewer?.split_whitespace().map(str::to_string).collect();
    if argv.is_empty() {
        return None;
    }
    argv.push(path.to_string_lossy().into_owned());
    Some(argv)
}

fn run(program: &str, args: &[String]) -> Result<(), ShellError> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()?;
    if output.status.success() {
        Ok(())
    } else {
        Err(ShellError::Failed {
            program: program.to_string(),
            status: output.status.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ApplicationId;
    use std::cell::RefCell;
    use std::path::PathBuf;

    thread_local! {
        static OPENED: RefCell<Vec<PathBuf>> = const { RefCell::new(Vec::new()) };
    }

    fn record_open(path: &Path) -> std::io::Result<()> {
        OPENED.with(|o| o.borrow_mut().push(path.to_path_buf()));
        Ok(())
    }

    fn opened() -> Vec<PathBuf> {
        OPENED.with(|o| std::mem::take(&mut *o.borrow_mut()))
    }

    fn context(exec: Option<&str>) -> ActiveApplicationContext {
        ActiveApplicationContext {
            application_id: ApplicationId::parse("xreader").unwrap(),
            display_name: "Xreader".into(),
            supported_mime_types: Default::default(),
            hidden_mime_types: Default::default(),
            exec: exec.map(str::to_string),
        }
    }

    #[test]
    fn show_items_call() {
        let args = show_items_args("file:///home/me/a.pdf");
        assert_eq!(args[2], "--dest=org.freedesktop.FileManager1");
        assert_eq!(args[5], "org.freedesktop.FileManager1.ShowItems");
        assert_eq!(args[6], "array:string:file:///home/me/a.pdf");
        assert_eq!(args[7], "string:");
    }

    #[test]
    fn viewer_prefers_application_exec() {
        let path = Path::new("/docs/a.pdf");
        let ctx = context(Some("xreader %U"));
        assert_eq!(
            viewer_argv("file:///docs/a.pdf", path, Some(&ctx), Some("evince")),
            Some(vec!["xreader".to_string(), "file:///docs/a.pdf".to_string()])
        );
    }

    #[test]
    fn viewer_falls_back_to_configured_command() {
        let path = Path::new("/docs/a.pdf");
        let ctx = context(None);
        assert_eq!(
            viewer_argv("file:///docs/a.pdf", path, Some(&ctx), Some("xreader --fullscreen")),
            Some(vec![
                "xreader".to_string(),
                "--fullscreen".to_string(),
                "/docs/a.pdf".to_string()
            ])
        );
        assert_eq!(viewer_argv("file:///docs/a.pdf", path, None, None), None);
        assert_eq!(viewer_argv("file:///docs/a.pdf", path, None, Some("  ")), None);
    }

    #[test]
    fn launch_rejects_remote_uri() {
        let shell = Shell::new(None);
        assert!(matches!(
            shell.launch("https://example.org/a.pdf", None),
            Err(ShellError::NotLocal(_))
        ));
    }

    #[test]
    fn reveal_opens_parent_when_file_manager_fails() {
        let shell = Shell::new(None).with_dbus_send("false").with_opener(record_open);
        shell.reveal("file:///docs/papers/a%20b.pdf").unwrap();
        assert_eq!(opened(), vec![PathBuf::from("/docs/papers")]);
    }

    #[test]
    fn reveal_skips_fallback_when_file_manager_answers() {
        let shell = Shell::new(None).with_dbus_send("true").with_opener(record_open);
        shell.reveal("file:///docs/a.pdf").unwrap();
        assert!(opened().is_empty());
    }

    #[test]
    fn reveal_fallback_rejects_remote_uri() {
        let shell = Shell::new(None).with_dbus_send("false").with_opener(record_open);
        assert!(matches!(
            shell.reveal("sftp://host/docs/a.pdf"),
            Err(ShellError::NotLocal(_))
        ));
        assert!(opened().is_empty());
    }
}
