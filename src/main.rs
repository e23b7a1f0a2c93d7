//! Entry point for the **thingy** launcher.
//!
//! Spawns all [`CommandSource`](thingy::traits::CommandSource)s on
//! background threads and processes incoming commands on the main thread.
//!
//! By default the main thread runs the GTK window (feature `gui`).
//! `--headless` keeps the library running without a window, driven only by
//! the command socket, and `--list` prints one snapshot as JSON and exits.
//!
//! Only one instance runs per session.  A second launch hands its `--app`
//! selection (or a refresh) to the running instance and exits.

use thingy::command::{ApplicationId, Command};
use thingy::config::Config;
use thingy::desktop::watch::{FileWatcher, GSettingsMonitor};
use thingy::desktop::FreedesktopDesktop;
use thingy::ipc::listener::{self, UnixSocketListener};
use thingy::library::{self, Library, LibrarySettings};
use thingy::paths;
use thingy::traits::{CommandSource, Desktop, ViewEvent};
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

/// Quiet period before a burst of file events becomes one command.
const WATCH_DEBOUNCE: Duration = Duration::from_millis(250);

/// How often the headless loop collects worker results.
const HEADLESS_TICK: Duration = Duration::from_millis(100);

/// Try to load the config from `$XDG_CONFIG_HOME/thingy/config.json`,
/// falling back to compiled-in defaults.
fn load_config() -> Config {
    let path = paths::config_dir().join("config.json");
    match Config::load(&path) {
        Ok(cfg) => {
            info!("loaded config from {}", path.display());
            cfg
        }
        Err(e) => {
            info!("no config file ({}), using defaults", e);
            Config::default()
        }
    }
}

//  Command line

#[derive(Debug, Default)]
struct Options {
    headless: bool,
    list: bool,
    app: Option<ApplicationId>,
}

fn parse_args() -> Options {
    let mut options = Options::default();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--headless" => options.headless = true,
            "--list" => options.list = true,
            "--app" => match args.next().as_deref().and_then(ApplicationId::parse) {
                Some(id) => options.app = Some(id),
                None => {
                    error!("--app needs an application id");
                    std::process::exit(2);
                }
            },
            other => warn!("ignoring unknown argument {:?}", other),
        }
    }
    options
}

//  Main

fn main() {
    env_logger::init();

    let options = parse_args();
    let config = load_config();
    let settings = config.library_settings();
    let desktop = FreedesktopDesktop::new(&config);

    if options.list {
        run_list(&desktop, &settings, options.app.as_ref());
        return;
    }

    let socket = paths::socket_path();
    let request = options
        .app
        .clone()
        .map_or(Command::Refresh, Command::SelectApplication);
    match listener::forward(&socket, &request) {
        Ok(true) => {
            info!("thingy is already running, sent {}", request);
            return;
        }
        Ok(false) => {}
        Err(e) => warn!("cannot reach the running instance: {}", e),
    }

    let recent_path = desktop.recent_path().to_path_buf();
    let favorites_path = desktop.favorites_path();

    let mut library = Library::new(desktop, settings);
    if let Some(id) = options.app {
        library = library.with_application(id);
    }

    let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
    spawn_command_sources(cmd_tx.clone(), socket, recent_path, favorites_path);

    if options.headless {
        drop(cmd_tx);
        run_headless(library, cmd_rx);
    } else {
        start_event_loop(library, cmd_rx, cmd_tx, &config);
    }
}

/// `--list`: print one snapshot and exit.
fn run_list<D: Desktop>(desktop: &D, settings: &LibrarySettings, app: Option<&ApplicationId>) {
    let shelf = library::build_once(desktop, settings, app);
    match serde_json::to_string_pretty(&shelf) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            error!("failed to serialise the list: {}", e);
            std::process::exit(1);
        }
    }
}

//  Event loops

fn run_headless<D: Desktop>(mut library: Library<D>, cmd_rx: mpsc::Receiver<Command>) {
    let (view_tx, view_rx) = mpsc::channel::<ViewEvent>();
    library.set_view(view_tx);
    library.request_rebuild();

    info!("thingy running headless");
    loop {
        match cmd_rx.recv_timeout(HEADLESS_TICK) {
            Ok(cmd) => {
                if let Err(e) = library.handle(cmd) {
                    error!("command error: {}", e);
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
        library.poll();
        while let Ok(ViewEvent::Show(shelf)) = view_rx.try_recv() {
            info!(
                "{} document(s) for {}",
                shelf.len(),
                shelf.context.display_name
            );
        }
    }
    info!("all command sources closed, exiting");
}

#[cfg(feature = "gui")]
fn start_event_loop<D: Desktop>(
    library: Library<D>,
    cmd_rx: mpsc::Receiver<Command>,
    cmd_tx: mpsc::Sender<Command>,
    config: &Config,
) {
    let geometry_path = paths::config_dir().join("window.json");
    if let Err(e) = thingy::ui::gtk::run_main_loop(library, cmd_rx, cmd_tx, config, geometry_path)
    {
        error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "gui"))]
fn start_event_loop<D: Desktop>(
    library: Library<D>,
    cmd_rx: mpsc::Receiver<Command>,
    cmd_tx: mpsc::Sender<Command>,
    _config: &Config,
) {
    warn!("built without the `gui` feature, running headless");
    drop(cmd_tx);
    run_headless(library, cmd_rx);
}

//  Helpers

fn spawn_command_sources(
    tx: mpsc::Sender<Command>,
    socket: PathBuf,
    recent_path: PathBuf,
    favorites_path: Option<PathBuf>,
) {
    spawn_source("socket", UnixSocketListener::new(socket), tx.clone());

    let mut watcher = FileWatcher::new(WATCH_DEBOUNCE).watch(recent_path, Command::RecentChanged);
    match favorites_path {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    warn!("cannot create {}: {}", parent.display(), e);
                }
            }
            watcher = watcher.watch(path, Command::FavoritesChanged);
        }
        None => spawn_source("gsettings-monitor", GSettingsMonitor::new(), tx.clone()),
    }
    spawn_source("file-watcher", watcher, tx);
}

fn spawn_source<S: CommandSource + 'static>(
    name: &'static str,
    mut source: S,
    tx: mpsc::Sender<Command>,
) {
    let spawned = std::thread::Builder::new()
        .name(name.into())
        .spawn(move || {
            if let Err(e) = source.run(tx) {
                error!("{} error: {}", name, e);
            }
        });
    if let Err(e) = spawned {
        error!("failed to start {}: {}", name, e);
    }
}
