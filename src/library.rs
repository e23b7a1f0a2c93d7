//! The orchestrator that ties the desktop backend, the aggregator and the
//! view together.
//!
//! [`Library`] lives on one thread (the GTK main loop, or the headless
//! loop) and reacts to [`Command`]s.  Anything that touches the desktop
//! runs on a short-lived worker thread; workers report back over a channel
//! that the owner drains with [`Library::poll`].
//!
//! # Rebuilds
//!
//! The list is never patched.  Every trigger (reselection, a registry
//! change, a finished trash or favorite toggle, a manual refresh) asks for
//! a full rebuild, and each rebuild gets a new generation number.  At most
//! one rebuild runs at a time: a request that arrives while one is running
//! is remembered, the running rebuild's result is thrown away when it
//! arrives, and a fresh rebuild starts in its place.  Only results tagged
//! with the generation currently in flight are ever published.

use crate::aggregate;
use crate::command::{ApplicationId, Command};
use crate::document::{ActiveApplicationContext, ApplicationChoice, Shelf, Tile};
use crate::mime::{self, HiddenMimeTable};
use crate::traits::{Desktop, ViewEvent};
use log::{debug, error, info, warn};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

/// Possible errors from the library.
#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    /// The command refers to a document that is not in the current list.
    #[error("document not in the library: {0}")]
    UnknownDocument(String),
    /// A worker thread could not be started.
    #[error("failed to spawn worker: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Everything a rebuild needs besides the desktop itself.
#[derive(Debug, Clone)]
pub struct LibrarySettings {
    /// Applications offered for selection, in order of preference.
    pub applications: Vec<ApplicationId>,
    /// Mime types assumed when the selected application is not installed.
    pub fallback_mime_types: Vec<String>,
    pub hidden_mime_types: HiddenMimeTable,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            applications: vec![ApplicationId(mime::DEFAULT_APPLICATION.to_string())],
            fallback_mime_types: mime::default_fallback(),
            hidden_mime_types: HiddenMimeTable::default(),
        }
    }
}

/// A destructive or external action run on a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Open,
    Reveal,
    AddFavorite,
    RemoveFavorite,
    Trash,
}

impl ActionKind {
    /// Whether the list must be rebuilt once the action has finished.
    pub fn changes_list(self) -> bool {
        matches!(
            self,
            ActionKind::AddFavorite | ActionKind::RemoveFavorite | ActionKind::Trash
        )
    }
}

/// What a worker sends back to the owning thread.
#[derive(Debug)]
enum WorkerResult {
    Rebuilt {
        generation: u64,
        shelf: Shelf,
    },
    ActionFinished {
        kind: ActionKind,
        uri: String,
        result: Result<(), String>,
    },
}

/// Owns the current list and coordinates rebuilds and actions.
///
/// Generic over any [`Desktop`], so the same logic drives the freedesktop
/// backend and the in-memory doubles used in tests.
pub struct Library<D: Desktop> {
    desktop: Arc<D>,
    settings: Arc<LibrarySettings>,
    /// Explicitly selected application; `None` means "first installed
    /// candidate", resolved by the rebuild worker.
    selected: Option<ApplicationId>,
    shelf: Option<Arc<Shelf>>,
    next_generation: u64,
    in_flight: Option<u64>,
    rebuild_pending: bool,
    actions_in_flight: usize,
    results_tx: mpsc::Sender<WorkerResult>,
    results_rx: mpsc::Receiver<WorkerResult>,
    view_tx: Option<mpsc::Sender<ViewEvent>>,
}

impl<D: Desktop> Library<D> {
    /// Create a library.  Nothing is read until the first rebuild.
    pub fn new(desktop: D, settings: LibrarySettings) -> Self {
        let (results_tx, results_rx) = mpsc::channel();
        Self {
            desktop: Arc::new(desktop),
            settings: Arc::new(settings),
            selected: None,
            shelf: None,
            next_generation: 0,
            in_flight: None,
            rebuild_pending: false,
            actions_in_flight: 0,
            results_tx,
            results_rx,
            view_tx: None,
        }
    }

    /// Start with `id` selected instead of the first installed candidate.
    pub fn with_application(mut self, id: ApplicationId) -> Self {
        self.selected = Some(id);
        self
    }

    /// Attach a view.  Every published snapshot is sent as
    /// [`ViewEvent::Show`].
    pub fn set_view(&mut self, tx: mpsc::Sender<ViewEvent>) {
        self.view_tx = Some(tx);
    }

    /// The last published snapshot, if any rebuild has completed.
    pub fn shelf(&self) -> Option<&Arc<Shelf>> {
        self.shelf.as_ref()
    }

    /// The context of the last published snapshot.
    pub fn context(&self) -> Option<&ActiveApplicationContext> {
        self.shelf.as_deref().map(|s| &s.context)
    }

    /// The explicitly selected application, if any.
    pub fn selected_application(&self) -> Option<&ApplicationId> {
        self.selected.as_ref()
    }

    /// Whether no rebuild or action is outstanding.
    pub fn is_idle(&self) -> bool {
        self.in_flight.is_none() && !self.rebuild_pending && self.actions_in_flight == 0
    }

    /// Process a single [`Command`].
    ///
    /// Actions are started in the background; their failures are logged
    /// when they come back through [`poll`](Self::poll), never returned
    /// here.
    pub fn handle(&mut self, cmd: Command) -> Result<(), LibraryError> {
        match cmd {
            Command::SelectApplication(id) => {
                info!("select application {}", id);
                self.selected = Some(id);
                self.request_rebuild();
            }

            Command::Refresh | Command::FavoritesChanged | Command::RecentChanged => {
                debug!("{}", cmd);
                self.request_rebuild();
            }

            Command::Open(uri) => {
                info!("open {}", uri);
                self.spawn_action(ActionKind::Open, uri)?;
            }

            Command::Reveal(uri) => {
                info!("reveal {}", uri);
                self.spawn_action(ActionKind::Reveal, uri)?;
            }

            Command::ToggleFavorite(uri) => {
                let tile = self
                    .tile(&uri)
                    .ok_or_else(|| LibraryError::UnknownDocument(uri.clone()))?;
                let kind = if tile.is_favorite() {
                    ActionKind::RemoveFavorite
                } else {
                    ActionKind::AddFavorite
                };
                info!("{:?} {}", kind, uri);
                self.spawn_action(kind, uri)?;
            }

            Command::Trash(uri) => {
                info!("trash {}", uri);
                self.spawn_action(ActionKind::Trash, uri)?;
            }
        }
        Ok(())
    }

    /// Ask for a full rebuild.
    ///
    /// Starts one immediately when the library is quiet; otherwise the
    /// request is coalesced with any other pending one.
    pub fn request_rebuild(&mut self) {
        if let Some(generation) = self.in_flight {
            debug!("rebuild {} in flight, queueing another", generation);
            self.rebuild_pending = true;
            return;
        }
        self.spawn_rebuild();
    }

    /// Apply every worker result that has already arrived.
    ///
    /// Returns the number of results processed.
    pub fn poll(&mut self) -> usize {
        let mut count = 0;
        while let Ok(result) = self.results_rx.try_recv() {
            self.apply(result);
            count += 1;
        }
        count
    }

    /// Like [`poll`](Self::poll), but wait up to `timeout` for the first
    /// result.
    pub fn poll_timeout(&mut self, timeout: Duration) -> usize {
        match self.results_rx.recv_timeout(timeout) {
            Ok(result) => {
                self.apply(result);
                1 + self.poll()
            }
            Err(_) => 0,
        }
    }

    //  internals

    fn tile(&self, uri: &str) -> Option<&Tile> {
        self.shelf.as_deref().and_then(|s| s.get(uri))
    }

    fn spawn_rebuild(&mut self) {
        self.next_generation += 1;
        let generation = self.next_generation;

        let desktop = Arc::clone(&self.desktop);
        let settings = Arc::clone(&self.settings);
        let selected = self.selected.clone();
        let tx = self.results_tx.clone();

        let spawned = thread::Builder::new()
            .name(format!("rebuild-{}", generation))
            .spawn(move || {
                let shelf = build_shelf(&*desktop, &settings, selected.as_ref(), generation);
                let _ = tx.send(WorkerResult::Rebuilt { generation, shelf });
            });

        match spawned {
            Ok(_) => {
                debug!("rebuild {} started", generation);
                self.in_flight = Some(generation);
            }
            Err(e) => error!("failed to start rebuild {}: {}", generation, e),
        }
    }

    fn spawn_action(&mut self, kind: ActionKind, uri: String) -> Result<(), LibraryError> {
        let desktop = Arc::clone(&self.desktop);
        let tx = self.results_tx.clone();
        let context = self.context().cloned();
        let mime_type = self.tile(&uri).map(|t| t.document.mime_type.clone());

        thread::Builder::new()
            .name(format!("{:?}", kind).to_lowercase())
            .spawn(move || {
                let result = match kind {
                    ActionKind::Open => desktop.launch(&uri, context.as_ref()),
                    ActionKind::Reveal => desktop.reveal(&uri),
                    ActionKind::AddFavorite => {
                        desktop.add_favorite(&uri, mime_type.as_deref().unwrap_or_default())
                    }
                    ActionKind::RemoveFavorite => desktop.remove_favorite(&uri),
                    ActionKind::Trash => desktop.trash(&uri),
                };
                let _ = tx.send(WorkerResult::ActionFinished {
                    kind,
                    uri,
                    result: result.map_err(|e| e.to_string()),
                });
            })?;

        self.actions_in_flight += 1;
        Ok(())
    }

    fn apply(&mut self, result: WorkerResult) {
        match result {
            WorkerResult::Rebuilt { generation, shelf } => {
                if self.in_flight != Some(generation) {
                    debug!("discarding stale rebuild {}", generation);
                    return;
                }
                self.in_flight = None;

                if self.rebuild_pending {
                    self.rebuild_pending = false;
                    self.spawn_rebuild();
                    // A superseded result still beats an empty window.
                    if self.shelf.is_some() {
                        debug!("rebuild {} superseded", generation);
                        return;
                    }
                }

                info!(
                    "rebuild {}: {} document(s) for {}",
                    generation,
                    shelf.len(),
                    shelf.context.application_id
                );
                let shelf = Arc::new(shelf);
                self.shelf = Some(Arc::clone(&shelf));
                if let Some(tx) = &self.view_tx {
                    let _ = tx.send(ViewEvent::Show(shelf));
                }
            }

            WorkerResult::ActionFinished { kind, uri, result } => {
                self.actions_in_flight = self.actions_in_flight.saturating_sub(1);
                match result {
                    Ok(()) => debug!("{:?} {} done", kind, uri),
                    Err(e) => warn!("{:?} {} failed: {}", kind, uri, e),
                }
                // No rollback on failure: the rebuild shows whatever the
                // stores now say.
                if kind.changes_list() {
                    self.request_rebuild();
                }
            }
        }
    }
}

/// Read both registries and build a snapshot.  Runs on a worker.
///
/// Registry failures degrade to an empty source; they never abort the
/// rebuild.
fn build_shelf<D: Desktop>(
    desktop: &D,
    settings: &LibrarySettings,
    selected: Option<&ApplicationId>,
    generation: u64,
) -> Shelf {
    let lookup = |id: &ApplicationId| match desktop.application(id) {
        Ok(app) => app,
        Err(e) => {
            warn!("application lookup for {} failed: {}", id, e);
            None
        }
    };

    let installed: Vec<_> = settings
        .applications
        .iter()
        .filter_map(|id| lookup(id))
        .collect();

    let id = match selected {
        Some(id) => id.clone(),
        None => mime::default_application(&settings.applications, |id| {
            installed.iter().any(|a| &a.id == id)
        }),
    };
    let app = installed
        .iter()
        .find(|a| a.id == id)
        .cloned()
        .or_else(|| lookup(&id));

    let context = mime::context_for(
        &id,
        app.as_ref(),
        &settings.fallback_mime_types,
        &settings.hidden_mime_types,
    );

    let favorites = desktop.favorites().unwrap_or_else(|e| {
        warn!("failed to read favorites: {}", e);
        Vec::new()
    });
    let recent = desktop.recent().unwrap_or_else(|e| {
        warn!("failed to read recent files: {}", e);
        Vec::new()
    });

    let list = aggregate::build(&context, &favorites, recent, |uri| desktop.probe(uri));

    let tiles = list
        .into_entries()
        .into_iter()
        .map(|entry| {
            let details = desktop.details(&entry.document.uri, &entry.path, &entry.document.mime_type);
            Tile {
                document: entry.document,
                path: entry.path,
                details,
            }
        })
        .collect();

    let applications = installed
        .into_iter()
        .filter(|a| !a.no_display || a.id == id)
        .map(|a| ApplicationChoice {
            id: a.id,
            name: a.name,
        })
        .collect();

    Shelf {
        generation,
        context,
        applications,
        tiles,
    }
}

/// Build a snapshot synchronously on the calling thread.
///
/// Used by one-shot modes that have no event loop.
pub fn build_once<D: Desktop>(
    desktop: &D,
    settings: &LibrarySettings,
    selected: Option<&ApplicationId>,
) -> Shelf {
    build_shelf(desktop, settings, selected, 0)
}
