//! GTK4 window that runs on the **main thread**.
//!
//! # Widget tree
//!
//! ```text
//! window
//! └ box (vertical)
//!     ├ header         application drop-down, refresh button
//!     └ GtkStack
//!         ├ "tiles"    scrolled GtkFlowBox of tile buttons
//!         └ "empty"    label shown when the shelf is empty
//! ```
//!
//! Widgets never call into the library directly.  Every user action is
//! sent as a [`Command`] into the same channel the socket and the watchers
//! feed, and the poll timer hands it to [`Library::handle`].

use crate::command::{ApplicationId, Command};
use crate::config::Config;
use crate::document::{Shelf, Tile};
use crate::library::Library;
use crate::traits::{Desktop, ViewEvent};
use crate::ui::geometry::WindowGeometry;
use gtk4::prelude::*;
use gtk4::{glib, pango};
use log::{debug, error, info, warn};
use std::cell::{Cell, RefCell};
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::mpsc;
use std::time::Duration;

const TILES_PAGE: &str = "tiles";
const EMPTY_PAGE: &str = "empty";
const THUMBNAIL_SIZE: i32 = 128;
const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, thiserror::Error)]
pub enum UiError {
    #[error("failed to initialise GTK: {0}")]
    Init(#[from] glib::BoolError),
}

//  Application selector

/// Drop-down of applications.  Positions map back to ids through `ids`.
struct Selector {
    dropdown: gtk4::DropDown,
    ids: Rc<RefCell<Vec<ApplicationId>>>,
    /// Set while the model is replaced, so the change is not mistaken for
    /// a user selection.
    updating: Rc<Cell<bool>>,
}

impl Selector {
    fn new(tx: &mpsc::Sender<Command>) -> Self {
        let dropdown = gtk4::DropDown::from_strings(&[]);
        let ids: Rc<RefCell<Vec<ApplicationId>>> = Rc::default();
        let updating: Rc<Cell<bool>> = Rc::default();

        let (ids_c, updating_c, tx) = (Rc::clone(&ids), Rc::clone(&updating), tx.clone());
        dropdown.connect_selected_notify(move |dd| {
            if updating_c.get() {
                return;
            }
            let Some(id) = ids_c.borrow().get(dd.selected() as usize).cloned() else {
                return;
            };
            let _ = tx.send(Command::SelectApplication(id));
        });

        Self {
            dropdown,
            ids,
            updating,
        }
    }

    fn update(&self, shelf: &Shelf) {
        let active = &shelf.context.application_id;
        let mut ids: Vec<ApplicationId> = shelf.applications.iter().map(|a| a.id.clone()).collect();
        let mut names: Vec<&str> = shelf.applications.iter().map(|a| a.name.as_str()).collect();
        if !ids.contains(active) {
            ids.push(active.clone());
            names.push(&shelf.context.display_name);
        }
        let position = ids.iter().position(|id| id == active).unwrap_or(0);

        self.updating.set(true);
        if *self.ids.borrow() != ids {
            self.dropdown.set_model(Some(&gtk4::StringList::new(&names)));
            *self.ids.borrow_mut() = ids;
        }
        self.dropdown.set_selected(position as u32);
        self.updating.set(false);
    }
}

//  View

struct View {
    window: gtk4::Window,
    selector: Selector,
    stack: gtk4::Stack,
    flowbox: gtk4::FlowBox,
    empty: gtk4::Label,
}

impl View {
    /// Replace everything on screen with `shelf`.
    fn show(&self, shelf: &Shelf, tx: &mpsc::Sender<Command>) {
        debug!("showing generation {} ({} tiles)", shelf.generation, shelf.len());
        self.selector.update(shelf);
        self.window
            .set_title(Some(&format!("Recent documents: {}", shelf.context.display_name)));

        while let Some(child) = self.flowbox.first_child() {
            self.flowbox.remove(&child);
        }
        for tile in &shelf.tiles {
            self.flowbox.insert(&tile_widget(tile, tx), -1);
        }

        if shelf.is_empty() {
            self.empty.set_label(&format!(
                "No recent documents for {}",
                shelf.context.display_name
            ));
            self.stack.set_visible_child_name(EMPTY_PAGE);
        } else {
            self.stack.set_visible_child_name(TILES_PAGE);
        }
    }
}

//  Tiles

fn tile_widget(tile: &Tile, tx: &mpsc::Sender<Command>) -> gtk4::Button {
    let image = tile
        .details
        .thumbnail
        .as_deref()
        .unwrap_or(tile.details.fallback_icon.as_path());
    let picture = gtk4::Picture::for_filename(image);
    picture.set_can_shrink(true);
    picture.set_size_request(THUMBNAIL_SIZE, THUMBNAIL_SIZE);

    let overlay = gtk4::Overlay::new();
    overlay.set_child(Some(&picture));
    if tile.is_favorite() {
        let emblem = gtk4::Image::from_icon_name("starred-symbolic");
        emblem.set_halign(gtk4::Align::End);
        emblem.set_valign(gtk4::Align::Start);
        overlay.add_overlay(&emblem);
    }

    let label = gtk4::Label::new(Some(tile.details.display_name.as_str()));
    label.set_ellipsize(pango::EllipsizeMode::Middle);
    label.set_max_width_chars(18);

    let content = gtk4::Box::new(gtk4::Orientation::Vertical, 4);
    content.append(&overlay);
    content.append(&label);
    if let Some(fraction) = tile.details.progress {
        let bar = gtk4::ProgressBar::new();
        bar.set_fraction(fraction);
        content.append(&bar);
    }

    let button = gtk4::Button::new();
    button.set_child(Some(&content));
    button.set_has_frame(false);
    button.set_tooltip_text(Some(tile.path.to_string_lossy().as_ref()));

    let uri = tile.uri().to_string();
    {
        let (tx, uri) = (tx.clone(), uri.clone());
        button.connect_clicked(move |_| {
            let _ = tx.send(Command::Open(uri.clone()));
        });
    }

    let gesture = gtk4::GestureClick::new();
    gesture.set_button(3);
    let weak = button.downgrade();
    let favorite = tile.is_favorite();
    let tx = tx.clone();
    gesture.connect_pressed(move |_, _, _, _| {
        let Some(button) = weak.upgrade() else {
            return;
        };
        let popover = tile_menu(&uri, favorite, &tx);
        popover.set_parent(&button);
        popover.connect_closed(|popover| {
            let popover = popover.clone();
            glib::idle_add_local_once(move || popover.unparent());
        });
        popover.popup();
    });
    button.add_controller(gesture);

    button
}

/// The right-click menu of a tile.
fn tile_menu(uri: &str, favorite: bool, tx: &mpsc::Sender<Command>) -> gtk4::Popover {
    let popover = gtk4::Popover::new();
    let menu = gtk4::Box::new(gtk4::Orientation::Vertical, 0);

    let favorite_label = if favorite {
        "Remove from favorites"
    } else {
        "Add to favorites"
    };
    let items = [
        ("Show in folder", Command::Reveal(uri.to_string())),
        (favorite_label, Command::ToggleFavorite(uri.to_string())),
        ("Move to trash", Command::Trash(uri.to_string())),
    ];
    for (label, command) in items {
        let item = gtk4::Button::with_label(label);
        item.set_has_frame(false);
        let tx = tx.clone();
        let weak = popover.downgrade();
        item.connect_clicked(move |_| {
            let _ = tx.send(command.clone());
            if let Some(popover) = weak.upgrade() {
                popover.popdown();
            }
        });
        menu.append(&item);
    }

    popover.set_child(Some(&menu));
    popover
}

//  Public API

/// Run the GTK4 main loop on the **current** (main) thread until the
/// window is closed.
///
/// `cmd_tx` is the sending half of `cmd_rx`; widgets use it to submit user
/// actions.
pub fn run_main_loop<D: Desktop>(
    mut library: Library<D>,
    cmd_rx: mpsc::Receiver<Command>,
    cmd_tx: mpsc::Sender<Command>,
    config: &Config,
    geometry_path: PathBuf,
) -> Result<(), UiError> {
    gtk4::init()?;
    info!("GTK4 initialised on main thread");

    let geometry = WindowGeometry::load_or_default(&geometry_path, &config.window);
    let window = gtk4::Window::new();
    window.set_title(Some("Recent documents"));
    window.set_default_size(geometry.width, geometry.height);
    if geometry.maximized {
        window.maximize();
    }

    //  Header
    let selector = Selector::new(&cmd_tx);
    let refresh = gtk4::Button::from_icon_name("view-refresh-symbolic");
    {
        let tx = cmd_tx.clone();
        refresh.connect_clicked(move |_| {
            let _ = tx.send(Command::Refresh);
        });
    }
    let header = gtk4::Box::new(gtk4::Orientation::Horizontal, 6);
    header.set_margin_top(6);
    header.set_margin_bottom(6);
    header.set_margin_start(6);
    header.set_margin_end(6);
    selector.dropdown.set_hexpand(true);
    header.append(&selector.dropdown);
    header.append(&refresh);

    //  Pages
    let flowbox = gtk4::FlowBox::new();
    flowbox.set_selection_mode(gtk4::SelectionMode::None);
    flowbox.set_homogeneous(true);
    flowbox.set_valign(gtk4::Align::Start);
    flowbox.set_column_spacing(12);
    flowbox.set_row_spacing(12);

    let scrolled = gtk4::ScrolledWindow::new();
    scrolled.set_child(Some(&flowbox));
    scrolled.set_vexpand(true);

    let empty = gtk4::Label::new(Some("Loading…"));
    empty.set_vexpand(true);

    let stack = gtk4::Stack::new();
    stack.add_named(&scrolled, Some(TILES_PAGE));
    stack.add_named(&empty, Some(EMPTY_PAGE));
    stack.set_visible_child_name(EMPTY_PAGE);

    let root = gtk4::Box::new(gtk4::Orientation::Vertical, 0);
    root.append(&header);
    root.append(&stack);
    window.set_child(Some(&root));

    let main_loop = glib::MainLoop::new(None, false);
    {
        let main_loop = main_loop.clone();
        window.connect_close_request(move |w| {
            let geometry = WindowGeometry {
                width: w.default_width(),
                height: w.default_height(),
                maximized: w.is_maximized(),
            };
            match geometry.save(&geometry_path) {
                Ok(()) => debug!("saved window size to {}", geometry_path.display()),
                Err(e) => warn!("failed to save window size: {}", e),
            }
            main_loop.quit();
            glib::Propagation::Proceed
        });
    }
    window.present();

    //  View channel
    let (view_tx, view_rx) = mpsc::channel::<ViewEvent>();
    library.set_view(view_tx);
    library.request_rebuild();

    let view = View {
        window,
        selector,
        stack,
        flowbox,
        empty,
    };

    glib::timeout_add_local(POLL_INTERVAL, move || {
        // 1. Drain commands.
        while let Ok(cmd) = cmd_rx.try_recv() {
            debug!("command: {}", cmd);
            if let Err(e) = library.handle(cmd) {
                error!("command error: {}", e);
            }
        }

        // 2. Collect worker results.
        library.poll();

        // 3. Render the newest snapshot only.
        if let Some(ViewEvent::Show(shelf)) = view_rx.try_iter().last() {
            view.show(&shelf, &cmd_tx);
        }

        glib::ControlFlow::Continue
    });

    info!("entering GLib main loop");
    main_loop.run();
    info!("GLib main loop exited");
    Ok(())
}
