//! **thingy**: a library of recent and favorite documents.
//!
//! The window lists the documents of one application (a document viewer
//! such as Xreader, or an office suite): the user's favorites first, in the
//! order they were added, then recently used files, newest first.  Only
//! documents whose mime type the application handles and that still exist
//! on the local disk are shown.
//!
//! # Architecture
//!
//! The crate is organised around two core traits:
//!
//! * [`traits::Desktop`] abstracts every desktop service the library reads
//!   or drives (favorites, recent files, desktop entries, thumbnails, trash,
//!   file manager, launcher) so the aggregation logic is not coupled to
//!   any specific desktop.
//! * [`traits::CommandSource`] abstracts the things that produce
//!   [`command::Command`]s (a Unix socket, file watchers, a settings
//!   monitor) so the main loop is not coupled to any specific transport.
//!
//! [`library::Library`] owns the current list and runs rebuilds on worker
//! threads; [`aggregate`] is the pure merge/filter/order step.  Concrete
//! implementations live in [`desktop`] (freedesktop) and [`ipc`]
//! (Unix-socket command listener); [`ui`] renders the list.

pub mod aggregate;
pub mod command;
pub mod config;
pub mod desktop;
pub mod document;
pub mod ipc;
pub mod library;
pub mod mime;
pub mod paths;
pub mod traits;
pub mod ui;
pub mod uri;
