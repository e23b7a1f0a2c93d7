//! Presentation of the library.
//!
//! With the `gui` feature, [`gtk::run_main_loop`] takes over the main
//! thread and drives both command processing and rendering through the
//! GLib main loop.

pub mod geometry;

#[cfg(feature = "gui")]
pub mod gtk;
