//! Command socket.
//!
//! External tools (`thingy-ctl`, scripts, key-bind helpers) connect to the
//! socket and send newline-delimited JSON commands.

pub mod listener;
