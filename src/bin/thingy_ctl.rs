//! Send a command to a running **thingy**.
//!
//! ```text
//! thingy-ctl open <file|uri>
//! thingy-ctl reveal <file|uri>
//! thingy-ctl favorite <file|uri>
//! thingy-ctl trash <file|uri>
//! thingy-ctl app <application id>
//! thingy-ctl refresh
//! ```
//!
//! The command is written as one line of JSON to
//! `$XDG_RUNTIME_DIR/thingy.sock`.

use thingy::command::{ApplicationId, Command};
use thingy::ipc::listener;
use thingy::{paths, uri};
use log::debug;
use std::path::Path;

const USAGE: &str = "usage: thingy-ctl open|reveal|favorite|trash <file|uri> | app <id> | refresh";

/// Accept both URIs and (relative) paths.
fn document_uri(arg: &str) -> Result<String, String> {
    if arg.contains("://") {
        return Ok(arg.to_string());
    }
    let path = std::fs::canonicalize(Path::new(arg))
        .map_err(|e| format!("{}: {}", arg, e))?;
    Ok(uri::from_path(&path))
}

fn parse_command(args: &[String]) -> Result<Command, String> {
    let verb = args.first().map(String::as_str);
    let operand = args.get(1).map(String::as_str);
    let command = match (verb, operand) {
        (Some("open"), Some(doc)) => Command::Open(document_uri(doc)?),
        (Some("reveal"), Some(doc)) => Command::Reveal(document_uri(doc)?),
        (Some("favorite"), Some(doc)) => Command::ToggleFavorite(document_uri(doc)?),
        (Some("trash"), Some(doc)) => Command::Trash(document_uri(doc)?),
        (Some("app"), Some(id)) => Command::SelectApplication(
            ApplicationId::parse(id).ok_or_else(|| format!("invalid application id {:?}", id))?,
        ),
        (Some("refresh"), None) => Command::Refresh,
        _ => return Err(USAGE.to_string()),
    };
    if args.len() > 2 {
        return Err(USAGE.to_string());
    }
    Ok(command)
}

fn send(command: &Command) -> Result<(), String> {
    let path = paths::socket_path();
    debug!("sending {} to {}", command, path.display());
    match listener::forward(&path, command) {
        Ok(true) => Ok(()),
        Ok(false) => Err(format!("thingy is not running ({})", path.display())),
        Err(e) => Err(e.to_string()),
    }
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = parse_command(&args).and_then(|command| send(&command));
    if let Err(e) = result {
        eprintln!("thingy-ctl: {}", e);
        std::process::exit(1);
    }
}
