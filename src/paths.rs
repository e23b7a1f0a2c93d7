//! XDG base directories.
//!
//! Resolved straight from the environment with the defaults of the XDG
//! Base Directory specification.

use std::path::PathBuf;

fn home() -> PathBuf {
    PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| "/tmp".into()))
}

/// Read an XDG variable, ignoring empty and relative values as the
/// specification requires.
fn xdg_var(name: &str) -> Option<PathBuf> {
    std::env::var_os(name)
        .map(PathBuf::from)
        .filter(|p| p.is_absolute())
}

/// `$XDG_CONFIG_HOME/thingy`.
pub fn config_dir() -> PathBuf {
    xdg_var("XDG_CONFIG_HOME")
        .unwrap_or_else(|| home().join(".config"))
        .join("thingy")
}

/// `$XDG_DATA_HOME`.
pub fn data_home() -> PathBuf {
    xdg_var("XDG_DATA_HOME").unwrap_or_else(|| home().join(".local/share"))
}

/// `$XDG_CACHE_HOME`.
pub fn cache_home() -> PathBuf {
    xdg_var("XDG_CACHE_HOME").unwrap_or_else(|| home().join(".cache"))
}

/// `$XDG_DATA_DIRS`, most important first.
pub fn data_dirs() -> Vec<PathBuf> {
    let dirs: Vec<PathBuf> = std::env::var("XDG_DATA_DIRS")
        .unwrap_or_default()
        .split(':')
        .map(PathBuf::from)
        .filter(|p| p.is_absolute())
        .collect();
    if dirs.is_empty() {
        vec![PathBuf::from("/usr/local/share"), PathBuf::from("/usr/share")]
    } else {
        dirs
    }
}

/// Directories searched for desktop entries, user entries first.
pub fn application_dirs() -> Vec<PathBuf> {
    std::iter::once(data_home())
        .chain(data_dirs())
        .map(|d| d.join("applications"))
        .collect()
}

/// Default socket path for the command listener.
pub fn socket_path() -> PathBuf {
    let runtime = std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".into());
    PathBuf::from(runtime).join("thingy.sock")
}
