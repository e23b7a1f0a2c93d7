//! `file://` URI helpers.
//!
//! Both registries store documents as URIs; the filesystem wants paths.
//! Only the local `file` scheme is understood, anything else is treated as
//! remote.  Escaping follows GLib's rules for file URIs so that hashes of
//! the produced URIs match the thumbnail cache.

use std::ffi::OsString;
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::path::{Path, PathBuf};

/// Characters GLib leaves unescaped in the path of a file URI, besides
/// ASCII alphanumerics.
const PATH_SAFE: &[u8] = b"-._~!$&'()*+,;=:@/";

/// Convert a `file://` URI into an absolute path.
///
/// Returns `None` for other schemes, remote hosts, relative paths, or
/// malformed percent escapes.
pub fn to_path(uri: &str) -> Option<PathBuf> {
    let rest = uri.strip_prefix("file://")?;
    let path = if rest.starts_with('/') {
        rest
    } else {
        rest.strip_prefix("localhost")?
    };
    if !path.starts_with('/') {
        return None;
    }
    let bytes = percent_decode(path)?;
    Some(PathBuf::from(OsString::from_vec(bytes)))
}

/// Convert an absolute path into a `file://` URI.
pub fn from_path(path: &Path) -> String {
    let mut out = String::from("file://");
    for &b in path.as_os_str().as_bytes() {
        if b.is_ascii_alphanumeric() || PATH_SAFE.contains(&b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}

/// The last path segment of `uri`, decoded.
pub fn display_name(uri: &str) -> String {
    let trimmed = uri.trim_end_matches('/');
    let last = trimmed.rsplit('/').next().unwrap_or(trimmed);
    match percent_decode(last) {
        Some(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        None => last.to_string(),
    }
}

fn percent_decode(s: &str) -> Option<Vec<u8>> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes.get(i + 1..i + 3)?;
            let hex = std::str::from_utf8(hex).ok()?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Some(out)
}
