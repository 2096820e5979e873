// src/paths.rs

//! Small path utilities shared across the pipeline.
//!
//! All paths stored in the project database are relative to the project
//! root and use forward slashes, regardless of platform. The helpers here
//! are the single place where OS paths are converted into that form.

use std::path::Path;
use std::time::UNIX_EPOCH;

/// Convert `path` into a string relative to `base`, with forward slashes.
///
/// Returns `None` if `path` is not under `base`. The comparison is
/// component-wise, so a base of `/proj` does not match `/project/x`.
pub fn make_relative(base: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(base).ok()?;
    Some(normalize_separators(&rel.to_string_lossy()))
}

/// Replace backslashes with forward slashes.
pub fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}

/// Last-modification time of `path` in whole seconds since the epoch.
///
/// Returns 0 when the file does not exist (or its metadata cannot be
/// read), which makes a missing output compare as older than any input.
pub fn file_timestamp(path: &Path) -> i64 {
    let Ok(meta) = std::fs::metadata(path) else {
        return 0;
    };
    let Ok(modified) = meta.modified() else {
        return 0;
    };
    match modified.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        Err(_) => 0,
    }
}
