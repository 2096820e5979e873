// src/errors.rs

//! Crate-wide error aliases and the fatal-exit helper.
//!
//! Host-level code (CLI, config loading callers) uses `anyhow` Results.
//! Storage-engine failures and build-configuration failures are not
//! recoverable: the build environment itself is broken, and continuing
//! risks corrupting dependency/error state. Those paths go through
//! [`fatal`].

pub use anyhow::{Error, Result};

/// Emit a diagnostic and terminate the process.
///
/// Used for storage-engine failures and build-script (configuration)
/// failures only; per-asset compile failures are ordinary data and never
/// come through here.
pub fn fatal(message: &str) -> ! {
    tracing::error!("{message}");
    eprintln!("assetpipe fatal error: {message}");
    std::process::exit(1);
}
