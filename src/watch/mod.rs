// src/watch/mod.rs

//! Filesystem change observation for the active project's content
//! directory.

pub mod watcher;

pub use watcher::{FileWatcher, WatchEvent};
