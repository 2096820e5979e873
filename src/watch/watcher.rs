// src/watch/watcher.rs

use std::path::{Path, PathBuf};

use anyhow::Result;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};

/// Kind of filesystem change delivered to the callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEvent {
    Created,
    Modified,
    Removed,
    Renamed,
}

/// Single-subscription recursive directory watcher.
///
/// Exactly one callback is registered at construction; watching a new
/// directory replaces the previous subscription. The callback fires on
/// the watch backend's own thread and must be cheap and thread-safe;
/// the pipeline's callback only appends a request to the compile queue.
pub struct FileWatcher {
    inner: RecommendedWatcher,
    watched: Option<PathBuf>,
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher")
            .field("watched", &self.watched)
            .finish_non_exhaustive()
    }
}

impl FileWatcher {
    /// Create a watcher delivering change events to `callback`.
    pub fn new<F>(callback: F) -> Result<Self>
    where
        F: Fn(WatchEvent, &Path) + Send + 'static,
    {
        let inner = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let Some(kind) = classify(&event.kind) else {
                        return;
                    };
                    for path in &event.paths {
                        debug!(?kind, ?path, "file change observed");
                        callback(kind, path);
                    }
                }
                Err(err) => {
                    warn!(error = %err, "file watch error");
                }
            },
            Config::default(),
        )?;

        Ok(Self {
            inner,
            watched: None,
        })
    }

    /// Watch `dir` recursively, replacing any previous subscription.
    pub fn watch(&mut self, dir: &Path) -> Result<()> {
        if let Some(previous) = self.watched.take() {
            if let Err(err) = self.inner.unwatch(&previous) {
                debug!(?previous, error = %err, "unwatching previous directory failed");
            }
        }
        self.inner.watch(dir, RecursiveMode::Recursive)?;
        self.watched = Some(dir.to_path_buf());
        info!(?dir, "watching content directory");
        Ok(())
    }
}

/// Map a notify event kind onto the watch contract; access-only events
/// are ignored.
fn classify(kind: &EventKind) -> Option<WatchEvent> {
    match kind {
        EventKind::Create(_) => Some(WatchEvent::Created),
        EventKind::Modify(notify::event::ModifyKind::Name(_)) => Some(WatchEvent::Renamed),
        EventKind::Modify(_) => Some(WatchEvent::Modified),
        EventKind::Remove(_) => Some(WatchEvent::Removed),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => None,
    }
}
