// src/pipeline/queue.rs

use std::collections::VecDeque;
use std::path::PathBuf;

use parking_lot::{Condvar, Mutex};

use crate::store::ProjectId;

/// One unit of work for the worker thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileRequest {
    /// Compile every out-of-date asset of the project.
    Project(ProjectId),
    /// Recompile the outputs depending on one changed file (absolute
    /// path as delivered by the watcher).
    FileChanged(PathBuf),
}

struct QueueState {
    queue: VecDeque<CompileRequest>,
    /// Set on push; polled by the worker between assets for cooperative
    /// cancellation; cleared at end of pass when no request is waiting.
    compiling: bool,
    /// Terminal signal: the worker exits once it observes this.
    quit: bool,
}

/// The compile-request queue shared between producers and the worker.
///
/// Producers (any thread) only append; the worker exclusively drains.
/// One mutex guards the queue, the in-progress flag and the terminal
/// flag; the condvar wakes the worker on new work or shutdown.
pub struct CompileQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

impl CompileQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                queue: VecDeque::new(),
                compiling: false,
                quit: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Append a request and mark a compile as in progress. Never blocks
    /// beyond the lock.
    pub fn push(&self, request: CompileRequest) {
        let mut state = self.state.lock();
        state.queue.push_back(request);
        state.compiling = true;
        self.available.notify_all();
    }

    /// Cancel: drop all queued requests and clear the in-progress flag.
    ///
    /// A running pass observes the cleared flag before its next asset and
    /// stops within one asset's completion.
    pub fn cancel(&self) {
        let mut state = self.state.lock();
        state.queue.clear();
        state.compiling = false;
    }

    /// Signal the worker to exit once it next reaches the dispatch point.
    pub fn signal_quit(&self) {
        let mut state = self.state.lock();
        state.queue.clear();
        state.quit = true;
        self.available.notify_all();
    }

    /// Worker side: block until work or shutdown; `None` means quit.
    pub fn next(&self) -> Option<CompileRequest> {
        let mut state = self.state.lock();
        loop {
            if state.quit {
                return None;
            }
            if state.compiling {
                if let Some(request) = state.queue.pop_front() {
                    return Some(request);
                }
                // Flag set with nothing queued (e.g. after a cancel raced
                // a pass end); wait for the next push.
                state.compiling = false;
            }
            self.available.wait(&mut state);
        }
    }

    /// Whether the current pass should keep compiling. Checked between
    /// assets, never mid-asset.
    pub fn should_continue(&self) -> bool {
        let state = self.state.lock();
        state.compiling && !state.quit
    }

    /// End-of-pass: clear the in-progress flag unless more requests
    /// arrived while the pass ran (clearing it then would lose their
    /// wakeup).
    pub fn finish_pass(&self) {
        let mut state = self.state.lock();
        if state.queue.is_empty() {
            state.compiling = false;
        }
    }
}

impl Default for CompileQueue {
    fn default() -> Self {
        Self::new()
    }
}
