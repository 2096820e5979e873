// src/pipeline/messages.rs

//! Outbound messages from the worker thread to the host.
//!
//! The worker never calls into host code directly; every completion event
//! is queued here and delivered when the host polls
//! [`crate::pipeline::BuildWorker::dispatch_events`] from its own thread.
//! This is the only channel crossing the worker/host thread boundary.

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::store::ProjectId;

/// Summary of a whole-project build pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildCompletion {
    pub project: ProjectId,
    pub succeeded: u32,
    pub failed: u32,
}

/// Summary of a single-file recompile pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecompileCompletion {
    pub project: ProjectId,
    /// The changed input, relative to the project root.
    pub path: String,
    pub succeeded: bool,
}

/// Detail of one asset that failed to compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileFailure {
    pub input_paths: Vec<String>,
    pub output_paths: Vec<String>,
    pub message: String,
}

/// One completion event, queued by the worker and drained by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    BuildFinished(BuildCompletion),
    RecompileFinished(RecompileCompletion),
    AssetCompiled,
    CompileFailed(CompileFailure),
}

/// Receiver of pipeline events on the polling thread.
///
/// All methods default to no-ops so hosts only implement what they react
/// to.
pub trait PipelineDelegate {
    fn on_build_finished(&mut self, _info: &BuildCompletion) {}
    fn on_recompile_finished(&mut self, _info: &RecompileCompletion) {}
    fn on_asset_compiled(&mut self) {}
    fn on_compile_failed(&mut self, _info: &CompileFailure) {}
}

/// FIFO queue of pipeline events.
///
/// Pushes happen on the worker thread; draining happens on whichever
/// thread polls. Guarded by its own mutex, distinct from the compile
/// queue's.
#[derive(Default)]
pub struct OutboundQueue {
    queue: Mutex<VecDeque<PipelineEvent>>,
}

impl OutboundQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: PipelineEvent) {
        self.queue.lock().push_back(event);
    }

    /// Pop the oldest queued event, if any.
    ///
    /// The lock is held only for the pop; delivery to the delegate happens
    /// outside it.
    pub fn pop(&self) -> Option<PipelineEvent> {
        self.queue.lock().pop_front()
    }

    /// Deliver every queued event, in order, to `delegate`.
    pub fn dispatch(&self, delegate: &mut dyn PipelineDelegate) {
        while let Some(event) = self.pop() {
            match event {
                PipelineEvent::BuildFinished(info) => delegate.on_build_finished(&info),
                PipelineEvent::RecompileFinished(info) => delegate.on_recompile_finished(&info),
                PipelineEvent::AssetCompiled => delegate.on_asset_compiled(),
                PipelineEvent::CompileFailed(info) => delegate.on_compile_failed(&info),
            }
        }
    }
}
