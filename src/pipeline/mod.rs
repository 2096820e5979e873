// src/pipeline/mod.rs

//! The build worker: single-threaded compile scheduling, queueing and
//! cancellation, and the polled outbound message channel.

pub mod messages;
pub mod queue;
pub mod worker;

pub use messages::{
    BuildCompletion, CompileFailure, OutboundQueue, PipelineDelegate, PipelineEvent,
    RecompileCompletion,
};
pub use queue::{CompileQueue, CompileRequest};
pub use worker::{BuildWorker, WorkerOptions};
