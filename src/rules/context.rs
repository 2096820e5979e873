// src/rules/context.rs

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::events::AssetEventSink;
use crate::exec::{self, ProcessOutput};
use crate::paths;
use crate::pipeline::messages::{CompileFailure, OutboundQueue, PipelineEvent};
use crate::store::{ProjectId, ProjectStore};

/// Handles the worker lends to the rule engine for the duration of one
/// compile step.
pub struct HostContext<'a> {
    pub store: &'a mut ProjectStore,
    pub events: &'a dyn AssetEventSink,
    pub outbound: &'a OutboundQueue,
    pub project: ProjectId,
}

/// The complete capability surface exposed to compilation rules.
///
/// Everything a rule may do to the outside world goes through this
/// context: run tools, query timestamps, record or clear dependency edges
/// and compile errors, and announce compiled outputs. Rules hold no
/// references of their own to the store or the event channel.
pub struct RuleContext<'h, 'a> {
    host: &'h mut HostContext<'a>,
    root: &'h Path,
    content_dir: Option<&'h str>,
    data_dir: Option<&'h str>,
    manifest: Option<&'h str>,
}

impl<'h, 'a> RuleContext<'h, 'a> {
    pub(crate) fn new(
        host: &'h mut HostContext<'a>,
        root: &'h Path,
        content_dir: Option<&'h str>,
        data_dir: Option<&'h str>,
        manifest: Option<&'h str>,
    ) -> Self {
        Self {
            host,
            root,
            content_dir,
            data_dir,
            manifest,
        }
    }

    /// Absolute root directory of the project being compiled.
    pub fn project_root(&self) -> &Path {
        self.root
    }

    /// Declared source-asset directory, relative to the project root.
    pub fn content_dir(&self) -> Option<&str> {
        self.content_dir
    }

    /// Declared compiled-data directory, relative to the project root.
    pub fn data_dir(&self) -> Option<&str> {
        self.data_dir
    }

    /// Declared manifest path, relative to the project root.
    pub fn manifest_path(&self) -> Option<&str> {
        self.manifest
    }

    /// Resolve a project-relative path against the project root.
    pub fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    /// Run an external tool to completion from the project root.
    ///
    /// Returns `None` when the tool could not be launched.
    pub fn run_process(&self, command: &str, args: &[String]) -> Option<ProcessOutput> {
        exec::run_process(command, args, Some(self.root))
    }

    /// Last-modification time of a project-relative path, in seconds; 0
    /// when the file is missing.
    pub fn file_timestamp(&self, path: &str) -> i64 {
        paths::file_timestamp(&self.resolve(path))
    }

    /// Delete all recorded dependency edges for `output`.
    pub fn clear_dependencies(&mut self, output: &str) {
        self.host.store.clear_dependencies(self.host.project, output);
    }

    /// Record that `output` was produced from `input`.
    pub fn record_dependency(&mut self, output: &str, input: &str) {
        self.host
            .store
            .record_dependency(self.host.project, output, input);
    }

    /// Persist a compile error and surface it to the host.
    pub fn record_compile_error(
        &mut self,
        inputs: Vec<String>,
        outputs: Vec<String>,
        message: String,
    ) {
        self.host
            .store
            .record_error(self.host.project, &inputs, &outputs, &message);
        self.host
            .outbound
            .push(PipelineEvent::CompileFailed(CompileFailure {
                input_paths: inputs,
                output_paths: outputs,
                message,
            }));
    }

    /// Clear a previously recorded compile error for the given set.
    pub fn clear_compile_error(&mut self, inputs: &[String], outputs: &[String]) {
        self.host.store.clear_error(self.host.project, inputs, outputs);
    }

    /// Announce that `path` (project-relative) was freshly compiled.
    ///
    /// The path is relativized against the declared data directory and
    /// normalized to forward slashes before being forwarded; paths outside
    /// the data directory are not announced.
    pub fn notify_asset_compiled(&mut self, path: &str) {
        let Some(data_dir) = self.data_dir else {
            return;
        };
        let Some(relative) = paths::make_relative(Path::new(data_dir), Path::new(path)) else {
            return;
        };
        if relative.is_empty() {
            return;
        }
        debug!(asset = %relative, "asset compiled");
        self.host.events.notify_asset_compiled(&relative);
    }
}
