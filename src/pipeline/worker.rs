// src/pipeline/worker.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::{debug, info, warn};

use crate::errors::fatal;
use crate::events::AssetEventSink;
use crate::paths;
use crate::pipeline::messages::{
    BuildCompletion, OutboundQueue, PipelineDelegate, PipelineEvent, RecompileCompletion,
};
use crate::pipeline::queue::{CompileQueue, CompileRequest};
use crate::rules::{EngineFactory, HostContext, RuleEngine};
use crate::store::{ProjectId, ProjectStore};
use crate::watch::FileWatcher;

/// Configuration for [`BuildWorker::spawn`].
pub struct WorkerOptions {
    /// Location of the project database.
    pub db_path: PathBuf,
    /// Builds the rule engine when the worker switches projects.
    pub engine_factory: Box<dyn EngineFactory>,
    /// Where asset-compiled announcements go.
    pub events: Arc<dyn AssetEventSink>,
}

/// Serializes all compilation for this process onto one background
/// thread.
///
/// Producers on any thread enqueue requests; the worker drains them one
/// at a time, lazily rebuilding the rule-engine context when the target
/// project (or its directory) changes, and posts completion events to an
/// outbound queue that the host drains by polling
/// [`BuildWorker::dispatch_events`] from its own thread.
pub struct BuildWorker {
    queue: Arc<CompileQueue>,
    outbound: Arc<OutboundQueue>,
    thread: Option<JoinHandle<()>>,
}

impl BuildWorker {
    pub fn spawn(options: WorkerOptions) -> Self {
        let queue = Arc::new(CompileQueue::new());
        let outbound = Arc::new(OutboundQueue::new());

        let thread_queue = Arc::clone(&queue);
        let thread_outbound = Arc::clone(&outbound);
        let thread = std::thread::Builder::new()
            .name("build-worker".to_string())
            .spawn(move || worker_loop(options, thread_queue, thread_outbound))
            .unwrap_or_else(|err| fatal(&format!("spawning build worker thread: {err}")));

        Self {
            queue,
            outbound,
            thread: Some(thread),
        }
    }

    /// Enqueue a whole-project build. Never blocks beyond a brief lock.
    pub fn compile_project(&self, project: ProjectId) {
        self.queue.push(CompileRequest::Project(project));
    }

    /// Enqueue a single-file recompile for a changed path.
    ///
    /// This is the watcher-callback entry point; it is safe to call from
    /// any thread.
    pub fn file_changed(&self, path: impl Into<PathBuf>) {
        self.queue.push(CompileRequest::FileChanged(path.into()));
    }

    /// Cancel the running pass and drop queued requests.
    ///
    /// Takes effect within one asset's completion; a summary message for
    /// the interrupted pass is still posted.
    pub fn cancel(&self) {
        self.queue.cancel();
    }

    /// Drain queued completion events, in FIFO order, into `delegate`.
    ///
    /// Must be called from the thread that owns the delegate; the worker
    /// never invokes delegate code itself.
    pub fn dispatch_events(&self, delegate: &mut dyn PipelineDelegate) {
        self.outbound.dispatch(delegate);
    }
}

impl Drop for BuildWorker {
    fn drop(&mut self) {
        self.queue.signal_quit();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// The rule-engine context currently loaded on the worker thread.
struct ActiveProject {
    project: ProjectId,
    root: PathBuf,
    engine: RuleEngine,
}

/// What kind of pass is running, for the summary message.
enum PassMode {
    Project,
    SingleFile { path: String },
}

fn worker_loop(options: WorkerOptions, queue: Arc<CompileQueue>, outbound: Arc<OutboundQueue>) {
    let WorkerOptions {
        db_path,
        engine_factory,
        events,
    } = options;

    let mut store = ProjectStore::create_or_open(&db_path);

    // Watcher events only append to the compile queue; the pass itself
    // always runs here on the worker thread.
    let watcher_queue = Arc::clone(&queue);
    let mut watcher = match FileWatcher::new(move |_kind, path| {
        watcher_queue.push(CompileRequest::FileChanged(path.to_path_buf()));
    }) {
        Ok(watcher) => Some(watcher),
        Err(err) => {
            warn!(error = %err, "file watching unavailable");
            None
        }
    };

    let mut active: Option<ActiveProject> = None;

    info!("build worker started");

    while let Some(request) = queue.next() {
        let mode = match request {
            CompileRequest::Project(project) => {
                prepare_project_pass(
                    project,
                    &mut active,
                    &store,
                    engine_factory.as_ref(),
                    watcher.as_mut(),
                );
                PassMode::Project
            }
            CompileRequest::FileChanged(path) => {
                let Some(path) = prepare_single_file_pass(&path, &mut active, &store) else {
                    continue;
                };
                PassMode::SingleFile { path }
            }
        };

        let Some(context) = active.as_mut() else {
            continue;
        };
        run_pass(context, mode, &queue, &outbound, &mut store, events.as_ref());
    }

    info!("build worker stopped");
}

/// Switch to (or reuse) the rule-engine context for a whole-project pass.
fn prepare_project_pass(
    project: ProjectId,
    active: &mut Option<ActiveProject>,
    store: &ProjectStore,
    factory: &dyn EngineFactory,
    watcher: Option<&mut FileWatcher>,
) {
    let directory = PathBuf::from(store.project_directory(project));

    let reusable = active
        .as_ref()
        .is_some_and(|a| a.project == project && a.root == directory);

    if !reusable {
        info!(project, ?directory, "loading project build configuration");

        if let Err(err) = std::env::set_current_dir(&directory) {
            warn!(?directory, error = %err, "cannot change working directory");
        }

        // Build-configuration problems are author-time errors; a broken
        // build script must not be silently skipped.
        let engine = factory
            .create(project, &directory)
            .unwrap_or_else(|err| fatal(&format!("project {project}: {err:#}")));

        if let (Some(watcher), Some(content_dir)) = (watcher, engine.content_dir()) {
            let content_root = directory.join(content_dir);
            if let Err(err) = watcher.watch(&content_root) {
                warn!(?content_root, error = %err, "cannot watch content directory");
            }
        }

        *active = Some(ActiveProject {
            project,
            root: directory,
            engine,
        });
    }

    if let Some(context) = active.as_mut() {
        context.engine.setup(None);
    }
}

/// Seed a pass with the outputs depending on one changed file. Returns
/// the project-relative changed path, or `None` when the request cannot
/// be served.
fn prepare_single_file_pass(
    changed: &Path,
    active: &mut Option<ActiveProject>,
    store: &ProjectStore,
) -> Option<String> {
    let Some(context) = active.as_mut() else {
        warn!(?changed, "file change before any project was compiled; ignoring");
        return None;
    };

    let Some(input) = paths::make_relative(&context.root, changed) else {
        debug!(?changed, root = ?context.root, "changed path outside project root");
        return None;
    };

    let outputs = store.dependents(context.project, &input);
    debug!(input = %input, dependents = outputs.len(), "file change");

    context.engine.setup(Some(&outputs));
    Some(input)
}

/// Drive one compile pass to completion (or cancellation) and post its
/// summary.
fn run_pass(
    context: &mut ActiveProject,
    mode: PassMode,
    queue: &CompileQueue,
    outbound: &OutboundQueue,
    store: &mut ProjectStore,
    events: &dyn AssetEventSink,
) {
    let mut succeeded: u32 = 0;
    let mut failed: u32 = 0;

    loop {
        // Cooperative cancellation: checked before every asset, never
        // mid-asset.
        if !queue.should_continue() {
            info!(succeeded, failed, "compile pass cancelled");
            break;
        }

        let mut host = HostContext {
            store: &mut *store,
            events,
            outbound,
            project: context.project,
        };
        let step = context.engine.compile_next(&mut host);

        if !step.had_remaining {
            queue.finish_pass();
            break;
        }

        if step.succeeded {
            succeeded += 1;
            outbound.push(PipelineEvent::AssetCompiled);
        } else {
            failed += 1;
        }
    }

    match mode {
        PassMode::Project => {
            info!(project = context.project, succeeded, failed, "build finished");
            outbound.push(PipelineEvent::BuildFinished(BuildCompletion {
                project: context.project,
                succeeded,
                failed,
            }));
        }
        PassMode::SingleFile { path } => {
            info!(project = context.project, path = %path, succeeded, "recompile finished");
            outbound.push(PipelineEvent::RecompileFinished(RecompileCompletion {
                project: context.project,
                path,
                succeeded: succeeded > 0,
            }));
        }
    }
}
