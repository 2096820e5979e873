// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod events;
pub mod exec;
pub mod logging;
pub mod paths;
pub mod pipeline;
pub mod rules;
pub mod store;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use tracing::info;

use crate::cli::{CliArgs, Command};
use crate::events::AssetEventService;
use crate::pipeline::{
    BuildCompletion, BuildWorker, CompileFailure, PipelineDelegate, RecompileCompletion,
    WorkerOptions,
};
use crate::rules::ConfigEngineFactory;
use crate::store::{ProjectId, ProjectStore};

/// How often the host polls the outbound message queue.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// High-level entry point used by `main.rs`.
pub fn run(args: CliArgs) -> Result<()> {
    let db_path = resolve_db_path(&args);

    match args.command.clone() {
        Command::Add { name, directory } => {
            let directory = std::fs::canonicalize(&directory)
                .map_err(|err| anyhow!("project directory {directory:?}: {err}"))?;
            let mut store = ProjectStore::create_or_open(&db_path);
            let id = store.add_project(&name, &directory.to_string_lossy());
            println!("added project {id}: {name} ({})", directory.display());
            Ok(())
        }

        Command::List => {
            let store = ProjectStore::create_or_open(&db_path);
            let active = store.active_project();
            let ids = store.project_ids();
            if ids.is_empty() {
                println!("no projects registered");
                return Ok(());
            }
            for id in ids {
                let marker = if active == Some(id) { "*" } else { " " };
                println!(
                    "{marker} {id}  {}  {}",
                    store.project_name(id),
                    store.project_directory(id)
                );
            }
            Ok(())
        }

        Command::Use { project, none } => {
            let mut store = ProjectStore::create_or_open(&db_path);
            if none {
                store.set_active_project(None);
                println!("cleared active project");
                return Ok(());
            }
            let Some(id) = project else {
                return Err(anyhow!("a project id (or --none) is required"));
            };
            if !store.project_ids().contains(&id) {
                return Err(anyhow!("no project with id {id}"));
            }
            store.set_active_project(Some(id));
            println!("active project is now {id}");
            Ok(())
        }

        Command::Build { project } => {
            let project = resolve_project(&db_path, project)?;
            let worker = spawn_worker(&args, &db_path);
            worker.compile_project(project);

            let mut delegate = ConsoleDelegate::default();
            while !delegate.finished {
                worker.dispatch_events(&mut delegate);
                std::thread::sleep(POLL_INTERVAL);
            }
            Ok(())
        }

        Command::Watch { project } => {
            let project = resolve_project(&db_path, project)?;
            let worker = spawn_worker(&args, &db_path);
            worker.compile_project(project);

            info!(project, "watching for changes; press Ctrl-C to stop");
            let mut delegate = ConsoleDelegate::default();
            loop {
                worker.dispatch_events(&mut delegate);
                std::thread::sleep(POLL_INTERVAL);
            }
        }

        Command::Errors { project } => {
            let project = resolve_project(&db_path, project)?;
            let store = ProjectStore::create_or_open(&db_path);
            let ids = store.error_ids(project);
            if ids.is_empty() {
                println!("no compile errors recorded");
                return Ok(());
            }
            for id in ids {
                println!("error {id}: {}", store.error_message(id));
                for input in store.error_inputs(id) {
                    println!("    input:  {input}");
                }
                for output in store.error_outputs(id) {
                    println!("    output: {output}");
                }
            }
            Ok(())
        }
    }
}

fn resolve_db_path(args: &CliArgs) -> PathBuf {
    args.db
        .clone()
        .or_else(|| std::env::var("ASSETPIPE_DB").ok())
        .unwrap_or_else(|| "assetpipe.db".to_string())
        .into()
}

/// Explicit project id, or the active project, or a clean error.
fn resolve_project(db_path: &PathBuf, explicit: Option<ProjectId>) -> Result<ProjectId> {
    if let Some(id) = explicit {
        return Ok(id);
    }
    // Transient host-side metadata read; builds use the worker's own
    // connection.
    let store = ProjectStore::create_or_open(db_path);
    store
        .active_project()
        .ok_or_else(|| anyhow!("no project id given and no active project set"))
}

fn spawn_worker(args: &CliArgs, db_path: &PathBuf) -> BuildWorker {
    let events = Arc::new(AssetEventService::spawn(args.event_port));
    BuildWorker::spawn(WorkerOptions {
        db_path: db_path.clone(),
        engine_factory: Box::new(ConfigEngineFactory),
        events,
    })
}

/// Prints pipeline events as they arrive; remembers when a whole-project
/// build has finished so `build` can exit.
#[derive(Default)]
struct ConsoleDelegate {
    finished: bool,
}

impl PipelineDelegate for ConsoleDelegate {
    fn on_build_finished(&mut self, info: &BuildCompletion) {
        println!(
            "build finished: {} succeeded, {} failed",
            info.succeeded, info.failed
        );
        self.finished = true;
    }

    fn on_recompile_finished(&mut self, info: &RecompileCompletion) {
        let status = if info.succeeded { "ok" } else { "failed" };
        println!("recompiled {}: {status}", info.path);
    }

    fn on_compile_failed(&mut self, info: &CompileFailure) {
        for input in &info.input_paths {
            println!("error compiling {input}: {}", info.message);
        }
    }
}
