// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

use crate::events::DEFAULT_EVENT_PORT;
use crate::store::ProjectId;

/// Command-line arguments for `assetpipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetpipe",
    version,
    about = "Incremental asset build pipeline with file-watch rebuilds.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the project database.
    ///
    /// Falls back to the `ASSETPIPE_DB` environment variable, then to
    /// `assetpipe.db` in the current working directory.
    #[arg(long, value_name = "PATH", global = true)]
    pub db: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASSETPIPE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    /// TCP port for asset-compiled notifications to consumers.
    #[arg(long, value_name = "PORT", default_value_t = DEFAULT_EVENT_PORT, global = true)]
    pub event_port: u16,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Register a new project.
    Add {
        /// Display name of the project.
        name: String,
        /// Root directory of the project (contains assetpipeline.toml).
        directory: String,
    },

    /// List registered projects.
    List,

    /// Select the active project (or clear the selection with --none).
    Use {
        /// Project ID to activate.
        #[arg(required_unless_present = "none")]
        project: Option<ProjectId>,
        /// Clear the active-project selection.
        #[arg(long, conflicts_with = "project")]
        none: bool,
    },

    /// Compile a project once and exit.
    Build {
        /// Project ID; defaults to the active project.
        project: Option<ProjectId>,
    },

    /// Compile a project, then keep recompiling as watched files change.
    Watch {
        /// Project ID; defaults to the active project.
        project: Option<ProjectId>,
    },

    /// Show the persisted compile errors of a project.
    Errors {
        /// Project ID; defaults to the active project.
        project: Option<ProjectId>,
    },
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
