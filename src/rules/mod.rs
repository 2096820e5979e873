// src/rules/mod.rs

//! The rule engine: user-authored compilation rules driven one asset at a
//! time over a per-pass worklist.
//!
//! Rules see the outside world only through [`RuleContext`], an explicit
//! context object carrying typed handles to the store, the event channel
//! and the outbound message queue for the project currently being
//! compiled.

pub mod command;
pub mod context;
pub mod engine;

use std::path::Path;

use anyhow::{Context as _, Result};

use crate::config;
use crate::store::ProjectId;

pub use command::CommandRule;
pub use context::{HostContext, RuleContext};
pub use engine::{CompileStep, RuleEngine};

/// One unit of the pending worklist: an input asset, the rule that
/// claimed it, and the outputs that rule will produce. All paths are
/// relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAsset {
    pub(crate) rule: usize,
    pub input: String,
    pub outputs: Vec<String>,
}

/// Result of a rule's execute step. Failures are ordinary data-level
/// outcomes: recorded, counted and reported, never propagated as errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileOutcome {
    Success,
    Failure { message: String },
}

/// A compilation rule: a parse step deciding whether (and into what) an
/// input compiles, and an execute step performing the compilation.
pub trait Rule: Send {
    fn name(&self) -> &str;

    /// Decide whether this rule applies to `input` (a path relative to
    /// the content directory) and, if so, return the outputs it would
    /// produce (paths relative to the data directory).
    fn parse(&self, input: &str) -> Option<Vec<String>>;

    /// Compile one asset. External tools run to completion; cancellation
    /// happens only between assets.
    fn execute(&self, asset: &PendingAsset, ctx: &mut RuleContext<'_, '_>) -> CompileOutcome;
}

/// Builds the rule engine for a project when the worker switches to it.
///
/// The default implementation reads the project's build configuration;
/// tests substitute factories that install programmatic rules.
pub trait EngineFactory: Send {
    fn create(&self, project: ProjectId, root: &Path) -> Result<RuleEngine>;
}

/// Factory reading `assetpipeline.toml` from the project root.
pub struct ConfigEngineFactory;

impl EngineFactory for ConfigEngineFactory {
    fn create(&self, project: ProjectId, root: &Path) -> Result<RuleEngine> {
        let cfg = config::load_and_validate(root)
            .with_context(|| format!("loading build configuration for project at {root:?}"))?;

        let mut engine = RuleEngine::new(project, root);
        if let Some(dir) = cfg.content_dir {
            engine.declare_content_dir(dir);
        }
        if let Some(dir) = cfg.data_dir {
            engine.declare_data_dir(dir);
        }
        if let Some(path) = cfg.manifest {
            engine.declare_manifest(path);
        }
        for (name, rule) in &cfg.rule {
            engine.register_rule(Box::new(CommandRule::from_config(name, rule)?));
        }
        Ok(engine)
    }
}
