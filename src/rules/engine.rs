// src/rules/engine.rs

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::paths;
use crate::rules::context::{HostContext, RuleContext};
use crate::rules::{CompileOutcome, PendingAsset, Rule};
use crate::store::ProjectId;

/// Result of one [`RuleEngine::compile_next`] step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileStep {
    /// False when no pending asset remained (the pass is over and
    /// `succeeded` is meaningless).
    pub had_remaining: bool,
    /// Whether the compiled asset's execute step succeeded.
    pub succeeded: bool,
}

/// Drives a project's registered rules over its pending-asset worklist,
/// one asset per step.
///
/// The worklist is re-derived from the content tree on every pass
/// ([`RuleEngine::setup`]), so repeating a pass only needs a reset while
/// switching projects or directories needs a fresh engine built from that
/// project's configuration.
pub struct RuleEngine {
    project: ProjectId,
    root: PathBuf,
    content_dir: Option<String>,
    data_dir: Option<String>,
    manifest: Option<String>,
    rules: Vec<Box<dyn Rule>>,
    pending: VecDeque<PendingAsset>,
}

impl RuleEngine {
    pub fn new(project: ProjectId, root: impl Into<PathBuf>) -> Self {
        Self {
            project,
            root: root.into(),
            content_dir: None,
            data_dir: None,
            manifest: None,
            rules: Vec::new(),
            pending: VecDeque::new(),
        }
    }

    /// Declare the source-asset root, relative to the project root.
    pub fn declare_content_dir(&mut self, dir: impl Into<String>) {
        self.content_dir = Some(dir.into());
    }

    /// Declare the compiled-data root, relative to the project root.
    pub fn declare_data_dir(&mut self, dir: impl Into<String>) {
        self.data_dir = Some(dir.into());
    }

    /// Declare the manifest file path, relative to the project root.
    pub fn declare_manifest(&mut self, path: impl Into<String>) {
        self.manifest = Some(path.into());
    }

    /// Register a compilation rule. Rules are consulted in registration
    /// order; the first whose parse step matches an input claims it.
    pub fn register_rule(&mut self, rule: Box<dyn Rule>) {
        self.rules.push(rule);
    }

    pub fn project(&self) -> ProjectId {
        self.project
    }

    pub fn project_root(&self) -> &Path {
        &self.root
    }

    pub fn content_dir(&self) -> Option<&str> {
        self.content_dir.as_deref()
    }

    pub fn data_dir(&self) -> Option<&str> {
        self.data_dir.as_deref()
    }

    pub fn manifest_path(&self) -> Option<&str> {
        self.manifest.as_deref()
    }

    /// Number of assets still pending in the current pass.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Re-derive the pending-asset worklist for a new pass.
    ///
    /// With `seed = None` this is a full-project pass: the content tree is
    /// enumerated and an asset is pending when any of its outputs is
    /// missing or older than the input. With `seed = Some(outputs)` only
    /// assets producing one of the given outputs are kept, and the
    /// timestamp check is bypassed (the input is known to have changed).
    pub fn setup(&mut self, seed: Option<&[String]>) {
        self.pending.clear();

        let Some(content_dir) = self.content_dir.clone() else {
            warn!("no content directory declared; nothing to compile");
            return;
        };
        let data_dir = self.data_dir.clone().unwrap_or_default();

        let content_root = self.root.join(&content_dir);
        let mut inputs = Vec::new();
        collect_files_sorted(&content_root, &content_root, &mut inputs);

        for input in inputs {
            let Some((rule_index, outputs)) = self.match_rule(&input) else {
                continue;
            };

            let project_input = join_relative(&content_dir, &input);
            let project_outputs: Vec<String> = outputs
                .iter()
                .map(|out| join_relative(&data_dir, out))
                .collect();

            let wanted = match seed {
                Some(seed) => project_outputs.iter().any(|out| seed.contains(out)),
                None => self.is_stale(&project_input, &project_outputs),
            };
            if !wanted {
                continue;
            }

            self.pending.push_back(PendingAsset {
                rule: rule_index,
                input: project_input,
                outputs: project_outputs,
            });
        }

        debug!(pending = self.pending.len(), seeded = seed.is_some(), "worklist derived");
    }

    /// Compile exactly one pending asset.
    ///
    /// Bookkeeping around the rule's execute step: dependency edges for
    /// each declared output are cleared before execution
    /// (replace-not-append); on success, fresh edges are recorded, any
    /// matching error record is cleared, and each output is announced as
    /// compiled; on failure, the error is recorded (which also surfaces
    /// the failure to the host).
    pub fn compile_next(&mut self, host: &mut HostContext<'_>) -> CompileStep {
        let Some(asset) = self.pending.pop_front() else {
            return CompileStep {
                had_remaining: false,
                succeeded: false,
            };
        };

        let rule = &self.rules[asset.rule];
        debug!(rule = rule.name(), input = %asset.input, "compiling asset");

        let mut ctx = RuleContext::new(
            host,
            &self.root,
            self.content_dir.as_deref(),
            self.data_dir.as_deref(),
            self.manifest.as_deref(),
        );

        for output in &asset.outputs {
            ctx.clear_dependencies(output);
        }

        let succeeded = match rule.execute(&asset, &mut ctx) {
            CompileOutcome::Success => {
                let inputs = vec![asset.input.clone()];
                for output in &asset.outputs {
                    ctx.record_dependency(output, &asset.input);
                }
                ctx.clear_compile_error(&inputs, &asset.outputs);
                for output in &asset.outputs {
                    ctx.notify_asset_compiled(output);
                }
                true
            }
            CompileOutcome::Failure { message } => {
                warn!(rule = rule.name(), input = %asset.input, %message, "asset failed to compile");
                ctx.record_compile_error(vec![asset.input.clone()], asset.outputs.clone(), message);
                false
            }
        };

        CompileStep {
            had_remaining: true,
            succeeded,
        }
    }

    /// First registered rule matching `input` (content-relative), with the
    /// outputs its parse step declares.
    fn match_rule(&self, input: &str) -> Option<(usize, Vec<String>)> {
        self.rules
            .iter()
            .enumerate()
            .find_map(|(index, rule)| rule.parse(input).map(|outputs| (index, outputs)))
    }

    /// Source-timestamp comparison: an asset is stale when any output is
    /// missing or older than its input.
    fn is_stale(&self, input: &str, outputs: &[String]) -> bool {
        let input_ts = paths::file_timestamp(&self.root.join(input));
        outputs
            .iter()
            .any(|out| paths::file_timestamp(&self.root.join(out)) < input_ts)
    }
}

/// Join a base directory and a relative path into a forward-slash
/// project-relative string.
fn join_relative(base: &str, rel: &str) -> String {
    if base.is_empty() {
        return rel.to_string();
    }
    let base = base.trim_end_matches(['/', '\\']);
    format!("{base}/{rel}")
}

/// Collect every file under `dir`, depth-first with entries sorted by
/// name, as forward-slash paths relative to `base`.
fn collect_files_sorted(dir: &Path, base: &Path, out: &mut Vec<String>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        warn!(?dir, "cannot read content directory");
        return;
    };
    let mut entries: Vec<_> = entries.flatten().collect();
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            collect_files_sorted(&path, base, out);
        } else if path.is_file() {
            if let Some(rel) = paths::make_relative(base, &path) {
                out.push(rel);
            }
        }
    }
}
