#![allow(dead_code)]

use std::collections::HashSet;
use std::path::Path;
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};

use anyhow::Result;

use assetpipe::events::AssetEventSink;
use assetpipe::pipeline::{
    BuildCompletion, CompileFailure, PipelineDelegate, RecompileCompletion,
};
use assetpipe::rules::{
    CompileOutcome, EngineFactory, PendingAsset, Rule, RuleContext, RuleEngine,
};
use assetpipe::store::ProjectId;

/// A programmatic compilation rule for tests.
///
/// Matches inputs by extension and produces one output per input with the
/// extension swapped. The rule can log every compiled input, actually
/// copy the input file to its output, fail for chosen inputs, and block
/// on a permit channel so tests can control per-asset timing.
#[derive(Clone)]
pub struct TestRule {
    match_ext: String,
    out_ext: String,
    copy: bool,
    fail_inputs: HashSet<String>,
    log: Arc<Mutex<Vec<String>>>,
    gate: Option<Arc<Mutex<Receiver<()>>>>,
}

impl TestRule {
    pub fn new(match_ext: &str, out_ext: &str) -> Self {
        Self {
            match_ext: match_ext.to_string(),
            out_ext: out_ext.to_string(),
            copy: false,
            fail_inputs: HashSet::new(),
            log: Arc::new(Mutex::new(Vec::new())),
            gate: None,
        }
    }

    /// Actually copy each input to its output (so timestamps and
    /// dependency state behave like a real compiler).
    pub fn copying(mut self) -> Self {
        self.copy = true;
        self
    }

    /// Report a failure for the given project-relative input.
    pub fn failing_on(mut self, input: &str) -> Self {
        self.fail_inputs.insert(input.to_string());
        self
    }

    /// Block at the start of every execute step until a permit arrives.
    ///
    /// When the sender is dropped the gate opens permanently, so a
    /// failing test cannot wedge the worker thread.
    pub fn gated_by(mut self, permits: Receiver<()>) -> Self {
        self.gate = Some(Arc::new(Mutex::new(permits)));
        self
    }

    /// Project-relative inputs compiled so far, in order.
    pub fn compiled(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

impl Rule for TestRule {
    fn name(&self) -> &str {
        "test-rule"
    }

    fn parse(&self, input: &str) -> Option<Vec<String>> {
        let suffix = format!(".{}", self.match_ext);
        let stem = input.strip_suffix(&suffix)?;
        Some(vec![format!("{stem}.{}", self.out_ext)])
    }

    fn execute(&self, asset: &PendingAsset, ctx: &mut RuleContext<'_, '_>) -> CompileOutcome {
        if let Some(gate) = &self.gate {
            let _ = gate.lock().unwrap().recv();
        }

        self.log.lock().unwrap().push(asset.input.clone());

        if self.fail_inputs.contains(&asset.input) {
            return CompileOutcome::Failure {
                message: format!("synthetic failure for {}", asset.input),
            };
        }

        if self.copy {
            let from = ctx.resolve(&asset.input);
            let to = ctx.resolve(&asset.outputs[0]);
            if let Some(parent) = to.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            if let Err(err) = std::fs::copy(&from, &to) {
                return CompileOutcome::Failure {
                    message: format!("copy failed: {err}"),
                };
            }
        }

        CompileOutcome::Success
    }
}

/// Engine factory installing a fixed set of programmatic rules instead of
/// reading a build configuration from the project directory.
pub struct FixedRulesFactory {
    pub content_dir: String,
    pub data_dir: String,
    pub rules: Vec<TestRule>,
}

impl FixedRulesFactory {
    pub fn new(rules: Vec<TestRule>) -> Self {
        Self {
            content_dir: "src".to_string(),
            data_dir: "data".to_string(),
            rules,
        }
    }
}

impl EngineFactory for FixedRulesFactory {
    fn create(&self, project: ProjectId, root: &Path) -> Result<RuleEngine> {
        let mut engine = RuleEngine::new(project, root);
        engine.declare_content_dir(self.content_dir.clone());
        engine.declare_data_dir(self.data_dir.clone());
        for rule in &self.rules {
            engine.register_rule(Box::new(rule.clone()));
        }
        Ok(engine)
    }
}

/// Asset-event sink recording announced paths instead of sending them
/// over TCP.
#[derive(Default)]
pub struct RecordingSink {
    notified: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn notified(&self) -> Vec<String> {
        self.notified.lock().unwrap().clone()
    }
}

impl AssetEventSink for RecordingSink {
    fn notify_asset_compiled(&self, path: &str) {
        self.notified.lock().unwrap().push(path.to_string());
    }
}

/// Delegate accumulating every delivered pipeline event.
#[derive(Default)]
pub struct RecordingDelegate {
    pub builds: Vec<BuildCompletion>,
    pub recompiles: Vec<RecompileCompletion>,
    pub assets_compiled: usize,
    pub failures: Vec<CompileFailure>,
}

impl PipelineDelegate for RecordingDelegate {
    fn on_build_finished(&mut self, info: &BuildCompletion) {
        self.builds.push(info.clone());
    }

    fn on_recompile_finished(&mut self, info: &RecompileCompletion) {
        self.recompiles.push(info.clone());
    }

    fn on_asset_compiled(&mut self) {
        self.assets_compiled += 1;
    }

    fn on_compile_failed(&mut self, info: &CompileFailure) {
        self.failures.push(info.clone());
    }
}
