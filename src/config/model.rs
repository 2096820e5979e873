// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

/// A project's build configuration as read from `assetpipeline.toml` at the
/// project root.
///
/// This file plays the role of the project's build script: it declares
/// where source assets live, where compiled data goes, and the set of
/// compilation rules:
///
/// ```toml
/// content_dir = "src"
/// data_dir = "data"
/// manifest = "data/manifest.txt"
///
/// [rule.textures]
/// match = ["**/*.png"]
/// outputs = ["{stem}.ktx"]
/// command = "png2ktx"
/// args = ["{input}", "{output}"]
/// error_pattern = "(?m)^error: (.+)$"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    /// Source-asset root, relative to the project root.
    #[serde(default)]
    pub content_dir: Option<String>,

    /// Compiled-data root, relative to the project root.
    #[serde(default)]
    pub data_dir: Option<String>,

    /// Optional manifest file path, relative to the project root.
    #[serde(default)]
    pub manifest: Option<String>,

    /// All rules from `[rule.<name>]`. Keys are the rule names.
    #[serde(default)]
    pub rule: BTreeMap<String, RuleConfig>,
}

/// `[rule.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    /// Glob patterns, relative to the content dir, deciding which inputs
    /// this rule applies to.
    #[serde(rename = "match")]
    pub patterns: Vec<String>,

    /// Output path templates, relative to the data dir.
    ///
    /// Placeholders: `{path}` (input path relative to the content dir),
    /// `{stem}` (same, without the final extension), `{name}` (input file
    /// name).
    pub outputs: Vec<String>,

    /// The compiler executable to run.
    pub command: String,

    /// Argument templates for the command.
    ///
    /// Placeholders: `{input}` and `{output}` (project-root-relative
    /// paths; `{output}` is the first declared output), `{content_dir}`,
    /// `{data_dir}`, `{manifest}`.
    #[serde(default)]
    pub args: Vec<String>,

    /// Optional regex applied to the tool's stderr on failure; the first
    /// capture group (or the whole match) becomes the recorded error
    /// message.
    #[serde(default)]
    pub error_pattern: Option<String>,
}
