// src/rules/command.rs

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;

use crate::config::RuleConfig;
use crate::rules::context::RuleContext;
use crate::rules::{CompileOutcome, PendingAsset, Rule};

/// A compilation rule declared in the project's build configuration.
///
/// The parse step matches the input against the rule's glob set and
/// expands the output templates; the execute step expands the argument
/// templates and runs the configured external tool from the project root.
pub struct CommandRule {
    name: String,
    globs: GlobSet,
    outputs: Vec<String>,
    command: String,
    args: Vec<String>,
    error_pattern: Option<Regex>,
}

impl CommandRule {
    pub fn from_config(name: &str, config: &RuleConfig) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &config.patterns {
            let glob = Glob::new(pattern)
                .with_context(|| format!("rule '{name}': invalid glob pattern {pattern:?}"))?;
            builder.add(glob);
        }
        let globs = builder
            .build()
            .with_context(|| format!("rule '{name}': building glob set"))?;

        let error_pattern = config
            .error_pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
            .with_context(|| format!("rule '{name}': invalid error_pattern"))?;

        Ok(Self {
            name: name.to_string(),
            globs,
            outputs: config.outputs.clone(),
            command: config.command.clone(),
            args: config.args.clone(),
            error_pattern,
        })
    }

    /// Extract a concise failure message from the tool's output.
    fn failure_message(&self, status: i32, stderr: &str) -> String {
        if let Some(pattern) = &self.error_pattern {
            if let Some(captures) = pattern.captures(stderr) {
                let m = captures.get(1).or_else(|| captures.get(0));
                if let Some(m) = m {
                    return m.as_str().trim().to_string();
                }
            }
        }
        let trimmed = stderr.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
        format!("{} exited with status {status}", self.command)
    }
}

impl Rule for CommandRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn parse(&self, input: &str) -> Option<Vec<String>> {
        if !self.globs.is_match(input) {
            return None;
        }
        let vars = output_vars(input);
        Some(self.outputs.iter().map(|t| expand(t, &vars)).collect())
    }

    fn execute(&self, asset: &PendingAsset, ctx: &mut RuleContext<'_, '_>) -> CompileOutcome {
        let vars = arg_vars(asset, ctx);
        let args: Vec<String> = self.args.iter().map(|t| expand(t, &vars)).collect();

        let Some(output) = ctx.run_process(&self.command, &args) else {
            return CompileOutcome::Failure {
                message: format!("failed to launch {}", self.command),
            };
        };

        if output.success() {
            CompileOutcome::Success
        } else {
            CompileOutcome::Failure {
                message: self.failure_message(output.status, &output.stderr),
            }
        }
    }
}

/// Placeholder values for output templates, derived from the
/// content-relative input path.
fn output_vars(input: &str) -> Vec<(&'static str, String)> {
    let stem = match input.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => stem.to_string(),
        _ => input.to_string(),
    };
    let name = input.rsplit('/').next().unwrap_or(input).to_string();
    vec![
        ("path", input.to_string()),
        ("stem", stem),
        ("name", name),
    ]
}

/// Placeholder values for argument templates, derived from the pending
/// asset and the declared project directories.
fn arg_vars(asset: &PendingAsset, ctx: &RuleContext<'_, '_>) -> Vec<(&'static str, String)> {
    vec![
        ("input", asset.input.clone()),
        ("output", asset.outputs.first().cloned().unwrap_or_default()),
        ("content_dir", ctx.content_dir().unwrap_or_default().to_string()),
        ("data_dir", ctx.data_dir().unwrap_or_default().to_string()),
        ("manifest", ctx.manifest_path().unwrap_or_default().to_string()),
    ]
}

fn expand(template: &str, vars: &[(&'static str, String)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{key}}}"), value);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> RuleConfig {
        RuleConfig {
            patterns: vec!["**/*.png".into()],
            outputs: vec!["{stem}.ktx".into()],
            command: "png2ktx".into(),
            args: vec!["{input}".into(), "{output}".into()],
            error_pattern: Some("(?m)^error: (.+)$".into()),
        }
    }

    #[test]
    fn parse_matches_and_expands_outputs() {
        let rule = CommandRule::from_config("textures", &sample_config()).unwrap();
        assert_eq!(
            rule.parse("env/rock.png"),
            Some(vec!["env/rock.ktx".to_string()])
        );
        assert_eq!(rule.parse("env/rock.wav"), None);
    }

    #[test]
    fn output_vars_cover_documented_placeholders() {
        let vars = output_vars("env/rock.png");
        let get = |k: &str| {
            vars.iter()
                .find(|(key, _)| *key == k)
                .map(|(_, v)| v.as_str())
                .unwrap()
        };
        assert_eq!(get("path"), "env/rock.png");
        assert_eq!(get("stem"), "env/rock");
        assert_eq!(get("name"), "rock.png");
    }

    #[test]
    fn stem_of_extensionless_input_is_input() {
        let vars = output_vars("env/README");
        assert_eq!(vars[1].1, "env/README");
    }

    #[test]
    fn failure_message_prefers_error_pattern_capture() {
        let rule = CommandRule::from_config("textures", &sample_config()).unwrap();
        let stderr = "note: something\nerror: bad pixel format\nmore noise";
        assert_eq!(rule.failure_message(1, stderr), "bad pixel format");
    }

    #[test]
    fn failure_message_falls_back_to_stderr_then_status() {
        let mut config = sample_config();
        config.error_pattern = None;
        let rule = CommandRule::from_config("textures", &config).unwrap();
        assert_eq!(rule.failure_message(1, "  boom  \n"), "boom");
        assert_eq!(rule.failure_message(2, ""), "png2ktx exited with status 2");
    }
}
