// src/config/validate.rs

use globset::Glob;
use regex::Regex;
use thiserror::Error;

use crate::config::model::BuildConfig;

/// A build configuration that cannot be used.
///
/// These are author-time mistakes in the project's build script; the
/// worker treats them as fatal when it encounters them while preparing a
/// compile pass.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config must declare at least one [rule.<name>] section")]
    NoRules,
    #[error("config declares rules but no content_dir")]
    MissingContentDir,
    #[error("config declares rules but no data_dir")]
    MissingDataDir,
    #[error("rule '{rule}' has no match patterns")]
    NoPatterns { rule: String },
    #[error("rule '{rule}' has no outputs")]
    NoOutputs { rule: String },
    #[error("rule '{rule}': invalid glob pattern {pattern:?}: {source}")]
    BadGlob {
        rule: String,
        pattern: String,
        source: globset::Error,
    },
    #[error("rule '{rule}': invalid error_pattern: {source}")]
    BadErrorPattern {
        rule: String,
        source: regex::Error,
    },
    #[error("rule '{rule}': unknown placeholder {{{placeholder}}} in {template:?}")]
    UnknownPlaceholder {
        rule: String,
        template: String,
        placeholder: String,
    },
}

const OUTPUT_PLACEHOLDERS: &[&str] = &["path", "stem", "name"];
const ARG_PLACEHOLDERS: &[&str] = &["input", "output", "content_dir", "data_dir", "manifest"];

/// Run semantic validation against a loaded configuration.
///
/// Checks that the rule set is non-empty and well-formed: content and data
/// roots are declared, globs compile, the optional stderr regex compiles,
/// and every template placeholder is one the expander knows.
pub fn validate_config(cfg: &BuildConfig) -> Result<(), ConfigError> {
    if cfg.rule.is_empty() {
        return Err(ConfigError::NoRules);
    }
    if cfg.content_dir.is_none() {
        return Err(ConfigError::MissingContentDir);
    }
    if cfg.data_dir.is_none() {
        return Err(ConfigError::MissingDataDir);
    }

    for (name, rule) in cfg.rule.iter() {
        if rule.patterns.is_empty() {
            return Err(ConfigError::NoPatterns { rule: name.clone() });
        }
        if rule.outputs.is_empty() {
            return Err(ConfigError::NoOutputs { rule: name.clone() });
        }
        for pattern in &rule.patterns {
            if let Err(source) = Glob::new(pattern) {
                return Err(ConfigError::BadGlob {
                    rule: name.clone(),
                    pattern: pattern.clone(),
                    source,
                });
            }
        }
        if let Some(pattern) = &rule.error_pattern {
            if let Err(source) = Regex::new(pattern) {
                return Err(ConfigError::BadErrorPattern {
                    rule: name.clone(),
                    source,
                });
            }
        }
        for template in &rule.outputs {
            check_placeholders(name, template, OUTPUT_PLACEHOLDERS)?;
        }
        for template in &rule.args {
            check_placeholders(name, template, ARG_PLACEHOLDERS)?;
        }
    }

    Ok(())
}

fn check_placeholders(
    rule: &str,
    template: &str,
    allowed: &[&str],
) -> Result<(), ConfigError> {
    for placeholder in placeholders(template) {
        if !allowed.contains(&placeholder.as_str()) {
            return Err(ConfigError::UnknownPlaceholder {
                rule: rule.to_string(),
                template: template.to_string(),
                placeholder,
            });
        }
    }
    Ok(())
}

/// Extract `{...}` placeholder names from a template string.
fn placeholders(template: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let Some(len) = rest[start + 1..].find('}') else {
            break;
        };
        found.push(rest[start + 1..start + 1 + len].to_string());
        rest = &rest[start + 1 + len + 1..];
    }
    found
}
