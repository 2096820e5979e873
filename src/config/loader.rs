// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::model::BuildConfig;
use crate::config::validate::validate_config;

/// File name of the build configuration, relative to a project root.
pub const BUILD_CONFIG_FILE_NAME: &str = "assetpipeline.toml";

/// Path of the build configuration inside `project_root`.
pub fn build_config_path(project_root: &Path) -> PathBuf {
    project_root.join(BUILD_CONFIG_FILE_NAME)
}

/// Load a build configuration from a given path.
///
/// This only performs TOML deserialization; use [`load_and_validate`] to
/// also run the semantic checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<BuildConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading build config at {path:?}"))?;

    let config: BuildConfig = toml::from_str(&contents)
        .with_context(|| format!("parsing TOML build config from {path:?}"))?;

    Ok(config)
}

/// Load and validate a project's build configuration.
///
/// This is the entry point used when the worker prepares a compile pass
/// for a project; a failure here is an author-time error in the project's
/// build script and is treated as fatal by the caller.
pub fn load_and_validate(project_root: &Path) -> Result<BuildConfig> {
    let path = build_config_path(project_root);
    let config = load_from_path(&path)?;
    validate_config(&config).with_context(|| format!("validating build config at {path:?}"))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_example() {
        let toml = r#"
            content_dir = "src"
            data_dir = "data"
            manifest = "data/manifest.txt"

            [rule.textures]
            match = ["**/*.png"]
            outputs = ["{stem}.ktx"]
            command = "png2ktx"
            args = ["{input}", "{output}"]
            error_pattern = "(?m)^error: (.+)$"
        "#;
        let cfg: BuildConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.content_dir.as_deref(), Some("src"));
        assert_eq!(cfg.data_dir.as_deref(), Some("data"));
        assert_eq!(cfg.manifest.as_deref(), Some("data/manifest.txt"));
        assert_eq!(cfg.rule.len(), 1);
        let rule = &cfg.rule["textures"];
        assert_eq!(rule.patterns, vec!["**/*.png"]);
        assert_eq!(rule.command, "png2ktx");
    }

    #[test]
    fn rejects_unknown_keys() {
        let toml = r#"
            content_dir = "src"
            data_dirs = "data"
        "#;
        assert!(toml::from_str::<BuildConfig>(toml).is_err());
    }
}
