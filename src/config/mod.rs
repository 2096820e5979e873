// src/config/mod.rs

//! Project build configuration: the declarative build script read from
//! each project's root.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{build_config_path, load_and_validate, load_from_path, BUILD_CONFIG_FILE_NAME};
pub use model::{BuildConfig, RuleConfig};
pub use validate::{validate_config, ConfigError};
