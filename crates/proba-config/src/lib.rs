//! Proba Configuration
//!
//! Loads run settings for proba test hosts:
//! - Project configuration (`proba.toml`)
//! - Environment variable overrides (`PROBA_*`)
//! - Configuration precedence and merging
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded and merged in the following order (later overrides earlier):
//! 1. Built-in defaults
//! 2. Project config (./proba.toml, searched upwards)
//! 3. Environment variables (PROBA_*)
//! 4. CLI flags (applied by the caller)
//!
//! # Example
//!
//! ```no_run
//! use proba_config::ConfigLoader;
//! use std::path::Path;
//!
//! let loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! let options = config.run_options();
//! ```

pub mod loader;
pub mod project;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Re-export main types
pub use loader::{Config, ConfigLoader, CONFIG_FILE};
pub use project::{GoldenConfig, GoldenModeSetting, ProjectConfig, RunConfig};
