//! Project Configuration (proba.toml)
//!
//! Handles run settings stored in `proba.toml` next to the test host.

use crate::{ConfigError, ConfigResult};
use proba::GoldenMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Project configuration from proba.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Run behaviour
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run: Option<RunConfig>,

    /// Golden file settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub golden: Option<GoldenConfig>,
}

/// Run configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Run each test in its own child process (default: true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isolate: Option<bool>,

    /// Report elapsed time per suite (default: true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timer: Option<bool>,

    /// Colored console report (default: true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<bool>,
}

/// Golden file configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct GoldenConfig {
    /// What to do with captured output (default: off)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<GoldenModeSetting>,

    /// Directory holding golden files (default: ".")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    /// Suffix of stdout golden files (default: ".stdout")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout_suffix: Option<String>,

    /// Suffix of stderr golden files (default: ".stderr")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr_suffix: Option<String>,
}

/// Golden mode as written in proba.toml
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GoldenModeSetting {
    #[default]
    Off,
    Record,
    Verify,
}

impl From<GoldenModeSetting> for GoldenMode {
    fn from(setting: GoldenModeSetting) -> Self {
        match setting {
            GoldenModeSetting::Off => GoldenMode::Off,
            GoldenModeSetting::Record => GoldenMode::Record,
            GoldenModeSetting::Verify => GoldenMode::Verify,
        }
    }
}

impl ProjectConfig {
    /// Load project configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the project configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(golden) = &self.golden {
            if let Some(suffix) = &golden.stdout_suffix {
                validate_suffix("golden.stdout_suffix", suffix)?;
            }
            if let Some(suffix) = &golden.stderr_suffix {
                validate_suffix("golden.stderr_suffix", suffix)?;
            }
            if let Some(dir) = &golden.dir {
                if dir.as_os_str().is_empty() {
                    return Err(ConfigError::InvalidValue {
                        field: "golden.dir".to_string(),
                        reason: "directory cannot be empty".to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Merge another project config into this one
    /// Other config takes precedence for values it sets
    pub fn merge(&mut self, other: &ProjectConfig) {
        if let Some(run) = &other.run {
            let base = self.run.get_or_insert_with(Default::default);
            base.isolate = run.isolate.or(base.isolate);
            base.timer = run.timer.or(base.timer);
            base.color = run.color.or(base.color);
        }
        if let Some(golden) = &other.golden {
            let base = self.golden.get_or_insert_with(Default::default);
            base.mode = golden.mode.or(base.mode);
            if golden.dir.is_some() {
                base.dir = golden.dir.clone();
            }
            if golden.stdout_suffix.is_some() {
                base.stdout_suffix = golden.stdout_suffix.clone();
            }
            if golden.stderr_suffix.is_some() {
                base.stderr_suffix = golden.stderr_suffix.clone();
            }
        }
    }
}

/// Golden suffixes are appended to a bare file name
pub(crate) fn validate_suffix(field: &str, suffix: &str) -> ConfigResult<()> {
    if suffix.is_empty() {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: "suffix cannot be empty".to_string(),
        });
    }
    if suffix.contains('/') || suffix.contains('\\') {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("suffix '{}' contains a path separator", suffix),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn test_parse_full_project_config() {
        let toml = r#"
[run]
isolate = false
timer = true
color = false

[golden]
mode = "verify"
dir = "golden"
stdout_suffix = ".out"
stderr_suffix = ".err"
"#;

        let config: ProjectConfig = toml::from_str(toml).unwrap();
        assert!(config.validate().is_ok());

        let run = config.run.unwrap();
        assert_eq!(run.isolate, Some(false));
        assert_eq!(run.color, Some(false));

        let golden = config.golden.unwrap();
        assert_eq!(golden.mode, Some(GoldenModeSetting::Verify));
        assert_eq!(golden.dir, Some(PathBuf::from("golden")));
        assert_eq!(golden.stdout_suffix.as_deref(), Some(".out"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let toml = r#"
[run]
parallel = true
"#;
        assert!(toml::from_str::<ProjectConfig>(toml).is_err());
    }

    #[test]
    fn test_unknown_mode_rejected() {
        let toml = r#"
[golden]
mode = "bless"
"#;
        assert!(toml::from_str::<ProjectConfig>(toml).is_err());
    }

    #[rstest]
    #[case("", false)]
    #[case(".stdout", true)]
    #[case(".golden.txt", true)]
    #[case("/out", false)]
    #[case("a\\b", false)]
    fn test_suffix_validation(#[case] suffix: &str, #[case] valid: bool) {
        assert_eq!(validate_suffix("golden.stdout_suffix", suffix).is_ok(), valid);
    }

    #[test]
    fn test_merge_configs() {
        let mut base = ProjectConfig {
            run: Some(RunConfig {
                isolate: Some(true),
                timer: Some(false),
                color: None,
            }),
            ..Default::default()
        };
        let override_config = ProjectConfig {
            run: Some(RunConfig {
                isolate: Some(false),
                ..Default::default()
            }),
            golden: Some(GoldenConfig {
                mode: Some(GoldenModeSetting::Record),
                ..Default::default()
            }),
        };

        base.merge(&override_config);
        let run = base.run.unwrap();
        assert_eq!(run.isolate, Some(false));
        assert_eq!(run.timer, Some(false));
        assert_eq!(base.golden.unwrap().mode, Some(GoldenModeSetting::Record));
    }

    #[test]
    fn test_mode_conversion() {
        assert_eq!(GoldenMode::from(GoldenModeSetting::Off), GoldenMode::Off);
        assert_eq!(GoldenMode::from(GoldenModeSetting::Record), GoldenMode::Record);
        assert_eq!(GoldenMode::from(GoldenModeSetting::Verify), GoldenMode::Verify);
    }
}
