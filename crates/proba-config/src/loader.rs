//! Configuration Loader
//!
//! Handles loading and merging configuration from multiple sources with proper precedence.

use crate::project::{validate_suffix, GoldenModeSetting, ProjectConfig};
use crate::ConfigResult;
use proba::{GoldenMode, GoldenSuffixes, RunOptions, ISOLATION_AVAILABLE};
use std::env;
use std::path::{Path, PathBuf};

/// Name of the project configuration file
pub const CONFIG_FILE: &str = "proba.toml";

/// Configuration loader
///
/// Loads configuration from multiple sources and merges them with proper precedence:
/// 1. Built-in defaults - lowest priority
/// 2. Project config (./proba.toml) - overrides defaults
/// 3. Environment variables (PROBA_*) - overrides project
/// 4. CLI flags - highest priority (handled by caller)
#[derive(Debug, Default)]
pub struct ConfigLoader {
    /// Skip environment variable overrides
    ignore_env: bool,
}

/// Merged configuration result
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Project configuration, with environment overrides applied
    pub project: ProjectConfig,

    /// Directory where proba.toml was found
    pub project_root: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { ignore_env: false }
    }

    /// Do not apply PROBA_* environment overrides
    pub fn without_env(mut self) -> Self {
        self.ignore_env = true;
        self
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find proba.toml; defaults apply if
    /// there is none.
    pub fn load_from_directory(&self, start_dir: &Path) -> ConfigResult<Config> {
        let (project_root, project_config) = self.find_project_config(start_dir)?;
        self.finish(project_root, project_config)
    }

    /// Load configuration from a specific project config file
    pub fn load_from_file(&self, config_path: &Path) -> ConfigResult<Config> {
        let project_config = ProjectConfig::load_from_file(config_path)?;
        let project_root = config_path.parent().map(|p| p.to_path_buf());
        self.finish(project_root, project_config)
    }

    fn finish(&self, project_root: Option<PathBuf>, mut project: ProjectConfig) -> ConfigResult<Config> {
        // Golden directories in proba.toml are relative to the file
        if let (Some(root), Some(golden)) = (&project_root, project.golden.as_mut()) {
            if let Some(dir) = golden.dir.as_mut() {
                if dir.is_relative() {
                    *dir = root.join(&*dir);
                }
            }
        }

        if !self.ignore_env {
            project = apply_env_overrides(project)?;
        }

        Ok(Config {
            project,
            project_root,
        })
    }

    /// Find project configuration by walking up directory tree
    ///
    /// Returns (project_root, project_config)
    fn find_project_config(
        &self,
        start_dir: &Path,
    ) -> ConfigResult<(Option<PathBuf>, ProjectConfig)> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(CONFIG_FILE);

            if config_path.exists() {
                let project_config = ProjectConfig::load_from_file(&config_path)?;
                return Ok((Some(current), project_config));
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Ok((None, ProjectConfig::default())),
            }
        }
    }
}

/// Apply environment variable overrides to project config
///
/// Recognised: PROBA_ISOLATE, PROBA_TIMER, PROBA_RECORD, PROBA_GOLDEN_DIR,
/// PROBA_STDOUT_SUFFIX, PROBA_STDERR_SUFFIX, PROBA_NO_COLOR and NO_COLOR.
fn apply_env_overrides(mut config: ProjectConfig) -> ConfigResult<ProjectConfig> {
    if let Ok(isolate) = env::var("PROBA_ISOLATE") {
        config.run.get_or_insert_with(Default::default).isolate = Some(is_truthy(&isolate));
    }

    if let Ok(timer) = env::var("PROBA_TIMER") {
        config.run.get_or_insert_with(Default::default).timer = Some(is_truthy(&timer));
    }

    if env::var_os("NO_COLOR").is_some() || env::var_os("PROBA_NO_COLOR").is_some() {
        config.run.get_or_insert_with(Default::default).color = Some(false);
    }

    if let Ok(record) = env::var("PROBA_RECORD") {
        if is_truthy(&record) {
            config.golden.get_or_insert_with(Default::default).mode = Some(GoldenModeSetting::Record);
        }
    }

    if let Ok(dir) = env::var("PROBA_GOLDEN_DIR") {
        config.golden.get_or_insert_with(Default::default).dir = Some(PathBuf::from(dir));
    }

    if let Ok(suffix) = env::var("PROBA_STDOUT_SUFFIX") {
        validate_suffix("PROBA_STDOUT_SUFFIX", &suffix)?;
        config.golden.get_or_insert_with(Default::default).stdout_suffix = Some(suffix);
    }

    if let Ok(suffix) = env::var("PROBA_STDERR_SUFFIX") {
        validate_suffix("PROBA_STDERR_SUFFIX", &suffix)?;
        config.golden.get_or_insert_with(Default::default).stderr_suffix = Some(suffix);
    }

    Ok(config)
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

impl Config {
    /// Per-test process isolation (project > default)
    pub fn isolate(&self) -> bool {
        self.project
            .run
            .as_ref()
            .and_then(|r| r.isolate)
            .unwrap_or(ISOLATION_AVAILABLE)
    }

    pub fn timer(&self) -> bool {
        self.project.run.as_ref().and_then(|r| r.timer).unwrap_or(true)
    }

    pub fn color(&self) -> bool {
        self.project.run.as_ref().and_then(|r| r.color).unwrap_or(true)
    }

    pub fn golden_mode(&self) -> GoldenMode {
        self.project
            .golden
            .as_ref()
            .and_then(|g| g.mode)
            .unwrap_or_default()
            .into()
    }

    /// Directory golden files live in; the current directory by default
    pub fn golden_dir(&self) -> PathBuf {
        self.project
            .golden
            .as_ref()
            .and_then(|g| g.dir.clone())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn suffixes(&self) -> GoldenSuffixes {
        let mut suffixes = GoldenSuffixes::default();
        if let Some(golden) = &self.project.golden {
            if let Some(stdout) = &golden.stdout_suffix {
                suffixes.stdout = stdout.clone();
            }
            if let Some(stderr) = &golden.stderr_suffix {
                suffixes.stderr = stderr.clone();
            }
        }
        suffixes
    }

    /// Get the project root directory
    pub fn project_root(&self) -> Option<&Path> {
        self.project_root.as_deref()
    }

    /// Check if a proba.toml was found
    pub fn is_project(&self) -> bool {
        self.project_root.is_some()
    }

    /// Run options for the executor
    pub fn run_options(&self) -> RunOptions {
        RunOptions::default()
            .with_isolate(self.isolate())
            .with_timer(self.timer())
            .with_color(self.color())
            .with_golden(self.golden_mode())
            .with_golden_dir(self.golden_dir())
            .with_suffixes(self.suffixes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn create_config_file(dir: &Path, content: &str) -> PathBuf {
        let config_path = dir.join(CONFIG_FILE);
        fs::write(&config_path, content).unwrap();
        config_path
    }

    #[test]
    fn test_load_project_config() {
        let temp_dir = TempDir::new().unwrap();
        create_config_file(
            temp_dir.path(),
            r#"
[run]
timer = false
"#,
        );

        let config = ConfigLoader::new()
            .without_env()
            .load_from_directory(temp_dir.path())
            .unwrap();

        assert!(config.is_project());
        assert!(!config.timer());
        assert!(config.color());
    }

    #[test]
    fn test_golden_dir_relative_to_config() {
        let temp_dir = TempDir::new().unwrap();
        create_config_file(
            temp_dir.path(),
            r#"
[golden]
dir = "golden"
"#,
        );
        let sub_dir = temp_dir.path().join("nested");
        fs::create_dir(&sub_dir).unwrap();

        let config = ConfigLoader::new()
            .without_env()
            .load_from_directory(&sub_dir)
            .unwrap();

        assert_eq!(config.golden_dir(), temp_dir.path().join("golden"));
        assert_eq!(config.project_root(), Some(temp_dir.path()));
    }

    #[test]
    fn test_defaults_without_config() {
        let temp_dir = TempDir::new().unwrap();

        let config = ConfigLoader::new()
            .without_env()
            .load_from_directory(temp_dir.path())
            .unwrap();

        assert!(!config.is_project());
        assert_eq!(config.isolate(), ISOLATION_AVAILABLE);
        assert_eq!(config.golden_mode(), GoldenMode::Off);
        assert_eq!(config.golden_dir(), PathBuf::from("."));
        assert_eq!(config.suffixes(), GoldenSuffixes::default());
    }

    #[test]
    #[serial]
    fn test_env_overrides_project() {
        let temp_dir = TempDir::new().unwrap();
        create_config_file(
            temp_dir.path(),
            r#"
[run]
isolate = true

[golden]
stdout_suffix = ".out"
"#,
        );

        env::set_var("PROBA_ISOLATE", "0");
        env::set_var("PROBA_RECORD", "yes");
        env::set_var("PROBA_STDOUT_SUFFIX", ".actual");

        let config = ConfigLoader::new().load_from_directory(temp_dir.path());

        env::remove_var("PROBA_ISOLATE");
        env::remove_var("PROBA_RECORD");
        env::remove_var("PROBA_STDOUT_SUFFIX");

        let config = config.unwrap();
        assert!(!config.isolate());
        assert_eq!(config.golden_mode(), GoldenMode::Record);
        assert_eq!(config.suffixes().stdout, ".actual");
        assert_eq!(config.suffixes().stderr, ".stderr");
    }

    #[test]
    #[serial]
    fn test_env_invalid_suffix() {
        let temp_dir = TempDir::new().unwrap();

        env::set_var("PROBA_STDERR_SUFFIX", "");
        let result = ConfigLoader::new().load_from_directory(temp_dir.path());
        env::remove_var("PROBA_STDERR_SUFFIX");

        assert!(result.is_err());
    }

    #[test]
    fn test_run_options_from_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = create_config_file(
            temp_dir.path(),
            r#"
[run]
isolate = false
color = false

[golden]
mode = "verify"
stderr_suffix = ".err"
"#,
        );

        let options = ConfigLoader::new()
            .without_env()
            .load_from_file(&path)
            .unwrap()
            .run_options();

        assert!(!options.isolate);
        assert!(!options.color);
        assert!(options.timer);
        assert_eq!(options.golden, GoldenMode::Verify);
        assert_eq!(options.suffixes.stderr, ".err");
    }
}
