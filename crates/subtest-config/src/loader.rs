//! Configuration Loader
//!
//! Handles loading and merging configuration from multiple sources with proper precedence.

use crate::global::GlobalConfig;
use crate::project::ProjectConfig;
use crate::{ConfigError, ConfigResult};
use std::env;
use std::path::{Path, PathBuf};

/// Project config file name searched for from the working directory upwards
pub const PROJECT_CONFIG_FILE: &str = "subtest.toml";

/// Fixture document used when none is configured
pub const DEFAULT_FIXTURE_PATH: &str = "testdata/fixture.json";

/// Configuration loader
///
/// Loads configuration from multiple sources and merges them with proper precedence:
/// 1. Global config (~/.subtest/config.toml) - lowest priority
/// 2. Project config (./subtest.toml) - overrides global
/// 3. Environment variables (SUBTEST_*) - overrides project
/// 4. CLI flags - highest priority (handled by caller)
pub struct ConfigLoader {
    /// Cached global config path
    global_config_path: Option<PathBuf>,
}

/// Merged configuration result
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Project configuration, with environment overrides applied
    pub project: ProjectConfig,

    /// Global configuration
    pub global: GlobalConfig,

    /// Project root directory (where subtest.toml was found)
    pub project_root: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            global_config_path: None,
        }
    }

    /// Use `path` instead of ~/.subtest/config.toml
    pub fn with_global_config_path(path: impl Into<PathBuf>) -> Self {
        Self {
            global_config_path: Some(path.into()),
        }
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find subtest.toml, then loads and merges
    /// global config if it exists.
    pub fn load_from_directory(&mut self, start_dir: &Path) -> ConfigResult<Config> {
        let (project_root, project_config) = self.find_project_config(start_dir)?;
        self.finish(project_root, project_config)
    }

    /// Load configuration from a specific project config file
    pub fn load_from_file(&mut self, config_path: &Path) -> ConfigResult<Config> {
        let project_config = ProjectConfig::load_from_file(config_path)?;
        let project_root = config_path.parent().map(|p| p.to_path_buf());
        self.finish(project_root, project_config)
    }

    fn finish(
        &mut self,
        project_root: Option<PathBuf>,
        project_config: ProjectConfig,
    ) -> ConfigResult<Config> {
        // A broken global file must not block a run; a broken project file does
        let global_config = self.load_global_config().unwrap_or_default();
        let project_config = self.apply_env_overrides(project_config)?;

        Ok(Config {
            project: project_config,
            global: global_config,
            project_root,
        })
    }

    /// Find project configuration by walking up directory tree
    ///
    /// Returns (project_root, project_config); both default when no file exists
    fn find_project_config(
        &self,
        start_dir: &Path,
    ) -> ConfigResult<(Option<PathBuf>, ProjectConfig)> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(PROJECT_CONFIG_FILE);

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

    /// Load global configuration from ~/.subtest/config.toml
    fn load_global_config(&mut self) -> ConfigResult<GlobalConfig> {
        let path = match &self.global_config_path {
            Some(path) => path.clone(),
            None => {
                let path = GlobalConfig::global_config_path()?;
                self.global_config_path = Some(path.clone());
                path
            }
        };

        // Global config is optional - if it doesn't exist, return default
        if !path.exists() {
            return Ok(GlobalConfig::default());
        }

        GlobalConfig::load_from_file(&path)
    }

    /// Apply environment variable overrides to project config
    ///
    /// Recognized: SUBTEST_RUN, SUBTEST_PARALLEL, SUBTEST_VERBOSE, SUBTEST_FIXTURE
    fn apply_env_overrides(&self, mut config: ProjectConfig) -> ConfigResult<ProjectConfig> {
        if let Ok(filter) = env::var("SUBTEST_RUN") {
            config.run_mut().filter = Some(filter);
        }

        if let Ok(parallel) = env::var("SUBTEST_PARALLEL") {
            let threads = parallel
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|threads| *threads > 0)
                .ok_or_else(|| ConfigError::InvalidEnv {
                    name: "SUBTEST_PARALLEL".to_string(),
                    value: parallel.clone(),
                    reason: "expected a positive integer".to_string(),
                })?;
            config.run_mut().parallel = Some(threads);
        }

        if let Ok(verbose) = env::var("SUBTEST_VERBOSE") {
            config.run_mut().verbose = Some(parse_flag(&verbose));
        }

        if let Ok(fixture) = env::var("SUBTEST_FIXTURE") {
            config.fixture_mut().path = Some(PathBuf::from(fixture));
        }

        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Truthy environment values
pub fn parse_flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
}

impl Config {
    /// Selector expression (project/env), if any
    pub fn filter(&self) -> Option<&str> {
        self.project.filter()
    }

    /// Worker threads (project > global); `None` means one per CPU
    pub fn parallel(&self) -> Option<usize> {
        self.project
            .parallel()
            .or_else(|| self.global.default_parallel())
    }

    /// Show passing units' logs (project > global > false)
    pub fn verbose(&self) -> bool {
        self.project
            .verbose()
            .or_else(|| self.global.default_verbose())
            .unwrap_or(false)
    }

    /// Colored output (global > true)
    pub fn color(&self) -> bool {
        self.global.default_color().unwrap_or(true)
    }

    /// JSON reports (project > false)
    pub fn json(&self) -> bool {
        self.project.json().unwrap_or(false)
    }

    /// Fixture document path, relative paths resolved against the project root
    pub fn fixture_path(&self) -> PathBuf {
        let path = self
            .project
            .fixture_path()
            .unwrap_or_else(|| Path::new(DEFAULT_FIXTURE_PATH));
        match &self.project_root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Packages run when none are named
    pub fn default_packages(&self) -> &[String] {
        self.project.default_packages()
    }
}
