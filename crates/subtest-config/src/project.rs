//! Project Configuration (subtest.toml)
//!
//! Handles project-level configuration stored in `subtest.toml` at the project root.

use crate::global::validate_parallel;
use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Project configuration from subtest.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Run settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run: Option<RunConfig>,

    /// Fixture settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixture: Option<FixtureConfig>,

    /// Package selection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packages: Option<PackagesConfig>,
}

/// `[run]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Selector expression, as passed to `--run`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,

    /// Worker threads for parallel units
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel: Option<usize>,

    /// Show logs of passing units
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verbose: Option<bool>,

    /// Emit JSON reports
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json: Option<bool>,
}

/// `[fixture]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct FixtureConfig {
    /// Fixture document, relative to the project root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// `[packages]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct PackagesConfig {
    /// Packages run when none are named on the command line
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub default: Vec<String>,
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
        if let Some(parallel) = self.run.as_ref().and_then(|r| r.parallel) {
            validate_parallel("run.parallel", parallel)?;
        }

        if let Some(packages) = &self.packages {
            if packages.default.iter().any(|name| name.trim().is_empty()) {
                return Err(ConfigError::InvalidValue {
                    field: "packages.default".to_string(),
                    reason: "package names cannot be empty".to_string(),
                });
            }
        }

        Ok(())
    }

    pub fn filter(&self) -> Option<&str> {
        self.run.as_ref().and_then(|r| r.filter.as_deref())
    }

    pub fn parallel(&self) -> Option<usize> {
        self.run.as_ref().and_then(|r| r.parallel)
    }

    pub fn verbose(&self) -> Option<bool> {
        self.run.as_ref().and_then(|r| r.verbose)
    }

    pub fn json(&self) -> Option<bool> {
        self.run.as_ref().and_then(|r| r.json)
    }

    pub fn fixture_path(&self) -> Option<&Path> {
        self.fixture.as_ref().and_then(|f| f.path.as_deref())
    }

    /// Default package list, empty when unset
    pub fn default_packages(&self) -> &[String] {
        self.packages
            .as_ref()
            .map(|p| p.default.as_slice())
            .unwrap_or_default()
    }

    /// Mutable `[run]` section, created on demand
    pub(crate) fn run_mut(&mut self) -> &mut RunConfig {
        self.run.get_or_insert_with(RunConfig::default)
    }

    pub(crate) fn fixture_mut(&mut self) -> &mut FixtureConfig {
        self.fixture.get_or_insert_with(FixtureConfig::default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_project_config() {
        let toml = r#"
[run]
filter = "AddMulti/Len=3"
parallel = 2
verbose = true
json = false

[fixture]
path = "testdata/fixture.json"

[packages]
default = ["basic", "fixture"]
"#;

        let config: ProjectConfig = toml::from_str(toml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.filter(), Some("AddMulti/Len=3"));
        assert_eq!(config.parallel(), Some(2));
        assert_eq!(config.verbose(), Some(true));
        assert_eq!(config.json(), Some(false));
        assert_eq!(
            config.fixture_path(),
            Some(Path::new("testdata/fixture.json"))
        );
        assert_eq!(config.default_packages(), ["basic", "fixture"]);
    }

    #[test]
    fn test_empty_project_config() {
        let config: ProjectConfig = toml::from_str("").unwrap();
        assert!(config.validate().is_ok());
        assert!(config.default_packages().is_empty());
        assert_eq!(config.filter(), None);
    }

    #[test]
    fn test_zero_parallel_rejected() {
        let config: ProjectConfig = toml::from_str("[run]\nparallel = 0\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_blank_package_name_rejected() {
        let config: ProjectConfig = toml::from_str("[packages]\ndefault = [\" \"]\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_section_rejected() {
        let result: Result<ProjectConfig, _> = toml::from_str("[compiler]\noptimize = true\n");
        assert!(result.is_err());
    }
}
