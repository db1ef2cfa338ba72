//! Global Configuration (~/.subtest/config.toml)
//!
//! Handles user-level defaults stored in `~/.subtest/config.toml`.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global user configuration from ~/.subtest/config.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct GlobalConfig {
    /// Default settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,
}

/// Default settings applied to every run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct DefaultsConfig {
    /// Show logs of passing units
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verbose: Option<bool>,

    /// Colored output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<bool>,

    /// Worker threads for parallel units
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel: Option<usize>,
}

impl GlobalConfig {
    /// Load global configuration from a file
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

    /// Validate the global configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(parallel) = self.defaults.as_ref().and_then(|d| d.parallel) {
            validate_parallel("defaults.parallel", parallel)?;
        }
        Ok(())
    }

    /// Get the global config file path (~/.subtest/config.toml)
    pub fn global_config_path() -> ConfigResult<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".subtest").join("config.toml"))
    }

    pub fn default_verbose(&self) -> Option<bool> {
        self.defaults.as_ref().and_then(|d| d.verbose)
    }

    pub fn default_color(&self) -> Option<bool> {
        self.defaults.as_ref().and_then(|d| d.color)
    }

    pub fn default_parallel(&self) -> Option<usize> {
        self.defaults.as_ref().and_then(|d| d.parallel)
    }
}

/// Worker counts must be at least one
pub(crate) fn validate_parallel(field: &str, value: usize) -> ConfigResult<()> {
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    Ok(())
}
