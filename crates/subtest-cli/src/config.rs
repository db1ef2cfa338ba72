//! CLI configuration via environment variables
//!
//! Output switches that are not part of `subtest.toml` come from the
//! environment. Command-line flags override them.

use std::env;

/// CLI configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Default to JSON reports (SUBTEST_JSON=1)
    pub default_json: bool,
    /// Disable colored output (SUBTEST_NO_COLOR=1 or NO_COLOR=1)
    pub no_color: bool,
    /// Diagnostic log filter (SUBTEST_LOG=debug)
    pub log_filter: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            default_json: env::var("SUBTEST_JSON")
                .map(|v| subtest_config::loader::parse_flag(&v) || v.to_lowercase() == "json")
                .unwrap_or(false),
            no_color: env::var("SUBTEST_NO_COLOR").is_ok() || env::var("NO_COLOR").is_ok(),
            log_filter: env::var("SUBTEST_LOG").ok().filter(|v| !v.trim().is_empty()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
