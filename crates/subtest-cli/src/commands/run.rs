//! Run command - execute packages as independent suites

use super::{parse_selector, resolve_packages};
use crate::config::Config as EnvConfig;
use crate::packages::PackageContext;
use crate::reporter::{json_report, PackageRun, Reporter};
use anyhow::{ensure, Context, Result};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;

/// Arguments for the run command
#[derive(Debug, Default)]
pub struct RunArgs {
    /// Packages to run (default: configured list, else all)
    pub packages: Vec<String>,
    /// Selector expression
    pub filter: Option<String>,
    /// Show passing units and their logs
    pub verbose: bool,
    /// Output in JSON format
    pub json: bool,
    /// Worker threads for parallel units
    pub parallel: Option<usize>,
    /// Disable colored output
    pub no_color: bool,
    /// Fixture document for the `fixture` package
    pub fixture: Option<PathBuf>,
}

/// Run the selected packages and report them
pub fn run(args: RunArgs, config: &subtest_config::Config, env: &EnvConfig) -> Result<ExitCode> {
    let no_color = args.no_color || env.no_color || !config.color();
    let json = args.json || env.default_json || config.json();
    let verbose = args.verbose || config.verbose();

    let parallel = args.parallel.or(config.parallel());
    ensure!(parallel != Some(0), "--parallel must be at least 1");

    let selector = parse_selector(args.filter.as_deref().or(config.filter()))?;
    let packages = resolve_packages(&args.packages, config.default_packages())?;
    let ctx = PackageContext {
        selector,
        parallel,
        fixture_path: args.fixture.unwrap_or_else(|| config.fixture_path()),
    };

    if no_color {
        colored::control::set_override(false);
    }

    let reporter = Reporter::new(verbose);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut runs = Vec::with_capacity(packages.len());

    for package in packages {
        debug!(package = package.name(), selector = %ctx.selector, "running package");
        let outcome = package
            .run(&ctx)
            .with_context(|| format!("failed to start package '{}'", package.name()))?;
        let run = PackageRun {
            name: package.name(),
            outcome,
        };
        if !json {
            reporter.report_package(&mut out, &run)?;
        }
        runs.push(run);
    }

    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&json_report(&runs))?)?;
    } else {
        reporter.report_summary(&mut out, &runs)?;
    }
    out.flush()?;

    if no_color {
        colored::control::unset_override();
    }

    let passed = runs.iter().all(|run| run.outcome.is_success());
    Ok(if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> EnvConfig {
        EnvConfig {
            default_json: false,
            no_color: true,
            log_filter: None,
        }
    }

    #[test]
    fn test_zero_parallel_rejected() {
        let args = RunArgs {
            packages: vec!["testmain".to_string()],
            parallel: Some(0),
            ..Default::default()
        };
        let err = run(args, &subtest_config::Config::default(), &env()).unwrap_err();
        assert!(err.to_string().contains("--parallel"));
    }

    #[test]
    fn test_unknown_package_is_error() {
        let args = RunArgs {
            packages: vec!["gaehttp".to_string()],
            ..Default::default()
        };
        assert!(run(args, &subtest_config::Config::default(), &env()).is_err());
    }

    #[test]
    fn test_run_passing_package() {
        let args = RunArgs {
            packages: vec!["testmain".to_string()],
            verbose: true,
            no_color: true,
            ..Default::default()
        };
        let code = run(args, &subtest_config::Config::default(), &env()).unwrap();
        assert_eq!(format!("{:?}", code), format!("{:?}", ExitCode::SUCCESS));
    }
}
