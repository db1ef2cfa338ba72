use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;
mod config;
mod logging;
mod packages;
mod reporter;

/// Hierarchical test runner with subtests, parallel units and fixtures.
///
/// Runs the built-in test packages as independent suites and prints a
/// `go test` style report.
///
/// EXAMPLES:
///     subtest run                          Run every package
///     subtest run basic -v                 Run one package, show all logs
///     subtest run --run AddMulti/Len=3     Select units by name path
///     subtest list --run AddMulti          Show matching top-level tests
///
/// ENVIRONMENT VARIABLES:
///     SUBTEST_RUN       Default selector expression
///     SUBTEST_PARALLEL  Worker threads for parallel units
///     SUBTEST_VERBOSE   Set to '1' to show passing units
///     SUBTEST_FIXTURE   Fixture document path
///     SUBTEST_JSON      Set to '1' for JSON output by default
///     SUBTEST_LOG       Diagnostic log filter (e.g. 'debug')
///     NO_COLOR          Set to disable colored output
#[derive(Parser)]
#[command(name = "subtest")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Diagnostic log level or filter directive (overrides SUBTEST_LOG)
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run test packages
    ///
    /// Each package runs as its own suite: fixture setup, the test tree,
    /// fixture teardown. Exits non-zero if any package failed.
    ///
    /// EXAMPLES:
    ///     subtest run                          All packages
    ///     subtest run basic testmain           Selected packages
    ///     subtest run --run 'AddMulti$' -v     Filter by name path
    ///     subtest run --parallel 2 --json      Bounded workers, JSON report
    #[command(visible_alias = "r")]
    Run {
        /// Packages to run (default: all)
        packages: Vec<String>,
        /// Run only units whose name path matches, one regex per level
        #[arg(long = "run", value_name = "EXPR")]
        filter: Option<String>,
        /// Show passing units and their logs
        #[arg(long, short = 'v')]
        verbose: bool,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
        /// Worker threads for parallel units (default: one per CPU)
        #[arg(long, short = 'p')]
        parallel: Option<usize>,
        /// Disable colored output
        #[arg(long)]
        no_color: bool,
        /// Fixture document for the fixture package
        #[arg(long, value_name = "PATH")]
        fixture: Option<PathBuf>,
    },

    /// List the top-level tests of each package
    ///
    /// EXAMPLES:
    ///     subtest list
    ///     subtest list basic --run AddMulti
    #[command(visible_alias = "ls")]
    List {
        /// Packages to list (default: all)
        packages: Vec<String>,
        /// Show only tests matching the first level of the expression
        #[arg(long = "run", value_name = "EXPR")]
        filter: Option<String>,
        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Generate shell completions
    ///
    /// EXAMPLES:
    ///     subtest completions bash > ~/.local/share/bash-completion/completions/subtest
    ///     subtest completions zsh > ~/.zfunc/_subtest
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let env_config = config::Config::from_env();

    logging::init(&logging::filter_directive(
        cli.log_level.as_deref(),
        env_config.log_filter.as_deref(),
    ));

    match cli.command {
        Commands::Run {
            packages,
            filter,
            verbose,
            json,
            parallel,
            no_color,
            fixture,
        } => {
            let project = load_project_config()?;
            let args = commands::run::RunArgs {
                packages,
                filter,
                verbose,
                json,
                parallel,
                no_color,
                fixture,
            };
            commands::run::run(args, &project, &env_config)
        }
        Commands::List {
            packages,
            filter,
            no_color,
        } => {
            let project = load_project_config()?;
            let args = commands::list::ListArgs {
                packages,
                filter,
                no_color: no_color || env_config.no_color,
            };
            commands::list::run(args, &project)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// subtest.toml (searched upwards), ~/.subtest/config.toml and SUBTEST_* overrides
fn load_project_config() -> Result<subtest_config::Config> {
    let cwd = std::env::current_dir().context("failed to read the working directory")?;
    subtest_config::ConfigLoader::new()
        .load_from_directory(&cwd)
        .context("failed to load configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_flags() {
        let cli = Cli::parse_from([
            "subtest",
            "run",
            "basic",
            "--run",
            "AddMulti/Len=3",
            "-v",
            "--parallel",
            "2",
            "--log-level",
            "debug",
        ]);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Commands::Run {
                packages,
                filter,
                verbose,
                parallel,
                ..
            } => {
                assert_eq!(packages, ["basic"]);
                assert_eq!(filter.as_deref(), Some("AddMulti/Len=3"));
                assert!(verbose);
                assert_eq!(parallel, Some(2));
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_parse_completions() {
        let cli = Cli::parse_from(["subtest", "completions", "bash"]);
        match cli.command {
            Commands::Completions { shell } => assert_eq!(shell, Shell::Bash),
            _ => panic!("Expected Completions command"),
        }
    }
}
