//! Test reporter - display suite results
//!
//! The text format follows `go test`: a `--- STATUS: path (secs)` header per
//! unit, its captured lines indented one level deeper, and child blocks in
//! registration order at the point they were registered.

use colored::*;
use serde_json::{json, Value};
use std::io::{self, Write};
use std::time::Duration;
use subtest_runtime::{Counts, Entry, LogLine, Status, SuiteOutcome, UnitReport};

const INDENT: &str = "    ";

/// Outcome of one package in this invocation
#[derive(Debug)]
pub struct PackageRun {
    pub name: &'static str,
    pub outcome: SuiteOutcome,
}

impl PackageRun {
    pub fn counts(&self) -> Counts {
        self.outcome
            .report
            .as_ref()
            .map(UnitReport::counts)
            .unwrap_or_default()
    }

    pub fn elapsed(&self) -> Duration {
        self.outcome
            .report
            .as_ref()
            .map(|report| report.elapsed)
            .unwrap_or_default()
    }
}

/// Test reporter with output configuration
#[derive(Debug, Default)]
pub struct Reporter {
    /// Show passing and skipped units with their logs
    verbose: bool,
}

impl Reporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Print one package's unit tree and its status line
    pub fn report_package(&self, out: &mut impl Write, run: &PackageRun) -> io::Result<()> {
        let outcome = &run.outcome;

        if let Some(err) = &outcome.setup_error {
            writeln!(out, "{} {}", "setup:".red().bold(), err)?;
        }
        if let Some(report) = &outcome.report {
            // root lines only appear when the package body itself failed
            for entry in report.entries() {
                match entry {
                    Entry::Line(line) => write_line(out, line, 0)?,
                    Entry::Unit(child) => self.write_unit(out, child, 0)?,
                }
            }
        }
        if let Some(err) = &outcome.teardown_error {
            let label = if err.is_fatal() {
                "teardown:".red().bold()
            } else {
                "teardown:".yellow().bold()
            };
            writeln!(out, "{} {}", label, err)?;
        }

        let status = if outcome.is_success() {
            "ok  ".green().bold()
        } else {
            "FAIL".red().bold()
        };
        match outcome.cause {
            Some(cause) if outcome.report.is_none() => {
                writeln!(out, "{}\t{}\t[{}]", status, run.name, cause)?
            }
            _ => writeln!(out, "{}\t{}\t{}", status, run.name, seconds(run.elapsed()))?,
        }
        Ok(())
    }

    fn shows(&self, unit: &UnitReport) -> bool {
        self.verbose || unit.is_failure()
    }

    fn write_unit(&self, out: &mut impl Write, unit: &UnitReport, depth: usize) -> io::Result<()> {
        if !self.shows(unit) {
            return Ok(());
        }

        writeln!(
            out,
            "{}--- {}: {} ({})",
            INDENT.repeat(depth),
            label(unit.status),
            unit.path,
            seconds(unit.elapsed)
        )?;

        for entry in unit.entries() {
            match entry {
                Entry::Line(line) => write_line(out, line, depth + 1)?,
                Entry::Unit(child) => self.write_unit(out, child, depth + 1)?,
            }
        }
        Ok(())
    }

    /// Print the totals across packages
    pub fn report_summary(&self, out: &mut impl Write, runs: &[PackageRun]) -> io::Result<()> {
        let totals = runs.iter().map(PackageRun::counts).fold(Counts::default(), |acc, c| Counts {
            passed: acc.passed + c.passed,
            failed: acc.failed + c.failed,
            skipped: acc.skipped + c.skipped,
        });
        let failed_packages = runs.iter().filter(|run| !run.outcome.is_success()).count();
        let total_duration: Duration = runs.iter().map(PackageRun::elapsed).sum();

        writeln!(out)?;
        writeln!(out, "{}", "─".repeat(50))?;

        let status = if failed_packages > 0 {
            "FAILED".red().bold()
        } else {
            "PASSED".green().bold()
        };

        writeln!(
            out,
            "Test result: {} | {} packages, {} passed, {} failed, {} skipped",
            status,
            runs.len().to_string().bold(),
            totals.passed.to_string().green().bold(),
            if totals.failed > 0 {
                totals.failed.to_string().red().bold()
            } else {
                totals.failed.to_string().normal()
            },
            totals.skipped.to_string().yellow()
        )?;
        writeln!(out, "Time: {:.2?}", total_duration)?;
        Ok(())
    }
}

fn label(status: Status) -> ColoredString {
    match status {
        Status::Passed => status.label().green().bold(),
        Status::Failed | Status::FailedFast => status.label().red().bold(),
        Status::Skipped => status.label().yellow().bold(),
        Status::Pending | Status::Running => status.label().normal(),
    }
}

fn seconds(elapsed: Duration) -> String {
    format!("{:.2}s", elapsed.as_secs_f64())
}

/// `file.rs:12: text`, continuation lines indented one more level
fn write_line(out: &mut impl Write, line: &LogLine, depth: usize) -> io::Result<()> {
    let indent = INDENT.repeat(depth);
    let mut text = line.text.lines();
    let first = text.next().unwrap_or_default();

    match line.site {
        Some(site) => writeln!(out, "{}{}: {}", indent, site.to_string().dimmed(), first)?,
        None => writeln!(out, "{}{}", indent, first)?,
    }
    for rest in text {
        writeln!(out, "{}{}{}", indent, INDENT, rest)?;
    }
    Ok(())
}

/// Machine-readable report of every package
pub fn json_report(runs: &[PackageRun]) -> Value {
    let packages: Vec<_> = runs
        .iter()
        .map(|run| {
            json!({
                "package": run.name,
                "exit": run.outcome.exit,
                "cause": run.outcome.cause,
                "setup_error": run.outcome.setup_error.as_ref().map(|e| e.to_string()),
                "teardown_error": run.outcome.teardown_error.as_ref().map(|e| e.to_string()),
                "counts": run.counts(),
                "report": run.outcome.report,
            })
        })
        .collect();

    json!({
        "passed": runs.iter().all(|run| run.outcome.is_success()),
        "packages": packages,
    })
}
