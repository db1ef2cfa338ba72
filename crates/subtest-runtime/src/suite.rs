//! Suite - one-time setup and teardown around a single scheduler run

use crate::error::{FixtureError, SuiteError, TestResult};
use crate::report::UnitReport;
use crate::scheduler::Scheduler;
use crate::unit::Test;
use serde::Serialize;
use std::fmt;
use std::process::ExitCode;
use tracing::{debug, info, warn};

/// Suite lifecycle states, visited strictly in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuiteState {
    Uninitialized,
    SettingUp,
    Ready,
    Running,
    TearingDown,
    Done,
}

/// Binary outcome handed back to the invoking process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitSignal {
    Success,
    Failure,
}

impl ExitSignal {
    pub fn is_success(self) -> bool {
        self == ExitSignal::Success
    }
}

impl From<ExitSignal> for ExitCode {
    fn from(signal: ExitSignal) -> Self {
        match signal {
            ExitSignal::Success => ExitCode::SUCCESS,
            ExitSignal::Failure => ExitCode::FAILURE,
        }
    }
}

/// Why a suite failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCause {
    Setup,
    Tests,
    Teardown,
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailureCause::Setup => "fixture setup failed",
            FailureCause::Tests => "tests failed",
            FailureCause::Teardown => "fixture teardown failed",
        })
    }
}

/// Everything a finished suite reports
#[derive(Debug)]
pub struct SuiteOutcome {
    pub exit: ExitSignal,
    pub cause: Option<FailureCause>,
    /// `None` when setup failed and no unit ran
    pub report: Option<UnitReport>,
    pub setup_error: Option<FixtureError>,
    pub teardown_error: Option<FixtureError>,
}

impl SuiteOutcome {
    pub fn is_success(&self) -> bool {
        self.exit.is_success()
    }
}

/// A single-shot test suite
///
/// Construct one per run and pass it by reference; several suites can exist
/// side by side.
pub struct Suite {
    name: String,
    scheduler: Scheduler,
    state: SuiteState,
    history: Vec<SuiteState>,
}

impl Suite {
    pub fn new(name: impl Into<String>, scheduler: Scheduler) -> Self {
        Self {
            name: name.into(),
            scheduler,
            state: SuiteState::Uninitialized,
            history: vec![SuiteState::Uninitialized],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> SuiteState {
        self.state
    }

    /// Every state visited so far
    pub fn history(&self) -> &[SuiteState] {
        &self.history
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    fn transition(&mut self, next: SuiteState) {
        debug!(suite = %self.name, from = ?self.state, to = ?next, "suite transition");
        self.state = next;
        self.history.push(next);
    }

    /// Set up fixtures, run the tree rooted at `body`, tear fixtures down
    ///
    /// `setup` produces the fixture value handed to `body` and then consumed
    /// by `teardown`. The fixture reference lives as long as the run, so
    /// parallel units can borrow from it. If `setup` fails, nothing runs and
    /// `teardown` is not called. `teardown` is called whatever the tests did.
    /// A second call returns [`SuiteError::AlreadyRun`].
    pub fn run<D, S, T, B>(
        &mut self,
        setup: S,
        teardown: T,
        body: B,
    ) -> Result<SuiteOutcome, SuiteError>
    where
        S: FnOnce() -> Result<D, FixtureError>,
        T: FnOnce(D) -> Result<(), FixtureError>,
        B: for<'run> FnOnce(&mut Test<'run>, &'run D) -> TestResult,
    {
        if self.state != SuiteState::Uninitialized {
            return Err(SuiteError::AlreadyRun(self.name.clone()));
        }

        self.transition(SuiteState::SettingUp);
        let fixture = match setup() {
            Ok(fixture) => fixture,
            Err(err) => {
                warn!(suite = %self.name, error = %err, "fixture setup failed");
                self.transition(SuiteState::Done);
                return Ok(SuiteOutcome {
                    exit: ExitSignal::Failure,
                    cause: Some(FailureCause::Setup),
                    report: None,
                    setup_error: Some(err),
                    teardown_error: None,
                });
            }
        };

        self.transition(SuiteState::Ready);
        self.transition(SuiteState::Running);
        let report = self
            .scheduler
            .execute(&self.name, |t| body(t, &fixture));
        let tests_failed = report.is_failure();

        self.transition(SuiteState::TearingDown);
        let teardown_error = teardown(fixture).err();
        if let Some(err) = &teardown_error {
            if err.is_fatal() {
                warn!(suite = %self.name, error = %err, "fatal fixture teardown error");
            } else {
                warn!(suite = %self.name, error = %err, "fixture teardown error ignored");
            }
        }
        let teardown_fatal = teardown_error.as_ref().is_some_and(FixtureError::is_fatal);

        self.transition(SuiteState::Done);
        let cause = if tests_failed {
            Some(FailureCause::Tests)
        } else if teardown_fatal {
            Some(FailureCause::Teardown)
        } else {
            None
        };
        let exit = if cause.is_some() {
            ExitSignal::Failure
        } else {
            ExitSignal::Success
        };
        info!(suite = %self.name, ?exit, "suite finished");

        Ok(SuiteOutcome {
            exit,
            cause,
            report: Some(report),
            setup_error: None,
            teardown_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::Selector;

    fn suite(name: &str) -> Suite {
        Suite::new(name, Scheduler::new(Selector::all(), Some(2)).unwrap())
    }

    #[test]
    fn test_states_visited_in_order() {
        let mut suite = suite("lifecycle");
        let outcome = suite.run(|| Ok(()), |_| Ok(()), |_, _| Ok(())).unwrap();

        assert!(outcome.is_success());
        assert_eq!(
            suite.history(),
            [
                SuiteState::Uninitialized,
                SuiteState::SettingUp,
                SuiteState::Ready,
                SuiteState::Running,
                SuiteState::TearingDown,
                SuiteState::Done,
            ]
        );
    }

    #[test]
    fn test_second_run_rejected() {
        let mut suite = suite("once");
        suite.run(|| Ok(()), |_| Ok(()), |_, _| Ok(())).unwrap();
        let err = suite
            .run(|| Ok(()), |_| Ok(()), |_, _| Ok(()))
            .unwrap_err();
        assert!(matches!(err, SuiteError::AlreadyRun(name) if name == "once"));
    }

    #[test]
    fn test_exit_signal_success() {
        assert!(ExitSignal::Success.is_success());
        assert!(!ExitSignal::Failure.is_success());
    }
}
