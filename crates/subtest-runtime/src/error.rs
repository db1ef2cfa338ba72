//! Error types for the harness
//!
//! In-tree errors never cross unit boundaries: registration errors are handed
//! back to the registering body, and aborts ([`Interrupt`]) stop only the body
//! that raised them. Fixture errors are the only ones that reach the suite's
//! exit signal.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while registering a child unit
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegisterError {
    #[error("duplicate test name '{name}' under '{parent}'")]
    DuplicateName { parent: String, name: String },

    #[error("invalid test name '{0}': names must be non-empty and must not contain '/'")]
    InvalidName(String),
}

/// Early exit from a unit's body
///
/// Bodies return [`TestResult`]; the `?` operator carries an interrupt up to
/// the unit's own task boundary, where the scheduler records it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interrupt {
    /// `fatal` / `fail_now`: the unit failed and stopped
    Fatal,
    /// `skip` / `skip_now`: the unit stopped without failing
    Skip,
    /// A registration error propagated out of the body
    Register(RegisterError),
}

impl From<RegisterError> for Interrupt {
    fn from(err: RegisterError) -> Self {
        Interrupt::Register(err)
    }
}

/// Result type returned by every unit body
pub type TestResult = Result<(), Interrupt>;

/// Errors raised while building a [`Selector`](crate::Selector)
#[derive(Error, Debug)]
pub enum SelectorError {
    #[error("invalid pattern '{pattern}' at depth {depth}: {source}")]
    InvalidPattern {
        pattern: String,
        depth: usize,
        #[source]
        source: regex::Error,
    },
}

/// Fixture setup and teardown errors
#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("failed to read fixture file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid fixture document {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("duplicate fixture case id '{0}'")]
    DuplicateCase(String),

    #[error("setup failed: {0}")]
    Setup(String),

    #[error("teardown failed: {message}")]
    Teardown { message: String, fatal: bool },
}

impl FixtureError {
    /// A non-fatal teardown error
    pub fn teardown(message: impl Into<String>) -> Self {
        FixtureError::Teardown {
            message: message.into(),
            fatal: false,
        }
    }

    /// A teardown error that fails the run
    pub fn fatal_teardown(message: impl Into<String>) -> Self {
        FixtureError::Teardown {
            message: message.into(),
            fatal: true,
        }
    }

    /// Whether this error must turn the exit signal into a failure.
    /// Everything except a non-fatal teardown error is fatal.
    pub fn is_fatal(&self) -> bool {
        match self {
            FixtureError::Teardown { fatal, .. } => *fatal,
            _ => true,
        }
    }
}

/// Suite-level errors
#[derive(Error, Debug)]
pub enum SuiteError {
    #[error("suite '{0}' has already run")]
    AlreadyRun(String),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_error_converts_to_interrupt() {
        let err = RegisterError::DuplicateName {
            parent: "TestAdd".to_string(),
            name: "Len=1".to_string(),
        };
        let interrupt: Interrupt = err.clone().into();
        assert_eq!(interrupt, Interrupt::Register(err));
    }

    #[test]
    fn test_fixture_error_fatality() {
        assert!(FixtureError::Setup("boom".to_string()).is_fatal());
        assert!(!FixtureError::teardown("cleanup").is_fatal());
        assert!(FixtureError::fatal_teardown("cleanup").is_fatal());
    }

    #[test]
    fn test_error_messages() {
        let err = RegisterError::DuplicateName {
            parent: "TestAdd".to_string(),
            name: "x".to_string(),
        };
        assert_eq!(err.to_string(), "duplicate test name 'x' under 'TestAdd'");
        assert_eq!(
            FixtureError::teardown("db closed").to_string(),
            "teardown failed: db closed"
        );
    }
}
