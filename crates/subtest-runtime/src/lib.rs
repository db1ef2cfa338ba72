//! subtest runtime - hierarchical test execution
//!
//! This library provides the harness behind the `subtest` CLI:
//! - A tree of named units registered and executed by their parent's body
//! - Sequential units that run inline and parallel units released after the
//!   parent's body returns, joined before the parent concludes
//! - Per-unit log capture with helper-scope call-site attribution
//! - Path-pattern selection of which units execute
//! - A single-shot suite wrapping the run in fixture setup and teardown
//!
//! # Example
//!
//! ```
//! use subtest_runtime::{Scheduler, Selector, Suite};
//!
//! let scheduler = Scheduler::new(Selector::all(), Some(2)).unwrap();
//! let mut suite = Suite::new("example", scheduler);
//! let outcome = suite
//!     .run(
//!         || Ok(()),
//!         |_| Ok(()),
//!         |t, _| {
//!             t.run("TestAdd", |t| {
//!                 if 1 + 2 != 3 {
//!                     t.error("add failed");
//!                 }
//!                 Ok(())
//!             })?;
//!             Ok(())
//!         },
//!     )
//!     .unwrap();
//! assert!(outcome.is_success());
//! ```

/// subtest runtime version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod error;
pub mod fixture;
pub mod log;
pub mod report;
pub mod scheduler;
pub mod selector;
pub mod suite;
pub mod unit;

pub use error::{FixtureError, Interrupt, RegisterError, SelectorError, SuiteError, TestResult};
pub use fixture::{FixtureCase, FixtureSet};
pub use log::{CallSite, LineKind, LogBuffer, LogLine};
pub use report::{Counts, Entry, UnitReport};
pub use scheduler::Scheduler;
pub use selector::Selector;
pub use suite::{ExitSignal, FailureCause, Suite, SuiteOutcome, SuiteState};
pub use unit::{Mode, ParallelBuilder, Status, Test, UnitBuilder, UnitNode};
