//! Built-in test packages
//!
//! Each package is a named set of top-level tests plus the fixture setup and
//! teardown around them. `subtest run` executes every selected package as its
//! own suite.

pub mod adder;
pub mod basic;
pub mod fixture;
pub mod testmain;

use std::fmt;
use std::path::PathBuf;
use subtest_runtime::{Scheduler, Selector, Suite, SuiteError, SuiteOutcome, Test, TestResult};

/// A top-level test receiving the suite's fixture value
///
/// The fixture borrow lasts for the whole run, so parallel subtests may
/// capture data from it.
pub type TestFn<D = ()> = for<'run> fn(&mut Test<'run>, &'run D) -> TestResult;

/// Settings shared by every package in one invocation
#[derive(Debug, Clone)]
pub struct PackageContext {
    pub selector: Selector,
    pub parallel: Option<usize>,
    pub fixture_path: PathBuf,
}

impl PackageContext {
    /// A fresh single-shot suite for `name`
    pub fn suite(&self, name: &str) -> Result<Suite, SuiteError> {
        let scheduler = Scheduler::new(self.selector.clone(), self.parallel)?;
        Ok(Suite::new(name, scheduler))
    }
}

pub trait Package: fmt::Debug + Sync {
    fn name(&self) -> &'static str;

    /// One-line description shown by `subtest list`
    fn about(&self) -> &'static str;

    /// Top-level test names in registration order
    fn test_names(&self) -> Vec<&'static str>;

    fn run(&self, ctx: &PackageContext) -> Result<SuiteOutcome, SuiteError>;
}

/// Every built-in package, in run order
pub fn all() -> Vec<&'static dyn Package> {
    vec![&basic::Basic, &fixture::Fixture, &testmain::TestMain]
}

pub fn find(name: &str) -> Option<&'static dyn Package> {
    all().into_iter().find(|package| package.name() == name)
}

/// Register `tests` under the suite root, in order
pub(crate) fn run_tests<'run, D>(
    t: &mut Test<'run>,
    fixture: &'run D,
    tests: &[(&'static str, TestFn<D>)],
) -> TestResult {
    for &(name, test) in tests {
        t.run(name, |t| test(t, fixture))?;
    }
    Ok(())
}

pub(crate) fn names<D>(tests: &[(&'static str, TestFn<D>)]) -> Vec<&'static str> {
    tests.iter().map(|(name, _)| *name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_names_unique() {
        let names: Vec<_> = all().iter().map(|p| p.name()).collect();
        assert_eq!(names, ["basic", "fixture", "testmain"]);
    }

    #[test]
    fn test_packages_debug_format() {
        assert_eq!(format!("{:?}", all()), "[Basic, Fixture, TestMain]");
    }

    #[test]
    fn test_find_package() {
        assert_eq!(find("basic").map(|p| p.name()), Some("basic"));
        assert!(find("http").is_none());
    }
}
