//! Suite-level setup and teardown around plain tests

use super::{names, run_tests, Package, PackageContext, TestFn};
use subtest_runtime::{SuiteError, SuiteOutcome, Test, TestResult};
use tracing::info;

#[derive(Debug)]
pub struct TestMain;

const TESTS: &[(&str, TestFn)] = &[("TestA", test_a), ("TestB", test_b)];

impl Package for TestMain {
    fn name(&self) -> &'static str {
        "testmain"
    }

    fn about(&self) -> &'static str {
        "setup and tear-down hooks around the whole package"
    }

    fn test_names(&self) -> Vec<&'static str> {
        names(TESTS)
    }

    fn run(&self, ctx: &PackageContext) -> Result<SuiteOutcome, SuiteError> {
        ctx.suite(self.name())?.run(
            || {
                info!(package = "testmain", "setup");
                Ok(())
            },
            |_| {
                info!(package = "testmain", "tear-down");
                Ok(())
            },
            |t, fixture| run_tests(t, fixture, TESTS),
        )
    }
}

fn test_a(t: &mut Test, _: &()) -> TestResult {
    t.log("TestA");
    Ok(())
}

fn test_b(t: &mut Test, _: &()) -> TestResult {
    t.log("TestB");
    Ok(())
}
