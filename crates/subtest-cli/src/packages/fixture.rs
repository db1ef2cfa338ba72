//! Fixture data loaded once in suite setup and shared by every test

use super::adder::add;
use super::{names, run_tests, Package, PackageContext, TestFn};
use subtest_runtime::{FixtureSet, SuiteError, SuiteOutcome, Test, TestResult};
use tracing::info;

#[derive(Debug)]
pub struct Fixture;

const TESTS: &[(&str, TestFn<FixtureSet>)] = &[("TestA", test_a), ("TestCases", test_cases)];

impl Package for Fixture {
    fn name(&self) -> &'static str {
        "fixture"
    }

    fn about(&self) -> &'static str {
        "cases loaded from a JSON fixture before any test runs"
    }

    fn test_names(&self) -> Vec<&'static str> {
        names(TESTS)
    }

    fn run(&self, ctx: &PackageContext) -> Result<SuiteOutcome, SuiteError> {
        let path = ctx.fixture_path.clone();
        ctx.suite(self.name())?.run(
            move || {
                let fixtures = FixtureSet::load(&path)?;
                info!(path = %path.display(), cases = fixtures.len(), "fixture loaded");
                Ok(fixtures)
            },
            |_| Ok(()),
            |t, fixtures| run_tests(t, fixtures, TESTS),
        )
    }
}

fn test_a(t: &mut Test, fixtures: &FixtureSet) -> TestResult {
    t.log(format!("fixture: {} cases", fixtures.len()));
    Ok(())
}

/// One parallel subtest per case, each reading its case from the fixture
fn test_cases<'run>(t: &mut Test<'run>, fixtures: &'run FixtureSet) -> TestResult {
    if fixtures.is_empty() {
        return t.skip("fixture has no cases");
    }
    for (id, case) in fixtures.iter() {
        t.unit(id).parallel().run(move |t| {
            let result = add(case.l, case.r);
            if result != case.result {
                t.error(format!(
                    "add({}, {}) = {}, want {}",
                    case.l, case.r, result, case.result
                ));
            }
            Ok(())
        })?;
    }
    Ok(())
}
