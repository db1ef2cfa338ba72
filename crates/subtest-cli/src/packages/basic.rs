//! Failure semantics, table tests, subtests, parallel subtests and helpers
//!
//! Several tests here fail on purpose so their output can be inspected;
//! select the passing ones with `--run`, e.g. `--run AddMulti`.

use super::adder::{add, Adder};
use super::{names, run_tests, Package, PackageContext, TestFn};
use chrono::Local;
use std::thread;
use std::time::Duration;
use subtest_runtime::{SuiteError, SuiteOutcome, Test, TestResult};

#[derive(Debug)]
pub struct Basic;

const TESTS: &[(&str, TestFn)] = &[
    ("TestAdd", test_add),
    ("TestAdd2", test_add2),
    ("TestAdd3", test_add3),
    ("TestAdd4", test_add4),
    ("TestAdd5", test_add5),
    ("TestAdder_Add", test_adder_add),
    ("TestAdder_AddMulti", test_adder_add_multi),
    ("TestAdder_AddMulti2", test_adder_add_multi2),
    ("TestAdder_AddMulti3", test_adder_add_multi3),
];

impl Package for Basic {
    fn name(&self) -> &'static str {
        "basic"
    }

    fn about(&self) -> &'static str {
        "add and Adder: failures, tables, subtests, parallel subtests, helpers"
    }

    fn test_names(&self) -> Vec<&'static str> {
        names(TESTS)
    }

    fn run(&self, ctx: &PackageContext) -> Result<SuiteOutcome, SuiteError> {
        ctx.suite(self.name())?
            .run(|| Ok(()), |_| Ok(()), |t, fixture| run_tests(t, fixture, TESTS))
    }
}

fn test_add(t: &mut Test, _: &()) -> TestResult {
    let result = add(1, 2);
    if result != 3 {
        t.error(format!("add failed. expect:{}, actual:{}", 3, result));
    }
    t.log(format!("result is {}", result));
    Ok(())
}

// error keeps going
fn test_add2(t: &mut Test, _: &()) -> TestResult {
    t.error("error");
    t.log("log");
    Ok(())
}

// fatal stops the body
fn test_add3(t: &mut Test, _: &()) -> TestResult {
    t.fatal("fatal")?;
    t.log("log");
    Ok(())
}

fn test_add4(t: &mut Test, _: &()) -> TestResult {
    t.fail();
    t.log("log");
    Ok(())
}

fn test_add5(t: &mut Test, _: &()) -> TestResult {
    t.fail_now()?;
    t.log("log");
    Ok(())
}

#[derive(Debug)]
struct AddCase {
    l: i64,
    r: i64,
    result: i64,
}

fn test_adder_add(t: &mut Test, _: &()) -> TestResult {
    let adder = Adder;
    let cases = [
        AddCase { l: 1, r: 2, result: 3 },
        AddCase { l: 0, r: 0, result: 0 },
        AddCase { l: 0, r: -1, result: -1 },
        // fails on purpose
        AddCase { l: 100, r: 200, result: 0 },
    ];

    for case in &cases {
        let result = adder.add(case.l, case.r);
        if result != case.result {
            t.error(format!("invalid result. case:{:?}, actual:{}", case, result));
        }
    }
    Ok(())
}

fn test_adder_add_multi(t: &mut Test, _: &()) -> TestResult {
    t.log("setup");

    t.run("Len=1", |t| {
        t.log("Len=1");
        if Adder.add_multi(&[1]) != 1 {
            t.fail();
        }
        Ok(())
    })?;

    t.run("Len=2", |t| {
        t.log("Len=2");
        if Adder.add_multi(&[1, 2]) != 3 {
            t.fail();
        }
        Ok(())
    })?;

    t.run("Len=3", |t| {
        t.log("Len=3");
        if Adder.add_multi(&[1, 2, 3]) != 6 {
            t.fail();
        }
        Ok(())
    })?;

    t.log("tear-down");
    Ok(())
}

/// Sleep per parallel case; finish order differs from registration order
const STAGGER: [(&str, &[i64], i64, u64); 3] = [
    ("Len=1", &[1], 1, 200),
    ("Len=2", &[1, 2], 3, 300),
    ("Len=3", &[1, 2, 3], 6, 100),
];

fn test_adder_add_multi2(t: &mut Test, _: &()) -> TestResult {
    t.log(format!("setup: {}", Local::now()));

    // the wrapper returns only once every parallel case has finished
    t.run("group", |t| {
        for (name, n, want, millis) in STAGGER {
            t.unit(name).parallel().run(move |t| {
                thread::sleep(Duration::from_millis(millis));
                if Adder.add_multi(n) != want {
                    t.fail();
                }
                t.log(format!("{}: {}", name, Local::now()));
                Ok(())
            })?;
        }
        Ok(())
    })?;

    t.log(format!("tear-down: {}", Local::now()));
    Ok(())
}

fn test_adder_add_multi3(t: &mut Test, _: &()) -> TestResult {
    t.run("group", |t| {
        helper_func(t, false);
        // lines logged inside are reported at this call
        t.helper(|t| helper_func(t, true));
        Ok(())
    })?;
    Ok(())
}

fn helper_func(t: &mut Test, use_helper: bool) {
    t.log(format!("use helper: {}", use_helper));
}
