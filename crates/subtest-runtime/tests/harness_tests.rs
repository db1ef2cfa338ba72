//! Execution-tree tests: registration, status rollup, ordering and log flush

use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use subtest_runtime::{
    Entry, Interrupt, LineKind, Mode, RegisterError, Scheduler, Selector, Status, Test, UnitReport,
};

fn scheduler() -> Scheduler {
    Scheduler::new(Selector::all(), Some(4)).unwrap()
}

fn texts(unit: &UnitReport) -> Vec<&str> {
    unit.lines.iter().map(|line| line.text.as_str()).collect()
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_single_passing_child() {
    let report = scheduler().execute("root", |t| {
        t.run("Len=1", |t| {
            t.log("Len=1");
            Ok(())
        })?;
        Ok(())
    });

    assert_eq!(report.find("Len=1").unwrap().status, Status::Passed);
    assert_eq!(report.status, Status::Passed);
}

#[test]
fn test_error_keeps_running() {
    let report = scheduler().execute("root", |t| {
        t.run("Len=1", |t| {
            t.error("x");
            t.log("after");
            Ok(())
        })?;
        Ok(())
    });

    let unit = report.find("Len=1").unwrap();
    assert_eq!(unit.status, Status::Failed);
    assert_eq!(texts(unit), ["x", "after"]);
    assert_eq!(unit.lines[0].kind, LineKind::Failure);
    assert_eq!(unit.lines[1].kind, LineKind::Log);
    assert_eq!(report.status, Status::Failed);
}

#[test]
fn test_fatal_stops_body() {
    let reached = AtomicBool::new(false);
    let report = scheduler().execute("root", |t| {
        t.run("Len=1", |t| {
            t.fatal("x")?;
            reached.store(true, Ordering::SeqCst);
            t.log("unreachable");
            Ok(())
        })?;
        Ok(())
    });

    let unit = report.find("Len=1").unwrap();
    assert!(!reached.load(Ordering::SeqCst));
    assert_eq!(unit.status, Status::FailedFast);
    assert_eq!(texts(unit), ["x"]);
    assert_eq!(report.status, Status::Failed);
}

#[test]
fn test_fail_now_without_message() {
    let report = scheduler().execute("root", |t| {
        t.run("silent", |t| {
            t.fail_now()?;
            t.log("unreachable");
            Ok(())
        })?;
        Ok(())
    });

    let unit = report.find("silent").unwrap();
    assert_eq!(unit.status, Status::FailedFast);
    assert!(unit.lines.is_empty());
}

#[test]
fn test_fail_without_message_continues() {
    let report = scheduler().execute("root", |t| {
        t.run("quiet", |t| {
            t.fail();
            t.log("log");
            Ok(())
        })?;
        Ok(())
    });

    let unit = report.find("quiet").unwrap();
    assert_eq!(unit.status, Status::Failed);
    assert_eq!(texts(unit), ["log"]);
}

#[test]
fn test_parallel_children_flush_in_registration_order() {
    let report = scheduler().execute("root", |t| {
        t.log("setup");
        t.run("group", |t| {
            for (name, delay) in [("Len=1", 60), ("Len=2", 90), ("Len=3", 20)] {
                let status = t.unit(name).parallel().run(move |t| {
                    thread::sleep(Duration::from_millis(delay));
                    t.log(name);
                    Ok(())
                })?;
                assert_eq!(status, Status::Pending);
            }
            Ok(())
        })?;
        t.log("tear-down");
        Ok(())
    });

    let group = report.find("group").unwrap();
    assert_eq!(group.status, Status::Passed);

    let names: Vec<_> = group.visible_children().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["Len=1", "Len=2", "Len=3"]);

    let group_end = group.body_ended_at.unwrap();
    let group_finish = group.finished_at.unwrap();
    for child in &group.children {
        assert_eq!(child.mode, Mode::Parallel);
        assert!(child.started_at.unwrap() > group_end, "{} started early", child.name);
        assert!(child.finished_at.unwrap() < group_finish, "{} outlived group", child.name);
    }

    // Root: own lines around the group block, in call order
    let order: Vec<_> = report
        .entries()
        .iter()
        .map(|entry| match entry {
            Entry::Line(line) => line.text.clone(),
            Entry::Unit(unit) => format!("[{}]", unit.name),
        })
        .collect();
    assert_eq!(order, ["setup", "[group]", "tear-down"]);
}

// ============================================================================
// Ordering properties
// ============================================================================

#[test]
fn test_sequential_siblings_complete_in_order() {
    let report = scheduler().execute("root", |t| {
        for name in ["a", "b", "c", "d"] {
            t.run(name, |t| {
                thread::sleep(Duration::from_millis(5));
                t.log(name);
                Ok(())
            })?;
        }
        Ok(())
    });

    let children = &report.children;
    for pair in children.windows(2) {
        assert!(pair[0].finished_at.unwrap() < pair[1].started_at.unwrap());
    }
}

#[test]
fn test_sequential_child_runs_before_registration_returns() {
    let report = scheduler().execute("root", |t| {
        let status = t.run("inline", |_| Ok(()))?;
        assert_eq!(status, Status::Passed);
        t.log("after inline");
        Ok(())
    });
    assert_eq!(report.status, Status::Passed);
}

#[test]
fn test_parallel_body_waits_for_parent_body() {
    let parent_done = Arc::new(AtomicBool::new(false));
    let observed = Arc::new(AtomicBool::new(false));

    let flag = Arc::clone(&parent_done);
    let seen = Arc::clone(&observed);
    let report = scheduler().execute("root", move |t| {
        t.run("parent", move |t| {
            let flag_in_child = Arc::clone(&flag);
            t.unit("child").parallel().run(move |_| {
                seen.store(flag_in_child.load(Ordering::SeqCst), Ordering::SeqCst);
                Ok(())
            })?;
            thread::sleep(Duration::from_millis(20));
            flag.store(true, Ordering::SeqCst);
            Ok(())
        })?;
        Ok(())
    });

    assert!(observed.load(Ordering::SeqCst));
    assert_eq!(report.status, Status::Passed);
}

#[test]
fn test_barrier_is_transitive() {
    let report = scheduler().execute("root", |t| {
        t.run("wrapper", |t| {
            t.unit("outer").parallel().run(|t| {
                t.unit("inner").parallel().run(|t| {
                    thread::sleep(Duration::from_millis(40));
                    t.log("deep");
                    Ok(())
                })?;
                Ok(())
            })?;
            Ok(())
        })?;
        Ok(())
    });

    let wrapper = report.find("wrapper").unwrap();
    let outer = report.find("wrapper/outer").unwrap();
    let inner = report.find("wrapper/outer/inner").unwrap();
    assert!(inner.finished_at.unwrap() < outer.finished_at.unwrap());
    assert!(outer.finished_at.unwrap() < wrapper.finished_at.unwrap());
    assert_eq!(inner.path, "wrapper/outer/inner");
}

#[test]
fn test_parallel_failure_rolls_up_without_cancelling_siblings() {
    let finished = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&finished);

    let report = scheduler().execute("root", move |t| {
        t.run("group", move |t| {
            t.unit("bad").parallel().run(|t| t.fatal("boom"))?;
            for name in ["ok1", "ok2"] {
                let counter = Arc::clone(&counter);
                t.unit(name).parallel().run(move |_| {
                    thread::sleep(Duration::from_millis(10));
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })?;
            }
            Ok(())
        })?;
        Ok(())
    });

    assert_eq!(finished.load(Ordering::SeqCst), 2);
    assert_eq!(report.find("group/bad").unwrap().status, Status::FailedFast);
    assert_eq!(report.find("group/ok1").unwrap().status, Status::Passed);
    assert_eq!(report.find("group").unwrap().status, Status::Failed);
    assert_eq!(report.status, Status::Failed);
}

#[test]
fn test_parallel_with_single_worker_completes() {
    let scheduler = Scheduler::new(Selector::all(), Some(1)).unwrap();
    let report = scheduler.execute("root", |t| {
        for name in ["p1", "p2", "p3"] {
            t.unit(name).parallel().run(move |t| {
                t.run("nested", |t| {
                    t.log(name);
                    Ok(())
                })?;
                Ok(())
            })?;
        }
        Ok(())
    });

    assert_eq!(report.counts().passed, 6);
    assert_eq!(report.status, Status::Passed);
}

#[test]
fn test_parallel_siblings_overlap() {
    // each body waits for all three to start
    let arrived = AtomicUsize::new(0);
    let scheduler = Scheduler::new(Selector::all(), Some(3)).unwrap();
    let report = scheduler.execute("root", |t| {
        for name in ["a", "b", "c"] {
            let arrived = &arrived;
            t.unit(name).parallel().run(move |t| {
                arrived.fetch_add(1, Ordering::SeqCst);
                let deadline = Instant::now() + Duration::from_secs(5);
                while arrived.load(Ordering::SeqCst) < 3 {
                    if Instant::now() > deadline {
                        return t.fatal("siblings did not overlap");
                    }
                    thread::yield_now();
                }
                Ok(())
            })?;
        }
        Ok(())
    });

    assert_eq!(report.counts().passed, 3);
    assert_eq!(report.status, Status::Passed);
}

#[test]
fn test_parallel_bodies_borrow_run_data() {
    let cases = vec![(1, 1, 2), (0, -1, -1), (1, -3, -2)];
    let checked = AtomicUsize::new(0);
    let report = scheduler().execute("root", |t| {
        for (index, case) in cases.iter().enumerate() {
            let checked = &checked;
            t.unit(&format!("case-{}", index))
                .parallel()
                .run(move |t| {
                    let (l, r, want) = *case;
                    if l + r != want {
                        t.error(format!("{} + {} != {}", l, r, want));
                    }
                    checked.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })?;
        }
        Ok(())
    });

    assert_eq!(checked.load(Ordering::SeqCst), cases.len());
    assert_eq!(report.counts().passed, 3);
}

// ============================================================================
// Registration errors
// ============================================================================

#[test]
fn test_duplicate_sibling_name() {
    let report = scheduler().execute("root", |t| {
        t.run("a", |_| Ok(()))?;
        let err = t.run("a", |_| Ok(())).unwrap_err();
        assert_eq!(
            err,
            RegisterError::DuplicateName {
                parent: "root".to_string(),
                name: "a".to_string(),
            }
        );
        Ok(())
    });
    assert_eq!(report.children.len(), 1);
    assert_eq!(report.status, Status::Passed);
}

#[test]
fn test_same_name_at_different_positions() {
    let report = scheduler().execute("root", |t| {
        for parent in ["a", "b"] {
            t.run(parent, |t| {
                t.run("x", |_| Ok(()))?;
                Ok(())
            })?;
        }
        Ok(())
    });

    assert_eq!(report.find("a/x").unwrap().status, Status::Passed);
    assert_eq!(report.find("b/x").unwrap().status, Status::Passed);
}

#[test]
fn test_duplicate_parallel_name_detected_at_registration() {
    scheduler().execute("root", |t| {
        t.unit("p").parallel().run(|_| Ok(()))?;
        let err = t.unit("p").parallel().run(|_| Ok(())).unwrap_err();
        assert!(matches!(err, RegisterError::DuplicateName { .. }));
        Ok(())
    });
}

#[test]
fn test_propagated_registration_error_fails_registering_unit() {
    let report = scheduler().execute("root", |t| {
        t.run("outer", |t| {
            t.run("dup", |_| Ok(()))?;
            t.run("dup", |_| Ok(()))?;
            t.log("unreachable");
            Ok(())
        })?;
        Ok(())
    });

    let outer = report.find("outer").unwrap();
    assert_eq!(outer.status, Status::FailedFast);
    assert_eq!(outer.lines.len(), 1);
    assert!(outer.lines[0].text.contains("duplicate test name 'dup'"));
}

#[test]
fn test_invalid_names() {
    scheduler().execute("root", |t| {
        assert!(matches!(
            t.run("a/b", |_| Ok(())),
            Err(RegisterError::InvalidName(_))
        ));
        assert!(matches!(
            t.run("", |_| Ok(())),
            Err(RegisterError::InvalidName(_))
        ));
        Ok(())
    });
}

// ============================================================================
// Skips, failures seen from the parent
// ============================================================================

#[test]
fn test_skip_marks_skipped() {
    let report = scheduler().execute("root", |t| {
        t.run("later", |t| {
            t.skip("not today")?;
            t.log("unreachable");
            Ok(())
        })?;
        Ok(())
    });

    let unit = report.find("later").unwrap();
    assert_eq!(unit.status, Status::Skipped);
    assert_eq!(unit.lines[0].kind, LineKind::Skip);
    assert_eq!(report.status, Status::Passed);
}

#[test]
fn test_skip_after_error_is_failure() {
    let report = scheduler().execute("root", |t| {
        t.run("mixed", |t| {
            t.error("bad");
            t.skip_now()
        })?;
        Ok(())
    });
    assert_eq!(report.find("mixed").unwrap().status, Status::Failed);
}

#[test]
fn test_parent_sees_failed_child() {
    scheduler().execute("root", |t| {
        assert!(!t.failed());
        let status = t.run("bad", |t| {
            t.error("no");
            Ok(())
        })?;
        assert_eq!(status, Status::Failed);
        assert!(t.failed());
        Ok(())
    });
}

#[test]
fn test_manual_interrupt_is_fatal() {
    let report = scheduler().execute("root", |t| {
        t.run("manual", |_| Err(Interrupt::Fatal))?;
        Ok(())
    });
    assert_eq!(report.find("manual").unwrap().status, Status::FailedFast);
}

// ============================================================================
// Helper attribution
// ============================================================================

fn log_use_helper(t: &mut Test, use_helper: bool) {
    t.log(format!("use helper: {}", use_helper));
}

#[test]
fn test_helper_attributes_to_call_site() {
    let mut helper_line = 0;
    let report = scheduler().execute("root", |t| {
        t.run("group", |t| {
            log_use_helper(t, false);
            helper_line = line!() + 1;
            t.helper(|t| log_use_helper(t, true));
            Ok(())
        })?;
        Ok(())
    });

    let group = report.find("group").unwrap();
    let plain = group.lines[0].site.unwrap();
    let helped = group.lines[1].site.unwrap();
    assert_eq!(helped.line, helper_line);
    assert_ne!(plain.line, helped.line);
    assert!(plain.file.ends_with("harness_tests.rs"));
}

#[test]
fn test_nested_helpers_walk_to_outermost_call() {
    let mut outer_line = 0;
    let report = scheduler().execute("root", |t| {
        t.run("nested", |t| {
            assert_eq!(t.helper_depth(), 0);
            outer_line = line!() + 1;
            t.helper(|t| {
                t.helper(|t| {
                    assert_eq!(t.helper_depth(), 2);
                    t.error("deep failure");
                })
            });
            assert_eq!(t.helper_depth(), 0);
            Ok(())
        })?;
        Ok(())
    });

    let unit = report.find("nested").unwrap();
    assert_eq!(unit.lines[0].site.unwrap().line, outer_line);
    assert_eq!(unit.status, Status::Failed);
}

// ============================================================================
// Selection
// ============================================================================

#[test]
fn test_selector_filters_units() {
    let ran = Arc::new(AtomicUsize::new(0));
    let selector = Selector::parse("AddMulti$/Len=3").unwrap();
    let scheduler = Scheduler::new(selector, Some(2)).unwrap();

    let counter = Arc::clone(&ran);
    let report = scheduler.execute("root", move |t| {
        t.run("TestAdder_AddMulti", |t| {
            t.log("setup");
            for name in ["Len=1", "Len=2", "Len=3"] {
                let counter = Arc::clone(&counter);
                t.run(name, move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })?;
            }
            t.log("tear-down");
            Ok(())
        })?;
        let status = t.run("TestAdd", |_| panic!("filtered unit ran"))?;
        assert_eq!(status, Status::Skipped);
        Ok(())
    });

    assert_eq!(ran.load(Ordering::SeqCst), 1);
    let visible: Vec<_> = report
        .flatten()
        .iter()
        .map(|(depth, unit)| (*depth, unit.path.clone()))
        .collect();
    assert_eq!(
        visible,
        [
            (0, "TestAdder_AddMulti".to_string()),
            (1, "TestAdder_AddMulti/Len=3".to_string()),
        ]
    );
    assert!(report.find("TestAdd").unwrap().filtered);
    assert_eq!(report.status, Status::Passed);
}
