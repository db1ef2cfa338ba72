//! Scheduler - walk the unit tree and aggregate status
//!
//! Every unit runs in two phases. Phase 1 invokes the body on the current
//! thread; sequential children run inline and parallel children are only
//! recorded. Phase 2 starts after the body returned: the recorded parallel
//! children are spawned into a scope on the worker pool, and the scope is the
//! join barrier. Because each parallel child runs its own phase 2 before its
//! task ends, the barrier covers parallel descendants at every depth.

use crate::error::{SuiteError, TestResult};
use crate::report::UnitReport;
use crate::selector::Selector;
use crate::unit::{Deferred, Status, Test, UnitNode};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// State shared by every unit of one execution
pub(crate) struct RunContext {
    selector: Arc<Selector>,
    pool: Arc<ThreadPool>,
    clock: AtomicU64,
}

impl RunContext {
    /// Next value of the logical clock stamping starts and finishes
    pub(crate) fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn permits(&self, node: &UnitNode) -> bool {
        self.selector
            .matches_at(node.depth().saturating_sub(1), node.name())
    }
}

/// Executes unit trees on a bounded worker pool
pub struct Scheduler {
    selector: Arc<Selector>,
    pool: Arc<ThreadPool>,
}

impl Scheduler {
    /// Create a scheduler
    ///
    /// `parallel` bounds the number of parallel units running at once;
    /// `None` uses one worker per CPU.
    pub fn new(selector: Selector, parallel: Option<usize>) -> Result<Self, SuiteError> {
        let mut builder =
            ThreadPoolBuilder::new().thread_name(|index| format!("subtest-worker-{}", index));
        if let Some(threads) = parallel {
            builder = builder.num_threads(threads.max(1));
        }
        let pool = builder.build()?;

        Ok(Self {
            selector: Arc::new(selector),
            pool: Arc::new(pool),
        })
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Number of worker threads available to parallel units
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run `body` as the root unit named `name` and snapshot the finished tree
    ///
    /// The root runs on the calling thread. The returned report is taken only
    /// after every unit in the tree reached a terminal status.
    pub fn execute<'run, F>(&self, name: &str, body: F) -> UnitReport
    where
        F: FnOnce(&mut Test<'run>) -> TestResult,
    {
        let ctx = Arc::new(RunContext {
            selector: Arc::clone(&self.selector),
            pool: Arc::clone(&self.pool),
            clock: AtomicU64::new(0),
        });
        let root = UnitNode::root(name);
        let status = Self::run_unit(&ctx, Arc::clone(&root), body);
        debug!(suite = name, ?status, "tree finished");
        UnitReport::capture(&root)
    }

    pub(crate) fn run_unit<'run, F>(
        ctx: &Arc<RunContext>,
        node: Arc<UnitNode>,
        body: F,
    ) -> Status
    where
        F: FnOnce(&mut Test<'run>) -> TestResult,
    {
        node.begin(ctx.tick());
        debug!(path = node.path(), mode = ?node.mode(), "unit started");

        let mut test = Test::new(Arc::clone(&node), Arc::clone(ctx));
        match panic::catch_unwind(AssertUnwindSafe(|| body(&mut test))) {
            Ok(Ok(())) => {}
            Ok(Err(interrupt)) => node.interrupted(interrupt),
            Err(payload) => node.panicked(panic_message(&*payload)),
        }
        node.end_body(ctx.tick());

        Self::release(ctx, test.take_deferred());

        let status = node.conclude(ctx.tick());
        debug!(path = node.path(), ?status, "unit finished");
        status
    }

    /// Spawn the deferred parallel children and wait for all of them
    ///
    /// The scope outlives no borrow a deferred body holds: it returns only
    /// after every spawned unit finished.
    fn release(ctx: &Arc<RunContext>, deferred: Vec<Deferred<'_>>) {
        if deferred.is_empty() {
            return;
        }
        ctx.pool.scope(|scope| {
            for Deferred { node, body } in deferred {
                let ctx = Arc::clone(ctx);
                scope.spawn(move |_| {
                    Scheduler::run_unit(&ctx, node, body);
                });
            }
        });
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
