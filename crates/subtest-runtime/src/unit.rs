//! Test units and the handle their bodies receive
//!
//! Registration and execution are the same call: a body registers a child by
//! name through its [`Test`] handle, and a sequential child runs to completion
//! before the call returns. A child registered through
//! [`UnitBuilder::parallel`] is only recorded; it is released by the scheduler
//! once the registering body has returned.

use crate::error::{Interrupt, RegisterError, TestResult};
use crate::log::{CallSite, LineKind, LogBuffer};
use crate::scheduler::{RunContext, Scheduler};
use parking_lot::{Mutex, MutexGuard};
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

/// Lifecycle status of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Pending,
    Running,
    Passed,
    /// Recorded at least one failure but ran to completion
    Failed,
    /// Aborted its own body on a fatal failure
    FailedFast,
    Skipped,
}

impl Status {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Status::Passed | Status::Failed | Status::FailedFast | Status::Skipped
        )
    }

    pub fn is_failure(self) -> bool {
        matches!(self, Status::Failed | Status::FailedFast)
    }

    /// Short label used in reports
    pub fn label(self) -> &'static str {
        match self {
            Status::Pending => "PENDING",
            Status::Running => "RUN",
            Status::Passed => "PASS",
            Status::Failed | Status::FailedFast => "FAIL",
            Status::Skipped => "SKIP",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Execution mode of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Sequential,
    Parallel,
}

#[derive(Debug, Default)]
pub(crate) struct UnitState {
    pub(crate) mode: Mode,
    pub(crate) status: Status,
    pub(crate) failed: bool,
    pub(crate) aborted: bool,
    pub(crate) skipped: bool,
    pub(crate) filtered: bool,
    pub(crate) log: LogBuffer,
    pub(crate) children: Vec<Arc<UnitNode>>,
    pub(crate) started_at: Option<u64>,
    pub(crate) body_ended_at: Option<u64>,
    pub(crate) finished_at: Option<u64>,
    pub(crate) started: Option<Instant>,
    pub(crate) elapsed: Duration,
}

/// One node of the execution tree
///
/// The node's own body thread writes its state while it runs; the rollup in
/// [`UnitNode::conclude`] happens after every child is terminal. The mutex
/// serializes both.
#[derive(Debug)]
pub struct UnitNode {
    name: String,
    path: String,
    depth: usize,
    /// Number of the parent's log lines captured before this unit registered
    slot: usize,
    parent: Weak<UnitNode>,
    state: Mutex<UnitState>,
}

impl UnitNode {
    pub(crate) fn root(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            path: String::new(),
            depth: 0,
            slot: 0,
            parent: Weak::new(),
            state: Mutex::new(UnitState::default()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// '/'-joined names from the root (excluded) to this unit
    pub fn path(&self) -> &str {
        &self.path
    }

    /// 0 for the root, 1 for top-level units
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub(crate) fn slot(&self) -> usize {
        self.slot
    }

    pub fn parent(&self) -> Option<Arc<UnitNode>> {
        self.parent.upgrade()
    }

    pub fn status(&self) -> Status {
        self.state.lock().status
    }

    pub fn mode(&self) -> Mode {
        self.state.lock().mode
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, UnitState> {
        self.state.lock()
    }

    fn display_path(&self) -> &str {
        if self.path.is_empty() {
            &self.name
        } else {
            &self.path
        }
    }

    pub(crate) fn register_child(
        self: &Arc<Self>,
        name: &str,
    ) -> Result<Arc<Self>, RegisterError> {
        if name.is_empty() || name.contains('/') {
            return Err(RegisterError::InvalidName(name.to_string()));
        }

        let mut state = self.state.lock();
        if state.children.iter().any(|child| child.name == name) {
            return Err(RegisterError::DuplicateName {
                parent: self.display_path().to_string(),
                name: name.to_string(),
            });
        }

        let path = if self.path.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.path, name)
        };
        let child = Arc::new(Self {
            name: name.to_string(),
            path,
            depth: self.depth + 1,
            slot: state.log.len(),
            parent: Arc::downgrade(self),
            state: Mutex::new(UnitState::default()),
        });
        state.children.push(Arc::clone(&child));
        Ok(child)
    }

    pub(crate) fn record(&self, kind: LineKind, site: Option<CallSite>, text: String) {
        self.state.lock().log.push(kind, site, text);
    }

    pub(crate) fn set_parallel(&self) {
        self.state.lock().mode = Mode::Parallel;
    }

    pub(crate) fn begin(&self, tick: u64) {
        let mut state = self.state.lock();
        state.status = Status::Running;
        state.started_at = Some(tick);
        state.started = Some(Instant::now());
    }

    pub(crate) fn interrupted(&self, interrupt: Interrupt) {
        let mut state = self.state.lock();
        match interrupt {
            Interrupt::Fatal => state.aborted = true,
            Interrupt::Skip => state.skipped = true,
            Interrupt::Register(err) => {
                state.log.push(LineKind::Failure, None, err.to_string());
                state.aborted = true;
            }
        }
    }

    pub(crate) fn panicked(&self, message: String) {
        let mut state = self.state.lock();
        state
            .log
            .push(LineKind::Failure, None, format!("panicked: {}", message));
        state.aborted = true;
    }

    pub(crate) fn end_body(&self, tick: u64) {
        self.state.lock().body_ended_at = Some(tick);
    }

    /// Selector rejected this unit: it never runs and is hidden from reports
    pub(crate) fn mark_filtered(&self, tick: u64) {
        let mut state = self.state.lock();
        state.filtered = true;
        state.skipped = true;
        state.status = Status::Skipped;
        state.finished_at = Some(tick);
    }

    /// Roll up the final status once every child is terminal
    pub(crate) fn conclude(&self, tick: u64) -> Status {
        let children = self.state.lock().children.clone();
        let child_failed = children.iter().any(|child| child.status().is_failure());

        let mut state = self.state.lock();
        let status = if state.aborted {
            Status::FailedFast
        } else if state.failed || child_failed {
            Status::Failed
        } else if state.skipped {
            Status::Skipped
        } else {
            Status::Passed
        };
        state.status = status;
        state.finished_at = Some(tick);
        state.elapsed = state.started.map(|s| s.elapsed()).unwrap_or_default();
        status
    }
}

pub(crate) type ParallelBody<'run> =
    Box<dyn FnOnce(&mut Test<'run>) -> TestResult + Send + 'run>;

/// A parallel child waiting for its parent's body to return
pub(crate) struct Deferred<'run> {
    pub(crate) node: Arc<UnitNode>,
    pub(crate) body: ParallelBody<'run>,
}

/// Handle passed to a unit's body
///
/// Through it the body logs, records failures, aborts, skips, marks helper
/// scopes and registers children. `'run` is the lifetime of the data the
/// whole run may borrow, such as a suite fixture: parallel bodies can capture
/// references that live that long.
pub struct Test<'run> {
    node: Arc<UnitNode>,
    ctx: Arc<RunContext>,
    /// Call sites of the enclosing `helper` scopes, outermost first
    helper_sites: Vec<CallSite>,
    deferred: Vec<Deferred<'run>>,
}

impl<'run> Test<'run> {
    pub(crate) fn new(node: Arc<UnitNode>, ctx: Arc<RunContext>) -> Self {
        Self {
            node,
            ctx,
            helper_sites: Vec::new(),
            deferred: Vec::new(),
        }
    }

    pub(crate) fn take_deferred(&mut self) -> Vec<Deferred<'run>> {
        std::mem::take(&mut self.deferred)
    }

    pub fn name(&self) -> &str {
        self.node.name()
    }

    pub fn path(&self) -> &str {
        self.node.path()
    }

    pub fn node(&self) -> &Arc<UnitNode> {
        &self.node
    }

    /// Number of helper scopes the current statement runs inside
    pub fn helper_depth(&self) -> usize {
        self.helper_sites.len()
    }

    /// Record a log line attributed to the caller
    #[track_caller]
    pub fn log(&self, message: impl fmt::Display) {
        let site = self.attribute(CallSite::caller());
        self.node.record(LineKind::Log, Some(site), message.to_string());
    }

    /// Record a failure and keep going
    #[track_caller]
    pub fn error(&self, message: impl fmt::Display) {
        let site = self.attribute(CallSite::caller());
        self.node
            .record(LineKind::Failure, Some(site), message.to_string());
        self.fail();
    }

    /// Mark the unit failed without a message and keep going
    pub fn fail(&self) {
        self.node.state().failed = true;
    }

    /// Record a failure and abort the body: `t.fatal("reason")?`
    #[track_caller]
    pub fn fatal(&self, message: impl fmt::Display) -> TestResult {
        let site = self.attribute(CallSite::caller());
        self.node
            .record(LineKind::Failure, Some(site), message.to_string());
        self.fail_now()
    }

    /// Abort the body as failed without a message: `t.fail_now()?`
    pub fn fail_now(&self) -> TestResult {
        self.node.state().aborted = true;
        Err(Interrupt::Fatal)
    }

    /// Whether this unit, or any child that already finished, has failed
    pub fn failed(&self) -> bool {
        let children = {
            let state = self.node.state();
            if state.failed || state.aborted {
                return true;
            }
            state.children.clone()
        };
        children.iter().any(|child| child.status().is_failure())
    }

    /// Record a reason and stop the body without failing: `t.skip("reason")?`
    #[track_caller]
    pub fn skip(&self, message: impl fmt::Display) -> TestResult {
        let site = self.attribute(CallSite::caller());
        self.node.record(LineKind::Skip, Some(site), message.to_string());
        self.skip_now()
    }

    /// Stop the body without failing
    pub fn skip_now(&self) -> TestResult {
        self.node.state().skipped = true;
        Err(Interrupt::Skip)
    }

    pub fn skipped(&self) -> bool {
        self.node.state().skipped
    }

    /// Run `f` as a helper scope
    ///
    /// Every line logged while `f` runs is attributed to the call of the
    /// outermost enclosing `helper`, not to the statement that logged it.
    /// That includes lines from plain functions `f` calls and from nested
    /// helper scopes: the whole scope reports as its caller's line.
    #[track_caller]
    pub fn helper<R>(&mut self, f: impl FnOnce(&mut Test<'run>) -> R) -> R {
        self.helper_sites.push(CallSite::caller());
        let result = f(self);
        self.helper_sites.pop();
        result
    }

    fn attribute(&self, site: CallSite) -> CallSite {
        self.helper_sites.first().copied().unwrap_or(site)
    }

    /// Register a sequential child and run it to completion
    ///
    /// Returns the child's terminal status, `Skipped` if the selector
    /// rejected it.
    pub fn run<F>(&mut self, name: &str, body: F) -> Result<Status, RegisterError>
    where
        F: FnOnce(&mut Test<'run>) -> TestResult,
    {
        self.unit(name).run(body)
    }

    /// Start registering a child; call [`UnitBuilder::parallel`] to defer it
    pub fn unit(&mut self, name: &str) -> UnitBuilder<'_, 'run> {
        UnitBuilder {
            parent: self,
            name: name.to_string(),
        }
    }

    /// Register the child and apply the selector. `None` means filtered out.
    fn admit(&mut self, name: &str) -> Result<Option<Arc<UnitNode>>, RegisterError> {
        let node = self.node.register_child(name)?;
        if self.ctx.permits(&node) {
            Ok(Some(node))
        } else {
            tracing::trace!(path = node.path(), "unit filtered out");
            node.mark_filtered(self.ctx.tick());
            Ok(None)
        }
    }
}

impl fmt::Debug for Test<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Test")
            .field("path", &self.node.path())
            .field("helper_depth", &self.helper_depth())
            .field("deferred", &self.deferred.len())
            .finish()
    }
}

/// A child being registered in sequential mode
pub struct UnitBuilder<'t, 'run> {
    parent: &'t mut Test<'run>,
    name: String,
}

impl<'t, 'run> UnitBuilder<'t, 'run> {
    /// Mark the child parallel. Its body will start once the registering body
    /// has returned, concurrently with its parallel siblings.
    pub fn parallel(self) -> ParallelBuilder<'t, 'run> {
        ParallelBuilder {
            parent: self.parent,
            name: self.name,
        }
    }

    pub fn run<F>(self, body: F) -> Result<Status, RegisterError>
    where
        F: FnOnce(&mut Test<'run>) -> TestResult,
    {
        let Some(node) = self.parent.admit(&self.name)? else {
            return Ok(Status::Skipped);
        };
        let ctx = Arc::clone(&self.parent.ctx);
        Ok(Scheduler::run_unit(&ctx, node, body))
    }
}

/// A child being registered in parallel mode
pub struct ParallelBuilder<'t, 'run> {
    parent: &'t mut Test<'run>,
    name: String,
}

impl<'t, 'run> ParallelBuilder<'t, 'run> {
    /// Record the child; returns `Pending` (or `Skipped` if filtered out)
    ///
    /// The body may borrow anything that outlives the run.
    pub fn run<F>(self, body: F) -> Result<Status, RegisterError>
    where
        F: FnOnce(&mut Test<'run>) -> TestResult + Send + 'run,
    {
        let Some(node) = self.parent.admit(&self.name)? else {
            return Ok(Status::Skipped);
        };
        node.set_parallel();
        self.parent.deferred.push(Deferred {
            node,
            body: Box::new(body),
        });
        Ok(Status::Pending)
    }
}
