//! Snapshot of a finished unit tree

use crate::log::LogLine;
use crate::unit::{Mode, Status, UnitNode};
use serde::{Serialize, Serializer};
use std::time::Duration;

/// Immutable copy of a unit and its subtree, taken after the run
#[derive(Debug, Clone, Serialize)]
pub struct UnitReport {
    pub name: String,
    pub path: String,
    pub status: Status,
    pub mode: Mode,
    /// Rejected by the selector; never ran
    pub filtered: bool,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
    /// Logical clock at body start
    pub started_at: Option<u64>,
    /// Logical clock when the body returned, before parallel children ran
    pub body_ended_at: Option<u64>,
    /// Logical clock once the unit and its subtree were terminal
    pub finished_at: Option<u64>,
    /// Number of the parent's lines captured before this unit registered
    pub slot: usize,
    pub lines: Vec<LogLine>,
    pub children: Vec<UnitReport>,
}

/// One item of a unit's flushed block
#[derive(Debug, Clone, Copy)]
pub enum Entry<'a> {
    Line(&'a LogLine),
    Unit(&'a UnitReport),
}

/// Unit counts by outcome
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl Counts {
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.skipped
    }
}

fn serialize_millis<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(elapsed.as_secs_f64() * 1000.0)
}

impl UnitReport {
    pub(crate) fn capture(node: &UnitNode) -> Self {
        let (mut report, children) = {
            let state = node.state();
            let report = UnitReport {
                name: node.name().to_string(),
                path: node.path().to_string(),
                status: state.status,
                mode: state.mode,
                filtered: state.filtered,
                elapsed: state.elapsed,
                started_at: state.started_at,
                body_ended_at: state.body_ended_at,
                finished_at: state.finished_at,
                slot: node.slot(),
                lines: state.log.lines().to_vec(),
                children: Vec::new(),
            };
            (report, state.children.clone())
        };
        report.children = children.iter().map(|child| Self::capture(child)).collect();
        report
    }

    pub fn is_failure(&self) -> bool {
        self.status.is_failure()
    }

    /// Children that actually ran, in registration order
    pub fn visible_children(&self) -> impl Iterator<Item = &UnitReport> {
        self.children.iter().filter(|child| !child.filtered)
    }

    /// The unit's block in flush order
    ///
    /// Own lines keep their relative order; each child block sits at the slot
    /// where the child was registered, regardless of when it completed.
    pub fn entries(&self) -> Vec<Entry<'_>> {
        let mut entries = Vec::with_capacity(self.lines.len() + self.children.len());
        let mut children = self.visible_children().peekable();

        for (index, line) in self.lines.iter().enumerate() {
            while let Some(child) = children.next_if(|child| child.slot <= index) {
                entries.push(Entry::Unit(child));
            }
            entries.push(Entry::Line(line));
        }
        entries.extend(children.map(Entry::Unit));
        entries
    }

    /// Look up a descendant by path relative to this unit
    pub fn find(&self, path: &str) -> Option<&UnitReport> {
        path.split('/').try_fold(self, |unit, name| {
            unit.children.iter().find(|child| child.name == name)
        })
    }

    /// Visible descendants in pre-order, with depth (0 = direct child)
    pub fn flatten(&self) -> Vec<(usize, &UnitReport)> {
        let mut out = Vec::new();
        self.collect(0, &mut out);
        out
    }

    fn collect<'a>(&'a self, depth: usize, out: &mut Vec<(usize, &'a UnitReport)>) {
        for child in self.visible_children() {
            out.push((depth, child));
            child.collect(depth + 1, out);
        }
    }

    /// Outcome counts over all visible descendants
    pub fn counts(&self) -> Counts {
        self.flatten()
            .iter()
            .fold(Counts::default(), |mut counts, (_, unit)| {
                match unit.status {
                    Status::Passed => counts.passed += 1,
                    Status::Failed | Status::FailedFast => counts.failed += 1,
                    Status::Skipped => counts.skipped += 1,
                    Status::Pending | Status::Running => {}
                }
                counts
            })
    }
}
