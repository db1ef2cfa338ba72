//! Per-unit log capture

use serde::Serialize;
use std::fmt;
use std::panic::Location;
use std::path::Path;

/// Source location a log line is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CallSite {
    pub file: &'static str,
    pub line: u32,
}

impl CallSite {
    /// The location of the caller (through any `#[track_caller]` chain)
    #[track_caller]
    pub fn caller() -> Self {
        Location::caller().into()
    }

    /// File name without its directory, as shown in reports
    pub fn file_name(&self) -> &'static str {
        Path::new(self.file)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(self.file)
    }
}

impl From<&'static Location<'static>> for CallSite {
    fn from(location: &'static Location<'static>) -> Self {
        Self {
            file: location.file(),
            line: location.line(),
        }
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file_name(), self.line)
    }
}

/// What a captured line records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Log,
    Failure,
    Skip,
}

/// One captured line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogLine {
    pub kind: LineKind,
    /// Attributed call site; `None` for lines the harness writes itself (panics)
    pub site: Option<CallSite>,
    pub text: String,
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.site {
            Some(site) => write!(f, "{}: {}", site, self.text),
            None => f.write_str(&self.text),
        }
    }
}

/// Ordered sequence of a unit's captured lines
#[derive(Debug, Clone, Default)]
pub struct LogBuffer {
    lines: Vec<LogLine>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: LineKind, site: Option<CallSite>, text: impl Into<String>) {
        self.lines.push(LogLine {
            kind,
            site,
            text: text.into(),
        });
    }

    pub fn lines(&self) -> &[LogLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn has_failures(&self) -> bool {
        self.lines.iter().any(|line| line.kind == LineKind::Failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_preserves_call_order() {
        let mut buffer = LogBuffer::new();
        buffer.push(LineKind::Log, None, "first");
        buffer.push(LineKind::Failure, None, "second");
        buffer.push(LineKind::Log, None, "third");

        let texts: Vec<_> = buffer.lines().iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, ["first", "second", "third"]);
        assert!(buffer.has_failures());
    }

    #[test]
    fn test_call_site_display_uses_file_name() {
        let site = CallSite {
            file: "crates/subtest-cli/src/packages/basic.rs",
            line: 42,
        };
        assert_eq!(site.to_string(), "basic.rs:42");
    }

    #[test]
    fn test_call_site_caller_points_here() {
        let site = CallSite::caller();
        assert!(site.file.ends_with("log.rs"));
        assert_eq!(site.line, line!() - 2);
    }

    #[test]
    fn test_line_without_site() {
        let line = LogLine {
            kind: LineKind::Failure,
            site: None,
            text: "panicked".to_string(),
        };
        assert_eq!(line.to_string(), "panicked");
    }
}
