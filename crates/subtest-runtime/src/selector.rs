//! Name-path selection
//!
//! A selector holds one regular expression per tree depth. The expression
//! `AddMulti/Len=3` selects every top-level unit whose name contains
//! `AddMulti`, and below it every child whose name contains `Len=3`. Depths
//! beyond the last pattern are unconstrained.

use crate::error::SelectorError;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

/// Immutable path filter deciding which units execute
#[derive(Debug, Clone, Default)]
pub struct Selector {
    expression: Option<String>,
    patterns: Vec<Regex>,
}

impl Selector {
    /// A selector that permits every unit
    pub fn all() -> Self {
        Self::default()
    }

    /// Parse a '/'-delimited filter expression
    ///
    /// Slashes inside `[...]` or `(...)` and escaped slashes do not split, so
    /// `a(b/c)` is a single pattern. The empty expression permits everything.
    pub fn parse(expression: &str) -> Result<Self, SelectorError> {
        if expression.is_empty() {
            return Ok(Self::all());
        }
        let mut selector = Self::from_patterns(split_expression(expression))?;
        selector.expression = Some(expression.to_string());
        Ok(selector)
    }

    /// Build from an ordered per-depth pattern sequence
    pub fn from_patterns<I, S>(patterns: I) -> Result<Self, SelectorError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .enumerate()
            .map(|(depth, pattern)| {
                let pattern = pattern.as_ref();
                Regex::new(pattern).map_err(|source| SelectorError::InvalidPattern {
                    pattern: pattern.to_string(),
                    depth,
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            expression: None,
            patterns,
        })
    }

    /// Whether the unit at `path` (root excluded) may execute
    pub fn permits(&self, path: &str) -> bool {
        if path.is_empty() {
            return true;
        }
        path.split('/')
            .enumerate()
            .all(|(depth, name)| self.matches_at(depth, name))
    }

    /// Whether `name` matches the pattern for zero-based `depth`
    pub fn matches_at(&self, depth: usize, name: &str) -> bool {
        self.patterns
            .get(depth)
            .map_or(true, |pattern| pattern.is_match(name))
    }

    /// Number of constrained depths
    pub fn depth(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_all(&self) -> bool {
        self.patterns.is_empty()
    }

    /// The expression this selector was parsed from, if any
    pub fn expression(&self) -> Option<&str> {
        self.expression.as_deref()
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.expression {
            Some(expression) => f.write_str(expression),
            None => {
                let patterns: Vec<_> = self.patterns.iter().map(Regex::as_str).collect();
                f.write_str(&patterns.join("/"))
            }
        }
    }
}

/// Split on '/' outside of bracket expressions, groups and escapes
fn split_expression(expression: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut brackets = 0usize;
    let mut parens = 0usize;
    let mut chars = expression.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                current.push(c);
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
                continue;
            }
            '[' => brackets += 1,
            ']' => brackets = brackets.saturating_sub(1),
            '(' if brackets == 0 => parens += 1,
            ')' if brackets == 0 => parens = parens.saturating_sub(1),
            '/' if brackets == 0 && parens == 0 => {
                parts.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    parts.push(current);
    parts
}
