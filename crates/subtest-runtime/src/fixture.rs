//! Fixture data loaded once before a suite runs
//!
//! The document format is
//!
//! ```json
//! {
//!   "test_cases": [
//!     { "l": 1, "r": 1, "result": 2 },
//!     { "id": "neg", "l": 0, "r": -1, "result": -1 }
//!   ]
//! }
//! ```
//!
//! Cases without an `id` are named `case-<index>`.

use crate::error::FixtureError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Operands and expected sum of one case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureCase {
    pub l: i64,
    pub r: i64,
    pub result: i64,
}

#[derive(Debug, Deserialize)]
struct FixtureDocument {
    test_cases: Vec<RawCase>,
}

#[derive(Debug, Deserialize)]
struct RawCase {
    #[serde(default)]
    id: Option<String>,
    #[serde(flatten)]
    case: FixtureCase,
}

/// Ordered mapping from case identifier to case
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixtureSet {
    cases: Vec<(String, FixtureCase)>,
}

impl FixtureSet {
    /// Read and parse a fixture file
    pub fn load(path: &Path) -> Result<Self, FixtureError> {
        let content = fs::read_to_string(path).map_err(|source| FixtureError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content, &path.display().to_string())
    }

    /// Parse a fixture document; `origin` names it in errors
    pub fn from_json(content: &str, origin: &str) -> Result<Self, FixtureError> {
        let document: FixtureDocument =
            serde_json::from_str(content).map_err(|source| FixtureError::Parse {
                origin: origin.to_string(),
                source,
            })?;

        let mut set = FixtureSet::default();
        for (index, raw) in document.test_cases.into_iter().enumerate() {
            let id = raw.id.unwrap_or_else(|| format!("case-{}", index));
            if set.get(&id).is_some() {
                return Err(FixtureError::DuplicateCase(id));
            }
            set.cases.push((id, raw.case));
        }
        Ok(set)
    }

    pub fn get(&self, id: &str) -> Option<&FixtureCase> {
        self.cases
            .iter()
            .find(|(case_id, _)| case_id == id)
            .map(|(_, case)| case)
    }

    /// Cases in document order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FixtureCase)> {
        self.cases.iter().map(|(id, case)| (id.as_str(), case))
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}
