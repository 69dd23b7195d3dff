//! In-memory representation of istanbul-style coverage data.
//!
//! This mirrors the `coverage-final.json` schema: a top-level object keyed
//! by file path, where each entry carries positional metadata maps
//! (`statementMap`, `fnMap`, `branchMap`) and matching hit-count objects
//! (`s`, `f`, `b`) plus a per-line hit map (`l`).

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// A point in a source file. Lines are 1-based, columns 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    #[serde(default, deserialize_with = "de_column")]
    pub column: u32,
}

/// Some instrumenters emit `null` or negative columns for synthesized
/// nodes; both collapse to column 0.
fn de_column<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<i64> = Option::deserialize(deserializer)?;
    Ok(value.filter(|c| *c >= 0).unwrap_or(0) as u32)
}

/// A source range with an optional ignore marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
    #[serde(default, skip_serializing_if = "is_false")]
    pub skip: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Metadata for one instrumentable function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionMeta {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    pub loc: Range,
    #[serde(default, skip_serializing_if = "is_false")]
    pub skip: bool,
}

impl FunctionMeta {
    /// Declaration line, falling back to the body location.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.line.unwrap_or(self.loc.start.line)
    }
}

/// Metadata for one branch and its outcome locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchMeta {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loc: Option<Range>,
    pub locations: Vec<Range>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub skip: bool,
}

impl BranchMeta {
    /// Branch line, falling back to `loc` and then the first location.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
            .or_else(|| self.loc.map(|l| l.start.line))
            .or_else(|| self.locations.first().map(|l| l.start.line))
            .unwrap_or(0)
    }
}

/// Coverage data for a single source file.
///
/// Invariant: every id present in a `*_map` has a matching entry in its
/// stats map (for branches, the hit array length equals `locations.len()`).
/// The maps default to empty so that files missing a dimension entirely
/// behave as "nothing to report for this kind".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileCoverage {
    #[serde(default)]
    pub path: String,
    #[serde(rename = "statementMap", default)]
    pub statement_map: BTreeMap<u32, Range>,
    #[serde(default)]
    pub s: BTreeMap<u32, u64>,
    #[serde(rename = "fnMap", default)]
    pub fn_map: BTreeMap<u32, FunctionMeta>,
    #[serde(default)]
    pub f: BTreeMap<u32, u64>,
    #[serde(rename = "branchMap", default)]
    pub branch_map: BTreeMap<u32, BranchMeta>,
    #[serde(default)]
    pub b: BTreeMap<u32, Vec<u64>>,
    #[serde(default)]
    pub l: BTreeMap<u32, u64>,
    /// Embedded source lines; takes precedence over the source store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<Vec<String>>,
}

impl FileCoverage {
    pub fn new(path: String) -> Self {
        Self {
            path,
            ..Default::default()
        }
    }
}

/// The top-level `coverage-final.json` object.
pub type CoverageMap = BTreeMap<String, FileCoverage>;

/// An inclusive `[start, end]` line range from a diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffRange {
    pub start: u32,
    pub end: u32,
}

impl DiffRange {
    #[must_use]
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Build from a JSON `[start, end, ...]` array; entries with fewer
    /// than two elements are malformed and yield `None`.
    #[must_use]
    pub fn from_pair(pair: &[u32]) -> Option<Self> {
        match pair {
            [start, end, ..] => Some(Self::new(*start, *end)),
            _ => None,
        }
    }

    #[must_use]
    pub fn contains(&self, line: u32) -> bool {
        line >= self.start && line <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_file_entry() {
        let input = r#"{
            "path": "/src/app.js",
            "statementMap": {
                "0": { "start": { "line": 1, "column": 0 }, "end": { "line": 1, "column": 29 } },
                "1": { "start": { "line": 2, "column": 0 }, "end": { "line": 4, "column": 1 }, "skip": true }
            },
            "s": { "0": 5, "1": 0 },
            "fnMap": {
                "0": { "name": "main", "line": 2, "loc": { "start": { "line": 2, "column": 0 }, "end": { "line": 4, "column": 1 } } }
            },
            "f": { "0": 0 },
            "branchMap": {
                "0": { "type": "if", "line": 3, "locations": [
                    { "start": { "line": 3, "column": 2 }, "end": { "line": 3, "column": 20 } },
                    { "start": { "line": 3, "column": 2 }, "end": { "line": 3, "column": 20 } }
                ] }
            },
            "b": { "0": [1, 0] },
            "l": { "1": 5, "2": 0 }
        }"#;
        let fc: FileCoverage = serde_json::from_str(input).unwrap();
        assert_eq!(fc.path, "/src/app.js");
        assert_eq!(fc.statement_map.len(), 2);
        assert!(fc.statement_map[&1].skip);
        assert_eq!(fc.s[&0], 5);
        assert_eq!(fc.fn_map[&0].line(), 2);
        assert_eq!(fc.branch_map[&0].kind, "if");
        assert_eq!(fc.branch_map[&0].line(), 3);
        assert_eq!(fc.b[&0], vec![1, 0]);
        assert_eq!(fc.l[&2], 0);
    }

    #[test]
    fn test_parse_missing_maps_default_empty() {
        let fc: FileCoverage = serde_json::from_str(r#"{ "path": "/a.js" }"#).unwrap();
        assert!(fc.statement_map.is_empty());
        assert!(fc.b.is_empty());
        assert!(fc.code.is_none());
    }

    #[test]
    fn test_parse_null_column() {
        let input = r#"{ "start": { "line": 1, "column": null }, "end": { "line": 1, "column": -1 } }"#;
        let range: Range = serde_json::from_str(input).unwrap();
        assert_eq!(range.start.column, 0);
        assert_eq!(range.end.column, 0);
    }

    #[test]
    fn test_serialize_round_trip() {
        let mut fc = FileCoverage::new("/src/lib.js".to_string());
        fc.l.insert(1, 3);
        fc.s.insert(0, 3);
        let json = serde_json::to_string(&fc).unwrap();
        assert!(json.contains("\"statementMap\""));
        let back: FileCoverage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fc);
    }

    #[test]
    fn test_diff_range_from_pair() {
        assert_eq!(DiffRange::from_pair(&[10, 20]), Some(DiffRange::new(10, 20)));
        assert_eq!(DiffRange::from_pair(&[7]), None);
        assert_eq!(DiffRange::from_pair(&[]), None);
    }
}
