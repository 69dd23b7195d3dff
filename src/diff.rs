//! Builds the incremental map (file path → changed-line ranges) that
//! drives diff-window dimming and the incremental coverage filter.
//!
//! Two sources are supported: a JSON file of `{path: [[start, end], ...]}`
//! ranges, and a unified diff (stdin or `git diff`) whose added lines are
//! coalesced into inclusive ranges.

use std::collections::HashMap;
use std::process::Command;

use anyhow::{Context, Result};

use crate::config::IncrementalMap;
use crate::model::DiffRange;

// ---------------------------------------------------------------------------
// Diff sources
// ---------------------------------------------------------------------------

/// A source for obtaining a unified diff.
pub trait DiffSource {
    /// Fetch the diff text.
    fn fetch_diff(&self) -> Result<String>;
}

/// Diff from stdin.
pub struct StdinDiff;

impl DiffSource for StdinDiff {
    fn fetch_diff(&self) -> Result<String> {
        std::io::read_to_string(std::io::stdin()).context("Failed to read diff from stdin")
    }
}

/// Diff from a git command (e.g., `git diff HEAD~1`).
pub struct GitDiff {
    /// Arguments to pass to `git diff`.
    pub args: String,
}

impl DiffSource for GitDiff {
    fn fetch_diff(&self) -> Result<String> {
        let diff_args: Vec<&str> = self.args.split_whitespace().collect();
        let output = Command::new("git")
            .arg("diff")
            .args(&diff_args)
            .output()
            .context("Failed to run git diff")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("git diff failed: {stderr}");
        }

        String::from_utf8(output.stdout).context("git diff output not valid UTF-8")
    }
}

// ---------------------------------------------------------------------------
// Diff parsing
// ---------------------------------------------------------------------------

/// Parse the JSON form: an object mapping file paths to arrays of
/// `[start, end]` pairs. Malformed entries (fewer than two elements)
/// are skipped, not fatal.
pub fn parse_diff_json(text: &str) -> Result<IncrementalMap> {
    let raw: HashMap<String, Vec<Vec<u32>>> =
        serde_json::from_str(text).context("Invalid diff JSON")?;
    Ok(raw
        .into_iter()
        .map(|(path, pairs)| {
            let ranges = pairs
                .iter()
                .filter_map(|pair| DiffRange::from_pair(pair))
                .collect();
            (path, ranges)
        })
        .collect())
}

/// Parse a unified diff (e.g., `git diff`) into the incremental map,
/// coalescing consecutive added lines into inclusive ranges.
pub fn parse_diff(diff_text: &str) -> IncrementalMap {
    added_lines(diff_text)
        .into_iter()
        .map(|(path, lines)| (path, to_ranges(&lines)))
        .collect()
}

/// Prepend a path prefix to all file paths in a diff result, for matching
/// against coverage data paths.
pub fn apply_path_prefix(map: IncrementalMap, prefix: &str) -> IncrementalMap {
    let prefix = prefix.trim_end_matches('/');
    map.into_iter()
        .map(|(path, ranges)| (format!("{prefix}/{path}"), ranges))
        .collect()
}

/// Coalesce sorted line numbers into inclusive ranges.
fn to_ranges(lines: &[u32]) -> Vec<DiffRange> {
    let mut ranges: Vec<DiffRange> = Vec::new();
    for &line in lines {
        match ranges.last_mut() {
            Some(range) if line == range.end + 1 => range.end = line,
            _ => ranges.push(DiffRange::new(line, line)),
        }
    }
    ranges
}

/// Return a map of file path -> list of added line numbers (in the new
/// file) from a unified diff.
fn added_lines(diff_text: &str) -> HashMap<String, Vec<u32>> {
    let mut result: HashMap<String, Vec<u32>> = HashMap::new();
    let mut current_file: Option<String> = None;
    let mut new_line_number: u32 = 0;

    for line in diff_text.lines() {
        if let Some(rest) = line.strip_prefix("+++ ") {
            if rest == "/dev/null" {
                current_file = None; // File was deleted
            } else {
                // Strip common VCS prefixes: "b/" (default git), "a/" (some tools).
                // Also handles --no-prefix diffs where no prefix is present.
                let path = rest
                    .strip_prefix("b/")
                    .or_else(|| rest.strip_prefix("a/"))
                    .unwrap_or(rest);
                current_file = Some(path.to_string());
            }
        } else if line.starts_with("@@ ") {
            // Hunk header: @@ -old_start[,old_count] +new_start[,new_count] @@
            if let Some(new_range) = parse_hunk_header(line) {
                new_line_number = new_range;
            }
        } else if let Some(ref file) = current_file {
            if line.starts_with('\\') {
                // "\ No newline at end of file" — diff metadata, not a real line
            } else if line.starts_with('+') && !line.starts_with("+++") {
                // Added line
                result
                    .entry(file.clone())
                    .or_default()
                    .push(new_line_number);
                new_line_number += 1;
            } else if line.starts_with('-') && !line.starts_with("---") {
                // Deleted line — doesn't advance new line counter
            } else {
                // Context line or other
                new_line_number += 1;
            }
        }
    }

    result
}

/// Parse "new" start line from a hunk header like "@@ -10,5 +20,8 @@"
fn parse_hunk_header(line: &str) -> Option<u32> {
    let after_at = line.strip_prefix("@@ ")?;
    let parts: Vec<&str> = after_at.split(' ').collect();
    if parts.len() < 2 {
        return None;
    }
    let new_part = parts[1].strip_prefix('+')?;
    let start_str = new_part.split(',').next()?;
    start_str.parse::<u32>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hunk_header() {
        assert_eq!(parse_hunk_header("@@ -10,5 +20,8 @@"), Some(20));
        assert_eq!(parse_hunk_header("@@ -0,0 +1,3 @@"), Some(1));
        assert_eq!(parse_hunk_header("@@ -5 +5 @@"), Some(5));
    }

    #[test]
    fn test_to_ranges_coalesces() {
        assert_eq!(
            to_ranges(&[1, 2, 3, 7, 9, 10]),
            vec![
                DiffRange::new(1, 3),
                DiffRange::new(7, 7),
                DiffRange::new(9, 10)
            ]
        );
        assert!(to_ranges(&[]).is_empty());
    }

    #[test]
    fn test_parse_diff() {
        let diff = "\
--- a/src/main.js
+++ b/src/main.js
@@ -10,3 +10,5 @@
 context
+added one
+added two
 context
+added three
";
        let result = parse_diff(diff);
        assert_eq!(result.len(), 1);
        let ranges = result.get("src/main.js").unwrap();
        assert_eq!(ranges, &[DiffRange::new(11, 12), DiffRange::new(14, 14)]);
    }

    #[test]
    fn test_parse_diff_deleted_file() {
        let diff = "\
--- a/src/old.js
+++ /dev/null
@@ -1,3 +0,0 @@
-gone
-gone
-gone
";
        assert!(parse_diff(diff).is_empty());
    }

    #[test]
    fn test_parse_diff_no_newline_marker() {
        let diff = "\
--- a/src/lib.js
+++ b/src/lib.js
@@ -1,2 +1,3 @@
 hello
+world
+end
\\ No newline at end of file
";
        let result = parse_diff(diff);
        let ranges = result.get("src/lib.js").unwrap();
        assert_eq!(ranges, &[DiffRange::new(2, 3)]);
    }

    #[test]
    fn test_parse_diff_json_skips_malformed() {
        let map =
            parse_diff_json(r#"{ "/src/a.js": [[10, 20], [], [30]], "/src/b.js": [] }"#).unwrap();
        assert_eq!(map["/src/a.js"], vec![DiffRange::new(10, 20)]);
        assert!(map["/src/b.js"].is_empty());
    }

    #[test]
    fn test_apply_path_prefix() {
        let mut map = IncrementalMap::new();
        map.insert("src/a.js".to_string(), vec![DiffRange::new(1, 2)]);
        let prefixed = apply_path_prefix(map, "/repo/");
        assert!(prefixed.contains_key("/repo/src/a.js"));
    }
}
