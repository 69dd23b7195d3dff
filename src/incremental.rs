//! Reduces a file's coverage record to the entities overlapping a set of
//! changed-line ranges, for incremental ("diff only") reporting.

use std::collections::BTreeMap;

use crate::model::{DiffRange, FileCoverage, Range};

/// How one entity's line range relates to one diff range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Overlap {
    /// The entity strictly contains the diff range on both sides.
    Delete,
    /// The ranges overlap without strict containment on both sides.
    Remain,
}

/// Classify entity lines `[start, end]` against one diff range, or `None`
/// when the ranges are disjoint.
///
/// The priority order is load-bearing: `Delete` is checked before
/// `Remain` and the caller stops scanning at the first non-disjoint
/// classification. Do not simplify the predicates; they are not a clean
/// partition for all range combinations.
fn classify(start: u32, end: u32, diff: DiffRange) -> Option<Overlap> {
    if start > diff.end || end < diff.start {
        return None;
    }
    if start < diff.start && end > diff.end {
        return Some(Overlap::Delete);
    }
    Some(Overlap::Remain)
}

/// Scan the diff ranges in order; the first non-disjoint classification
/// decides the entity's fate. An entity disjoint from every range is
/// dropped, as is one without usable line metadata.
fn keep_entity(lines: Option<(u32, u32)>, diff_ranges: &[DiffRange]) -> bool {
    let Some((start, end)) = lines else {
        return false;
    };
    for diff in diff_ranges {
        match classify(start, end, *diff) {
            None => continue,
            Some(Overlap::Delete) => return false,
            Some(Overlap::Remain) => return true,
        }
    }
    false
}

fn range_lines(range: &Range) -> Option<(u32, u32)> {
    Some((range.start.line, range.end.line))
}

fn filter_maps<M: Clone>(
    map: &BTreeMap<u32, M>,
    stats: &BTreeMap<u32, impl Clone>,
    lines_of: impl Fn(&M) -> Option<(u32, u32)>,
    diff_ranges: &[DiffRange],
) -> (BTreeMap<u32, M>, Vec<u32>) {
    let mut kept_map = BTreeMap::new();
    let mut kept_ids = Vec::new();
    for (id, meta) in map {
        if keep_entity(lines_of(meta), diff_ranges) {
            kept_map.insert(*id, meta.clone());
            if stats.contains_key(id) {
                kept_ids.push(*id);
            }
        }
    }
    (kept_map, kept_ids)
}

/// Produce the reduced coverage record for `fc` against `diff_ranges`.
///
/// Statements, functions and branches are filtered; the line hit map and
/// embedded source pass through untouched. Original ids are preserved
/// for the kept subset, so the result feeds the same JSON/LCOV writers
/// as a full record.
#[must_use]
pub fn filter_file_coverage(fc: &FileCoverage, diff_ranges: &[DiffRange]) -> FileCoverage {
    let mut out = FileCoverage::new(fc.path.clone());
    out.l = fc.l.clone();
    out.code = fc.code.clone();

    let (statement_map, ids) = filter_maps(&fc.statement_map, &fc.s, range_lines, diff_ranges);
    out.statement_map = statement_map;
    out.s = ids.iter().map(|id| (*id, fc.s[id])).collect();

    let (fn_map, ids) = filter_maps(
        &fc.fn_map,
        &fc.f,
        |meta| range_lines(&meta.loc),
        diff_ranges,
    );
    out.fn_map = fn_map;
    out.f = ids.iter().map(|id| (*id, fc.f[id])).collect();

    // A branch without a `loc` range has no usable line metadata and is
    // excluded rather than guessed from its outcome locations.
    let (branch_map, ids) = filter_maps(
        &fc.branch_map,
        &fc.b,
        |meta| meta.loc.as_ref().and_then(range_lines),
        diff_ranges,
    );
    out.branch_map = branch_map;
    out.b = ids.iter().map(|id| (*id, fc.b[id].clone())).collect();

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BranchMeta, FunctionMeta, Position};

    fn range(start_line: u32, end_line: u32) -> Range {
        Range {
            start: Position {
                line: start_line,
                column: 0,
            },
            end: Position {
                line: end_line,
                column: 0,
            },
            skip: false,
        }
    }

    fn file_with_statements(spans: &[(u32, u32)]) -> FileCoverage {
        let mut fc = FileCoverage::new("/src/a.js".to_string());
        for (i, (start, end)) in spans.iter().enumerate() {
            fc.statement_map.insert(i as u32, range(*start, *end));
            fc.s.insert(i as u32, i as u64);
        }
        fc
    }

    #[test]
    fn test_classify_priority() {
        let diff = DiffRange::new(10, 20);
        assert_eq!(classify(1, 5, diff), None);
        assert_eq!(classify(25, 30, diff), None);
        assert_eq!(classify(5, 25, diff), Some(Overlap::Delete));
        assert_eq!(classify(12, 15, diff), Some(Overlap::Remain));
        assert_eq!(classify(18, 25, diff), Some(Overlap::Remain));
        assert_eq!(classify(5, 15, diff), Some(Overlap::Remain));
        assert_eq!(classify(10, 20, diff), Some(Overlap::Remain));
    }

    #[test]
    fn test_statement_totality() {
        // Remain, no-overlap, delete and partial-overlap cases.
        let fc = file_with_statements(&[(12, 15), (1, 5), (5, 25), (18, 25)]);
        let diff = [DiffRange::new(10, 20)];
        let reduced = filter_file_coverage(&fc, &diff);

        let kept: Vec<u32> = reduced.statement_map.keys().copied().collect();
        assert_eq!(kept, vec![0, 3]);
        assert_eq!(reduced.s.len(), 2);
        assert_eq!(reduced.s[&3], 3);
    }

    #[test]
    fn test_delete_stops_scanning() {
        // Entity strictly contains the first diff range; the second range
        // would classify it as remain, but delete wins.
        let fc = file_with_statements(&[(5, 25)]);
        let diff = [DiffRange::new(10, 20), DiffRange::new(5, 25)];
        let reduced = filter_file_coverage(&fc, &diff);
        assert!(reduced.statement_map.is_empty());
        assert!(reduced.s.is_empty());
    }

    #[test]
    fn test_lines_pass_through() {
        let mut fc = file_with_statements(&[(1, 1)]);
        fc.l.insert(1, 2);
        fc.l.insert(99, 0);
        let reduced = filter_file_coverage(&fc, &[DiffRange::new(10, 20)]);
        assert_eq!(reduced.l.len(), 2);
        assert!(reduced.statement_map.is_empty());
    }

    #[test]
    fn test_functions_filtered_by_loc() {
        let mut fc = FileCoverage::new("/src/a.js".to_string());
        fc.fn_map.insert(
            0,
            FunctionMeta {
                name: "inside".to_string(),
                line: Some(12),
                loc: range(12, 14),
                skip: false,
            },
        );
        fc.fn_map.insert(
            1,
            FunctionMeta {
                name: "outside".to_string(),
                line: Some(50),
                loc: range(50, 60),
                skip: false,
            },
        );
        fc.f.insert(0, 1);
        fc.f.insert(1, 9);
        let reduced = filter_file_coverage(&fc, &[DiffRange::new(10, 20)]);
        assert_eq!(reduced.fn_map.len(), 1);
        assert_eq!(reduced.fn_map[&0].name, "inside");
        assert_eq!(reduced.f[&0], 1);
        assert!(!reduced.f.contains_key(&1));
    }

    #[test]
    fn test_branch_without_loc_excluded() {
        let mut fc = FileCoverage::new("/src/a.js".to_string());
        fc.branch_map.insert(
            0,
            BranchMeta {
                kind: "if".to_string(),
                line: Some(12),
                loc: None,
                locations: vec![range(12, 12), range(12, 12)],
                skip: false,
            },
        );
        fc.branch_map.insert(
            1,
            BranchMeta {
                kind: "if".to_string(),
                line: Some(15),
                loc: Some(range(15, 16)),
                locations: vec![range(15, 15), range(16, 16)],
                skip: false,
            },
        );
        fc.b.insert(0, vec![1, 0]);
        fc.b.insert(1, vec![2, 2]);
        let reduced = filter_file_coverage(&fc, &[DiffRange::new(10, 20)]);
        assert_eq!(reduced.branch_map.len(), 1);
        assert_eq!(reduced.b[&1], vec![2, 2]);
    }

    #[test]
    fn test_idempotent() {
        let mut fc = file_with_statements(&[(12, 15), (1, 5), (5, 25), (18, 25)]);
        fc.l.insert(12, 1);
        let diff = [DiffRange::new(10, 20)];
        let once = filter_file_coverage(&fc, &diff);
        let twice = filter_file_coverage(&once, &diff);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty_diff_drops_everything_filterable() {
        let mut fc = file_with_statements(&[(1, 5)]);
        fc.l.insert(1, 1);
        let reduced = filter_file_coverage(&fc, &[]);
        assert!(reduced.statement_map.is_empty());
        assert_eq!(reduced.l.len(), 1);
    }
}
