//! Per-dimension coverage metrics and the merge rules used when folding
//! file summaries up a tree.

use serde::{Deserialize, Serialize};

use crate::model::FileCoverage;

/// Counters for one dimension (statements, branches, functions, lines).
///
/// `covered` counts entities with at least one hit, `skipped` counts
/// unhit entities explicitly marked `skip`, so `covered + skipped` never
/// exceeds `total`. A dimension with nothing to cover reports 100%.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub total: u64,
    pub covered: u64,
    pub skipped: u64,
    pub pct: f64,
}

impl Metrics {
    #[must_use]
    pub fn from_counts(total: u64, covered: u64, skipped: u64) -> Self {
        let pct = if total == 0 {
            100.0
        } else {
            round2((covered + skipped) as f64 / total as f64 * 100.0)
        };
        Self {
            total,
            covered,
            skipped,
            pct,
        }
    }

    #[must_use]
    pub fn neutral() -> Self {
        Self::from_counts(0, 0, 0)
    }

    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        Self::from_counts(
            self.total + other.total,
            self.covered + other.covered,
            self.skipped + other.skipped,
        )
    }
}

/// Round to 2 decimal places, matching the displayed percentages.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// The four-dimension summary attached to files and tree nodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoverageSummary {
    pub statements: Metrics,
    pub branches: Metrics,
    pub functions: Metrics,
    pub lines: Metrics,
}

impl CoverageSummary {
    #[must_use]
    pub fn neutral() -> Self {
        Self {
            statements: Metrics::neutral(),
            branches: Metrics::neutral(),
            functions: Metrics::neutral(),
            lines: Metrics::neutral(),
        }
    }

    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            statements: self.statements.merge(&other.statements),
            branches: self.branches.merge(&other.branches),
            functions: self.functions.merge(&other.functions),
            lines: self.lines.merge(&other.lines),
        }
    }

    /// Dimension-wise merge of any number of summaries; the empty merge
    /// is the neutral summary.
    #[must_use]
    pub fn merge_all<'a, I>(summaries: I) -> Self
    where
        I: IntoIterator<Item = &'a Self>,
    {
        summaries
            .into_iter()
            .fold(Self::neutral(), |acc, s| acc.merge(s))
    }
}

/// Compute the summary for one file's coverage record.
#[must_use]
pub fn summarize_file_coverage(fc: &FileCoverage) -> CoverageSummary {
    let statements = simple_totals(fc.s.iter().map(|(id, hits)| {
        (*hits, fc.statement_map.get(id).is_some_and(|m| m.skip))
    }));
    let functions = simple_totals(
        fc.f.iter()
            .map(|(id, hits)| (*hits, fc.fn_map.get(id).is_some_and(|m| m.skip))),
    );
    let lines = simple_totals(fc.l.values().map(|hits| (*hits, false)));

    let branches = simple_totals(fc.b.iter().flat_map(|(id, arms)| {
        let meta = fc.branch_map.get(id);
        arms.iter().enumerate().map(move |(i, hits)| {
            // Skip may be flagged on the branch itself or on a location.
            let skip = meta.is_some_and(|m| {
                m.skip || m.locations.get(i).is_some_and(|loc| loc.skip)
            });
            (*hits, skip)
        })
    }));

    CoverageSummary {
        statements,
        branches,
        functions,
        lines,
    }
}

fn simple_totals<I>(entries: I) -> Metrics
where
    I: IntoIterator<Item = (u64, bool)>,
{
    let mut total = 0;
    let mut covered = 0;
    let mut skipped = 0;
    for (hits, skip) in entries {
        total += 1;
        if hits > 0 {
            covered += 1;
        } else if skip {
            skipped += 1;
        }
    }
    Metrics::from_counts(total, covered, skipped)
}
