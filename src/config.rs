//! Report configuration and per-invocation context.
//!
//! `ReportConfig` is constructed once and passed by reference into the
//! report implementations; run-scoped data (the diff map) travels in a
//! separate `RunContext` rather than being merged into the config.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::model::DiffRange;

/// Percentage thresholds used to color-classify a metric: below `low` is
/// low, at or above `high` is high, anything between is medium.
#[derive(Debug, Clone, Copy)]
pub struct Watermark {
    pub low: f64,
    pub high: f64,
}

impl Default for Watermark {
    fn default() -> Self {
        Self {
            low: 50.0,
            high: 80.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Watermarks {
    pub statements: Watermark,
    pub lines: Watermark,
    pub functions: Watermark,
    pub branches: Watermark,
}

/// Immutable report configuration, shared by all formats in one run.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// Directory in which reports are generated.
    pub dir: PathBuf,
    /// Output file name for the lcovonly report.
    pub lcov_file: String,
    /// Output file name for the json report.
    pub json_file: String,
    pub watermarks: Watermarks,
    pub verbose: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("coverage"),
            lcov_file: "lcov.info".to_string(),
            json_file: "coverage-final.json".to_string(),
            watermarks: Watermarks::default(),
            verbose: false,
        }
    }
}

/// Mapping from file path to its changed-line ranges.
pub type IncrementalMap = HashMap<String, Vec<DiffRange>>;

/// Run-scoped data passed alongside the collector on each write.
#[derive(Default)]
pub struct RunContext {
    pub incremental_map: Option<IncrementalMap>,
}

impl RunContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_incremental_map(map: IncrementalMap) -> Self {
        Self {
            incremental_map: Some(map),
        }
    }

    /// Diff ranges for one file, if it is part of the incremental window.
    #[must_use]
    pub fn ranges_for(&self, path: &str) -> Option<&[DiffRange]> {
        self.incremental_map
            .as_ref()
            .and_then(|map| map.get(path))
            .map(Vec::as_slice)
    }
}
