//! Command handler functions for the covrep CLI.
//!
//! Handlers that produce terminal output return it as a `String`, making
//! them easy to test without capturing stdout.

use std::fmt::Write;
use std::path::Path;

use anyhow::{Context, Result};

use crate::collector::Collector;
use crate::config::{IncrementalMap, ReportConfig, RunContext};
use crate::model::CoverageMap;
use crate::report::{self, Format};
use crate::summary::{summarize_file_coverage, CoverageSummary, Metrics};

/// Load a `coverage-final.json` style object into a collector.
pub fn load_coverage(file: &Path) -> Result<Collector> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let map: CoverageMap = serde_json::from_str(&text)
        .with_context(|| format!("Invalid coverage JSON in {}", file.display()))?;
    let mut collector = Collector::new();
    collector.add_map(map);
    Ok(collector)
}

/// Write every requested report format. Duplicate formats are written
/// once.
pub fn cmd_report(
    collector: &Collector,
    formats: &[Format],
    config: &ReportConfig,
    incremental_map: Option<IncrementalMap>,
) -> Result<()> {
    let ctx = match incremental_map {
        Some(map) => RunContext::with_incremental_map(map),
        None => RunContext::new(),
    };

    let mut seen: Vec<Format> = Vec::new();
    for format in formats {
        if seen.contains(format) {
            continue;
        }
        seen.push(*format);
        if config.verbose {
            eprintln!("Write report: {format}");
        }
        report::create(*format, config)
            .write_report(collector, &ctx)
            .with_context(|| format!("Failed to write {format} report"))?;
    }
    Ok(())
}

/// Text summary of the metrics merged across every file.
#[must_use]
pub fn cmd_summary(collector: &Collector) -> String {
    let merged = CoverageSummary::merge_all(
        collector
            .coverage_map()
            .values()
            .map(summarize_file_coverage)
            .collect::<Vec<_>>()
            .iter(),
    );

    let mut out = String::new();
    writeln!(out, "Files:      {}", collector.files().count()).unwrap();
    writeln!(out, "Statements: {}", metric_line(&merged.statements)).unwrap();
    writeln!(out, "Branches:   {}", metric_line(&merged.branches)).unwrap();
    writeln!(out, "Functions:  {}", metric_line(&merged.functions)).unwrap();
    writeln!(out, "Lines:      {}", metric_line(&merged.lines)).unwrap();
    out
}

fn metric_line(metrics: &Metrics) -> String {
    let mut line = format!(
        "{}/{} ({}%)",
        metrics.covered, metrics.total, metrics.pct
    );
    if metrics.skipped > 0 {
        write!(line, " [{} ignored]", metrics.skipped).unwrap();
    }
    line
}

/// List every report format with its one-line synopsis.
#[must_use]
pub fn cmd_formats() -> String {
    let config = ReportConfig::default();
    let mut out = String::new();
    for format in Format::ALL {
        let synopsis = report::create(format, &config).synopsis();
        writeln!(out, "{:<12} {}", format.as_str(), synopsis).unwrap();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FileCoverage;

    fn sample_collector() -> Collector {
        let mut collector = Collector::new();
        let mut a = FileCoverage::new("/src/a.js".to_string());
        a.l.insert(1, 2);
        a.l.insert(2, 0);
        a.s.insert(0, 2);
        a.s.insert(1, 0);
        collector.add_file(a);
        let mut b = FileCoverage::new("/src/b.js".to_string());
        b.l.insert(1, 1);
        collector.add_file(b);
        collector
    }

    #[test]
    fn test_load_coverage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coverage.json");
        std::fs::write(&path, r#"{ "/src/a.js": { "l": { "1": 3 } } }"#).unwrap();
        let collector = load_coverage(&path).unwrap();
        assert_eq!(collector.file_coverage_for("/src/a.js").unwrap().l[&1], 3);
    }

    #[test]
    fn test_load_coverage_missing_file() {
        assert!(load_coverage(Path::new("/no/such/coverage.json")).is_err());
    }

    #[test]
    fn test_cmd_summary() {
        let out = cmd_summary(&sample_collector());
        assert!(out.contains("Files:      2"));
        assert!(out.contains("Lines:      2/3 (66.67%)"));
        assert!(out.contains("Statements: 1/2 (50%)"));
        assert!(out.contains("Branches:   0/0 (100%)"));
    }

    #[test]
    fn test_cmd_formats_lists_all() {
        let out = cmd_formats();
        for format in Format::ALL {
            assert!(out.contains(format.as_str()));
        }
        assert!(out.contains("lcov coverage report"));
    }

    #[test]
    fn test_cmd_report_writes_requested_formats() {
        let dir = tempfile::tempdir().unwrap();
        let config = ReportConfig {
            dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        // Duplicate lcovonly is only written once and must not error.
        cmd_report(
            &sample_collector(),
            &[Format::Lcovonly, Format::Json, Format::Lcovonly],
            &config,
            None,
        )
        .unwrap();

        assert!(dir.path().join("lcov.info").is_file());
        assert!(dir.path().join("coverage-final.json").is_file());
    }
}
