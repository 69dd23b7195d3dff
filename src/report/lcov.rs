//! LCOV record output, consumable by the lcov toolchain.
//!
//! Key records:
//!   TN:<test name>
//!   SF:<source file path>
//!   FN:<line>,<function name>
//!   FNDA:<execution count>,<function name>
//!   FNF/FNH:<functions found/hit>
//!   DA:<line>,<execution count>
//!   LF/LH:<lines found/hit>
//!   BRDA:<line>,<block>,<branch>,<taken>
//!   BRF/BRH:<branches found/hit>
//!   end_of_record

use std::fmt::Write;

use crate::collector::Collector;
use crate::config::{ReportConfig, RunContext};
use crate::error::Result;
use crate::model::FileCoverage;
use crate::report::Report;
use crate::summary::summarize_file_coverage;
use crate::writer::FileWriter;

/// Format one file's coverage as an LCOV record.
#[must_use]
pub fn format_file_coverage(fc: &FileCoverage) -> String {
    let summary = summarize_file_coverage(fc);
    let mut out = String::new();

    out.push_str("TN:\n"); // no test name
    writeln!(out, "SF:{}", fc.path).unwrap();

    for (id, meta) in &fc.fn_map {
        if fc.f.contains_key(id) {
            writeln!(out, "FN:{},{}", meta.line(), meta.name).unwrap();
        }
    }
    writeln!(out, "FNF:{}", summary.functions.total).unwrap();
    writeln!(out, "FNH:{}", summary.functions.covered).unwrap();

    for (id, hits) in &fc.f {
        if let Some(meta) = fc.fn_map.get(id) {
            writeln!(out, "FNDA:{},{}", hits, meta.name).unwrap();
        }
    }

    for (line, hits) in &fc.l {
        writeln!(out, "DA:{line},{hits}").unwrap();
    }
    writeln!(out, "LF:{}", summary.lines.total).unwrap();
    writeln!(out, "LH:{}", summary.lines.covered).unwrap();

    for (id, arms) in &fc.b {
        if let Some(meta) = fc.branch_map.get(id) {
            let line = meta.line();
            for (i, hits) in arms.iter().enumerate() {
                writeln!(out, "BRDA:{line},{id},{i},{hits}").unwrap();
            }
        }
    }
    writeln!(out, "BRF:{}", summary.branches.total).unwrap();
    writeln!(out, "BRH:{}", summary.branches.covered).unwrap();
    out.push_str("end_of_record\n");

    out
}

fn format_all(collector: &Collector) -> String {
    collector
        .coverage_map()
        .values()
        .map(format_file_coverage)
        .collect()
}

/// Writes an `lcov.info` file into the report directory.
pub struct LcovOnlyReport {
    config: ReportConfig,
}

impl LcovOnlyReport {
    #[must_use]
    pub fn new(config: ReportConfig) -> Self {
        Self { config }
    }
}

impl Report for LcovOnlyReport {
    fn synopsis(&self) -> &'static str {
        "lcov coverage report that can be consumed by the lcov tool"
    }

    fn write_report(&self, collector: &Collector, _ctx: &RunContext) -> Result<()> {
        let path = self.config.dir.join(&self.config.lcov_file);
        FileWriter::new(self.config.verbose).write_file(&path, &format_all(collector))
    }
}

/// Prints LCOV records to standard out.
pub struct TextLcovReport;

impl Report for TextLcovReport {
    fn synopsis(&self) -> &'static str {
        "lcov coverage report printed to standard out"
    }

    fn write_report(&self, collector: &Collector, _ctx: &RunContext) -> Result<()> {
        print!("{}", format_all(collector));
        Ok(())
    }
}
