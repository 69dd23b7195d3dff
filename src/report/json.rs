//! Writes the coverage object back out as JSON.

use crate::collector::Collector;
use crate::config::{ReportConfig, RunContext};
use crate::error::Result;
use crate::report::Report;
use crate::writer::FileWriter;

/// Writes `coverage-final.json` into the report directory.
pub struct JsonReport {
    config: ReportConfig,
}

impl JsonReport {
    #[must_use]
    pub fn new(config: ReportConfig) -> Self {
        Self { config }
    }
}

impl Report for JsonReport {
    fn synopsis(&self) -> &'static str {
        "prints the coverage object as JSON to a file"
    }

    fn write_report(&self, collector: &Collector, _ctx: &RunContext) -> Result<()> {
        let json = serde_json::to_string(collector.coverage_map())?;
        let path = self.config.dir.join(&self.config.json_file);
        FileWriter::new(self.config.verbose).write_file(&path, &json)
    }
}
