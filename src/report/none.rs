//! A report that does nothing, used to suppress reporting entirely.

use crate::collector::Collector;
use crate::config::RunContext;
use crate::error::Result;
use crate::report::Report;

pub struct NoneReport;

impl Report for NoneReport {
    fn synopsis(&self) -> &'static str {
        "Does nothing. Useful to override default behavior and suppress reporting entirely"
    }

    fn write_report(&self, _collector: &Collector, _ctx: &RunContext) -> Result<()> {
        Ok(())
    }
}
