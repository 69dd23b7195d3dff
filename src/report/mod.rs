//! Report formats and their registry.

pub mod html;
pub mod json;
pub mod lcov;
pub mod none;

use std::str::FromStr;

use crate::collector::Collector;
use crate::config::{ReportConfig, RunContext};
use crate::error::{CovrepError, Result};

/// Every report format implements this trait.
pub trait Report {
    /// One-line description shown by `covrep formats`.
    fn synopsis(&self) -> &'static str;

    /// Generate the report for the collected coverage data.
    fn write_report(&self, collector: &Collector, ctx: &RunContext) -> Result<()>;
}

/// The supported report formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Html,
    Lcovonly,
    TextLcov,
    Json,
    None,
}

impl Format {
    pub const ALL: [Format; 5] = [
        Format::Html,
        Format::Lcovonly,
        Format::TextLcov,
        Format::Json,
        Format::None,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Html => "html",
            Format::Lcovonly => "lcovonly",
            Format::TextLcov => "text-lcov",
            Format::Json => "json",
            Format::None => "none",
        }
    }
}

impl FromStr for Format {
    type Err = CovrepError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "html" => Ok(Format::Html),
            "lcovonly" | "lcov" => Ok(Format::Lcovonly),
            "text-lcov" => Ok(Format::TextLcov),
            "json" => Ok(Format::Json),
            "none" => Ok(Format::None),
            other => Err(CovrepError::InvalidFormat(other.to_string())),
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Instantiate the report implementation for a format.
#[must_use]
pub fn create(format: Format, config: &ReportConfig) -> Box<dyn Report> {
    match format {
        Format::Html => Box::new(html::HtmlReport::new(config.clone())),
        Format::Lcovonly => Box::new(lcov::LcovOnlyReport::new(config.clone())),
        Format::TextLcov => Box::new(lcov::TextLcovReport),
        Format::Json => Box::new(json::JsonReport::new(config.clone())),
        Format::None => Box::new(none::NoneReport),
    }
}
