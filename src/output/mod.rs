//! Output module for rendering crawl reports
//!
//! This module handles:
//! - Rendering the record snapshot as text or JSON
//! - Summarizing task outcomes and failures

mod json;
pub mod stats;
mod text;
mod traits;

pub use json::JsonReport;
pub use stats::ReportStats;
pub use text::TextReport;
pub use traits::{OutputError, OutputResult, ReportWriter};

use crate::crawler::CrawlReport;
use serde::Deserialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Report format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One block of lines per record
    #[default]
    Text,

    /// Pretty-printed JSON array of records
    Json,
}

/// Writes `report` to `out` in the given format
///
/// # Arguments
///
/// * `report` - The quiescent crawl report
/// * `format` - Text or JSON
/// * `out` - Destination writer
///
/// # Returns
///
/// * `Ok(())` - Report written
/// * `Err(OutputError)` - Serialization or I/O failed
pub fn write_report(
    report: &CrawlReport,
    format: OutputFormat,
    out: &mut dyn Write,
) -> OutputResult<()> {
    match format {
        OutputFormat::Text => TextReport.write_report(report, out),
        OutputFormat::Json => JsonReport.write_report(report, out),
    }
}

/// Writes the report to `path`, or to stdout when `path` is `None`
pub fn emit_report(
    report: &CrawlReport,
    format: OutputFormat,
    path: Option<&Path>,
) -> OutputResult<()> {
    match path {
        Some(path) => {
            let mut file = BufWriter::new(File::create(path)?);
            write_report(report, format, &mut file)
        }
        None => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            write_report(report, format, &mut lock)
        }
    }
}
