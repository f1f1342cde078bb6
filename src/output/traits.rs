//! Report writer trait and errors
//!
//! This module defines the trait interface for report writers and the
//! errors they can return.

use crate::crawler::CrawlReport;
use std::io::Write;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("Failed to format output: {0}")]
    Format(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Renders a finished crawl
pub trait ReportWriter {
    /// Writes the report to `out`
    ///
    /// # Arguments
    ///
    /// * `report` - The quiescent crawl report
    /// * `out` - Destination (stdout or a file)
    fn write_report(&self, report: &CrawlReport, out: &mut dyn Write) -> OutputResult<()>;
}
