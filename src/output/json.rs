//! JSON report: a pretty-printed array of records sorted by key

use crate::crawler::CrawlReport;
use crate::output::traits::{OutputResult, ReportWriter};
use std::io::Write;

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReport;

impl ReportWriter for JsonReport {
    fn write_report(&self, report: &CrawlReport, out: &mut dyn Write) -> OutputResult<()> {
        serde_json::to_writer_pretty(&mut *out, &report.records)?;
        writeln!(out)?;
        out.flush()?;
        Ok(())
    }
}
