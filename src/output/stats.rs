//! Summary statistics over a crawl report

use crate::crawler::CrawlReport;
use crate::store::RecordStatus;
use std::collections::BTreeMap;

/// Crawl statistics summary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportStats {
    /// Number of records in the snapshot
    pub total_records: usize,

    pub complete: usize,
    pub partial: usize,
    pub failed: usize,

    /// Failure counts by kind, including correlation failures
    pub failures_by_kind: BTreeMap<&'static str, usize>,

    /// Tasks that reached a terminal state
    pub total_tasks: usize,
}

impl ReportStats {
    pub fn from_report(report: &CrawlReport) -> Self {
        let mut stats = Self {
            total_records: report.records.len(),
            total_tasks: report.tasks.total(),
            ..Self::default()
        };

        for record in &report.records {
            match record.status {
                RecordStatus::Complete => stats.complete += 1,
                RecordStatus::Partial => stats.partial += 1,
                RecordStatus::Failed => stats.failed += 1,
            }
        }

        for failure in &report.failures {
            *stats.failures_by_kind.entry(failure.kind.as_str()).or_insert(0) += 1;
        }

        stats
    }

    /// Share of records with every expected field, as a percentage
    pub fn completion_rate(&self) -> f64 {
        if self.total_records == 0 {
            return 0.0;
        }
        (self.complete as f64 / self.total_records as f64) * 100.0
    }
}
