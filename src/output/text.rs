//! Plain-text report
//!
//! One block of `TICKER - Label: value` lines per record, followed by task
//! counts and the failure list.

use crate::crawler::CrawlReport;
use crate::output::stats::ReportStats;
use crate::output::traits::{OutputResult, ReportWriter};
use crate::store::{Horizon, Record};
use std::fmt::Display;
use std::io::Write;

/// Renders the report as plain text
#[derive(Debug, Clone, Copy, Default)]
pub struct TextReport;

fn show<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| v.to_string())
}

fn horizon_label(horizon: Horizon) -> &'static str {
    match horizon {
        Horizon::Short => "short",
        Horizon::Mid => "mid",
        Horizon::Long => "long",
    }
}

fn write_record(record: &Record, out: &mut dyn Write) -> OutputResult<()> {
    let t = &record.ticker;

    writeln!(out, "{} - {}", t, show(record.detail_url.as_deref()))?;
    writeln!(out, "{} - Company: {}", t, show(record.company_name.as_deref()))?;
    writeln!(
        out,
        "{} - Earnings Call Time: {}",
        t,
        show(record.earnings_call_time.as_deref())
    )?;
    writeln!(out, "{} - EPS Estimate: {}", t, show(record.eps_estimate.as_deref()))?;
    if let Some(date) = record.earnings_date {
        writeln!(out, "{} - Earnings Date: {}", t, date)?;
    }
    writeln!(out, "{} - Current Price: {}", t, show(record.current_price))?;
    writeln!(out, "{} - Market Cap: {}", t, show(record.market_cap.as_deref()))?;
    writeln!(out, "{} - Previous Day Volume: {}", t, show(record.prev_day_volume))?;
    writeln!(out, "{} - Avg. Volume: {}", t, show(record.avg_volume))?;
    writeln!(out, "{} - Sector: {}", t, show(record.sector.as_deref()))?;

    for horizon in Horizon::ALL {
        let label = horizon_label(horizon);
        writeln!(
            out,
            "{} - Sector Performance ({}): {}",
            t,
            label,
            show(record.sector_outlook(horizon))
        )?;
        writeln!(
            out,
            "{} - Stock Performance ({}): {}",
            t,
            label,
            show(record.stock_outlook(horizon))
        )?;
    }

    let missing = record.missing_fields();
    if missing.is_empty() {
        writeln!(out, "{} - Status: {}", t, record.status)?;
    } else {
        writeln!(
            out,
            "{} - Status: {} (missing: {})",
            t,
            record.status,
            missing.join(", ")
        )?;
    }
    Ok(())
}

impl ReportWriter for TextReport {
    fn write_report(&self, report: &CrawlReport, out: &mut dyn Write) -> OutputResult<()> {
        let stats = ReportStats::from_report(report);

        writeln!(out, "Total Stocks: {}", stats.total_records)?;
        for record in &report.records {
            writeln!(out)?;
            write_record(record, out)?;
        }

        writeln!(out)?;
        writeln!(
            out,
            "Records: {} complete, {} partial, {} failed ({:.1}% complete)",
            stats.complete,
            stats.partial,
            stats.failed,
            stats.completion_rate()
        )?;
        for (name, counts) in [
            ("listing", &report.tasks.listing),
            ("detail", &report.tasks.detail),
            ("follow-up", &report.tasks.follow_up),
        ] {
            writeln!(
                out,
                "Tasks ({}): {} done, {} failed, {} abandoned",
                name, counts.done, counts.failed, counts.abandoned
            )?;
        }
        writeln!(out, "Elapsed: {:.1}s", report.elapsed.as_secs_f64())?;
        if report.deadline_hit {
            writeln!(out, "Crawl deadline reached; remaining tasks were abandoned")?;
        }

        if !report.failures.is_empty() {
            writeln!(out)?;
            writeln!(out, "Failures ({}):", report.failures.len())?;
            for failure in &report.failures {
                writeln!(out, "  {}", failure)?;
            }
        }

        out.flush()?;
        Ok(())
    }
}
