use crate::state::TaskFailure;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::fmt;

/// A trend direction reported by the insights store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum Direction {
    Bullish,
    Bearish,
    Neutral,
    Other(String),
}

impl Direction {
    /// Parses a direction, ignoring case and surrounding whitespace
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.to_ascii_lowercase().as_str() {
            "bullish" => Self::Bullish,
            "bearish" => Self::Bearish,
            "neutral" => Self::Neutral,
            _ => Self::Other(raw.to_string()),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bullish => f.write_str("Bullish"),
            Self::Bearish => f.write_str("Bearish"),
            Self::Neutral => f.write_str("Neutral"),
            Self::Other(raw) => f.write_str(raw),
        }
    }
}

impl From<Direction> for String {
    fn from(direction: Direction) -> Self {
        direction.to_string()
    }
}

/// Outlook horizon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Horizon {
    Short,
    Mid,
    Long,
}

impl Horizon {
    pub const ALL: [Horizon; 3] = [Horizon::Short, Horizon::Mid, Horizon::Long];

    /// Key of this horizon's object under `technicalEvents`
    pub fn outlook_key(&self) -> &'static str {
        match self {
            Self::Short => "shortTermOutlook",
            Self::Mid => "intermediateTermOutlook",
            Self::Long => "longTermOutlook",
        }
    }
}

/// One field value to merge into a record
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    DetailUrl(String),
    CompanyName(String),
    EarningsCallTime(String),
    EpsEstimate(String),
    EarningsDate(NaiveDate),
    CurrentPrice(f64),
    MarketCap(String),
    PrevDayVolume(u64),
    AvgVolume(u64),
    CrawledAt(DateTime<Utc>),
    Sector(String),
    StockOutlook(Horizon, Direction),
    SectorOutlook(Horizon, Direction),
}

/// Overall state of a record after the crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// Every expected field is set and nothing failed
    Complete,

    /// Some expected field is unset
    Partial,

    /// At least one task for this key failed
    Failed,
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Complete => "complete",
            Self::Partial => "partial",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Everything harvested about one ticker
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub ticker: String,
    pub detail_url: Option<String>,
    pub company_name: Option<String>,
    pub earnings_call_time: Option<String>,
    pub eps_estimate: Option<String>,
    pub earnings_date: Option<NaiveDate>,
    pub current_price: Option<f64>,
    pub market_cap: Option<String>,
    pub prev_day_volume: Option<u64>,
    pub avg_volume: Option<u64>,
    pub crawled_at: Option<DateTime<Utc>>,
    pub sector: Option<String>,
    pub stock_outlook_short: Option<Direction>,
    pub stock_outlook_mid: Option<Direction>,
    pub stock_outlook_long: Option<Direction>,
    pub sector_outlook_short: Option<Direction>,
    pub sector_outlook_mid: Option<Direction>,
    pub sector_outlook_long: Option<Direction>,
    pub status: RecordStatus,
    pub issues: Vec<TaskFailure>,
}

impl Record {
    /// Creates an empty record for `ticker`
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            detail_url: None,
            company_name: None,
            earnings_call_time: None,
            eps_estimate: None,
            earnings_date: None,
            current_price: None,
            market_cap: None,
            prev_day_volume: None,
            avg_volume: None,
            crawled_at: None,
            sector: None,
            stock_outlook_short: None,
            stock_outlook_mid: None,
            stock_outlook_long: None,
            sector_outlook_short: None,
            sector_outlook_mid: None,
            sector_outlook_long: None,
            status: RecordStatus::Partial,
            issues: Vec::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.ticker
    }

    /// Sets one field, overwriting any earlier value
    pub fn apply(&mut self, field: Field) {
        match field {
            Field::DetailUrl(v) => self.detail_url = Some(v),
            Field::CompanyName(v) => self.company_name = Some(v),
            Field::EarningsCallTime(v) => self.earnings_call_time = Some(v),
            Field::EpsEstimate(v) => self.eps_estimate = Some(v),
            Field::EarningsDate(v) => self.earnings_date = Some(v),
            Field::CurrentPrice(v) => self.current_price = Some(v),
            Field::MarketCap(v) => self.market_cap = Some(v),
            Field::PrevDayVolume(v) => self.prev_day_volume = Some(v),
            Field::AvgVolume(v) => self.avg_volume = Some(v),
            Field::CrawledAt(v) => self.crawled_at = Some(v),
            Field::Sector(v) => self.sector = Some(v),
            Field::StockOutlook(horizon, v) => *self.stock_outlook_mut(horizon) = Some(v),
            Field::SectorOutlook(horizon, v) => *self.sector_outlook_mut(horizon) = Some(v),
        }
        self.refresh_status();
    }

    /// Attaches a task failure to this record
    pub fn push_issue(&mut self, failure: TaskFailure) {
        self.issues.push(failure);
        self.refresh_status();
    }

    pub fn stock_outlook(&self, horizon: Horizon) -> Option<&Direction> {
        match horizon {
            Horizon::Short => self.stock_outlook_short.as_ref(),
            Horizon::Mid => self.stock_outlook_mid.as_ref(),
            Horizon::Long => self.stock_outlook_long.as_ref(),
        }
    }

    pub fn sector_outlook(&self, horizon: Horizon) -> Option<&Direction> {
        match horizon {
            Horizon::Short => self.sector_outlook_short.as_ref(),
            Horizon::Mid => self.sector_outlook_mid.as_ref(),
            Horizon::Long => self.sector_outlook_long.as_ref(),
        }
    }

    fn stock_outlook_mut(&mut self, horizon: Horizon) -> &mut Option<Direction> {
        match horizon {
            Horizon::Short => &mut self.stock_outlook_short,
            Horizon::Mid => &mut self.stock_outlook_mid,
            Horizon::Long => &mut self.stock_outlook_long,
        }
    }

    fn sector_outlook_mut(&mut self, horizon: Horizon) -> &mut Option<Direction> {
        match horizon {
            Horizon::Short => &mut self.sector_outlook_short,
            Horizon::Mid => &mut self.sector_outlook_mid,
            Horizon::Long => &mut self.sector_outlook_long,
        }
    }

    /// Names of the expected fields that are still unset
    ///
    /// `earnings_date` only exists when the listing was seeded by day, and
    /// `avg_volume` is legitimately unset when the site reports `N/A`, so
    /// neither is expected.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let checks = [
            ("detail_url", self.detail_url.is_some()),
            ("company_name", self.company_name.is_some()),
            ("earnings_call_time", self.earnings_call_time.is_some()),
            ("eps_estimate", self.eps_estimate.is_some()),
            ("current_price", self.current_price.is_some()),
            ("market_cap", self.market_cap.is_some()),
            ("prev_day_volume", self.prev_day_volume.is_some()),
            ("crawled_at", self.crawled_at.is_some()),
            ("sector", self.sector.is_some()),
            ("stock_outlook_short", self.stock_outlook_short.is_some()),
            ("stock_outlook_mid", self.stock_outlook_mid.is_some()),
            ("stock_outlook_long", self.stock_outlook_long.is_some()),
            ("sector_outlook_short", self.sector_outlook_short.is_some()),
            ("sector_outlook_mid", self.sector_outlook_mid.is_some()),
            ("sector_outlook_long", self.sector_outlook_long.is_some()),
        ];

        checks
            .into_iter()
            .filter(|(_, present)| !present)
            .map(|(name, _)| name)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Failed beats partial beats complete
    pub fn compute_status(&self) -> RecordStatus {
        if self.issues.iter().any(|issue| issue.kind.is_hard()) {
            RecordStatus::Failed
        } else if !self.is_complete() {
            RecordStatus::Partial
        } else {
            RecordStatus::Complete
        }
    }

    fn refresh_status(&mut self) {
        self.status = self.compute_status();
    }
}
