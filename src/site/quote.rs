use crate::crawler::parser::{is_not_available, parenthesized, parse_int, parse_price, select_text};
use crate::crawler::{Document, TaskSpec};
use crate::site::{ExtractionError, HandlerContext, HandlerOutput, PageHandler};
use crate::state::TaskRole;
use crate::store::{Field, StoreError};
use crate::url::append_path;
use chrono::Utc;
use scraper::Html;
use tracing::{debug, info};

const HEADER: &str = "#quote-header-info h1";
const PRICE: &[&str] = &[
    "#quote-header-info > div:nth-child(3) > div > div > span:first-child",
    r#"fin-streamer[data-field="regularMarketPrice"]"#,
];
const MARKET_CAP: &str = r#"td[data-test="MARKET_CAP-value"]"#;
const VOLUME: &str = r#"td[data-test="TD_VOLUME-value"]"#;
const AVG_VOLUME: &str = r#"td[data-test="AVERAGE_VOLUME_3MONTH-value"]"#;

/// Reads the conventional DOM fields of a quote page
///
/// Active on any page whose path contains `/quote/`. The key comes from the
/// page header, e.g. `GameStop Corp. (GME)`.
#[derive(Debug, Clone, Default)]
pub struct QuoteDomHandler {
    follow_up_path: Option<String>,
}

impl QuoteDomHandler {
    pub fn new(follow_up_path: Option<String>) -> Self {
        Self { follow_up_path }
    }

    fn fields(&self, html: &Html, url: &str) -> (Vec<Field>, Vec<ExtractionError>) {
        let mut fields = Vec::new();
        let mut issues = Vec::new();

        let parse_error = |field: &str, value: String| ExtractionError::Parse {
            url: url.to_string(),
            field: field.to_string(),
            value,
        };

        match PRICE.iter().find_map(|css| select_text(html, css)) {
            Some(raw) => match parse_price(&raw) {
                Some(price) => fields.push(Field::CurrentPrice(price)),
                None => issues.push(parse_error("current_price", raw)),
            },
            None => issues.push(ExtractionError::MissingElement {
                url: url.to_string(),
                what: "current price".to_string(),
            }),
        }

        if let Some(cap) = select_text(html, MARKET_CAP) {
            fields.push(Field::MarketCap(cap));
        }

        if let Some(raw) = select_text(html, VOLUME) {
            match parse_int(&raw) {
                Some(volume) => fields.push(Field::PrevDayVolume(volume)),
                None if is_not_available(&raw) => {}
                None => issues.push(parse_error("prev_day_volume", raw)),
            }
        }

        if let Some(raw) = select_text(html, AVG_VOLUME) {
            match parse_int(&raw) {
                Some(volume) => fields.push(Field::AvgVolume(volume)),
                None if is_not_available(&raw) => debug!("Average volume N/A on {}", url),
                None => issues.push(parse_error("avg_volume", raw)),
            }
        }

        fields.push(Field::CrawledAt(Utc::now()));
        (fields, issues)
    }
}

impl PageHandler for QuoteDomHandler {
    fn name(&self) -> &'static str {
        "quote-dom"
    }

    fn matches(&self, document: &Document) -> bool {
        document.path_contains("/quote/")
    }

    fn handle(
        &self,
        document: &Document,
        ctx: &HandlerContext<'_>,
    ) -> Result<HandlerOutput, ExtractionError> {
        let url = document.url.to_string();
        let html = document.html();

        let header = select_text(&html, HEADER).ok_or_else(|| ExtractionError::MissingElement {
            url: url.clone(),
            what: "quote header".to_string(),
        })?;
        let key = parenthesized(&header)
            .map(str::to_string)
            .ok_or_else(|| ExtractionError::Correlation {
                url: url.clone(),
                key: None,
            })?;

        let (fields, issues) = self.fields(&html, &url);
        ctx.store
            .merge_fields(&key, fields)
            .map_err(|StoreError::NotFound { key }| ExtractionError::Correlation {
                url: url.clone(),
                key: Some(key),
            })?;
        info!("Merged quote fields for {} from {}", key, url);

        let mut output = HandlerOutput {
            issues,
            ..HandlerOutput::default()
        };

        if ctx.task.role == TaskRole::Detail {
            if let Some(path) = &self.follow_up_path {
                output
                    .follow_ups
                    .push(TaskSpec::follow_up(append_path(&document.url, path), key));
            }
        }

        Ok(output)
    }
}
