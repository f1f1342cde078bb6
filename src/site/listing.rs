use crate::crawler::parser::{child_attr, child_text, select_all};
use crate::crawler::{Document, TaskSpec};
use crate::site::{ExtractionError, HandlerContext, HandlerOutput, PageHandler};
use crate::store::Field;
use crate::url::resolve_href;
use chrono::NaiveDate;
use tracing::{debug, info, warn};
use url::Url;

const ROW: &str = ".simpTblRow";
const SYMBOL: &str = r#"td[aria-label="Symbol"]"#;
const COMPANY: &str = r#"td[aria-label="Company"]"#;
const CALL_TIME: &str = r#"td[aria-label="Earnings Call Time"]"#;
const EPS_ESTIMATE: &str = r#"td[aria-label="EPS Estimate"]"#;
const QUOTE_LINK: &str = "td > a";

/// Discovers tickers on an earnings calendar page
///
/// Every row creates (or revisits) the ticker's record, fills the listing
/// columns, and yields one detail task for the ticker's quote page.
#[derive(Debug, Clone)]
pub struct EarningsListingHandler {
    base_url: Url,
    earnings_date: Option<NaiveDate>,
}

impl EarningsListingHandler {
    pub fn new(base_url: Url, earnings_date: Option<NaiveDate>) -> Self {
        Self {
            base_url,
            earnings_date,
        }
    }

    /// Quote URL for a row: its link if it has one, else `/quote/{sym}?p={sym}`
    fn detail_url(&self, href: Option<&str>, symbol: &str) -> Option<Url> {
        href.and_then(|h| resolve_href(&self.base_url, h))
            .or_else(|| {
                self.base_url
                    .join(&format!("/quote/{0}?p={0}", symbol))
                    .ok()
            })
    }
}

impl PageHandler for EarningsListingHandler {
    fn name(&self) -> &'static str {
        "earnings-listing"
    }

    fn matches(&self, _document: &Document) -> bool {
        true
    }

    fn handle(
        &self,
        document: &Document,
        ctx: &HandlerContext<'_>,
    ) -> Result<HandlerOutput, ExtractionError> {
        let html = document.html();
        let rows = select_all(&html, ROW);
        let mut output = HandlerOutput::default();

        if rows.is_empty() {
            warn!("No earnings rows on {}", document.url);
            return Ok(output);
        }

        for (index, row) in rows.into_iter().enumerate() {
            let Some(symbol) = child_text(row, SYMBOL) else {
                warn!("Skipping row {} on {}: no symbol", index, document.url);
                continue;
            };

            let record = ctx.store.get_or_create(&symbol);
            if !record.was_created() {
                debug!("{} listed again on {}", symbol, document.url);
            }

            let href = child_attr(row, QUOTE_LINK, "href");
            let detail_url = self.detail_url(href.as_deref(), &symbol);

            let mut fields = Vec::with_capacity(5);
            if let Some(company) = child_text(row, COMPANY) {
                fields.push(Field::CompanyName(company));
            }
            if let Some(call_time) = child_text(row, CALL_TIME) {
                fields.push(Field::EarningsCallTime(call_time));
            }
            if let Some(eps) = child_text(row, EPS_ESTIMATE) {
                fields.push(Field::EpsEstimate(eps));
            }
            if let Some(date) = self.earnings_date {
                fields.push(Field::EarningsDate(date));
            }
            if let Some(url) = &detail_url {
                fields.push(Field::DetailUrl(url.to_string()));
            }

            // The record was created above, so this cannot miss
            if let Err(e) = record.merge(fields) {
                warn!("Dropping listing fields for {}: {}", symbol, e);
                continue;
            }

            match detail_url {
                Some(url) => {
                    info!("Discovered {} -> {}", symbol, url);
                    output.follow_ups.push(TaskSpec::detail(url, symbol));
                }
                None => output.issues.push(ExtractionError::MissingElement {
                    url: document.url.to_string(),
                    what: format!("quote link for {}", symbol),
                }),
            }
        }

        Ok(output)
    }
}
