//! Shared fixtures and an in-memory fetcher for the integration tests

use earnings_ripple::config::{parse_config, Config};
use earnings_ripple::crawler::{Document, FetchError, FetchRequest, PageFetcher};
use earnings_ripple::store::{KeyedRecordStore, Record};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

pub const BASE: &str = "https://finance.yahoo.com";

pub fn listing_url(name: &str) -> String {
    format!("{}/calendar/earnings?day={}", BASE, name)
}

pub fn quote_url(ticker: &str) -> String {
    format!("{0}/quote/{1}?p={1}", BASE, ticker)
}

/// A listing page with one row per `(ticker, company)`
pub fn listing_html(rows: &[(&str, &str)]) -> String {
    let rows: String = rows
        .iter()
        .map(|(ticker, company)| {
            format!(
                r#"<tr class="simpTblRow">
  <td aria-label="Symbol"><a href="/quote/{ticker}?p={ticker}">{ticker}</a></td>
  <td aria-label="Company">{company}</td>
  <td aria-label="Earnings Call Time">After Market Close</td>
  <td aria-label="EPS Estimate">0.42</td>
</tr>"#
            )
        })
        .collect();
    format!("<html><body><table><tbody>{rows}</tbody></table></body></html>")
}

fn insights_script(ticker: &str) -> String {
    format!(
        r#"root.App.main = {{"context":{{"dispatcher":{{"stores":{{"ResearchPageStore":{{"originUrl":"/quote/{ticker}?p={ticker}","technicalInsights":{{"{ticker}":{{"instrumentInfo":{{"technicalEvents":{{"sector":"Technology","shortTermOutlook":{{"direction":"Bullish","sectorDirection":"Bearish"}},"intermediateTermOutlook":{{"direction":"Bearish","sectorDirection":"Neutral"}},"longTermOutlook":{{"direction":"Neutral","sectorDirection":"Bullish"}}}}}}}}}}}}}}}}}},"plugins":{{"router":{{}}}}}};"#
    )
}

fn quote_dom(ticker: &str) -> String {
    format!(
        r#"<div id="quote-header-info">
  <div><div><h1>{ticker} Holdings ({ticker})</h1></div></div>
  <div></div>
  <div><div><div><span>1,118.18</span><span>+1.00 (1%)</span></div></div></div>
</div>
<table>
  <tr><td data-test="TD_VOLUME-value">32,745,019</td></tr>
  <tr><td data-test="AVERAGE_VOLUME_3MONTH-value">12,000,000</td></tr>
  <tr><td data-test="MARKET_CAP-value">8.243B</td></tr>
</table>"#
    )
}

/// Quote page with DOM fields only
pub fn quote_html(ticker: &str) -> String {
    format!("<html><body>{}</body></html>", quote_dom(ticker))
}

/// Quote page with DOM fields and the insights script
pub fn full_quote_html(ticker: &str) -> String {
    format!(
        "<html><body>{}<script>{}</script></body></html>",
        quote_dom(ticker),
        insights_script(ticker)
    )
}

/// Parses a config for `seeds`, with `crawler` lines appended to `[crawler]`
pub fn test_config(seeds: &[String], crawler: &str) -> Config {
    let seeds = seeds
        .iter()
        .map(|s| format!("\"{}\"", s))
        .collect::<Vec<_>>()
        .join(", ");
    parse_config(&format!(
        r#"
[crawler]
max-concurrent-fetches = 8
max-parallelism = 8
min-delay-ms = 0
retry-delay-ms = 10
{crawler}

[fetcher]
allowed-domains = ["finance.yahoo.com"]
user-agent-policy = "randomized"

[source]
base-url = "{BASE}"
seeds = [{seeds}]
"#
    ))
    .expect("test config parses")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Start,
    End,
}

#[derive(Debug, Clone)]
pub struct Event {
    pub url: String,
    pub kind: EventKind,
}

#[derive(Debug, Clone)]
struct Route {
    body: Result<String, FetchError>,
    delay: Duration,
    /// Transient 503s served before `body`
    transient_failures: u32,
}

#[derive(Default)]
struct Inner {
    routes: Mutex<HashMap<String, Route>>,
    attempts: Mutex<HashMap<String, u32>>,
    events: Mutex<Vec<Event>>,
    user_agents: Mutex<Vec<String>>,
    probe: OnceLock<Arc<KeyedRecordStore>>,
    probes: Mutex<HashMap<String, Vec<Record>>>,
}

/// In-memory [`PageFetcher`] with per-URL bodies, delays and failures
///
/// Unknown URLs answer 404. Clones share state, so a test can keep one
/// handle for inspection while the coordinator owns another.
#[derive(Clone, Default)]
pub struct StaticFetcher {
    inner: Arc<Inner>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn route(self, url: &str, route: Route) -> Self {
        self.inner
            .routes
            .lock()
            .unwrap()
            .insert(url.to_string(), route);
        self
    }

    pub fn page(self, url: &str, body: impl Into<String>) -> Self {
        self.slow_page(url, body, Duration::ZERO)
    }

    pub fn slow_page(self, url: &str, body: impl Into<String>, delay: Duration) -> Self {
        self.route(
            url,
            Route {
                body: Ok(body.into()),
                delay,
                transient_failures: 0,
            },
        )
    }

    pub fn flaky_page(self, url: &str, body: impl Into<String>, failures: u32) -> Self {
        self.route(
            url,
            Route {
                body: Ok(body.into()),
                delay: Duration::ZERO,
                transient_failures: failures,
            },
        )
    }

    pub fn failing(self, url: &str, err: FetchError) -> Self {
        self.route(
            url,
            Route {
                body: Err(err),
                delay: Duration::ZERO,
                transient_failures: 0,
            },
        )
    }

    /// Records a store snapshot at the start of every fetch
    pub fn probe_store(&self, store: Arc<KeyedRecordStore>) {
        let _ = self.inner.probe.set(store);
    }

    pub fn snapshot_at(&self, url: &str) -> Option<Vec<Record>> {
        self.inner.probes.lock().unwrap().get(url).cloned()
    }

    pub fn attempts(&self, url: &str) -> u32 {
        self.inner
            .attempts
            .lock()
            .unwrap()
            .get(url)
            .copied()
            .unwrap_or(0)
    }

    pub fn events(&self) -> Vec<Event> {
        self.inner.events.lock().unwrap().clone()
    }

    pub fn user_agents(&self) -> Vec<String> {
        self.inner.user_agents.lock().unwrap().clone()
    }

    /// Position of the first event matching `url` and `kind`
    pub fn position(&self, url: &str, kind: EventKind) -> Option<usize> {
        self.events()
            .iter()
            .position(|e| e.url == url && e.kind == kind)
    }

    fn push(&self, url: &str, kind: EventKind) {
        self.inner.events.lock().unwrap().push(Event {
            url: url.to_string(),
            kind,
        });
    }
}

impl PageFetcher for StaticFetcher {
    async fn fetch(&self, request: FetchRequest) -> Result<Document, FetchError> {
        let url = request.url.to_string();
        self.inner
            .user_agents
            .lock()
            .unwrap()
            .push(request.user_agent.clone());

        if let Some(store) = self.inner.probe.get() {
            self.inner
                .probes
                .lock()
                .unwrap()
                .insert(url.clone(), store.snapshot());
        }

        let attempt = {
            let mut attempts = self.inner.attempts.lock().unwrap();
            let n = attempts.entry(url.clone()).or_insert(0);
            *n += 1;
            *n
        };
        let route = self.inner.routes.lock().unwrap().get(&url).cloned();

        self.push(&url, EventKind::Start);
        let result = match route {
            Some(route) => {
                if !route.delay.is_zero() {
                    tokio::time::sleep(route.delay).await;
                }
                if attempt <= route.transient_failures {
                    Err(FetchError::Status {
                        url: url.clone(),
                        status: 503,
                    })
                } else {
                    route
                        .body
                        .map(|body| Document::new(request.url.clone(), 200, body))
                }
            }
            None => Err(FetchError::Status {
                url: url.clone(),
                status: 404,
            }),
        };
        self.push(&url, EventKind::End);
        result
    }
}
