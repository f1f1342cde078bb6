use crate::extract::BoundaryStrategy;
use crate::output::OutputFormat;
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;

/// User agent sent when no other is configured
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 11_2_1) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/88.0.4324.182 Safari/537.36";

/// Main configuration structure for Earnings-Ripple
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// When detail fetches are released relative to discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FanOutPolicy {
    /// Detail tasks start as soon as their listing page has been processed
    #[default]
    Interleaved,

    /// Detail tasks are held until every listing page has been processed
    AfterDiscovery,
}

/// How the `User-Agent` header is chosen per request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UserAgentPolicy {
    /// Always send the configured user agent
    #[default]
    Fixed,

    /// Send a fresh random token on every request
    Randomized,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Size of the worker pool (global cap on in-flight fetches)
    #[serde(rename = "max-concurrent-fetches")]
    pub max_concurrent_fetches: u32,

    /// Maximum in-flight fetches per domain
    #[serde(rename = "max-parallelism")]
    pub max_parallelism: u32,

    /// Minimum time between two grants for the same domain (milliseconds)
    #[serde(rename = "min-delay-ms")]
    pub min_delay_ms: u64,

    /// Fan-out scheduling policy
    #[serde(rename = "fan-out", default)]
    pub fan_out: FanOutPolicy,

    /// Retries for retryable fetch failures
    #[serde(rename = "max-retries", default)]
    pub max_retries: u32,

    /// Pause between retries (milliseconds)
    #[serde(rename = "retry-delay-ms", default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Hard cap on the whole crawl (seconds)
    #[serde(rename = "crawl-deadline-secs", default)]
    pub crawl_deadline_secs: Option<u64>,
}

impl CrawlerConfig {
    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn crawl_deadline(&self) -> Option<Duration> {
        self.crawl_deadline_secs.map(Duration::from_secs)
    }
}

fn default_retry_delay_ms() -> u64 {
    1000
}

/// HTTP fetcher configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// Domain patterns the fetcher may visit (e.g., "finance.yahoo.com" or "*.yahoo.com")
    #[serde(rename = "allowed-domains", default)]
    pub allowed_domains: Vec<String>,

    /// Maximum response body size in bytes (0 = unlimited)
    #[serde(rename = "max-body-bytes", default)]
    pub max_body_bytes: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// User agent selection policy
    #[serde(rename = "user-agent-policy", default)]
    pub user_agent_policy: UserAgentPolicy,

    /// User agent used by the fixed policy
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

impl FetcherConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            allowed_domains: Vec::new(),
            max_body_bytes: 0,
            request_timeout_secs: default_request_timeout_secs(),
            user_agent_policy: UserAgentPolicy::default(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

/// Where the listing pages live
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Site root; listing hrefs are resolved against it
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Path of the earnings listing page
    #[serde(rename = "listing-path", default = "default_listing_path")]
    pub listing_path: String,

    /// First day of the listing date range
    #[serde(default)]
    pub from: Option<NaiveDate>,

    /// Last day of the listing date range
    #[serde(default)]
    pub to: Option<NaiveDate>,

    /// Day selected inside the range; also stamped on each record
    #[serde(default)]
    pub day: Option<NaiveDate>,

    /// Explicit listing URLs; when set, the date range is not used
    #[serde(default)]
    pub seeds: Vec<String>,

    /// Path appended to each quote URL for one extra fetch per ticker
    #[serde(rename = "follow-up-path", default)]
    pub follow_up_path: Option<String>,
}

impl SourceConfig {
    /// Follow-up path, treating an empty string as unset
    pub fn follow_up(&self) -> Option<&str> {
        self.follow_up_path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

fn default_listing_path() -> String {
    "/calendar/earnings".to_string()
}

/// Embedded JSON extraction settings
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractConfig {
    /// Literal that opens the fragment
    #[serde(rename = "start-marker", default = "default_start_marker")]
    pub start_marker: String,

    /// Literal that closes the fragment
    #[serde(rename = "end-marker", default = "default_end_marker")]
    pub end_marker: String,

    /// Which occurrence of the end marker bounds the fragment
    #[serde(default)]
    pub boundary: BoundaryStrategy,

    /// Literal the site emits when insights could not be loaded
    #[serde(rename = "failure-marker", default = "default_failure_marker")]
    pub failure_marker: String,

    /// Literal identifying the script that carries the insights store
    #[serde(rename = "store-marker", default = "default_store_marker")]
    pub store_marker: String,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            start_marker: default_start_marker(),
            end_marker: default_end_marker(),
            boundary: BoundaryStrategy::default(),
            failure_marker: default_failure_marker(),
            store_marker: default_store_marker(),
        }
    }
}

fn default_start_marker() -> String {
    "\"context\"".to_string()
}

fn default_end_marker() -> String {
    "\"plugins\"".to_string()
}

fn default_failure_marker() -> String {
    "LOAD_TECH_INSIGHTS_FAIL".to_string()
}

fn default_store_marker() -> String {
    "ResearchPageStore".to_string()
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Report format
    #[serde(default)]
    pub format: OutputFormat,

    /// Report file; stdout when unset
    #[serde(default)]
    pub path: Option<String>,
}

impl OutputConfig {
    /// Report file, treating an empty string as stdout
    pub fn output_path(&self) -> Option<&str> {
        self.path.as_deref().filter(|p| !p.trim().is_empty())
    }
}
