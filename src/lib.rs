//! Earnings-Ripple: an earnings-calendar record harvester
//!
//! This crate crawls an earnings listing page, fans out to one quote page per
//! discovered ticker, and merges the DOM fields and the embedded insights JSON
//! of each page into one record per ticker.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod site;
pub mod state;
pub mod store;
pub mod url;

use thiserror::Error;

/// Main error type for Earnings-Ripple operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("No seed listing could be fetched (last failure at {url}): {source}")]
    SeedUnreachable {
        url: String,
        source: crawler::FetchError,
    },

    #[error("No seed listing URLs to crawl")]
    NoSeeds,

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for Earnings-Ripple operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{crawl, Coordinator, CrawlPhase, CrawlReport};
pub use state::{FailureKind, TaskFailure, TaskRole, TaskStatus};
pub use store::{KeyedRecordStore, Record, RecordStatus};
