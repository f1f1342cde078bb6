//! Crawler module for page fetching and crawl orchestration
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching behind the [`PageFetcher`] seam
//! - Global and per-domain admission control
//! - Task bookkeeping and the worker pool
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod limiter;
pub mod parser;
mod task;
mod user_agent;

pub use coordinator::{
    Coordinator, CrawlPhase, CrawlReport, RoleCounts, TaskCounts, WorkCounter,
};
pub use fetcher::{
    build_http_client, Document, FetchError, FetchRequest, HttpFetcher, PageFetcher,
};
pub use limiter::{Permit, RateLimiter};
pub use task::{CrawlTask, TaskId, TaskSpec};
pub use user_agent::{random_user_agent, UserAgentSource};

use crate::config::{seed_urls, Config};
use crate::CrawlError;
use tracing::info;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Build the HTTP fetcher
/// 2. Derive the seed listing URLs
/// 3. Fetch the listings and fan out to the quote pages
/// 4. Return the quiescent record snapshot
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl reached quiescence
/// * `Err(CrawlError)` - Crawl could not start or no seed was reachable
pub async fn crawl(config: Config) -> Result<CrawlReport, CrawlError> {
    let fetcher = HttpFetcher::new(&config.fetcher)?;
    let seeds = seed_urls(&config.source)?;
    info!("Starting crawl with {} seed(s)", seeds.len());

    let mut coordinator = Coordinator::new(&config, fetcher)?;
    coordinator.run(seeds).await
}
