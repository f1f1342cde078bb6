//! Site profile: the handlers that turn fetched pages into record fields
//!
//! Each handler declares an activation predicate over the fetched
//! [`Document`]; the crawl loop runs every handler of the task's role whose
//! predicate matches. Handlers are synchronous and never hold parsed HTML
//! across an await point.

mod insights;
mod listing;
mod quote;

pub use insights::InsightsJsonHandler;
pub use listing::EarningsListingHandler;
pub use quote::QuoteDomHandler;

use crate::config::Config;
use crate::crawler::{CrawlTask, Document, TaskSpec};
use crate::state::{FailureKind, TaskFailure, TaskRole};
use crate::store::KeyedRecordStore;
use crate::ConfigError;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

/// Why a handler could not extract (all of) what it wanted from a page
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    /// The page names a key that is not in the store, or names none at all
    #[error("{url} could not be correlated to a known key (found {})", .key.as_deref().unwrap_or("none"))]
    Correlation { url: String, key: Option<String> },

    #[error("{what} missing on {url}")]
    MissingElement { url: String, what: String },

    #[error("could not parse {field} {value:?} on {url}")]
    Parse {
        url: String,
        field: String,
        value: String,
    },

    #[error("no embedded data on {url}: {reason}")]
    FragmentNotFound { url: String, reason: String },

    #[error("embedded data on {url} did not decode: {reason}")]
    Decode { url: String, reason: String },

    #[error("insights unavailable for {key} on {url}")]
    InsightsUnavailable { url: String, key: String },
}

impl ExtractionError {
    /// Conditions the site produces routinely; logged at warn level
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::FragmentNotFound { .. } | Self::InsightsUnavailable { .. }
        )
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Correlation { .. } => FailureKind::Correlation,
            Self::MissingElement { .. } | Self::Parse { .. } => FailureKind::Extraction,
            Self::FragmentNotFound { .. } => FailureKind::FragmentMissing,
            Self::Decode { .. } => FailureKind::Decode,
            Self::InsightsUnavailable { .. } => FailureKind::Unavailable,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Correlation { url, .. }
            | Self::MissingElement { url, .. }
            | Self::Parse { url, .. }
            | Self::FragmentNotFound { url, .. }
            | Self::Decode { url, .. }
            | Self::InsightsUnavailable { url, .. } => url,
        }
    }

    /// Converts into a task failure for the task that produced it
    ///
    /// Correlation failures carry the key the page claimed, not the task's.
    pub fn into_failure(self, task: &CrawlTask) -> TaskFailure {
        let key = match &self {
            Self::Correlation { key, .. } => key.clone(),
            _ => task.key.clone(),
        };
        TaskFailure::new(self.url().to_string(), key, task.role, self.kind(), self.to_string())
    }
}

/// What a handler can see besides the document
#[derive(Debug, Clone, Copy)]
pub struct HandlerContext<'a> {
    pub store: &'a KeyedRecordStore,
    pub task: &'a CrawlTask,
}

/// What a handler produced besides store writes
#[derive(Debug, Default)]
pub struct HandlerOutput {
    /// Tasks to enqueue before the current one counts as finished
    pub follow_ups: Vec<TaskSpec>,

    /// Problems that did not stop the handler
    pub issues: Vec<ExtractionError>,
}

/// Extracts fields from one kind of page
pub trait PageHandler: Send + Sync {
    fn name(&self) -> &'static str;

    /// Activation predicate
    fn matches(&self, document: &Document) -> bool;

    fn handle(
        &self,
        document: &Document,
        ctx: &HandlerContext<'_>,
    ) -> Result<HandlerOutput, ExtractionError>;
}

/// The handlers for one site, grouped by task role
#[derive(Clone, Default)]
pub struct SiteProfile {
    pub listing: Vec<Arc<dyn PageHandler>>,
    pub detail: Vec<Arc<dyn PageHandler>>,
}

impl SiteProfile {
    /// The earnings calendar profile configured from `config`
    pub fn earnings(config: &Config) -> Result<Self, ConfigError> {
        let base_url = Url::parse(&config.source.base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("base-url: {}", e)))?;

        Ok(Self {
            listing: vec![Arc::new(EarningsListingHandler::new(
                base_url,
                config.source.day,
            ))],
            detail: vec![
                Arc::new(QuoteDomHandler::new(
                    config.source.follow_up().map(str::to_string),
                )),
                Arc::new(InsightsJsonHandler::new(config.extract.clone())),
            ],
        })
    }

    /// Handlers for `role` whose predicate matches `document`
    pub fn handlers_for<'a>(
        &'a self,
        role: TaskRole,
        document: &'a Document,
    ) -> impl Iterator<Item = &'a Arc<dyn PageHandler>> + 'a {
        let handlers = match role {
            TaskRole::Listing => &self.listing,
            TaskRole::Detail | TaskRole::FollowUp => &self.detail,
        };
        handlers.iter().filter(move |h| h.matches(document))
    }
}

impl std::fmt::Debug for SiteProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = |hs: &[Arc<dyn PageHandler>]| hs.iter().map(|h| h.name()).collect::<Vec<_>>();
        f.debug_struct("SiteProfile")
            .field("listing", &names(&self.listing))
            .field("detail", &names(&self.detail))
            .finish()
    }
}
