//! Page fetching
//!
//! [`PageFetcher`] is the seam between the crawl loop and the network: it
//! turns a URL plus a `User-Agent` into a [`Document`] or a [`FetchError`].
//! [`HttpFetcher`] is the reqwest implementation used by the binary. It
//! enforces the allowed-domain list before any request is sent and on every
//! redirect hop, and caps the body size while it streams.

use crate::config::FetcherConfig;
use crate::url::{extract_domain, is_domain_allowed};
use reqwest::header::USER_AGENT;
use reqwest::redirect::Policy;
use reqwest::Client;
use scraper::Html;
use std::error::Error as StdError;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// One fetch to perform
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: Url,
    pub user_agent: String,
}

/// A fetched page
#[derive(Debug, Clone)]
pub struct Document {
    /// Final URL after redirects
    pub url: Url,

    /// HTTP status code
    pub status: u16,

    /// Page body
    pub body: String,
}

impl Document {
    pub fn new(url: Url, status: u16, body: impl Into<String>) -> Self {
        Self {
            url,
            status,
            body: body.into(),
        }
    }

    /// Parses the body as HTML
    ///
    /// The parsed tree is not `Send`; parse inside synchronous code and drop
    /// it before the next await.
    pub fn html(&self) -> Html {
        Html::parse_document(&self.body)
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn path_contains(&self, needle: &str) -> bool {
        self.url.path().contains(needle)
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.body.contains(needle)
    }

    pub fn domain(&self) -> Option<String> {
        extract_domain(&self.url)
    }
}

/// Ways a fetch can fail
///
/// None of these abort a crawl; they are recorded against the task.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("Could not connect to {url}: {message}")]
    Connect { url: String, message: String },

    #[error("Transport failure for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("{url} is outside the allowed domains")]
    DomainNotAllowed { url: String },

    #[error("Body of {url} exceeds {limit} bytes")]
    BodyTooLarge { url: String, limit: u64 },
}

impl FetchError {
    pub fn url(&self) -> &str {
        match self {
            Self::Status { url, .. }
            | Self::Timeout { url }
            | Self::Connect { url, .. }
            | Self::Transport { url, .. }
            | Self::DomainNotAllowed { url }
            | Self::BodyTooLarge { url, .. } => url,
        }
    }

    /// HTTP status, for status failures
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether another attempt might succeed
    ///
    /// | Condition | Retry |
    /// |-----------|-------|
    /// | Timeout, connect, other transport | yes |
    /// | HTTP 429, HTTP 5xx | yes |
    /// | Other HTTP status | no |
    /// | Disallowed domain, body too large | no |
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Connect { .. } | Self::Transport { .. } => true,
            Self::Status { status, .. } => *status == 429 || (500..600).contains(status),
            Self::DomainNotAllowed { .. } | Self::BodyTooLarge { .. } => false,
        }
    }

    fn from_reqwest(url: &Url, err: reqwest::Error) -> Self {
        if let Some(offsite) = offsite_redirect(&err) {
            return Self::DomainNotAllowed {
                url: offsite.url.clone(),
            };
        }

        let url = url.to_string();
        if err.is_timeout() {
            Self::Timeout { url }
        } else if err.is_connect() {
            Self::Connect {
                url,
                message: err.to_string(),
            }
        } else {
            Self::Transport {
                url,
                message: err.to_string(),
            }
        }
    }
}

const MAX_REDIRECTS: usize = 10;

/// A redirect hop that left the allowed domains
#[derive(Debug, Error)]
#[error("redirect to {url} leaves the allowed domains")]
struct OffsiteRedirect {
    url: String,
}

fn offsite_redirect(err: &reqwest::Error) -> Option<&OffsiteRedirect> {
    let mut source = err.source();
    while let Some(inner) = source {
        if let Some(offsite) = inner.downcast_ref::<OffsiteRedirect>() {
            return Some(offsite);
        }
        source = inner.source();
    }
    None
}

/// Follows redirects only while they stay inside `allowed_domains`
fn redirect_policy(allowed_domains: Vec<String>) -> Policy {
    let limited = Policy::limited(MAX_REDIRECTS);
    Policy::custom(move |attempt| {
        if !is_domain_allowed(&allowed_domains, attempt.url()) {
            let url = attempt.url().to_string();
            return attempt.error(OffsiteRedirect { url });
        }
        limited.redirect(attempt)
    })
}

/// Fetches pages for the crawl
pub trait PageFetcher: Send + Sync + 'static {
    fn fetch(
        &self,
        request: FetchRequest,
    ) -> impl Future<Output = Result<Document, FetchError>> + Send;
}

/// Builds the HTTP client used by [`HttpFetcher`]
///
/// # Arguments
///
/// * `config` - Fetcher configuration (timeouts, allowed redirect targets)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(config.request_timeout())
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .redirect(redirect_policy(config.allowed_domains.clone()))
        .build()
}

/// reqwest-backed [`PageFetcher`]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    allowed_domains: Vec<String>,
    max_body_bytes: u64,
}

impl HttpFetcher {
    pub fn new(config: &FetcherConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
            allowed_domains: config.allowed_domains.clone(),
            max_body_bytes: config.max_body_bytes,
        })
    }

    fn exceeds_limit(&self, len: u64) -> bool {
        self.max_body_bytes > 0 && len > self.max_body_bytes
    }

    fn too_large(&self, url: &Url) -> FetchError {
        FetchError::BodyTooLarge {
            url: url.to_string(),
            limit: self.max_body_bytes,
        }
    }
}

impl PageFetcher for HttpFetcher {
    async fn fetch(&self, request: FetchRequest) -> Result<Document, FetchError> {
        let FetchRequest { url, user_agent } = request;

        if !is_domain_allowed(&self.allowed_domains, &url) {
            return Err(FetchError::DomainNotAllowed {
                url: url.to_string(),
            });
        }

        let mut response = self
            .client
            .get(url.clone())
            .header(USER_AGENT, user_agent.as_str())
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(&url, e))?;

        let status = response.status();
        let final_url = response.url().clone();

        if !status.is_success() {
            debug!("{} answered {}", url, status);
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if response
            .content_length()
            .is_some_and(|len| self.exceeds_limit(len))
        {
            return Err(self.too_large(&url));
        }

        // Content-Length may be absent, so the cap is also checked per chunk
        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| FetchError::from_reqwest(&url, e))?
        {
            if self.exceeds_limit((bytes.len() + chunk.len()) as u64) {
                return Err(self.too_large(&url));
            }
            bytes.extend_from_slice(&chunk);
        }

        Ok(Document::new(
            final_url,
            status.as_u16(),
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    }
}
