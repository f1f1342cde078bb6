use crate::{UrlError, UrlResult};
use url::Url;

/// Extracts the lowercase host of a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use earnings_ripple::url::extract_domain;
///
/// let url = Url::parse("https://Finance.Yahoo.com/quote/AAPL").unwrap();
/// assert_eq!(extract_domain(&url), Some("finance.yahoo.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Like [`extract_domain`], but a URL without a host is an error
pub fn require_domain(url: &Url) -> UrlResult<String> {
    extract_domain(url).ok_or(UrlError::MissingDomain)
}

/// Parses an absolute http(s) URL that has a host
///
/// # Arguments
///
/// * `raw` - The URL string
///
/// # Returns
///
/// * `Ok(Url)` - The parsed URL
/// * `Err(UrlError)` - Unparseable, not http(s), or no host
pub fn parse_http_url(raw: &str) -> UrlResult<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    require_domain(&url)?;
    Ok(url)
}
