use crate::url::extract_domain;
use url::Url;

/// Checks if a domain matches a pattern
///
/// `"finance.yahoo.com"` matches only itself. `"*.yahoo.com"` matches
/// `yahoo.com` and any subdomain of it, however deep.
///
/// Both sides are expected to be lowercase already.
///
/// # Examples
///
/// ```
/// use earnings_ripple::url::matches_wildcard;
///
/// assert!(matches_wildcard("finance.yahoo.com", "finance.yahoo.com"));
/// assert!(matches_wildcard("*.yahoo.com", "query1.finance.yahoo.com"));
/// assert!(!matches_wildcard("*.yahoo.com", "notyahoo.com"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(base) => {
            candidate == base
                || candidate
                    .strip_suffix(base)
                    .is_some_and(|head| head.ends_with('.'))
        }
        None => candidate == pattern,
    }
}

/// Returns true when the URL's host matches one of the allowed patterns
///
/// An empty pattern list allows every host. A URL without a host is never
/// allowed.
pub fn is_domain_allowed(patterns: &[String], url: &Url) -> bool {
    let Some(domain) = extract_domain(url) else {
        return false;
    };

    patterns.is_empty()
        || patterns
            .iter()
            .any(|pattern| matches_wildcard(&pattern.to_lowercase(), &domain))
}
