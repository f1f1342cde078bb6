use url::Url;

/// Resolves a link href found on a page into an absolute http(s) URL
///
/// Empty hrefs, fragment-only anchors, and non-http schemes
/// (`javascript:`, `mailto:`, ...) resolve to `None`.
pub fn resolve_href(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let resolved = base.join(href).ok()?;
    match resolved.scheme() {
        "http" | "https" => Some(resolved),
        _ => None,
    }
}

/// Appends `extra` to the path of `url`, keeping its query string
///
/// ```
/// use url::Url;
/// use earnings_ripple::url::append_path;
///
/// let quote = Url::parse("https://finance.yahoo.com/quote/GME?p=GME").unwrap();
/// let profile = append_path(&quote, "profile");
/// assert_eq!(profile.as_str(), "https://finance.yahoo.com/quote/GME/profile?p=GME");
/// ```
pub fn append_path(url: &Url, extra: &str) -> Url {
    let mut joined = url.clone();
    let base = url.path().trim_end_matches('/');
    let extra = extra.trim_matches('/');
    joined.set_path(&format!("{}/{}", base, extra));
    joined
}
