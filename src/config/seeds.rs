use crate::config::types::SourceConfig;
use crate::url::parse_http_url;
use crate::ConfigError;
use url::Url;

/// Builds the seed listing URLs for a crawl
///
/// Explicit `seeds` win. Otherwise a single listing URL is built from
/// `base-url` + `listing-path`, with whichever of `from`, `to` and `day`
/// are set appended as query parameters in that order.
///
/// # Returns
///
/// * `Ok(Vec<Url>)` - The seed URLs, possibly empty
/// * `Err(ConfigError::InvalidUrl)` - A seed or the base URL did not parse
pub fn seed_urls(source: &SourceConfig) -> Result<Vec<Url>, ConfigError> {
    if !source.seeds.is_empty() {
        return source
            .seeds
            .iter()
            .map(|seed| {
                parse_http_url(seed)
                    .map_err(|e| ConfigError::InvalidUrl(format!("seed '{}': {}", seed, e)))
            })
            .collect();
    }

    let base = parse_http_url(&source.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("base-url '{}': {}", source.base_url, e)))?;
    let mut listing = base
        .join(&source.listing_path)
        .map_err(|e| ConfigError::InvalidUrl(format!("listing-path '{}': {}", source.listing_path, e)))?;

    let params: Vec<(&str, String)> = [("from", source.from), ("to", source.to), ("day", source.day)]
        .into_iter()
        .filter_map(|(name, date)| date.map(|d| (name, d.format("%Y-%m-%d").to_string())))
        .collect();

    if !params.is_empty() {
        let mut query = listing.query_pairs_mut();
        for (name, value) in &params {
            query.append_pair(name, value);
        }
    }

    Ok(vec![listing])
}
