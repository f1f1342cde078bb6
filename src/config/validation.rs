use crate::config::seeds::seed_urls;
use crate::config::types::{
    Config, CrawlerConfig, ExtractConfig, FetcherConfig, SourceConfig, UserAgentPolicy,
};
use crate::url::is_domain_allowed;
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_source_config(&config.source, &config.fetcher)?;
    validate_extract_config(&config.extract)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_fetches < 1 || config.max_concurrent_fetches > 100 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-fetches must be between 1 and 100, got {}",
            config.max_concurrent_fetches
        )));
    }

    if config.max_parallelism < 1 {
        return Err(ConfigError::Validation(format!(
            "max-parallelism must be >= 1, got {}",
            config.max_parallelism
        )));
    }

    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max-retries must be <= 10, got {}",
            config.max_retries
        )));
    }

    if config.crawl_deadline_secs == Some(0) {
        return Err(ConfigError::Validation(
            "crawl-deadline-secs must be > 0 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates fetcher configuration
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    for pattern in &config.allowed_domains {
        validate_domain_pattern(pattern)?;
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be > 0".to_string(),
        ));
    }

    if config.user_agent_policy == UserAgentPolicy::Fixed && config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty with the fixed user-agent policy".to_string(),
        ));
    }

    Ok(())
}

/// Validates the listing source and checks every seed is fetchable
fn validate_source_config(
    source: &SourceConfig,
    fetcher: &FetcherConfig,
) -> Result<(), ConfigError> {
    if let (Some(from), Some(to)) = (source.from, source.to) {
        if from > to {
            return Err(ConfigError::Validation(format!(
                "from ({}) must not be after to ({})",
                from, to
            )));
        }
    }

    if let Some(day) = source.day {
        let before_range = source.from.is_some_and(|from| day < from);
        let after_range = source.to.is_some_and(|to| day > to);
        if before_range || after_range {
            return Err(ConfigError::Validation(format!(
                "day ({}) must lie within the from/to range",
                day
            )));
        }
    }

    for seed in seed_urls(source)? {
        if !is_domain_allowed(&fetcher.allowed_domains, &seed) {
            return Err(ConfigError::Validation(format!(
                "Seed URL '{}' is outside allowed-domains",
                seed
            )));
        }
    }

    Ok(())
}

/// Validates embedded JSON markers
fn validate_extract_config(config: &ExtractConfig) -> Result<(), ConfigError> {
    let markers = [
        ("start-marker", &config.start_marker),
        ("end-marker", &config.end_marker),
        ("store-marker", &config.store_marker),
    ];

    for (name, marker) in markers {
        if marker.is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    Ok(())
}

/// Validates a domain pattern (supports wildcards)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    validate_domain_string(pattern.strip_prefix("*.").unwrap_or(pattern))
}

/// Validates a domain string (without wildcard prefix)
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with(['.', '-']) || domain.ends_with(['.', '-']) {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    // "localhost" and the mock servers on 127.0.0.1 are legitimate targets
    if !domain.contains('.') && domain != "localhost" {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' must contain at least one dot (e.g., 'yahoo.com')",
            domain
        )));
    }

    Ok(())
}
