//! Earnings-Ripple main entry point
//!
//! This is the command-line interface for the Earnings-Ripple record harvester.

use anyhow::Context;
use clap::Parser;
use earnings_ripple::config::{load_config_with_hash, seed_urls, Config};
use earnings_ripple::crawler::crawl;
use earnings_ripple::output::{emit_report, OutputFormat};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Earnings-Ripple: an earnings-calendar record harvester
///
/// Earnings-Ripple fetches an earnings listing, visits the quote page of
/// every listed ticker, and prints one merged record per ticker.
#[derive(Parser, Debug)]
#[command(name = "earnings-ripple")]
#[command(version)]
#[command(about = "An earnings-calendar record harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,

    /// Report format; overrides [output] format
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Report file; overrides [output] path (stdout otherwise)
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = match load_config_with_hash(&cli.config) {
        Ok(loaded) => loaded,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e).with_context(|| format!("loading {}", cli.config.display()));
        }
    };
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if cli.dry_run {
        handle_dry_run(&config)
    } else {
        handle_crawl(config, cli.format, cli.output).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("earnings_ripple=info,warn"),
            1 => EnvFilter::new("earnings_ripple=debug,info"),
            2 => EnvFilter::new("earnings_ripple=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    // Logs go to stderr so the report can be piped
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Earnings-Ripple Dry Run ===\n");

    println!("Crawler Configuration:");
    println!(
        "  Max concurrent fetches: {}",
        config.crawler.max_concurrent_fetches
    );
    println!("  Max parallelism per domain: {}", config.crawler.max_parallelism);
    println!("  Minimum delay: {}ms", config.crawler.min_delay_ms);
    println!("  Fan-out: {:?}", config.crawler.fan_out);
    println!(
        "  Retries: {} (delay {}ms)",
        config.crawler.max_retries, config.crawler.retry_delay_ms
    );
    match config.crawler.crawl_deadline() {
        Some(deadline) => println!("  Deadline: {}s", deadline.as_secs()),
        None => println!("  Deadline: none"),
    }

    println!("\nFetcher:");
    println!("  User agent policy: {:?}", config.fetcher.user_agent_policy);
    println!("  Request timeout: {}s", config.fetcher.request_timeout_secs);
    if config.fetcher.allowed_domains.is_empty() {
        println!("  Allowed domains: any");
    } else {
        println!("  Allowed domains: {}", config.fetcher.allowed_domains.join(", "));
    }

    println!("\nExtraction:");
    println!(
        "  Markers: {} .. {} ({:?})",
        config.extract.start_marker, config.extract.end_marker, config.extract.boundary
    );
    if let Some(path) = config.source.follow_up() {
        println!("  Follow-up path: {}", path);
    }

    let seeds = seed_urls(&config.source)?;
    println!("\nSeeds ({}):", seeds.len());
    for seed in &seeds {
        println!("  - {}", seed);
    }

    println!("\nOutput:");
    println!("  Format: {:?}", config.output.format);
    println!("  Path: {}", config.output.output_path().unwrap_or("stdout"));

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: Config,
    format: Option<OutputFormat>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let format = format.unwrap_or(config.output.format);
    let path = output.or_else(|| config.output.output_path().map(PathBuf::from));

    tracing::info!("Starting crawl...");
    let report = match crawl(config).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };

    emit_report(&report, format, path.as_deref())
        .context("writing crawl report")?;
    tracing::info!(
        "Crawl completed: {} records, {} failures",
        report.records.len(),
        report.failures.len()
    );
    Ok(())
}
