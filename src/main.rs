//! Layercrawl main entry point
//!
//! This is the command-line interface for the layercrawl breadth-first crawler.

use anyhow::Context;
use clap::Parser;
use layercrawl::config::{load_config_with_hash, validate, Config};
use layercrawl::output::{
    generate_markdown_summary, print_result, print_statistics, CrawlStatistics,
};
use layercrawl::{Crawler, HttpDownloader};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Layercrawl: a layered, host-throttled web crawler
///
/// Downloads every page reachable from URL within DEPTH link hops,
/// one layer at a time, with at most PER_HOST downloads in flight
/// against any single host.
#[derive(Parser, Debug)]
#[command(name = "layercrawl")]
#[command(version)]
#[command(about = "A layered, host-throttled web crawler", long_about = None)]
struct Cli {
    /// Seed URL
    #[arg(value_name = "URL")]
    url: String,

    /// Number of layers to crawl, the seed's layer included
    #[arg(value_name = "DEPTH")]
    depth: Option<usize>,

    /// Number of download workers
    #[arg(value_name = "DOWNLOADERS")]
    downloaders: Option<usize>,

    /// Number of link extraction workers
    #[arg(value_name = "EXTRACTORS")]
    extractors: Option<usize>,

    /// Maximum concurrent downloads per host
    #[arg(value_name = "PER_HOST")]
    per_host: Option<usize>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Restrict the crawl to this host (repeatable; replaces the config's list)
    #[arg(long = "host", value_name = "HOST")]
    hosts: Vec<String>,

    /// Write a markdown summary to this path
    #[arg(long, value_name = "FILE")]
    summary: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = resolve_config(&cli)?;

    let crawler = build_crawler(&config).context("Failed to start crawler")?;
    let outcome = run_crawl(&crawler, &cli, &config).await;

    // Close even if reporting failed
    crawler.close().await;
    outcome.context("Crawl reporting failed")
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("layercrawl=info,warn"),
            1 => EnvFilter::new("layercrawl=debug,info"),
            2 => EnvFilter::new("layercrawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the config file (if any) and applies command-line overrides
fn resolve_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    if let Some(depth) = cli.depth {
        config.crawler.depth = depth;
    }
    if let Some(downloaders) = cli.downloaders {
        config.crawler.downloaders = downloaders;
    }
    if let Some(extractors) = cli.extractors {
        config.crawler.extractors = extractors;
    }
    if let Some(per_host) = cli.per_host {
        config.crawler.per_host = per_host;
    }
    if !cli.hosts.is_empty() {
        config.allowed_hosts = cli.hosts.clone();
    }

    validate(&config).context("Invalid crawl settings")?;
    Ok(config)
}

/// Builds the HTTP downloader and the crawler's pools
fn build_crawler(config: &Config) -> layercrawl::Result<Crawler> {
    let downloader = HttpDownloader::new(&config.fetch, &config.user_agent)?;
    Crawler::from_config(Arc::new(downloader), &config.crawler)
}

/// Runs one crawl and reports it
async fn run_crawl(crawler: &Crawler, cli: &Cli, config: &Config) -> layercrawl::Result<()> {
    let depth = config.crawler.depth;
    tracing::info!(
        "Crawling {} to depth {} ({} downloaders, {} extractors, {} per host)",
        cli.url,
        depth,
        config.crawler.downloaders,
        config.crawler.extractors,
        config.crawler.per_host
    );

    let result = match config.host_filter() {
        Some(hosts) => {
            tracing::info!("Restricted to hosts: {}", hosts.join(", "));
            crawler
                .download_restricted(&cli.url, depth, hosts.iter().cloned())
                .await
        }
        None => crawler.download(&cli.url, depth).await,
    };

    let stats = CrawlStatistics::from_result(&result);
    print_result(&result);
    print_statistics(&stats);

    if let Some(path) = &cli.summary {
        generate_markdown_summary(&result, &stats, path)?;
        println!("\n✓ Summary written to: {}", path.display());
    }

    Ok(())
}
