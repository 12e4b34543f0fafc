//! Statistics derived from a crawl result
//!
//! This module aggregates a [`CrawlResult`] into counts and prints both the
//! raw result and the statistics to stdout.

use crate::output::CrawlResult;
use crate::url::host_of;
use crate::ErrorKind;
use std::collections::{BTreeMap, HashSet};

/// Crawl statistics summary
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlStatistics {
    /// Number of successfully fetched pages
    pub downloaded: usize,

    /// Number of URLs with a recorded error
    pub errors: usize,

    /// Error count per error kind
    pub errors_by_kind: BTreeMap<ErrorKind, usize>,

    /// Distinct hosts across downloaded and failed URLs
    pub unique_hosts: usize,

    /// Number of layers processed
    pub layers: usize,

    /// Frontier size of each layer
    pub frontier_sizes: Vec<usize>,

    /// Whether the crawl was abandoned by `close`
    pub abandoned: bool,
}

impl CrawlStatistics {
    /// Aggregates a crawl result
    ///
    /// URLs without a derivable host (malformed ones) do not count towards
    /// `unique_hosts`.
    pub fn from_result(result: &CrawlResult) -> Self {
        let mut errors_by_kind = BTreeMap::new();
        for error in result.errors.values() {
            *errors_by_kind.entry(error.kind()).or_insert(0) += 1;
        }

        let hosts: HashSet<String> = result
            .downloaded
            .iter()
            .chain(result.errors.keys())
            .filter_map(|url| host_of(url).ok())
            .collect();

        Self {
            downloaded: result.downloaded.len(),
            errors: result.errors.len(),
            errors_by_kind,
            unique_hosts: hosts.len(),
            layers: result.frontier_sizes.len(),
            frontier_sizes: result.frontier_sizes.clone(),
            abandoned: result.abandoned,
        }
    }

    /// Share of attempted URLs that downloaded, as a percentage
    pub fn success_rate(&self) -> f64 {
        let attempted = self.downloaded + self.errors;
        if attempted == 0 {
            0.0
        } else {
            (self.downloaded as f64 / attempted as f64) * 100.0
        }
    }
}

/// Prints downloaded URLs and errors to stdout
pub fn print_result(result: &CrawlResult) {
    println!("{} pages downloaded successfully:", result.downloaded.len());
    for url in &result.downloaded {
        println!("{}", url);
    }
    println!();

    println!("{} pages downloaded with errors:", result.errors.len());
    for url in result.failed_urls() {
        if let Some(error) = result.errors.get(url) {
            println!("url: {} with error: {}", url, error);
        }
    }
    println!();
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Pages downloaded: {}", stats.downloaded);
    println!("  Pages with errors: {}", stats.errors);
    println!("  Unique hosts: {}", stats.unique_hosts);
    println!("  Layers processed: {}", stats.layers);
    if stats.abandoned {
        println!("  Crawl was abandoned before completion");
    }
    println!();

    if !stats.errors_by_kind.is_empty() {
        println!("Error Summary:");
        let mut kind_counts: Vec<_> = stats.errors_by_kind.iter().collect();
        kind_counts.sort_by(|a, b| b.1.cmp(a.1));

        for (kind, count) in kind_counts {
            println!("  {:?}: {}", kind, count);
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} pages successfully downloaded)",
        stats.success_rate(),
        stats.downloaded,
        stats.downloaded + stats.errors
    );
}
