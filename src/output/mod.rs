//! Output module for crawl results and reports
//!
//! This module handles:
//! - The [`CrawlResult`] returned by every crawl
//! - Aggregating results into [`CrawlStatistics`]
//! - Printing results to stdout and writing markdown summaries

mod markdown;
mod report;
pub mod stats;

pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use report::CrawlResult;
pub use stats::{print_result, print_statistics, CrawlStatistics};

use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
