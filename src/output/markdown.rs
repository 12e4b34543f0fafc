//! Markdown summary generation
//!
//! This module generates human-readable markdown summaries of crawl results,
//! including statistics, the per-layer frontier and an error report.

use crate::output::{CrawlResult, CrawlStatistics, OutputResult};
use chrono::Utc;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes a markdown summary of a crawl to `output_path`
///
/// # Arguments
///
/// * `result` - The crawl result
/// * `stats` - Statistics derived from `result`
/// * `output_path` - Path where the markdown file should be written
pub fn generate_markdown_summary(
    result: &CrawlResult,
    stats: &CrawlStatistics,
    output_path: &Path,
) -> OutputResult<()> {
    let markdown = format_markdown_summary(result, stats);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a crawl result as markdown
pub fn format_markdown_summary(result: &CrawlResult, stats: &CrawlStatistics) -> String {
    let mut md = String::new();

    md.push_str("# Layercrawl Summary\n\n");
    md.push_str(&format!(
        "- **Generated**: {}\n",
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    ));
    md.push_str(&format!(
        "- **Status**: {}\n\n",
        if result.abandoned {
            "abandoned"
        } else {
            "completed"
        }
    ));

    md.push_str("## Overview\n\n");
    md.push_str(&format!("- **Pages Downloaded**: {}\n", stats.downloaded));
    md.push_str(&format!("- **Pages With Errors**: {}\n", stats.errors));
    md.push_str(&format!("- **Unique Hosts**: {}\n", stats.unique_hosts));
    md.push_str(&format!("- **Layers**: {}\n", stats.layers));
    md.push_str(&format!(
        "- **Success Rate**: {:.2}%\n\n",
        stats.success_rate()
    ));

    if !result.frontier_sizes.is_empty() {
        md.push_str("## Layers\n\n");
        md.push_str("| Layer | Frontier |\n");
        md.push_str("|-------|----------|\n");
        for (index, size) in result.frontier_sizes.iter().enumerate() {
            md.push_str(&format!("| {} | {} |\n", index + 1, size));
        }
        md.push('\n');
    }

    if !stats.errors_by_kind.is_empty() {
        md.push_str("## Error Summary\n\n");
        md.push_str("| Error Type | Count |\n");
        md.push_str("|------------|-------|\n");
        for (kind, count) in &stats.errors_by_kind {
            md.push_str(&format!("| {:?} | {} |\n", kind, count));
        }
        md.push('\n');
    }

    if !result.errors.is_empty() {
        md.push_str("## Errors\n\n");
        md.push_str("| URL | Error |\n");
        md.push_str("|-----|-------|\n");
        for url in result.failed_urls() {
            if let Some(error) = result.errors.get(url) {
                md.push_str(&format!(
                    "| {} | {} |\n",
                    escape_cell(url),
                    escape_cell(&error.to_string())
                ));
            }
        }
        md.push('\n');
    }

    md
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
