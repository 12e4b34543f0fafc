//! Configuration module for Layercrawl
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section is optional; missing keys fall back to the defaults used by the
//! command-line tool (depth 2, 8 downloaders, 8 extractors, 2 downloads per host).
//!
//! # Example
//!
//! ```no_run
//! use layercrawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawl.toml")).unwrap();
//! println!("Crawler will use depth: {}", config.crawler.depth);
//! ```

mod parser;
mod types;
pub mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, FetchConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
