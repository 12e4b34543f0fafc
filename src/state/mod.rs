//! State module for tracking one crawl invocation
//!
//! [`CrawlState`] lives for a single `download` call. It holds the visited
//! set, the accumulated successes and errors, the optional host allow-list,
//! and the lazily created per-host throttles.

mod crawl_state;

pub use crawl_state::CrawlState;
