//! URL handling module for Layercrawl
//!
//! The crawl core treats URLs as opaque strings and never normalizes them.
//! The only thing it needs from a URL is its host, which keys both the
//! per-host throttles and the optional host allow-list.

mod domain;

pub use domain::host_of;
