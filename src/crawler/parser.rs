//! HTML link extraction
//!
//! [`HtmlDocument`] is the page type produced by [`super::HttpDownloader`].
//! It keeps the raw body and the URL it was served from, and only parses
//! when the crawler asks for links, on an extraction worker.

use crate::crawler::traits::Document;
use crate::ExtractError;
use scraper::{Html, Selector};
use url::Url;

/// A downloaded HTML page
#[derive(Debug, Clone)]
pub struct HtmlDocument {
    /// URL the body was served from (after redirects); relative links resolve against it
    base_url: String,
    body: String,
}

impl HtmlDocument {
    pub fn new(base_url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            body: body.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Document for HtmlDocument {
    fn extract_links(&self) -> Result<Vec<String>, ExtractError> {
        let base_url = Url::parse(&self.base_url)
            .map_err(|_| ExtractError::InvalidBase(self.base_url.clone()))?;
        extract_links(&self.body, &base_url)
    }
}

/// Extracts all followable links from an HTML body
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` anywhere in the document
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links and data URIs
/// - Fragment-only links (same-page anchors)
/// - Anything that is not http(s) after resolution
///
/// Fragments are stripped from the resolved URLs. Duplicates are kept; the
/// crawler's visited set takes care of them.
///
/// # Example
///
/// ```
/// use layercrawl::crawler::extract_links;
/// use url::Url;
///
/// let html = r#"<html><body><a href="/page#top">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let links = extract_links(html, &base_url).unwrap();
/// assert_eq!(links, vec!["https://example.com/page".to_string()]);
/// ```
pub fn extract_links(html: &str, base_url: &Url) -> Result<Vec<String>, ExtractError> {
    let document = Html::parse_document(html);
    let mut links = Vec::new();

    let anchors = selector("a[href]")?;
    for element in document.select(&anchors) {
        if element.value().attr("download").is_some() {
            continue;
        }

        if let Some(href) = element.value().attr("href") {
            if let Some(absolute_url) = resolve_link(href, base_url) {
                links.push(absolute_url);
            }
        }
    }

    let canonical = selector("link[rel='canonical'][href]")?;
    for element in document.select(&canonical) {
        if let Some(absolute_url) = element
            .value()
            .attr("href")
            .and_then(|href| resolve_link(href, base_url))
        {
            links.push(absolute_url);
        }
    }

    Ok(links)
}

fn selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::Selector(format!("{}: {:?}", css, e)))
}

/// Resolves a link href to an absolute URL
///
/// Returns None if the link should be excluded.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    let mut absolute_url = base_url.join(href).ok()?;
    if absolute_url.scheme() != "http" && absolute_url.scheme() != "https" {
        return None;
    }
    absolute_url.set_fragment(None);

    Some(absolute_url.into())
}
