//! HTTP downloader implementation
//!
//! This module provides the bundled [`Downloader`]:
//! - Building an HTTP client with a descriptive user agent string
//! - Following redirects up to a configured limit
//! - Classifying failures (status, timeout, connect, content type, body)
//!
//! It performs no retries. A failed fetch is reported once and the crawler
//! records it.

use crate::config::{FetchConfig, UserAgentConfig};
use crate::crawler::parser::HtmlDocument;
use crate::crawler::traits::{Document, Downloader};
use crate::FetchError;
use async_trait::async_trait;
use reqwest::{header, redirect::Policy, Client};
use std::time::Duration;

/// Downloads pages over HTTP(S) with `reqwest`
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    /// Builds a downloader from the fetch and user agent configuration
    ///
    /// # Example
    ///
    /// ```no_run
    /// use layercrawl::config::{FetchConfig, UserAgentConfig};
    /// use layercrawl::crawler::HttpDownloader;
    ///
    /// let downloader =
    ///     HttpDownloader::new(&FetchConfig::default(), &UserAgentConfig::default()).unwrap();
    /// ```
    pub fn new(fetch: &FetchConfig, user_agent: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(user_agent.header_value())
            .timeout(Duration::from_secs(fetch.request_timeout_secs))
            .connect_timeout(Duration::from_secs(fetch.connect_timeout_secs))
            .redirect(Policy::limited(fetch.max_redirects))
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self { client })
    }

    /// Fetches one URL and returns its HTML document
    ///
    /// | Condition | Result |
    /// |-----------|--------|
    /// | 2xx with `text/html` | `HtmlDocument` based at the final URL |
    /// | 2xx with another content type | `FetchError::ContentMismatch` |
    /// | Non-2xx status | `FetchError::Status` |
    /// | Timeout | `FetchError::Timeout` |
    /// | Connection failure | `FetchError::Connect` |
    /// | Anything else (redirect limit, body read) | `FetchError::Network` |
    pub async fn fetch(&self, url: &str) -> Result<HtmlDocument, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !is_html(&content_type) {
            return Err(FetchError::ContentMismatch {
                url: url.to_string(),
                content_type,
            });
        }

        let final_url = response.url().to_string();
        let body = response
            .text()
            .await
            .map_err(|e| classify_error(url, e))?;

        Ok(HtmlDocument::new(final_url, body))
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, url: &str) -> Result<Box<dyn Document>, FetchError> {
        let document = self.fetch(url).await?;
        Ok(Box::new(document))
    }
}

fn is_html(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    mime == "text/html" || mime == "application/xhtml+xml"
}

fn classify_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_connect() {
        FetchError::Connect {
            url: url.to_string(),
            message: error.to_string(),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}
