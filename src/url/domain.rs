use crate::{UrlError, UrlResult};
use url::Url;

/// Extracts the host from a URL string
///
/// The host is returned as the `url` crate reports it: lowercased for
/// domain names, without the port. Nothing else about the URL is normalized.
///
/// # Errors
///
/// * `UrlError::Parse` - the string is not an absolute URL
/// * `UrlError::MissingHost` - the URL parses but carries no host (e.g. `mailto:`)
///
/// # Examples
///
/// ```
/// use layercrawl::url::host_of;
///
/// assert_eq!(host_of("https://Example.COM/path").unwrap(), "example.com");
/// assert_eq!(host_of("http://a/").unwrap(), "a");
/// assert!(host_of("not a url").is_err());
/// ```
pub fn host_of(url: &str) -> UrlResult<String> {
    let parsed = Url::parse(url).map_err(|e| UrlError::Parse {
        url: url.to_string(),
        message: e.to_string(),
    })?;

    parsed
        .host_str()
        .filter(|host| !host.is_empty())
        .map(|host| host.to_lowercase())
        .ok_or_else(|| UrlError::MissingHost(url.to_string()))
}
