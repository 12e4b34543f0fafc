//! Integration tests for the crawler
//!
//! Most tests crawl an in-memory link graph through a fake downloader that
//! records every call and the per-host concurrency it observes. The last
//! tests use wiremock to run the full cycle over HTTP.

use async_trait::async_trait;
use layercrawl::config::{FetchConfig, UserAgentConfig};
use layercrawl::{
    CrawlError, Crawler, Document, Downloader, ErrorKind, ExtractError, FetchError,
    HttpDownloader,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// What the fake web serves for one URL
#[derive(Clone)]
enum Page {
    Links(Vec<&'static str>),
    BrokenLinks,
    Fails,
    Hangs,
}

struct FakeDocument {
    links: Result<Vec<String>, ExtractError>,
}

impl Document for FakeDocument {
    fn extract_links(&self) -> Result<Vec<String>, ExtractError> {
        self.links.clone()
    }
}

#[derive(Default)]
struct Activity {
    calls: Vec<String>,
    in_flight: HashMap<String, usize>,
    max_in_flight: HashMap<String, usize>,
}

/// In-memory web with call instrumentation
struct FakeWeb {
    pages: HashMap<&'static str, Page>,
    latency: Duration,
    activity: Mutex<Activity>,
}

impl FakeWeb {
    fn new(pages: Vec<(&'static str, Page)>) -> Arc<Self> {
        Self::with_latency(pages, Duration::ZERO)
    }

    fn with_latency(pages: Vec<(&'static str, Page)>, latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            pages: pages.into_iter().collect(),
            latency,
            activity: Mutex::new(Activity::default()),
        })
    }

    fn calls(&self) -> Vec<String> {
        self.activity.lock().unwrap().calls.clone()
    }

    fn max_in_flight(&self, host: &str) -> usize {
        self.activity
            .lock()
            .unwrap()
            .max_in_flight
            .get(host)
            .copied()
            .unwrap_or(0)
    }

    fn enter(&self, url: &str) -> String {
        let host = url::Url::parse(url)
            .unwrap()
            .host_str()
            .unwrap()
            .to_string();
        let mut activity = self.activity.lock().unwrap();
        activity.calls.push(url.to_string());
        let current = activity.in_flight.entry(host.clone()).or_insert(0);
        *current += 1;
        let current = *current;
        let max = activity.max_in_flight.entry(host.clone()).or_insert(0);
        *max = (*max).max(current);
        host
    }

    fn leave(&self, host: &str) {
        let mut activity = self.activity.lock().unwrap();
        if let Some(current) = activity.in_flight.get_mut(host) {
            *current -= 1;
        }
    }
}

#[async_trait]
impl Downloader for FakeWeb {
    async fn download(&self, url: &str) -> Result<Box<dyn Document>, FetchError> {
        let host = self.enter(url);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let page = self.pages.get(url).cloned();
        let outcome = match page {
            Some(Page::Links(links)) => Ok(Box::new(FakeDocument {
                links: Ok(links.into_iter().map(String::from).collect()),
            }) as Box<dyn Document>),
            Some(Page::BrokenLinks) => Ok(Box::new(FakeDocument {
                links: Err(ExtractError::Other("unparseable body".to_string())),
            }) as Box<dyn Document>),
            Some(Page::Hangs) => {
                self.leave(&host);
                std::future::pending::<()>().await;
                unreachable!()
            }
            Some(Page::Fails) | None => Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            }),
        };

        self.leave(&host);
        outcome
    }
}

fn crawler_for(web: &Arc<FakeWeb>, per_host: usize) -> Crawler {
    let downloader: Arc<dyn Downloader> = web.clone();
    Crawler::new(downloader, 8, 4, per_host).unwrap()
}

fn sorted(urls: &[String]) -> Vec<&str> {
    let mut urls: Vec<&str> = urls.iter().map(String::as_str).collect();
    urls.sort_unstable();
    urls
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_single_layer_downloads_only_seed() {
    let web = FakeWeb::new(vec![("http://a/", Page::Links(vec!["http://a/x"]))]);
    let crawler = crawler_for(&web, 2);

    let result = crawler.download("http://a/", 1).await;

    assert_eq!(result.downloaded, vec!["http://a/".to_string()]);
    assert!(result.errors.is_empty());
    assert_eq!(result.frontier_sizes, vec![1]);
    assert!(result.is_complete());
    assert_eq!(web.calls(), vec!["http://a/".to_string()]);

    crawler.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_second_layer_follows_links_across_hosts() {
    let web = FakeWeb::new(vec![
        ("http://a/", Page::Links(vec!["http://a/x", "http://b/y"])),
        ("http://a/x", Page::Links(vec![])),
        ("http://b/y", Page::Links(vec![])),
    ]);
    let crawler = crawler_for(&web, 2);

    let result = crawler.download("http://a/", 2).await;

    assert_eq!(
        sorted(&result.downloaded),
        vec!["http://a/", "http://a/x", "http://b/y"]
    );
    assert!(result.errors.is_empty());
    assert_eq!(result.frontier_sizes, vec![1, 2]);
    assert_eq!(web.calls().len(), 3);

    crawler.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_restricted_crawl_never_dispatches_other_hosts() {
    let web = FakeWeb::new(vec![
        ("http://a/", Page::Links(vec!["http://a/x", "http://b/y"])),
        ("http://a/x", Page::Links(vec!["http://b/z"])),
        ("http://b/y", Page::Links(vec![])),
    ]);
    let crawler = crawler_for(&web, 2);

    let result = crawler.download_restricted("http://a/", 3, ["a"]).await;

    assert_eq!(sorted(&result.downloaded), vec!["http://a/", "http://a/x"]);
    assert!(result.errors.is_empty());
    assert!(web.calls().iter().all(|url| url.starts_with("http://a/")));

    crawler.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_restricted_crawl_skips_disallowed_seed() {
    let web = FakeWeb::new(vec![("http://b/", Page::Links(vec![]))]);
    let crawler = crawler_for(&web, 2);

    let result = crawler.download_restricted("http://b/", 2, ["a"]).await;

    assert!(result.downloaded.is_empty());
    assert!(result.errors.is_empty());
    assert!(web.calls().is_empty());

    crawler.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_failed_seed_is_recorded_without_extraction() {
    let web = FakeWeb::new(vec![("http://a/", Page::Fails)]);
    let crawler = crawler_for(&web, 2);

    let result = crawler.download("http://a/", 3).await;

    assert!(result.downloaded.is_empty());
    assert_eq!(result.errors.len(), 1);
    assert_eq!(
        result.errors.get("http://a/"),
        Some(&CrawlError::Fetch(FetchError::Status {
            url: "http://a/".to_string(),
            status: 404,
        }))
    );
    // No second layer: nothing was extracted
    assert_eq!(result.frontier_sizes, vec![1]);
    assert_eq!(web.calls().len(), 1);

    crawler.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_extraction_failure_keyed_by_source_page() {
    let web = FakeWeb::new(vec![
        ("http://a/", Page::Links(vec!["http://a/broken"])),
        ("http://a/broken", Page::BrokenLinks),
    ]);
    let crawler = crawler_for(&web, 2);

    let result = crawler.download("http://a/", 3).await;

    assert_eq!(sorted(&result.downloaded), vec!["http://a/", "http://a/broken"]);
    let error = result.errors.get("http://a/broken").unwrap();
    assert_eq!(error.kind(), ErrorKind::Extraction);
    assert_eq!(result.frontier_sizes, vec![1, 1]);

    crawler.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_malformed_links_are_recorded() {
    let web = FakeWeb::new(vec![(
        "http://a/",
        Page::Links(vec!["not a url", "http://a/ok"]),
    )]);
    let crawler = crawler_for(&web, 2);

    let result = crawler.download("http://a/", 2).await;

    assert_eq!(
        result.errors.get("not a url").map(CrawlError::kind),
        Some(ErrorKind::Malformed)
    );
    // http://a/ok is not in the fake web, so it fails with a 404
    assert_eq!(
        result.errors.get("http://a/ok").map(CrawlError::kind),
        Some(ErrorKind::Fetch)
    );
    assert!(!web.calls().contains(&"not a url".to_string()));

    crawler.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_no_url_is_downloaded_twice() {
    let web = FakeWeb::new(vec![
        (
            "http://a/",
            Page::Links(vec!["http://a/x", "http://a/y", "http://a/", "http://b/"]),
        ),
        ("http://a/x", Page::Links(vec!["http://a/y", "http://a/", "http://b/"])),
        ("http://a/y", Page::Links(vec!["http://a/x", "http://b/"])),
        ("http://b/", Page::Links(vec!["http://a/x", "http://b/", "http://b/z"])),
        ("http://b/z", Page::Links(vec!["http://a/"])),
    ]);
    let crawler = crawler_for(&web, 2);

    let result = crawler.download("http://a/", 4).await;

    let calls = web.calls();
    let distinct: HashSet<&String> = calls.iter().collect();
    assert_eq!(distinct.len(), calls.len());

    let mut reported: Vec<&String> = result
        .downloaded
        .iter()
        .chain(result.errors.keys())
        .collect();
    let total = reported.len();
    reported.sort_unstable();
    reported.dedup();
    assert_eq!(reported.len(), total);
    assert_eq!(result.downloaded.len(), 5);

    crawler.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_layer_isolation_respects_depth() {
    let web = FakeWeb::new(vec![
        ("http://a/", Page::Links(vec!["http://a/1"])),
        ("http://a/1", Page::Links(vec!["http://a/2"])),
        ("http://a/2", Page::Links(vec!["http://a/3"])),
    ]);
    let crawler = crawler_for(&web, 2);

    let result = crawler.download("http://a/", 2).await;

    assert_eq!(sorted(&result.downloaded), vec!["http://a/", "http://a/1"]);
    assert!(!web.calls().contains(&"http://a/2".to_string()));
    assert_eq!(result.frontier_sizes, vec![1, 1]);

    crawler.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_per_host_concurrency_is_bounded() {
    let a_pages: Vec<&'static str> = (0..12)
        .map(|i| &*Box::leak(format!("http://a/{}", i).into_boxed_str()))
        .collect();
    let b_pages: Vec<&'static str> = (0..12)
        .map(|i| &*Box::leak(format!("http://b/{}", i).into_boxed_str()))
        .collect();

    let mut hub_links = a_pages.clone();
    hub_links.extend(b_pages.iter().copied());

    let mut pages = vec![("http://hub/", Page::Links(hub_links))];
    pages.extend(a_pages.iter().map(|url| (*url, Page::Links(vec![]))));
    pages.extend(b_pages.iter().map(|url| (*url, Page::Links(vec![]))));

    let web = FakeWeb::with_latency(pages, Duration::from_millis(15));
    let crawler = crawler_for(&web, 2);

    let result = crawler.download("http://hub/", 2).await;

    assert_eq!(result.downloaded.len(), 25);
    assert!(web.max_in_flight("a") <= 2);
    assert!(web.max_in_flight("b") <= 2);
    assert!(web.max_in_flight("a") >= 1);

    crawler.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sequential_crawls_share_one_crawler() {
    let web = FakeWeb::new(vec![
        ("http://a/", Page::Links(vec!["http://a/x"])),
        ("http://a/x", Page::Links(vec![])),
    ]);
    let crawler = crawler_for(&web, 1);

    let first = crawler.download("http://a/", 2).await;
    let second = crawler.download("http://a/", 2).await;

    // Each crawl has its own visited set
    assert_eq!(sorted(&first.downloaded), sorted(&second.downloaded));
    assert_eq!(web.calls().len(), 4);

    crawler.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_close_abandons_running_crawl() {
    let web = FakeWeb::new(vec![
        ("http://a/", Page::Links(vec!["http://a/stuck", "http://a/fine"])),
        ("http://a/stuck", Page::Hangs),
        ("http://a/fine", Page::Links(vec![])),
    ]);
    let crawler = Arc::new(crawler_for(&web, 2));

    let running = {
        let crawler = Arc::clone(&crawler);
        tokio::spawn(async move { crawler.download("http://a/", 3).await })
    };

    // Wait until the stuck page has been dispatched
    for _ in 0..200 {
        if web.calls().contains(&"http://a/stuck".to_string()) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    crawler.close().await;
    let result = tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .expect("crawl did not return after close")
        .unwrap();

    assert!(result.abandoned);
    assert!(result.downloaded.contains(&"http://a/".to_string()));
    assert!(!result.downloaded.contains(&"http://a/stuck".to_string()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_close_is_idempotent() {
    let web = FakeWeb::new(vec![("http://a/", Page::Links(vec![]))]);
    let crawler = crawler_for(&web, 2);

    crawler.close().await;
    crawler.close().await;
    assert!(crawler.is_closed());

    let result = crawler.download("http://a/", 2).await;
    assert!(result.abandoned);
    assert!(web.calls().is_empty());
}

fn test_user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    }
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_raw(body.to_string(), "text/html; charset=utf-8")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_full_crawl_over_http() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><body>
                <a href="/about">About</a>
                <a href="/missing">Missing</a>
                <a href="/about#team">About again</a>
                <a href="mailto:someone@example.com">Mail</a>
            </body></html>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(html(r#"<a href="/deep">Deep</a><a href="/">Home</a>"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/deep"))
        .respond_with(html(r#"<a href="/deeper">Deeper</a>"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/deeper"))
        .respond_with(html("<p>too deep</p>"))
        .expect(0)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let downloader = HttpDownloader::new(&FetchConfig::default(), &test_user_agent()).unwrap();
    let crawler = Crawler::new(Arc::new(downloader), 4, 2, 2).unwrap();

    let seed = format!("{}/", base_url);
    let result = crawler.download(&seed, 3).await;

    let mut expected = vec![
        format!("{}/", base_url),
        format!("{}/about", base_url),
        format!("{}/deep", base_url),
    ];
    expected.sort();
    let mut downloaded = result.downloaded.clone();
    downloaded.sort();
    assert_eq!(downloaded, expected);

    let missing = format!("{}/missing", base_url);
    assert!(matches!(
        result.errors.get(&missing),
        Some(CrawlError::Fetch(FetchError::Status { status: 404, .. }))
    ));
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.frontier_sizes, vec![1, 2, 1]);

    crawler.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_http_crawl_rejects_non_html() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(r#"<a href="/data.json">Data</a>"#))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/data.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("{}", "application/json"),
        )
        .mount(&mock_server)
        .await;

    let downloader = HttpDownloader::new(&FetchConfig::default(), &test_user_agent()).unwrap();
    let crawler = Crawler::new(Arc::new(downloader), 2, 1, 1).unwrap();

    let result = crawler.download(&format!("{}/", mock_server.uri()), 2).await;

    assert_eq!(result.downloaded.len(), 1);
    let data_url = format!("{}/data.json", mock_server.uri());
    assert!(matches!(
        result.errors.get(&data_url),
        Some(CrawlError::Fetch(FetchError::ContentMismatch { .. }))
    ));

    crawler.close().await;
}
