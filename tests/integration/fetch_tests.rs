//! Integration tests for the fetcher and single-site crawler

use sitescope::config::{CrawlerConfig, UserAgentConfig};
use sitescope::crawler::{CancelToken, FetchErrorKind, FetchStatus, HttpFetcher, PageFetcher, SiteCrawler};
use sitescope::targets::Target;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_fetcher(timeout_secs: u64) -> HttpFetcher {
    HttpFetcher::new(
        &UserAgentConfig::default(),
        Duration::from_secs(timeout_secs),
    )
    .expect("Failed to build fetcher")
}

fn html_page(title: &str, body: &str) -> ResponseTemplate {
    // set_body_string would pin the content type to text/plain, which the
    // fetcher rejects as non-HTML.
    ResponseTemplate::new(200).set_body_raw(
        format!(
            "<html><head><title>{}</title></head><body>{}</body></html>",
            title, body
        )
        .into_bytes(),
        "text/html",
    )
}

#[tokio::test]
async fn test_fetch_success_extracts_title_text_and_links() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(
            "Home",
            r#"<p>Welcome to our product page.</p> <a href="/pricing">Pricing</a>"#,
        ))
        .mount(&server)
        .await;

    let fetcher = test_fetcher(5);
    let url = Url::parse(&format!("{}/", server.uri())).unwrap();
    let result = fetcher.fetch(&url).await;

    match result.status {
        FetchStatus::Success { text, title, links } => {
            assert_eq!(title.as_deref(), Some("Home"));
            assert!(text.contains("Welcome to our product page."));
            assert!(links.iter().any(|l| l.ends_with("/pricing")));
        }
        FetchStatus::Failure { kind, message } => {
            panic!("Expected success, got {} ({})", kind, message)
        }
    }
}

#[tokio::test]
async fn test_fetch_classifies_http_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let fetcher = test_fetcher(5);

    let gone = fetcher
        .fetch(&Url::parse(&format!("{}/gone", server.uri())).unwrap())
        .await;
    assert_eq!(gone.error_kind(), Some(FetchErrorKind::Http { status: 404 }));
    assert!(!gone.error_kind().unwrap().is_transient());

    let broken = fetcher
        .fetch(&Url::parse(&format!("{}/broken", server.uri())).unwrap())
        .await;
    assert_eq!(
        broken.error_kind(),
        Some(FetchErrorKind::Http { status: 503 })
    );
    assert!(broken.error_kind().unwrap().is_transient());
}

#[tokio::test]
async fn test_fetch_rejects_non_html_content() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/report.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(vec![0x25, 0x50, 0x44, 0x46], "application/pdf"),
        )
        .mount(&server)
        .await;

    let fetcher = test_fetcher(5);
    let result = fetcher
        .fetch(&Url::parse(&format!("{}/report.pdf", server.uri())).unwrap())
        .await;
    assert_eq!(result.error_kind(), Some(FetchErrorKind::Parse));
}

#[tokio::test]
async fn test_fetch_connection_refused() {
    // Nothing listens on port 1.
    let fetcher = test_fetcher(2);
    let result = fetcher
        .fetch(&Url::parse("http://127.0.0.1:1/").unwrap())
        .await;
    assert_eq!(result.error_kind(), Some(FetchErrorKind::Connection));
}

#[tokio::test]
async fn test_site_crawl_respects_budget_and_dedups_spellings() {
    let server = MockServer::start().await;
    let base = server.uri();

    // 15 real links plus spelling variants of the first one: the crawl must
    // fetch exactly 10 distinct pages (seed + 9) and never fetch a variant
    // as a separate page.
    let mut links = String::new();
    for i in 0..15 {
        links.push_str(&format!(r#"<a href="{}/page{}">p{}</a> "#, base, i, i));
    }
    links.push_str(&format!(
        r#"<a href="{base}/page0/">dup</a> <a href="{base}/page0?utm_source=nav">dup</a> <a href="{base}/page0#section">dup</a>"#,
    ));

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("Home", &links))
        .mount(&server)
        .await;
    for i in 0..15 {
        Mock::given(method("GET"))
            .and(path(format!("/page{}", i)))
            .respond_with(html_page(&format!("Page {}", i), "Some page body text."))
            .mount(&server)
            .await;
    }

    let config = CrawlerConfig {
        page_budget: 10,
        page_concurrency: 4,
        ..CrawlerConfig::default()
    };
    let crawler = SiteCrawler::new(Arc::new(test_fetcher(5)), config);
    let target = Target {
        name: "Acme".to_string(),
        seed_url: Url::parse(&format!("{}/", base)).unwrap(),
    };

    let report = crawler
        .crawl(&target, &CancelToken::new(), Arc::default())
        .await;

    assert_eq!(report.pages.len(), 10);
    assert_eq!(report.succeeded_count + report.failed_count, 10);

    let requested: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| r.url.path().to_string())
        .collect();
    assert_eq!(requested.len(), 10);
    let distinct: HashSet<&String> = requested.iter().collect();
    assert_eq!(distinct.len(), 10, "a URL was fetched twice: {:?}", requested);
}

#[tokio::test]
async fn test_out_of_domain_link_never_fetched() {
    let site = MockServer::start().await;
    let other = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(
            "Home",
            &format!(
                r#"<a href="{}/internal">in</a> <a href="{}/external">out</a>"#,
                site.uri(),
                other.uri()
            ),
        ))
        .mount(&site)
        .await;
    Mock::given(method("GET"))
        .and(path("/internal"))
        .respond_with(html_page("Internal", "Internal page body."))
        .mount(&site)
        .await;
    Mock::given(method("GET"))
        .respond_with(html_page("External", "Should never be fetched."))
        .expect(0)
        .mount(&other)
        .await;

    let crawler = SiteCrawler::new(Arc::new(test_fetcher(5)), CrawlerConfig::default());
    let target = Target {
        name: "Acme".to_string(),
        seed_url: Url::parse(&format!("{}/", site.uri())).unwrap(),
    };

    crawler
        .crawl(&target, &CancelToken::new(), Arc::default())
        .await;
    // expect(0) on the external server is verified when it drops.
}

#[tokio::test]
async fn test_transient_failures_retried_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3) // 1 initial attempt + 2 retries
        .mount(&server)
        .await;

    let config = CrawlerConfig {
        fetch_retries: 2,
        ..CrawlerConfig::default()
    };
    let crawler = SiteCrawler::new(Arc::new(test_fetcher(5)), config);
    let target = Target {
        name: "Flaky".to_string(),
        seed_url: Url::parse(&format!("{}/", server.uri())).unwrap(),
    };

    let report = crawler
        .crawl(&target, &CancelToken::new(), Arc::default())
        .await;
    assert!(report.all_failed());
}
