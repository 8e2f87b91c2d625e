//! End-to-end pipeline tests: scrape, chunk, index, query

use sitescope::config::{Config, UserAgentConfig};
use sitescope::crawler::{CancelToken, HttpFetcher};
use sitescope::index::{HashEmbedder, IndexError, IndexStore};
use sitescope::pipeline::run_pipeline;
use sitescope::targets::Target;
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config() -> Config {
    let toml = r#"
        [crawler]
        page-budget = 10
        page-concurrency = 4
        site-concurrency = 3
        fetch-timeout-secs = 5

        [chunking]
        min-text-len = 40

        [input]
        targets-path = "unused.csv"

        [output]
        database-path = "unused.db"
    "#;
    toml::from_str(toml).expect("test config must parse")
}

fn test_fetcher() -> Arc<HttpFetcher> {
    Arc::new(
        HttpFetcher::new(&UserAgentConfig::default(), Duration::from_secs(5))
            .expect("Failed to build fetcher"),
    )
}

fn target(name: &str, uri: &str) -> Target {
    Target {
        name: name.to_string(),
        seed_url: Url::parse(&format!("{}/", uri)).unwrap(),
    }
}

async fn mount_site(server: &MockServer, topic: &str) {
    let body = format!(
        r#"<p>Our {topic} offering is described here in enough detail to produce
        at least one chunk of indexed content for similarity search.</p>
        <a href="/details">More</a>"#
    );
    let details = format!(
        "<p>Further details about {topic}, including specifics a comparison \
         query should be able to retrieve from the index afterwards.</p>"
    );

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(
                format!("<html><body>{}</body></html>", body).into_bytes(),
                "text/html",
            ),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/details"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(
                format!("<html><body>{}</body></html>", details).into_bytes(),
                "text/html",
            ),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_pipeline_with_one_dead_site() {
    let acme = MockServer::start().await;
    let zenith = MockServer::start().await;
    mount_site(&acme, "premium pricing plans").await;
    mount_site(&zenith, "enterprise analytics features").await;

    let targets = vec![
        target("Acme", &acme.uri()),
        target("Zenith", &zenith.uri()),
        // Nothing listens on port 1: seed fetch fails, batch continues.
        Target {
            name: "Ghost".to_string(),
            seed_url: Url::parse("http://127.0.0.1:1/").unwrap(),
        },
    ];

    let config = test_config();
    let mut store = IndexStore::open_in_memory().unwrap();
    let embedder = HashEmbedder::new(64);

    let outcome = run_pipeline(
        &config,
        &targets,
        test_fetcher(),
        &mut store,
        &embedder,
        &CancelToken::new(),
    )
    .await
    .expect("pipeline failed");

    // One report per target, dead site degraded into an all-failed report.
    assert_eq!(outcome.reports.len(), 3);
    assert_eq!(outcome.reports["Acme"].succeeded_count, 2);
    assert_eq!(outcome.reports["Zenith"].succeeded_count, 2);
    assert!(outcome.reports["Ghost"].all_failed());
    assert!(!outcome.summary.all_sites_failed());
    assert_eq!(outcome.summary.failed_sites(), vec!["Ghost"]);

    // Both live sites are represented in the index.
    let collection = outcome.collection.expect("collection should be built");
    assert!(collection.chunk_count >= 2);

    let results = store
        .query(&collection, "pricing plans", 10, None, &embedder)
        .await
        .unwrap();
    assert!(!results.is_empty());
    assert!(results.iter().all(|r| r.chunk.site_name != "Ghost"));

    let balanced = store
        .balanced_query(&collection, "what does the product offer", 1, &embedder)
        .await
        .unwrap();
    let sites: Vec<&str> = balanced.iter().map(|r| r.chunk.site_name.as_str()).collect();
    assert_eq!(sites, vec!["Acme", "Zenith"]);
}

#[tokio::test]
async fn test_second_run_fully_replaces_first() {
    let config = test_config();
    let mut store = IndexStore::open_in_memory().unwrap();
    let embedder = HashEmbedder::new(64);

    let first_server = MockServer::start().await;
    mount_site(&first_server, "obsolete widget catalogs").await;
    let first = run_pipeline(
        &config,
        &[target("OldCo", &first_server.uri())],
        test_fetcher(),
        &mut store,
        &embedder,
        &CancelToken::new(),
    )
    .await
    .unwrap();
    let first_collection = first.collection.unwrap();

    let second_server = MockServer::start().await;
    mount_site(&second_server, "modern subscription services").await;
    let second = run_pipeline(
        &config,
        &[target("NewCo", &second_server.uri())],
        test_fetcher(),
        &mut store,
        &embedder,
        &CancelToken::new(),
    )
    .await
    .unwrap();
    let second_collection = second.collection.unwrap();

    // The first run's handle is rejected outright.
    let err = store
        .query(&first_collection, "widgets", 5, None, &embedder)
        .await
        .unwrap_err();
    assert!(matches!(err, IndexError::StaleCollection(_)));

    // And the live collection contains nothing from the first run.
    let results = store
        .query(&second_collection, "obsolete widget catalogs", 10, None, &embedder)
        .await
        .unwrap();
    assert!(results.iter().all(|r| r.chunk.site_name == "NewCo"));
    assert!(results.iter().all(|r| !r.chunk.text.contains("obsolete")));
}

#[tokio::test]
async fn test_all_failed_batch_keeps_previous_collection() {
    let config = test_config();
    let mut store = IndexStore::open_in_memory().unwrap();
    let embedder = HashEmbedder::new(64);

    let server = MockServer::start().await;
    mount_site(&server, "durable reference content").await;
    let good = run_pipeline(
        &config,
        &[target("GoodCo", &server.uri())],
        test_fetcher(),
        &mut store,
        &embedder,
        &CancelToken::new(),
    )
    .await
    .unwrap();
    let collection = good.collection.unwrap();

    // Second run: nothing reachable, no chunks produced.
    let bad = run_pipeline(
        &config,
        &[Target {
            name: "Ghost".to_string(),
            seed_url: Url::parse("http://127.0.0.1:1/").unwrap(),
        }],
        test_fetcher(),
        &mut store,
        &embedder,
        &CancelToken::new(),
    )
    .await
    .unwrap();

    assert!(bad.summary.all_sites_failed());
    assert!(bad.collection.is_none());

    // The earlier collection is still live and queryable.
    let results = store
        .query(&collection, "reference content", 5, None, &embedder)
        .await
        .unwrap();
    assert!(!results.is_empty());
}

#[tokio::test]
async fn test_cancelled_run_schedules_no_fetches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = test_config();
    let mut store = IndexStore::open_in_memory().unwrap();
    let embedder = HashEmbedder::new(64);

    let cancel = CancelToken::new();
    cancel.cancel();

    let outcome = run_pipeline(
        &config,
        &[target("Acme", &server.uri())],
        test_fetcher(),
        &mut store,
        &embedder,
        &cancel,
    )
    .await
    .unwrap();

    assert_eq!(outcome.reports.len(), 1);
    assert!(outcome.summary.all_sites_failed());
    // expect(0) on the server verifies no fetch went out when it drops.
}

#[tokio::test]
async fn test_fresh_store_has_no_collection() {
    let store = IndexStore::open_in_memory().unwrap();
    assert!(store.current_collection().unwrap().is_none());
}
