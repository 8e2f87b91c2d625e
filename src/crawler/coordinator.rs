//! Batch coordinator: crawls every target under a site-level concurrency cap
//!
//! The coordinator owns the outer semaphore. Each site crawl runs as its own
//! task; a panic inside one crawl is converted into an all-failed report for
//! that site so the batch always produces exactly one report per target.

use crate::config::CrawlerConfig;
use crate::crawler::fetcher::PageFetcher;
use crate::crawler::progress::{BatchProgress, CancelToken};
use crate::crawler::site::{SiteCrawler, SiteScrapeReport};
use crate::targets::Target;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Runs site crawls for a whole target batch
pub struct ScrapeCoordinator<F: PageFetcher> {
    crawler: Arc<SiteCrawler<F>>,
    site_concurrency: usize,
}

impl<F: PageFetcher + 'static> ScrapeCoordinator<F> {
    pub fn new(fetcher: Arc<F>, config: CrawlerConfig) -> Self {
        let site_concurrency = config.site_concurrency;
        Self {
            crawler: Arc::new(SiteCrawler::new(fetcher, config)),
            site_concurrency,
        }
    }

    /// Crawls all targets, at most `site_concurrency` sites at a time
    ///
    /// Returns one report per input target, keyed by target name. Site-level
    /// disasters (unreachable seed, a panicking crawl task) degrade to
    /// all-failed reports instead of aborting the batch. Cancellation stops
    /// new sites and pages from being scheduled; fetches already in flight
    /// run to completion.
    pub async fn scrape_all(
        &self,
        targets: &[Target],
        cancel: &CancelToken,
        progress: &BatchProgress,
    ) -> BTreeMap<String, SiteScrapeReport> {
        let started = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.site_concurrency));
        let mut tasks: JoinSet<SiteScrapeReport> = JoinSet::new();
        let mut task_targets: HashMap<tokio::task::Id, Target> = HashMap::new();

        for target in targets {
            let crawler = Arc::clone(&self.crawler);
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();
            let target = target.clone();
            let site_progress = progress
                .site(&target.name)
                .unwrap_or_default();

            let handle = tasks.spawn({
                let target = target.clone();
                async move {
                    // Closed semaphores cannot occur while tasks are live.
                    let _permit = match semaphore.acquire_owned().await {
                        Ok(p) => p,
                        Err(_) => {
                            return SiteScrapeReport::aborted(target, "scheduler shut down")
                        }
                    };
                    crawler.crawl(&target, &cancel, site_progress).await
                }
            });
            task_targets.insert(handle.id(), target);
        }

        let mut reports = BTreeMap::new();
        while let Some(joined) = tasks.join_next_with_id().await {
            let report = match joined {
                Ok((id, report)) => {
                    task_targets.remove(&id);
                    report
                }
                Err(e) => {
                    let id = e.id();
                    let target = match task_targets.remove(&id) {
                        Some(t) => t,
                        None => continue,
                    };
                    tracing::error!("Crawl task for {} died: {}", target.name, e);
                    if let Some(p) = progress.site(&target.name) {
                        p.mark_done();
                    }
                    SiteScrapeReport::aborted(target, "crawl task failed")
                }
            };
            reports.insert(report.target.name.clone(), report);
        }

        tracing::info!(
            "Batch complete: {} sites in {:?}",
            reports.len(),
            started.elapsed()
        );
        reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::fetcher::{FetchErrorKind, FetchResult, FetchStatus};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use url::Url;

    /// Fetcher that succeeds for hosts in its allowlist and tracks how many
    /// distinct sites are being crawled at once
    struct SiteStubFetcher {
        live_hosts: Vec<String>,
        in_flight_hosts: std::sync::Mutex<Vec<String>>,
        max_sites: AtomicUsize,
    }

    impl SiteStubFetcher {
        fn new(live_hosts: &[&str]) -> Self {
            Self {
                live_hosts: live_hosts.iter().map(|s| s.to_string()).collect(),
                in_flight_hosts: std::sync::Mutex::new(Vec::new()),
                max_sites: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PageFetcher for SiteStubFetcher {
        async fn fetch(&self, url: &Url) -> FetchResult {
            let host = url.host_str().unwrap_or("").to_string();
            {
                let mut hosts = self.in_flight_hosts.lock().unwrap();
                hosts.push(host.clone());
                let distinct: std::collections::HashSet<&String> = hosts.iter().collect();
                self.max_sites.fetch_max(distinct.len(), Ordering::SeqCst);
            }

            tokio::time::sleep(Duration::from_millis(10)).await;

            let status = if self.live_hosts.contains(&host) {
                FetchStatus::Success {
                    text: "page text".to_string(),
                    title: None,
                    links: vec![],
                }
            } else {
                FetchStatus::Failure {
                    kind: FetchErrorKind::Connection,
                    message: "connection refused".to_string(),
                }
            };

            let mut hosts = self.in_flight_hosts.lock().unwrap();
            if let Some(pos) = hosts.iter().position(|h| h == &host) {
                hosts.remove(pos);
            }

            FetchResult {
                url: url.clone(),
                status,
                elapsed: Duration::from_millis(10),
            }
        }
    }

    fn target(name: &str, seed: &str) -> Target {
        Target {
            name: name.to_string(),
            seed_url: Url::parse(seed).unwrap(),
        }
    }

    fn config(site_concurrency: usize) -> CrawlerConfig {
        CrawlerConfig {
            site_concurrency,
            ..CrawlerConfig::default()
        }
    }

    #[tokio::test]
    async fn test_one_report_per_target() {
        let fetcher = Arc::new(SiteStubFetcher::new(&["a.test", "b.test"]));
        let coordinator = ScrapeCoordinator::new(fetcher, config(3));

        let targets = vec![
            target("Alpha", "https://a.test/"),
            target("Beta", "https://b.test/"),
            target("Gone", "https://gone.test/"),
        ];
        let progress = BatchProgress::for_targets(&targets);

        let reports = coordinator
            .scrape_all(&targets, &CancelToken::new(), &progress)
            .await;

        assert_eq!(reports.len(), 3);
        assert!(!reports["Alpha"].all_failed());
        assert!(!reports["Beta"].all_failed());
        assert!(reports["Gone"].all_failed());
    }

    #[tokio::test]
    async fn test_unreachable_site_does_not_poison_batch() {
        let fetcher = Arc::new(SiteStubFetcher::new(&["a.test"]));
        let coordinator = ScrapeCoordinator::new(fetcher, config(2));

        let targets = vec![
            target("Dead", "https://dead.test/"),
            target("Alpha", "https://a.test/"),
        ];
        let progress = BatchProgress::for_targets(&targets);

        let reports = coordinator
            .scrape_all(&targets, &CancelToken::new(), &progress)
            .await;

        assert_eq!(reports["Alpha"].succeeded_count, 1);
        assert_eq!(reports["Dead"].succeeded_count, 0);
        assert_eq!(reports["Dead"].failed_count, 1);
    }

    #[tokio::test]
    async fn test_site_concurrency_respected() {
        let fetcher = Arc::new(SiteStubFetcher::new(&[
            "a.test", "b.test", "c.test", "d.test", "e.test",
        ]));
        let coordinator = ScrapeCoordinator::new(Arc::clone(&fetcher), config(2));

        let targets: Vec<Target> = ["a", "b", "c", "d", "e"]
            .iter()
            .map(|h| target(h, &format!("https://{}.test/", h)))
            .collect();
        let progress = BatchProgress::for_targets(&targets);

        coordinator
            .scrape_all(&targets, &CancelToken::new(), &progress)
            .await;

        assert!(
            fetcher.max_sites.load(Ordering::SeqCst) <= 2,
            "observed {} sites crawling at once",
            fetcher.max_sites.load(Ordering::SeqCst)
        );
    }

    #[tokio::test]
    async fn test_cancelled_batch_reports_all_targets() {
        let fetcher = Arc::new(SiteStubFetcher::new(&["a.test", "b.test"]));
        let coordinator = ScrapeCoordinator::new(fetcher, config(2));

        let targets = vec![
            target("Alpha", "https://a.test/"),
            target("Beta", "https://b.test/"),
        ];
        let progress = BatchProgress::for_targets(&targets);

        let cancel = CancelToken::new();
        cancel.cancel();

        let reports = coordinator.scrape_all(&targets, &cancel, &progress).await;

        assert_eq!(reports.len(), 2);
        assert!(reports.values().all(|r| r.all_failed()));
    }

    #[tokio::test]
    async fn test_progress_marked_done_for_every_site() {
        let fetcher = Arc::new(SiteStubFetcher::new(&["a.test"]));
        let coordinator = ScrapeCoordinator::new(fetcher, config(2));

        let targets = vec![
            target("Alpha", "https://a.test/"),
            target("Gone", "https://gone.test/"),
        ];
        let progress = BatchProgress::for_targets(&targets);

        coordinator
            .scrape_all(&targets, &CancelToken::new(), &progress)
            .await;

        assert!(progress.all_done());
        let snapshot = progress.snapshot();
        assert_eq!(snapshot["Alpha"].succeeded, 1);
        assert_eq!(snapshot["Gone"].failed, 1);
    }
}
