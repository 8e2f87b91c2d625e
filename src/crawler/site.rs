//! Per-site crawler: bounded discovery and concurrent page fetching
//!
//! One [`SiteCrawler::crawl`] call handles one target site: fetch the seed,
//! discover in-domain candidate pages, and fan out fetches under the
//! per-site concurrency budget. The crawl never raises: every page outcome,
//! including a dead seed, lands in the returned [`SiteScrapeReport`].

use crate::config::CrawlerConfig;
use crate::crawler::fetcher::{FetchErrorKind, FetchResult, FetchStatus, PageFetcher};
use crate::crawler::progress::{CancelToken, SiteProgress};
use crate::targets::Target;
use crate::url::{extract_domain, in_scope, normalize_url};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

/// Everything learned from scraping one site
#[derive(Debug, Clone)]
pub struct SiteScrapeReport {
    /// The target this report belongs to
    pub target: Target,

    /// All fetch results, in completion order
    pub pages: Vec<FetchResult>,

    /// Number of successful page fetches
    pub succeeded_count: usize,

    /// Number of failed page fetches
    pub failed_count: usize,

    /// Wall-clock duration of the whole site crawl
    pub elapsed: Duration,
}

impl SiteScrapeReport {
    fn from_pages(target: Target, pages: Vec<FetchResult>, elapsed: Duration) -> Self {
        let succeeded_count = pages.iter().filter(|p| p.is_success()).count();
        let failed_count = pages.len() - succeeded_count;
        Self {
            target,
            pages,
            succeeded_count,
            failed_count,
            elapsed,
        }
    }

    /// Report for a site whose crawl never produced results (cancelled
    /// before start, or the crawl task itself died)
    pub fn aborted(target: Target, message: &str) -> Self {
        let seed = target.seed_url.clone();
        let pages = vec![FetchResult::failure(
            seed,
            FetchErrorKind::Connection,
            message.to_string(),
            Duration::ZERO,
        )];
        Self::from_pages(target, pages, Duration::ZERO)
    }

    /// True when at least one page succeeded but others failed
    pub fn is_degraded(&self) -> bool {
        self.succeeded_count > 0 && self.failed_count > 0
    }

    /// True when nothing was fetched successfully (degraded-but-valid
    /// outcome, not a crawler fault)
    pub fn all_failed(&self) -> bool {
        self.succeeded_count == 0
    }
}

/// Crawls one site under a page budget and a fetch-concurrency budget
pub struct SiteCrawler<F: PageFetcher> {
    fetcher: Arc<F>,
    config: CrawlerConfig,
}

impl<F: PageFetcher + 'static> SiteCrawler<F> {
    pub fn new(fetcher: Arc<F>, config: CrawlerConfig) -> Self {
        Self { fetcher, config }
    }

    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    /// Crawls a single target site
    ///
    /// Flow:
    /// 1. Normalize and fetch the seed URL.
    /// 2. Select up to `page_budget - 1` candidate pages from the seed's
    ///    in-domain links (normalized and deduplicated).
    /// 3. Fan out fetches with at most `page_concurrency` in flight.
    /// 4. With `discover_depth = 2`, harvest links from fetched pages while
    ///    the budget is unfilled and run one more round.
    ///
    /// Individual fetch failures are recorded, never raised. A transient
    /// failure (timeout, connection, 5xx) is retried up to `fetch_retries`
    /// times before its result is recorded.
    pub async fn crawl(
        &self,
        target: &Target,
        cancel: &CancelToken,
        progress: Arc<SiteProgress>,
    ) -> SiteScrapeReport {
        let started = Instant::now();

        let seed = normalize_url(target.seed_url.as_str()).unwrap_or_else(|_| {
            // Target validation accepts only parseable HTTPS URLs, so the
            // seed itself is usable even if renormalization balks.
            target.seed_url.clone()
        });
        let domain = extract_domain(&seed).unwrap_or_default();

        if cancel.is_cancelled() {
            progress.mark_done();
            return SiteScrapeReport::aborted(target.clone(), "run cancelled");
        }

        let mut seen: HashSet<String> = HashSet::new();
        seen.insert(seed.as_str().to_string());

        tracing::debug!("Fetching seed {} for site {}", seed, target.name);
        let seed_result = fetch_with_retry(&*self.fetcher, &seed, self.config.fetch_retries).await;
        progress.record(&seed_result);

        let budget = self.config.page_budget;
        let mut remaining = budget.saturating_sub(1);

        let frontier = match &seed_result.status {
            FetchStatus::Success { links, .. } => {
                self.select_candidates(links, &domain, &mut seen, remaining)
            }
            FetchStatus::Failure { kind, message } => {
                tracing::warn!(
                    "Seed fetch failed for {} ({}): {}",
                    target.name,
                    kind,
                    message
                );
                Vec::new()
            }
        };

        let mut pages = vec![seed_result];
        remaining -= frontier.len().min(remaining);

        let first_round = self.fetch_batch(frontier, cancel, &progress).await;

        let second_round = if self.config.discover_depth >= 2 && remaining > 0 {
            let mut extra = Vec::new();
            for result in &first_round {
                if extra.len() >= remaining {
                    break;
                }
                if let FetchStatus::Success { links, .. } = &result.status {
                    let want = remaining - extra.len();
                    extra.extend(self.select_candidates(links, &domain, &mut seen, want));
                }
            }
            self.fetch_batch(extra, cancel, &progress).await
        } else {
            Vec::new()
        };

        pages.extend(first_round);
        pages.extend(second_round);
        progress.mark_done();

        let report = SiteScrapeReport::from_pages(target.clone(), pages, started.elapsed());
        tracing::info!(
            "Site {}: {}/{} pages fetched in {:?}",
            target.name,
            report.succeeded_count,
            report.pages.len(),
            report.elapsed
        );
        report
    }

    /// Normalizes, scopes, and deduplicates candidate links, keeping at most
    /// `max` new URLs
    fn select_candidates(
        &self,
        links: &[String],
        domain: &str,
        seen: &mut HashSet<String>,
        max: usize,
    ) -> Vec<Url> {
        let mut selected = Vec::new();

        for link in links {
            if selected.len() >= max {
                break;
            }

            let normalized = match normalize_url(link) {
                Ok(u) => u,
                Err(e) => {
                    tracing::trace!("Skipping unparseable link {}: {}", link, e);
                    continue;
                }
            };

            if !in_scope(&normalized, domain) {
                continue;
            }

            if seen.insert(normalized.as_str().to_string()) {
                selected.push(normalized);
            }
        }

        selected
    }

    /// Fetches a batch of URLs with bounded concurrency, collecting results
    /// in completion order
    async fn fetch_batch(
        &self,
        urls: Vec<Url>,
        cancel: &CancelToken,
        progress: &Arc<SiteProgress>,
    ) -> Vec<FetchResult> {
        let semaphore = Arc::new(Semaphore::new(self.config.page_concurrency));
        let mut tasks: JoinSet<Option<FetchResult>> = JoinSet::new();

        for url in urls {
            if cancel.is_cancelled() {
                break;
            }

            let fetcher = Arc::clone(&self.fetcher);
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();
            let progress = Arc::clone(progress);
            let retries = self.config.fetch_retries;

            tasks.spawn(async move {
                // Closed semaphores cannot occur here; treat it as a skip.
                let _permit = semaphore.acquire_owned().await.ok()?;

                // A cancellation that lands while we queued for a permit
                // means this fetch was never "in flight" - drop it.
                if cancel.is_cancelled() {
                    return None;
                }

                let result = fetch_with_retry(&*fetcher, &url, retries).await;
                progress.record(&result);
                Some(result)
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Some(result)) => results.push(result),
                Ok(None) => {}
                Err(e) => tracing::error!("Fetch task failed: {}", e),
            }
        }
        results
    }
}

/// Fetches a URL, retrying transient failures up to `retries` times
async fn fetch_with_retry<F: PageFetcher + ?Sized>(
    fetcher: &F,
    url: &Url,
    retries: u32,
) -> FetchResult {
    let mut attempt = 0;
    loop {
        let result = fetcher.fetch(url).await;

        let transient = result
            .error_kind()
            .map(|k| k.is_transient())
            .unwrap_or(false);

        if !transient || attempt >= retries {
            return result;
        }

        attempt += 1;
        tracing::debug!(
            "Retrying {} after transient failure (attempt {}/{})",
            url,
            attempt,
            retries
        );
    }
}
