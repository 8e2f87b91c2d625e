//! Run cancellation and pollable scrape progress
//!
//! Progress counters are plain atomics so a caller (UI, log ticker) can poll
//! them while the batch runs. Cancellation is cooperative: setting the token
//! stops new work from being scheduled; in-flight fetches complete or time
//! out on their own.

use crate::crawler::fetcher::FetchResult;
use crate::targets::Target;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Cooperative cancellation token shared across a run
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation: no new fetches or site crawls are scheduled
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Live counters for one site's crawl
#[derive(Debug, Default)]
pub struct SiteProgress {
    attempted: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    done: AtomicBool,
}

/// Point-in-time copy of a site's counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiteProgressSnapshot {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub done: bool,
}

impl SiteProgress {
    pub fn record(&self, result: &FetchResult) {
        self.attempted.fetch_add(1, Ordering::Relaxed);
        if result.is_success() {
            self.succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn mark_done(&self) {
        self.done.store(true, Ordering::Release);
    }

    pub fn snapshot(&self) -> SiteProgressSnapshot {
        SiteProgressSnapshot {
            attempted: self.attempted.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            done: self.done.load(Ordering::Acquire),
        }
    }
}

/// Per-site progress for a whole batch, created before the crawl starts so
/// callers can poll while it runs
#[derive(Debug, Default)]
pub struct BatchProgress {
    sites: HashMap<String, Arc<SiteProgress>>,
}

impl BatchProgress {
    pub fn for_targets(targets: &[Target]) -> Self {
        let sites = targets
            .iter()
            .map(|t| (t.name.clone(), Arc::new(SiteProgress::default())))
            .collect();
        Self { sites }
    }

    pub fn site(&self, name: &str) -> Option<Arc<SiteProgress>> {
        self.sites.get(name).cloned()
    }

    /// Snapshot of every site's counters, keyed by site name
    pub fn snapshot(&self) -> BTreeMap<String, SiteProgressSnapshot> {
        self.sites
            .iter()
            .map(|(name, p)| (name.clone(), p.snapshot()))
            .collect()
    }

    pub fn all_done(&self) -> bool {
        self.sites.values().all(|p| p.snapshot().done)
    }
}
