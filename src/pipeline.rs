//! End-to-end run pipeline: scrape, normalize, index
//!
//! Glues the crawler, the content normalizer, and the index store together.
//! Scraping failures are absorbed into the run summary; only infrastructure
//! failures (database, embedder) surface as errors.

use crate::config::Config;
use crate::crawler::{BatchProgress, CancelToken, FetchStatus, PageFetcher, ScrapeCoordinator, SiteScrapeReport};
use crate::index::{Chunk, Embedder, IndexCollection, IndexStore};
use crate::output::RunSummary;
use crate::targets::Target;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Everything one pipeline run produced
pub struct PipelineOutcome {
    /// Per-site scrape reports, keyed by target name
    pub reports: BTreeMap<String, SiteScrapeReport>,

    /// Aggregated run summary for display
    pub summary: RunSummary,

    /// Handle to the freshly built collection; `None` when the run produced
    /// no chunks and the previous collection was left in place
    pub collection: Option<IndexCollection>,
}

/// Runs the full pipeline over a target batch
///
/// An all-failed batch is an outcome, not an error: when scraping yields no
/// chunks at all, the rebuild is skipped so the previously indexed collection
/// stays queryable.
pub async fn run_pipeline<F: PageFetcher + 'static>(
    config: &Config,
    targets: &[Target],
    fetcher: Arc<F>,
    store: &mut IndexStore,
    embedder: &dyn Embedder,
    cancel: &CancelToken,
) -> crate::Result<PipelineOutcome> {
    let progress = BatchProgress::for_targets(targets);
    let coordinator = ScrapeCoordinator::new(fetcher, config.crawler.clone());

    tracing::info!("Scraping {} target sites", targets.len());
    let reports = coordinator.scrape_all(targets, cancel, &progress).await;

    let chunks = collect_chunks(&reports, config);
    tracing::info!("Normalized scraped pages into {} chunks", chunks.len());

    let collection = if chunks.is_empty() {
        tracing::warn!("No chunks produced; keeping the existing index collection");
        None
    } else {
        Some(store.rebuild(chunks, embedder).await?)
    };

    let chunk_count = collection.as_ref().map(|c| c.chunk_count).unwrap_or(0);
    let summary = RunSummary::from_reports(&reports, chunk_count);

    Ok(PipelineOutcome {
        reports,
        summary,
        collection,
    })
}

/// Cleans and chunks every successfully fetched page
///
/// Pages are processed in URL order within each site so the produced chunk
/// set does not depend on fetch completion order.
pub fn collect_chunks(
    reports: &BTreeMap<String, SiteScrapeReport>,
    config: &Config,
) -> Vec<Chunk> {
    let mut chunks = Vec::new();

    for report in reports.values() {
        let mut pages: Vec<_> = report
            .pages
            .iter()
            .filter_map(|page| match &page.status {
                FetchStatus::Success { text, .. } => Some((&page.url, text)),
                FetchStatus::Failure { .. } => None,
            })
            .collect();
        pages.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));

        for (url, text) in pages {
            for (sequence_index, text) in crate::content::normalize(text, &config.chunking)
                .into_iter()
                .enumerate()
            {
                chunks.push(Chunk {
                    source_url: (*url).clone(),
                    site_name: report.target.name.clone(),
                    text,
                    sequence_index,
                });
            }
        }
    }

    chunks
}

/// Convenience used by the CLI to validate and load a run's targets
pub fn load_run_targets(config: &Config) -> crate::Result<Vec<Target>> {
    let targets = crate::targets::load_targets(std::path::Path::new(&config.input.targets_path))?;
    Ok(targets)
}
