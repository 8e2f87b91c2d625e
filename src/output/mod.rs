//! Run summary generation and display

use crate::crawler::SiteScrapeReport;
use std::collections::BTreeMap;
use std::time::Duration;

/// How a site's crawl went overall
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteOutcome {
    /// Every attempted page fetched successfully
    Complete,
    /// Some pages fetched, some failed
    Degraded,
    /// No page fetched at all
    Failed,
}

impl SiteOutcome {
    fn of(report: &SiteScrapeReport) -> Self {
        if report.succeeded_count == 0 {
            SiteOutcome::Failed
        } else if report.failed_count > 0 {
            SiteOutcome::Degraded
        } else {
            SiteOutcome::Complete
        }
    }
}

/// Per-site line of the run summary
#[derive(Debug, Clone)]
pub struct SiteSummary {
    pub name: String,
    pub succeeded: usize,
    pub attempted: usize,
    pub outcome: SiteOutcome,
    pub elapsed: Duration,
}

/// Whole-run summary
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub sites: Vec<SiteSummary>,
    pub total_pages_succeeded: usize,
    pub total_pages_attempted: usize,
    pub chunk_count: usize,
}

impl RunSummary {
    /// Builds a summary from the batch reports and the indexed chunk count
    pub fn from_reports(
        reports: &BTreeMap<String, SiteScrapeReport>,
        chunk_count: usize,
    ) -> Self {
        let sites: Vec<SiteSummary> = reports
            .values()
            .map(|report| SiteSummary {
                name: report.target.name.clone(),
                succeeded: report.succeeded_count,
                attempted: report.pages.len(),
                outcome: SiteOutcome::of(report),
                elapsed: report.elapsed,
            })
            .collect();

        let total_pages_succeeded = sites.iter().map(|s| s.succeeded).sum();
        let total_pages_attempted = sites.iter().map(|s| s.attempted).sum();

        Self {
            sites,
            total_pages_succeeded,
            total_pages_attempted,
            chunk_count,
        }
    }

    /// True when no site produced any page (nothing to index)
    pub fn all_sites_failed(&self) -> bool {
        self.sites.iter().all(|s| s.outcome == SiteOutcome::Failed)
    }

    pub fn failed_sites(&self) -> Vec<&str> {
        self.sites
            .iter()
            .filter(|s| s.outcome == SiteOutcome::Failed)
            .map(|s| s.name.as_str())
            .collect()
    }
}

/// Prints the run summary to stdout
pub fn print_summary(summary: &RunSummary) {
    println!("=== Scrape Summary ===\n");

    for site in &summary.sites {
        let marker = match site.outcome {
            SiteOutcome::Complete => "ok",
            SiteOutcome::Degraded => "degraded",
            SiteOutcome::Failed => "FAILED",
        };
        println!(
            "  {}: {}/{} pages scraped in {:.1}s [{}]",
            site.name,
            site.succeeded,
            site.attempted,
            site.elapsed.as_secs_f64(),
            marker
        );
    }

    println!();
    println!(
        "Totals: {}/{} pages across {} sites, {} chunks indexed",
        summary.total_pages_succeeded,
        summary.total_pages_attempted,
        summary.sites.len(),
        summary.chunk_count
    );

    let failed = summary.failed_sites();
    if !failed.is_empty() {
        println!("Sites with no scraped pages: {}", failed.join(", "));
    }
}
