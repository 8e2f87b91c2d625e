//! Web crawling engine
//!
//! Split into layers: [`fetcher`] turns one URL into a [`FetchResult`],
//! [`site`] crawls one site under its page budget, and [`coordinator`] runs
//! the whole target batch under the site concurrency cap. [`progress`] holds
//! the shared counters and the cancellation token; [`parser`] extracts
//! title, text, and links from fetched HTML.

mod coordinator;
mod fetcher;
mod parser;
mod progress;
mod site;

pub use coordinator::ScrapeCoordinator;
pub use fetcher::{FetchErrorKind, FetchResult, FetchStatus, HttpFetcher, PageFetcher};
pub use parser::{parse_page, ParsedPage};
pub use progress::{BatchProgress, CancelToken, SiteProgress, SiteProgressSnapshot};
pub use site::{SiteCrawler, SiteScrapeReport};
