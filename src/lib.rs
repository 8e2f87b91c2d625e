//! Sitescope: a website comparison scraper and index builder
//!
//! This crate crawls a user-supplied batch of websites in parallel, cleans and
//! chunks the fetched text, and rebuilds an isolated per-run vector index that
//! a retrieval stage can query for cross-site comparisons.

pub mod config;
pub mod content;
pub mod crawler;
pub mod index;
pub mod output;
pub mod pipeline;
pub mod targets;
pub mod url;

use thiserror::Error;

/// Main error type for sitescope operations
#[derive(Debug, Error)]
pub enum ScopeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Target list error: {0}")]
    Target(#[from] targets::TargetError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Index error: {0}")]
    Index(#[from] index::IndexError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for sitescope operations
pub type Result<T> = std::result::Result<T, ScopeError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{
    BatchProgress, CancelToken, FetchErrorKind, FetchResult, HttpFetcher, PageFetcher,
    ScrapeCoordinator, SiteCrawler, SiteScrapeReport,
};
pub use index::{Chunk, Embedder, IndexCollection, IndexError, IndexStore};
pub use targets::Target;
pub use url::{extract_domain, in_scope, normalize_url};
