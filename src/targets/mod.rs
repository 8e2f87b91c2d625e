//! Target list handling
//!
//! A run's input is a CSV file with `company_name,website_url` rows; each row
//! becomes one [`Target`]. Target identity is the seed URL: duplicate seeds
//! are rejected so one site is never crawled twice in a batch.

mod loader;

pub use loader::{load_targets, parse_targets, MAX_TARGETS};

use thiserror::Error;
use url::Url;

/// One row of user input: a named site to scrape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Display name for the site (used as the report/index key)
    pub name: String,

    /// Homepage URL the crawl starts from
    pub seed_url: Url,
}

/// Errors raised while loading or validating the target list
#[derive(Debug, Error)]
pub enum TargetError {
    #[error("Failed to read targets file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Targets file is empty")]
    Empty,

    #[error("Missing required columns, expected header 'company_name,website_url', got '{0}'")]
    MissingHeader(String),

    #[error("Malformed row at line {line}: {message}")]
    MalformedRow { line: usize, message: String },

    #[error("Invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Only HTTPS URLs are allowed: {0}")]
    InsecureScheme(String),

    #[error("Local and private addresses are not allowed: {0}")]
    LocalAddress(String),

    #[error("Duplicate target: {0}")]
    Duplicate(String),

    #[error("Duplicate company name: {0}")]
    DuplicateName(String),

    #[error("Too many targets: {count} (maximum {max})")]
    TooMany { count: usize, max: usize },
}
