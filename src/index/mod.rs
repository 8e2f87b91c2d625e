//! Vector index: embedding and SQLite-backed storage
//!
//! One run of the pipeline produces one collection of embedded chunks.
//! Exactly one collection is live at a time: `rebuild` replaces the previous
//! collection wholesale inside a single transaction. Queries run against a
//! collection handle and fail loudly when that handle has been superseded.

mod embedder;
mod schema;
mod store;

pub use embedder::{Embedder, HashEmbedder, HttpEmbedder};
pub use store::{IndexCollection, IndexStore, ScoredChunk};

use thiserror::Error;
use url::Url;

/// One embeddable slice of a page's cleaned text
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Normalized URL of the page this chunk came from
    pub source_url: Url,

    /// Site (target name) the page belongs to
    pub site_name: String,

    /// The chunk text, an exact substring of the cleaned page text
    pub text: String,

    /// Position of this chunk within its page, contiguous from 0
    pub sequence_index: usize,
}

/// Errors raised by the index layer
#[derive(Debug, Error)]
pub enum IndexError {
    /// No collection has been built, or the live collection holds no chunks
    #[error("Index is empty: no collection has been built yet")]
    EmptyIndex,

    /// The queried collection handle was superseded by a later rebuild
    #[error("Collection {0} has been superseded by a newer rebuild")]
    StaleCollection(i64),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {got}")]
    Dimension { expected: usize, got: usize },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Result type alias for index operations
pub type IndexResult<T> = std::result::Result<T, IndexError>;
