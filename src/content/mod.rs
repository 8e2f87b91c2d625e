//! Page text normalization: cleaning and chunking
//!
//! Sits between the crawler's raw extracted text and the index. Both steps
//! are pure functions of their input, so normalizing the same page twice
//! yields byte-identical chunks regardless of fetch scheduling.

mod chunker;
mod cleaner;

pub use chunker::chunk_text;
pub use cleaner::clean_text;

use crate::config::ChunkingConfig;

/// Cleans page text and splits it into overlapping chunks
pub fn normalize(raw_text: &str, config: &ChunkingConfig) -> Vec<String> {
    chunk_text(&clean_text(raw_text), config)
}
