//! Overlapping text chunking for embedding
//!
//! Chunks are exact substrings of the input text. Consecutive chunks overlap
//! by roughly `chunk_overlap` bytes so no sentence is stranded on a window
//! edge, and window ends prefer natural breakpoints (paragraph break, then
//! sentence end, then any whitespace) over a mid-word hard cut.

use crate::config::ChunkingConfig;

/// Splits cleaned page text into overlapping chunks
///
/// Pages shorter than `min_text_len` characters yield no chunks at all;
/// boilerplate-only pages are not worth indexing. Text that fits in a single
/// window is returned as one chunk.
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Vec<String> {
    chunk_spans(text, config)
        .into_iter()
        .map(|(start, end)| text[start..end].to_string())
        .collect()
}

/// Computes the byte spans of each chunk
///
/// Every span lies on char boundaries, spans are ordered by start, each
/// consecutive pair overlaps, and the spans jointly cover the whole text.
fn chunk_spans(text: &str, config: &ChunkingConfig) -> Vec<(usize, usize)> {
    if text.chars().count() < config.min_text_len {
        return Vec::new();
    }
    if text.len() <= config.chunk_size {
        return vec![(0, text.len())];
    }

    let stride = config.chunk_size - config.chunk_overlap;
    let mut spans = Vec::new();
    let mut start = 0;

    loop {
        let window_end = start + config.chunk_size;
        let (end, next) = if window_end >= text.len() {
            // Final windows advance by the full stride so the tail past the
            // last full window still gets its own chunk.
            (text.len(), start + stride)
        } else {
            let hard_end = snap_to_char_boundary(text, window_end);
            let end = find_breakpoint(text, start, hard_end, config);
            let next = end.saturating_sub(config.chunk_overlap);
            if next > start {
                (end, next)
            } else {
                // A breakpoint inside the overlap region would stall the
                // walk; take the hard cut and the plain stride instead.
                (hard_end, start + stride)
            }
        };
        spans.push((start, end));

        let next = snap_to_char_boundary(text, next);
        if next >= text.len() || next <= start {
            break;
        }
        start = next;
    }

    spans
}

/// Picks the best window end in `[floor, hard_end]`
///
/// Searches the back of the window for, in order of preference, a paragraph
/// break, a sentence end, then any whitespace. Falls back to the hard cut
/// when the window has no separators at all. The floor never dips into the
/// overlap region, so the window after this one always starts past the
/// current start.
fn find_breakpoint(text: &str, start: usize, hard_end: usize, config: &ChunkingConfig) -> usize {
    let min_advance = (config.chunk_size / 2).max(config.chunk_overlap);
    let floor = snap_to_char_boundary(text, start + min_advance);
    if floor >= hard_end {
        return hard_end;
    }
    let window = &text[floor..hard_end];

    if let Some(pos) = window.rfind("\n\n") {
        return floor + pos + 2;
    }
    if let Some(pos) = window.rfind(". ") {
        return floor + pos + 2;
    }
    if let Some((pos, ch)) = window
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace())
    {
        return floor + pos + ch.len_utf8();
    }

    hard_end
}

/// Rounds `idx` down to the nearest char boundary
fn snap_to_char_boundary(text: &str, mut idx: usize) -> usize {
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}
