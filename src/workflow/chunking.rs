//! Greedy boundary splitting with a character-window overlap.
//!
//! Pages are split into chunks of at most `chunk_size` characters along semantic
//! boundaries, then an overlap of up to `chunk_overlap` characters of the previous
//! chunk's tail is prepended to each subsequent chunk so spans around boundaries
//! stay visible to retrieval. Overlapped chunks never exceed the size budget.

use semchunk_rs::Chunker;

/// Split one page of text into bounded, overlapping chunks.
///
/// Whitespace-only input yields no chunks. `chunk_size` must be positive and
/// `overlap` smaller than `chunk_size`; both are validated upstream.
pub(crate) fn chunk_page(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let chunker = Chunker::new(
        chunk_size,
        Box::new(|segment: &str| segment.chars().count()),
    );
    let base_chunks = chunker.chunk(text);
    apply_overlap(base_chunks, chunk_size, overlap)
}

/// Prepend a bounded tail of the previous chunk to each subsequent chunk.
fn apply_overlap(chunks: Vec<String>, chunk_size: usize, overlap: usize) -> Vec<String> {
    if chunks.is_empty() {
        return chunks;
    }

    let effective_overlap = overlap.min(chunk_size.saturating_sub(1));
    if effective_overlap == 0 {
        return chunks;
    }

    let mut overlapped = Vec::with_capacity(chunks.len());
    let mut iter = chunks.into_iter();
    let mut previous = iter
        .next()
        .expect("chunks iterator yielded zero elements despite non-empty guard");
    overlapped.push(previous.clone());

    for current in iter {
        let combined = build_overlapped_chunk(&previous, &current, effective_overlap, chunk_size);
        overlapped.push(combined);
        previous = current;
    }

    overlapped
}

fn build_overlapped_chunk(
    previous: &str,
    current: &str,
    overlap: usize,
    chunk_size: usize,
) -> String {
    let tail = char_tail(previous, overlap);
    let mut combined = String::with_capacity(tail.len() + current.len() + 1);

    if !tail.is_empty() {
        combined.push_str(tail);
        if !ends_with_whitespace(tail) && !starts_with_whitespace(current) {
            combined.push(' ');
        }
    }

    combined.push_str(current);
    trim_to_char_budget(combined, chunk_size)
}

/// Last `limit` characters of `text`, left-trimmed.
fn char_tail(text: &str, limit: usize) -> &str {
    if limit == 0 {
        return "";
    }
    let count = text.chars().count();
    if count <= limit {
        return text.trim_start();
    }
    let skip = count - limit;
    let start = text
        .char_indices()
        .nth(skip)
        .map(|(offset, _)| offset)
        .unwrap_or(text.len());
    text[start..].trim_start()
}

/// Drop leading characters until `text` fits the budget.
fn trim_to_char_budget(text: String, budget: usize) -> String {
    let count = text.chars().count();
    if count <= budget {
        return text;
    }
    let skip = count - budget;
    let start = text
        .char_indices()
        .nth(skip)
        .map(|(offset, _)| offset)
        .unwrap_or(text.len());
    text[start..].trim_start().to_string()
}

fn starts_with_whitespace(text: &str) -> bool {
    text.chars()
        .next()
        .map(|c| c.is_whitespace())
        .unwrap_or(false)
}

fn ends_with_whitespace(text: &str) -> bool {
    text.chars()
        .next_back()
        .map(|c| c.is_whitespace())
        .unwrap_or(false)
}
