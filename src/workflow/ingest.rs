//! Page-to-chunk preparation for ingestion.

use crate::document::Page;
use crate::workflow::chunking::chunk_page;

/// Chunk text with the page it was extracted from.
#[derive(Debug, Clone)]
pub(crate) struct ChunkRecord {
    /// Chunk text content.
    pub(crate) text: String,
    /// 1-based page number the chunk came from.
    pub(crate) page: Option<u32>,
}

/// Split every page into bounded, overlapping chunks, keeping page provenance.
///
/// Empty or whitespace-only pages contribute nothing.
pub(crate) fn split_pages(pages: &[Page], chunk_size: usize, overlap: usize) -> Vec<ChunkRecord> {
    let mut records = Vec::new();
    for page in pages {
        for text in chunk_page(&page.text, chunk_size, overlap) {
            records.push(ChunkRecord {
                text,
                page: Some(page.number),
            });
        }
    }
    records
}

/// Join page texts into one document body for the summary and health paths.
///
/// Pages are trimmed and empty pages dropped; survivors are separated by blank lines.
pub(crate) fn join_pages(pages: &[Page]) -> String {
    pages
        .iter()
        .map(|page| page.text.trim())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}
