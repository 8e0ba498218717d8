//! Section-aware chunking of page texts
//!
//! Pages are split on newlines into paragraphs (blank lines dropped) and
//! packed greedily into chunks of fewer than `max_tokens * 4` characters. A
//! paragraph is never split, so one longer than the budget becomes a chunk
//! on its own.

use crate::types::{Chunk, SectionMarker};
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, info};

static SECTION_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:(?:section|art\.|article)\s*)?(\d+(?:\.\d+)*\.?)\s*[:\-]?\s*(.*)$")
        .expect("section header pattern is valid")
});

/// Recognize a section heading line
///
/// Accepts an optional `Section` / `Art.` / `Article` label (any case), a
/// dotted numeral, an optional `:` or `-`, and the title.
///
/// ```
/// use covenant_extractor::parse_section_header;
///
/// let marker = parse_section_header("ARTICLE 7 - Termination").unwrap();
/// assert_eq!(marker.number, "7");
/// assert_eq!(marker.title, "Termination");
///
/// assert!(parse_section_header("The Buyer shall pay.").is_none());
/// ```
pub fn parse_section_header(line: &str) -> Option<SectionMarker> {
    let caps = SECTION_HEADER.captures(line.trim())?;
    let number = caps.get(1)?.as_str();
    let title = caps.get(2).map_or("", |m| m.as_str()).trim();
    Some(SectionMarker::new(number, title))
}

/// Splits ordered pages into section-tagged chunks
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    max_tokens: usize,
}

impl Chunker {
    /// Create a chunker with a token budget (4 characters per token)
    pub fn new(max_tokens: usize) -> Self {
        Self { max_tokens }
    }

    /// Strict upper bound on buffered characters per chunk
    pub fn char_budget(&self) -> usize {
        self.max_tokens * 4
    }

    /// Chunk pages in order; page numbers are 1-based positions in `pages`
    ///
    /// A header paragraph takes effect before the size check, so a chunk
    /// flushed by a header carries the new section. The recorded page only
    /// moves on a flush: a chunk is tagged with the page of the paragraph
    /// that flushed the previous chunk, and the first chunk with page 0.
    pub fn chunk_pages<S: AsRef<str>>(&self, pages: &[S]) -> Vec<Chunk> {
        let budget = self.char_budget();
        let mut chunks = Vec::new();
        let mut section = SectionMarker::default();
        let mut buffer = String::new();
        let mut buffer_chars = 0usize;
        let mut current_page = 0u32;

        for (idx, page) in pages.iter().enumerate() {
            let page_number = idx as u32 + 1;

            for paragraph in page.as_ref().split('\n') {
                if paragraph.trim().is_empty() {
                    continue;
                }

                if let Some(marker) = parse_section_header(paragraph) {
                    debug!(number = %marker.number, title = %marker.title, page = page_number, "Section header");
                    section = marker;
                }

                let paragraph_chars = paragraph.chars().count();
                if buffer_chars + paragraph_chars >= budget {
                    flush(&mut chunks, &buffer, &section, current_page);
                    buffer.clear();
                    buffer_chars = 0;
                    current_page = page_number;
                }

                buffer.push_str(paragraph);
                buffer.push('\n');
                buffer_chars += paragraph_chars + 1;
            }
        }

        flush(&mut chunks, &buffer, &section, current_page);

        info!(
            pages = pages.len(),
            chunks = chunks.len(),
            budget,
            "Chunking complete"
        );
        chunks
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(800)
    }
}

fn flush(chunks: &mut Vec<Chunk>, buffer: &str, section: &SectionMarker, page: u32) {
    let text = buffer.trim();
    if text.is_empty() {
        return;
    }
    chunks.push(Chunk::new(text, section, page));
}
