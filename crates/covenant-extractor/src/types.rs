//! Chunk and run result types for extraction

use covenant_domain::ObligationSet;
use serde::{Deserialize, Serialize};

/// The currently active section heading
///
/// Both fields are empty until the first header is seen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionMarker {
    /// Section number as written (e.g. "4.2" or "7.")
    pub number: String,

    /// Heading text after the number, possibly empty
    pub title: String,
}

impl SectionMarker {
    /// Create a section marker
    pub fn new(number: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            title: title.into(),
        }
    }
}

/// A bounded unit of document text sent to the LLM in one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Trimmed chunk text, never empty
    pub text: String,

    /// Number of the section active when the chunk was emitted
    pub section_number: String,

    /// Title of the section active when the chunk was emitted
    pub section_title: String,

    /// Page recorded at the last flush; 0 until the first flush
    pub page_number: u32,

    /// Location string sent alongside the text
    pub context: String,
}

impl Chunk {
    /// Create a chunk; the context string is derived from the location
    pub fn new(text: impl Into<String>, section: &SectionMarker, page_number: u32) -> Self {
        Self {
            text: text.into(),
            section_number: section.number.clone(),
            section_title: section.title.clone(),
            page_number,
            context: format!(
                "Page {}, Section {}: {}",
                page_number, section.number, section.title
            ),
        }
    }
}

/// What processing one chunk produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// The model reported obligations (already canonicalized and deduplicated)
    Found(ObligationSet),

    /// The model reported that the chunk holds no obligations
    Empty,

    /// Every attempt failed; carries the last error message
    Failed(String),
}

impl ChunkOutcome {
    /// True for `Found`
    pub fn is_found(&self) -> bool {
        matches!(self, ChunkOutcome::Found(_))
    }

    /// True for `Failed`
    pub fn is_failed(&self) -> bool {
        matches!(self, ChunkOutcome::Failed(_))
    }
}

/// Metadata about an extraction run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionMetadata {
    /// Chunks submitted to the run
    pub total_chunks: usize,

    /// Batches executed
    pub batches: usize,

    /// Chunks that produced an obligation set
    pub chunks_with_obligations: usize,

    /// Chunks the model reported as empty
    pub empty_chunks: usize,

    /// Chunks that exhausted their retry budget
    pub failed_chunks: usize,

    /// Obligations dropped as duplicates of earlier ones
    pub duplicates_suppressed: usize,

    /// Obligations in the merged result
    pub total_obligations: usize,

    /// Parties in the merged result
    pub party_count: usize,

    /// Model that served the run
    pub model_name: String,

    /// Wall-clock time of the run (milliseconds)
    pub processing_time_ms: u64,
}

/// Result of an extraction run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionOutput {
    /// Always exactly one merged set
    pub results: Vec<ObligationSet>,

    /// Run statistics
    pub metadata: ExtractionMetadata,
}

impl ExtractionOutput {
    /// Wrap a merged set
    pub fn new(merged: ObligationSet, metadata: ExtractionMetadata) -> Self {
        Self {
            results: vec![merged],
            metadata,
        }
    }

    /// The merged obligation set
    pub fn merged(&self) -> Option<&ObligationSet> {
        self.results.first()
    }
}
