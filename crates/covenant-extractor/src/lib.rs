//! Covenant Extractor
//!
//! Turns the page texts of a contract into legal obligations grouped by
//! responsible party.
//!
//! # Overview
//!
//! The pipeline has four stages:
//!
//! - **Chunker**: splits ordered pages into bounded, section-aware chunks
//! - **Obligation Tracker**: run-scoped duplicate suppression and party-name
//!   canonicalization, shared by every chunk task of a run
//! - **Chunk Processor**: one LLM call per chunk with a fixed retry budget
//! - **Batch Orchestrator**: fixed-size concurrent batches, a pause between
//!   batches, and a final merge by party
//!
//! # Architecture
//!
//! ```text
//! pages → Chunker → chunks → [batch: ChunkProcessor × Tracker] → merge → ObligationSet
//! ```
//!
//! # Example Usage
//!
//! ```no_run
//! use covenant_extractor::{Extractor, ExtractorConfig};
//! use covenant_llm::MockProvider;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let llm = MockProvider::new("null");
//! let extractor = Extractor::new(llm, ExtractorConfig::default());
//!
//! let pages = vec!["Section 1: Payment\nThe Buyer shall pay within 30 days.".to_string()];
//! let output = extractor.extract_pages(&pages).await?;
//!
//! println!("Chunks: {}", output.metadata.total_chunks);
//! println!("Obligations: {}", output.metadata.total_obligations);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod chunking;
mod config;
mod error;
mod extractor;
mod parser;
mod processor;
mod prompt;
mod tracker;
mod types;


pub use chunking::{parse_section_header, Chunker};
pub use config::ExtractorConfig;
pub use error::ExtractorError;
pub use extractor::{merge_by_party, Extractor};
pub use parser::{parse_llm_response, ParsedResponse};
pub use processor::ChunkProcessor;
pub use prompt::{PromptBuilder, SYSTEM_PROMPT};
pub use tracker::{title_case, ObligationTracker, SharedTracker, TrackerStats};
pub use types::{Chunk, ChunkOutcome, ExtractionMetadata, ExtractionOutput, SectionMarker};
