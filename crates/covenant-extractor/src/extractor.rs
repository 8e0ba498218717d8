//! Batch orchestration and merge-by-party

use crate::chunking::Chunker;
use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use crate::processor::ChunkProcessor;
use crate::tracker::SharedTracker;
use crate::types::{Chunk, ChunkOutcome, ExtractionMetadata, ExtractionOutput};
use covenant_domain::traits::LlmProvider;
use covenant_domain::{ObligationSet, Party};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// The Extractor turns a document's chunks into one merged obligation set
///
/// Chunks run in consecutive batches of `batch_size`. Every chunk of a batch
/// is in flight at once, and no chunk of the next batch starts before the
/// whole batch has finished. Each run gets a fresh tracker, so runs never
/// suppress each other's obligations.
pub struct Extractor<L: LlmProvider> {
    llm_provider: Arc<L>,
    config: ExtractorConfig,
}

impl<L> Extractor<L>
where
    L: LlmProvider + 'static,
{
    /// Create a new Extractor
    pub fn new(llm_provider: L, config: ExtractorConfig) -> Self {
        Self::from_shared(Arc::new(llm_provider), config)
    }

    /// Create an Extractor over an already shared provider
    pub fn from_shared(llm_provider: Arc<L>, config: ExtractorConfig) -> Self {
        Self {
            llm_provider,
            config,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Model answering this extractor's requests
    pub fn model_name(&self) -> &str {
        self.llm_provider.model_name()
    }

    /// Chunker matching this extractor's token budget
    pub fn chunker(&self) -> Chunker {
        Chunker::new(self.config.max_tokens)
    }

    /// Chunk the pages of a document, then extract from every chunk
    pub async fn extract_pages<S: AsRef<str>>(
        &self,
        pages: &[S],
    ) -> Result<ExtractionOutput, ExtractorError> {
        let chunks = self.chunker().chunk_pages(pages);
        self.extract_chunks(chunks).await
    }

    /// Extract obligations from chunks in document order
    ///
    /// Failed chunks are logged and left out; the run still returns
    /// whatever the other chunks produced. The result always holds exactly
    /// one merged set, empty when nothing was found.
    ///
    /// # Errors
    ///
    /// `Config` for an invalid configuration, `TaskJoin` if a chunk task
    /// panicked.
    pub async fn extract_chunks(
        &self,
        chunks: Vec<Chunk>,
    ) -> Result<ExtractionOutput, ExtractorError> {
        self.config.validate()?;
        let start = Instant::now();

        let tracker = SharedTracker::new();
        let processor = Arc::new(ChunkProcessor::new(
            Arc::clone(&self.llm_provider),
            tracker.clone(),
            &self.config,
        ));

        let batch_size = self.config.batch_size;
        let total_batches = chunks.len().div_ceil(batch_size);
        let mut metadata = ExtractionMetadata {
            total_chunks: chunks.len(),
            batches: total_batches,
            model_name: self.llm_provider.model_name().to_string(),
            ..Default::default()
        };

        info!(
            chunks = chunks.len(),
            batches = total_batches,
            batch_size,
            model = %metadata.model_name,
            "Starting extraction"
        );

        let mut results = Vec::new();
        for (batch_idx, batch) in chunks.chunks(batch_size).enumerate() {
            let mut tasks = JoinSet::new();
            for chunk in batch {
                let processor = Arc::clone(&processor);
                let chunk = chunk.clone();
                tasks.spawn(async move { processor.process(&chunk).await });
            }

            while let Some(joined) = tasks.join_next().await {
                let outcome = joined.map_err(|e| ExtractorError::TaskJoin(e.to_string()))?;
                match outcome {
                    ChunkOutcome::Found(set) => {
                        metadata.chunks_with_obligations += 1;
                        results.push(set);
                    }
                    ChunkOutcome::Empty => metadata.empty_chunks += 1,
                    ChunkOutcome::Failed(reason) => {
                        metadata.failed_chunks += 1;
                        warn!(batch = batch_idx + 1, reason = %reason, "Dropping failed chunk");
                    }
                }
            }

            info!(
                batch = batch_idx + 1,
                of = total_batches,
                "Batch complete"
            );

            let delay = self.config.inter_batch_delay();
            if batch_idx + 1 < total_batches && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        let merged = merge_by_party(&results);
        metadata.duplicates_suppressed = tracker.stats().duplicates_suppressed;
        metadata.total_obligations = merged.obligation_count();
        metadata.party_count = merged.parties.len();
        metadata.processing_time_ms = start.elapsed().as_millis() as u64;

        info!(
            parties = metadata.party_count,
            obligations = metadata.total_obligations,
            failed = metadata.failed_chunks,
            duplicates = metadata.duplicates_suppressed,
            elapsed_ms = metadata.processing_time_ms,
            "Extraction complete"
        );

        Ok(ExtractionOutput::new(merged, metadata))
    }
}

/// Merge per-chunk sets into one set keyed by party name
///
/// Parties keep the order in which they were first encountered, and each
/// party's obligations keep their encounter order.
pub fn merge_by_party(results: &[ObligationSet]) -> ObligationSet {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut parties: Vec<Party> = Vec::new();

    for set in results {
        for party in &set.parties {
            let slot = match index.get(party.name.as_str()) {
                Some(&slot) => slot,
                None => {
                    debug!(party = %party.name, "New party");
                    index.insert(party.name.as_str(), parties.len());
                    parties.push(Party::new(party.name.clone()));
                    parties.len() - 1
                }
            };
            parties[slot]
                .obligations
                .extend(party.obligations.iter().cloned());
        }
    }

    ObligationSet::new(parties)
}
