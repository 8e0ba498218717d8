//! Per-chunk LLM extraction with a fixed retry budget

use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use crate::parser::{parse_llm_response, ParsedResponse};
use crate::prompt::PromptBuilder;
use crate::tracker::SharedTracker;
use crate::types::{Chunk, ChunkOutcome};
use covenant_domain::traits::{CompletionRequest, LlmProvider};
use covenant_domain::{ObligationSet, Party};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Sends one chunk to the LLM and post-processes the answer
///
/// Provider errors and unparseable responses consume an attempt; a `null`
/// answer does not. Surviving obligations are stamped with the chunk's
/// section and page, party names are canonicalized, and texts already seen
/// in this run are dropped.
pub struct ChunkProcessor<L> {
    llm: Arc<L>,
    tracker: SharedTracker,
    max_attempts: u32,
    retry_backoff: Duration,
    temperature: f32,
}

impl<L: LlmProvider> ChunkProcessor<L> {
    /// Create a processor bound to one run's tracker
    pub fn new(llm: Arc<L>, tracker: SharedTracker, config: &ExtractorConfig) -> Self {
        Self {
            llm,
            tracker,
            max_attempts: config.max_attempts.max(1),
            retry_backoff: config.retry_backoff(),
            temperature: config.temperature,
        }
    }

    /// Process one chunk; never fails, failures are reported in the outcome
    pub async fn process(&self, chunk: &Chunk) -> ChunkOutcome {
        let request = PromptBuilder::new(chunk).build_request(self.temperature);
        let mut last_error = String::new();

        for attempt in 1..=self.max_attempts {
            debug!(
                attempt,
                page = chunk.page_number,
                section = %chunk.section_number,
                "Processing chunk"
            );

            match self.attempt(&request).await {
                Ok(ParsedResponse::NoObligations) => {
                    debug!(page = chunk.page_number, "No obligations in chunk");
                    return ChunkOutcome::Empty;
                }
                Ok(ParsedResponse::Parties(set)) => {
                    return ChunkOutcome::Found(self.apply_tracker(set, chunk));
                }
                Err(e) => {
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        page = chunk.page_number,
                        error = %e,
                        "Chunk attempt failed"
                    );
                    last_error = e.to_string();
                    if attempt < self.max_attempts && !self.retry_backoff.is_zero() {
                        tokio::time::sleep(self.retry_backoff).await;
                    }
                }
            }
        }

        error!(
            page = chunk.page_number,
            section = %chunk.section_number,
            error = %last_error,
            "Chunk failed after all attempts"
        );
        ChunkOutcome::Failed(last_error)
    }

    async fn attempt(&self, request: &CompletionRequest) -> Result<ParsedResponse, ExtractorError> {
        let raw = self
            .llm
            .complete(request)
            .await
            .map_err(|e| ExtractorError::Llm(e.to_string()))?;
        parse_llm_response(&raw)
    }

    fn apply_tracker(&self, set: ObligationSet, chunk: &Chunk) -> ObligationSet {
        let parties = set
            .parties
            .into_iter()
            .map(|party| {
                let name = self.tracker.standardize_party_name(&party.name);
                let obligations = party
                    .obligations
                    .into_iter()
                    .filter(|ob| !self.tracker.is_duplicate(&ob.obligation_text))
                    .map(|mut ob| {
                        ob.section = chunk.section_number.clone();
                        ob.page_number = Some(chunk.page_number);
                        ob
                    })
                    .collect();
                Party { name, obligations }
            })
            .collect();
        ObligationSet::new(parties)
    }
}
