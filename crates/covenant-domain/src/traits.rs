//! Trait definitions for external interactions
//!
//! These traits define the boundaries between the pipeline and infrastructure.
//! Infrastructure implementations live in other crates.

use crate::{
    Issue, IssueRequest, IssueUpdate, Obligation, ObligationId, ObligationPage, ObligationQuery,
    ObligationSet, ObligationUpdate,
};
use async_trait::async_trait;

/// A single completion call: system instruction plus user content
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// System instruction
    pub system: String,

    /// User content
    pub user: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Constrain the response to a single JSON object
    pub json_mode: bool,
}

impl CompletionRequest {
    /// Create a request with temperature 0.0 and JSON mode off
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            temperature: 0.0,
            json_mode: false,
        }
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Require a JSON-object response
    pub fn json(mut self) -> Self {
        self.json_mode = true;
        self
    }
}

/// Trait for LLM provider operations
///
/// Implemented by the infrastructure layer (covenant-llm)
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Error type for LLM operations
    type Error: std::error::Error + Send + Sync + 'static;

    /// Run one completion and return the raw response text
    async fn complete(&self, request: &CompletionRequest) -> Result<String, Self::Error>;

    /// Name of the model answering requests
    fn model_name(&self) -> &str;
}

/// Trait for storing and retrieving obligations
///
/// Implemented by the infrastructure layer (covenant-store)
pub trait ObligationStore {
    /// Error type for store operations
    type Error;

    /// Persist every obligation of an extraction result
    fn store_results(
        &mut self,
        results: &[ObligationSet],
        source_document: Option<&str>,
    ) -> Result<Vec<Obligation>, Self::Error>;

    /// List obligations with pagination and an optional party filter
    fn list(&self, query: &ObligationQuery) -> Result<ObligationPage, Self::Error>;

    /// Get an obligation by ID
    fn get(&self, id: ObligationId) -> Result<Option<Obligation>, Self::Error>;

    /// Apply a partial update; `None` when the obligation does not exist
    fn update(
        &mut self,
        id: ObligationId,
        update: &ObligationUpdate,
    ) -> Result<Option<Obligation>, Self::Error>;

    /// Delete an obligation; `false` when it did not exist
    fn delete(&mut self, id: ObligationId) -> Result<bool, Self::Error>;

    /// Record the issue filed for an obligation
    fn set_issue_id(
        &mut self,
        id: ObligationId,
        issue_id: &str,
    ) -> Result<Option<Obligation>, Self::Error>;
}

/// Trait for filing and managing issues in a project tracker
///
/// Implemented by the infrastructure layer (covenant-tracker)
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Error type for tracker operations
    type Error: std::error::Error + Send + Sync + 'static;

    /// Backend name (e.g. "jira")
    fn name(&self) -> &str;

    /// File a new issue
    async fn create_issue(&self, request: &IssueRequest) -> Result<Issue, Self::Error>;

    /// Fetch an issue by id or key; `None` when it does not exist
    async fn get_issue(&self, id: &str) -> Result<Option<Issue>, Self::Error>;

    /// Apply a partial update; `None` when the issue does not exist
    async fn update_issue(
        &self,
        id: &str,
        update: &IssueUpdate,
    ) -> Result<Option<Issue>, Self::Error>;

    /// Delete an issue; `false` when it did not exist
    async fn delete_issue(&self, id: &str) -> Result<bool, Self::Error>;
}

/// A tracker that can also enumerate its issues
#[async_trait]
pub trait SearchableIssueTracker: IssueTracker {
    /// All issues the backend exposes for the configured project
    async fn list_issues(&self) -> Result<Vec<Issue>, Self::Error>;
}
