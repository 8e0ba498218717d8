//! In-memory issue tracker

use crate::TrackerError;
use async_trait::async_trait;
use covenant_domain::traits::{IssueTracker, SearchableIssueTracker};
use covenant_domain::{Issue, IssueRequest, IssueUpdate};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::info;

const MOCK_BROWSE_URL: &str = "https://mock-jira.example.com/browse";

#[derive(Debug, Default)]
struct MockState {
    issues: Vec<Issue>,
    fail_titles_containing: Vec<String>,
}

/// Issue tracker that keeps issues in memory
///
/// Issues get keys of the form `MOCK-XXXXXXXX` and start in status `To Do`.
/// Lookups accept either the id or the key.
#[derive(Debug, Default)]
pub struct MockTracker {
    state: Mutex<MockState>,
}

impl MockTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        info!("Initialized mock issue tracker");
        Self::default()
    }

    /// Make `create_issue` fail for titles containing `pattern`
    pub fn fail_titles_containing(&self, pattern: impl Into<String>) {
        self.lock().fail_titles_containing.push(pattern.into());
    }

    /// Number of issues currently held
    pub fn issue_count(&self) -> usize {
        self.lock().issues.len()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn matches(issue: &Issue, id: &str) -> bool {
    issue.id == id || issue.key.eq_ignore_ascii_case(id)
}

#[async_trait]
impl IssueTracker for MockTracker {
    type Error = TrackerError;

    fn name(&self) -> &str {
        "mock"
    }

    async fn create_issue(&self, request: &IssueRequest) -> Result<Issue, Self::Error> {
        let mut state = self.lock();
        if state
            .fail_titles_containing
            .iter()
            .any(|p| request.title.contains(p.as_str()))
        {
            return Err(TrackerError::Api {
                status: 500,
                message: "Mock failure".to_string(),
            });
        }

        let id = uuid::Uuid::new_v4().to_string();
        let key = format!("MOCK-{}", id[..8].to_uppercase());
        let issue = Issue {
            url: Some(format!("{}/{}", MOCK_BROWSE_URL, key)),
            id,
            key,
            title: request.title.clone(),
            description: request.description.clone(),
            priority: Some(request.priority.as_str().to_string()),
            labels: request.labels.clone(),
            status: Some("To Do".to_string()),
            description_locked: request.lock_description,
        };

        info!(key = %issue.key, title = %issue.title, "Created mock issue");
        state.issues.push(issue.clone());
        Ok(issue)
    }

    async fn get_issue(&self, id: &str) -> Result<Option<Issue>, Self::Error> {
        Ok(self.lock().issues.iter().find(|i| matches(i, id)).cloned())
    }

    async fn update_issue(
        &self,
        id: &str,
        update: &IssueUpdate,
    ) -> Result<Option<Issue>, Self::Error> {
        let mut state = self.lock();
        let Some(issue) = state.issues.iter_mut().find(|i| matches(i, id)) else {
            return Ok(None);
        };

        if let Some(title) = &update.title {
            issue.title = title.clone();
        }
        if let Some(description) = &update.description {
            issue.description = description.clone();
        }
        if let Some(priority) = update.priority {
            issue.priority = Some(priority.as_str().to_string());
        }
        if let Some(labels) = &update.labels {
            issue.labels = labels.clone();
        }
        if let Some(status) = &update.status {
            issue.status = Some(status.clone());
        }
        Ok(Some(issue.clone()))
    }

    async fn delete_issue(&self, id: &str) -> Result<bool, Self::Error> {
        let mut state = self.lock();
        let before = state.issues.len();
        state.issues.retain(|i| !matches(i, id));
        Ok(state.issues.len() < before)
    }
}

#[async_trait]
impl SearchableIssueTracker for MockTracker {
    async fn list_issues(&self) -> Result<Vec<Issue>, Self::Error> {
        Ok(self.lock().issues.clone())
    }
}
