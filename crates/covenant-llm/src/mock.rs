//! Mock LLM provider for deterministic testing
//!
//! Replies are chosen in this order:
//!
//! 1. the first scripted rule whose pattern occurs in the user content
//!    (each rule replays its replies in order, repeating the last one),
//! 2. otherwise the default response.
//!
//! Every call is recorded so tests can assert on call counts, the requests
//! that were sent, and how calls interleaved in time.

use crate::LlmError;
use async_trait::async_trait;
use covenant_domain::traits::{CompletionRequest, LlmProvider};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// One scripted reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    /// Return this text
    Text(String),
    /// Fail with `LlmError::Other`
    Error(String),
}

/// Whether a call event marks the start or the end of a call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPhase {
    /// The provider was invoked
    Started,
    /// The provider returned
    Finished,
}

/// A recorded call boundary
#[derive(Debug, Clone)]
pub struct CallEvent {
    /// Start or finish
    pub phase: CallPhase,
    /// User content of the request
    pub user: String,
}

#[derive(Debug)]
struct Rule {
    pattern: String,
    replies: Vec<MockReply>,
    served: usize,
}

#[derive(Debug, Default)]
struct MockState {
    rules: Vec<Rule>,
    requests: Vec<CompletionRequest>,
    events: Vec<CallEvent>,
}

/// Mock LLM provider for deterministic testing
///
/// This provider returns pre-configured responses without making any network
/// calls. Clones share their script and call log.
///
/// # Examples
///
/// ```
/// use covenant_llm::{MockProvider, MockReply};
/// use covenant_domain::traits::{CompletionRequest, LlmProvider};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let provider = MockProvider::new("null");
/// provider.add_sequence("flaky", vec![
///     MockReply::Error("boom".into()),
///     MockReply::Text(r#"{"parties":[]}"#.into()),
/// ]);
///
/// let flaky = CompletionRequest::new("sys", "flaky chunk");
/// assert!(provider.complete(&flaky).await.is_err());
/// assert_eq!(provider.complete(&flaky).await.unwrap(), r#"{"parties":[]}"#);
/// assert_eq!(provider.call_count(), 2);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    latency: Option<Duration>,
    model: String,
    state: Arc<Mutex<MockState>>,
}

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            latency: None,
            model: "mock".to_string(),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Delay every call by `latency` before answering
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Reply with `response` whenever the user content contains `pattern`
    pub fn add_response(&self, pattern: impl Into<String>, response: impl Into<String>) {
        self.add_sequence(pattern, vec![MockReply::Text(response.into())]);
    }

    /// Fail whenever the user content contains `pattern`
    pub fn add_error(&self, pattern: impl Into<String>) {
        self.add_sequence(pattern, vec![MockReply::Error("Mock error".to_string())]);
    }

    /// Replay `replies` in order for matching calls, repeating the last one
    pub fn add_sequence(&self, pattern: impl Into<String>, replies: Vec<MockReply>) {
        lock(&self.state).rules.push(Rule {
            pattern: pattern.into(),
            replies,
            served: 0,
        });
    }

    /// Get the number of times the provider was called
    pub fn call_count(&self) -> usize {
        lock(&self.state).requests.len()
    }

    /// Number of calls whose user content contains `pattern`
    pub fn calls_matching(&self, pattern: &str) -> usize {
        lock(&self.state)
            .requests
            .iter()
            .filter(|r| r.user.contains(pattern))
            .count()
    }

    /// All requests received so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        lock(&self.state).requests.clone()
    }

    /// Start/finish events in the order they happened
    pub fn events(&self) -> Vec<CallEvent> {
        lock(&self.state).events.clone()
    }

    /// Reset the call log
    pub fn reset_calls(&self) {
        let mut state = lock(&self.state);
        state.requests.clear();
        state.events.clear();
    }

    fn next_reply(&self, user: &str) -> MockReply {
        let mut state = lock(&self.state);
        let rule = state
            .rules
            .iter_mut()
            .find(|rule| user.contains(&rule.pattern) && !rule.replies.is_empty());

        match rule {
            Some(rule) => {
                let idx = rule.served.min(rule.replies.len() - 1);
                rule.served += 1;
                rule.replies[idx].clone()
            }
            None => MockReply::Text(self.default_response.clone()),
        }
    }

    fn record(&self, phase: CallPhase, user: &str) {
        lock(&self.state).events.push(CallEvent {
            phase,
            user: user.to_string(),
        });
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("null")
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    type Error = LlmError;

    async fn complete(&self, request: &CompletionRequest) -> Result<String, Self::Error> {
        lock(&self.state).requests.push(request.clone());
        self.record(CallPhase::Started, &request.user);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let reply = self.next_reply(&request.user);
        self.record(CallPhase::Finished, &request.user);

        match reply {
            MockReply::Text(text) => Ok(text),
            MockReply::Error(message) => Err(LlmError::Other(message)),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
