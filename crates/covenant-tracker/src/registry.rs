//! Backend registry
//!
//! Maps a lower-cased tool name to a constructor. Each backend is built on
//! first use and cached, so the in-memory mock keeps its issues between
//! requests.

use crate::{JiraTracker, MockTracker, TrackerConfig, TrackerError};
use covenant_domain::traits::{IssueTracker, SearchableIssueTracker};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, warn};

/// Constructor for a backend
pub type TrackerFactory = fn(&TrackerConfig) -> Result<TrackerHandle, TrackerError>;

/// A resolved backend
///
/// Whether the backend can list its issues is decided when the handle is
/// built, not probed per call.
#[derive(Clone)]
pub struct TrackerHandle {
    tracker: Arc<dyn IssueTracker<Error = TrackerError>>,
    searchable: Option<Arc<dyn SearchableIssueTracker<Error = TrackerError>>>,
}

impl TrackerHandle {
    /// Wrap a backend that supports listing
    pub fn searchable<T>(tracker: T) -> Self
    where
        T: SearchableIssueTracker<Error = TrackerError> + 'static,
    {
        let tracker = Arc::new(tracker);
        Self {
            tracker: tracker.clone(),
            searchable: Some(tracker),
        }
    }

    /// Wrap a backend that only supports the basic operations
    pub fn basic<T>(tracker: T) -> Self
    where
        T: IssueTracker<Error = TrackerError> + 'static,
    {
        Self {
            tracker: Arc::new(tracker),
            searchable: None,
        }
    }

    /// The backend
    pub fn tracker(&self) -> &dyn IssueTracker<Error = TrackerError> {
        self.tracker.as_ref()
    }

    /// The backend's listing capability, if it has one
    pub fn search(&self) -> Option<&dyn SearchableIssueTracker<Error = TrackerError>> {
        self.searchable.as_deref()
    }

    /// Backend name
    pub fn name(&self) -> &str {
        self.tracker.name()
    }
}

impl std::fmt::Debug for TrackerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackerHandle")
            .field("name", &self.name())
            .field("searchable", &self.searchable.is_some())
            .finish()
    }
}

fn build_jira(config: &TrackerConfig) -> Result<TrackerHandle, TrackerError> {
    if !config.jira.has_credentials() {
        warn!("Jira credentials not configured, using mock issue tracker");
        return build_mock(config);
    }
    Ok(TrackerHandle::searchable(JiraTracker::new(&config.jira)?))
}

fn build_mock(_config: &TrackerConfig) -> Result<TrackerHandle, TrackerError> {
    Ok(TrackerHandle::searchable(MockTracker::new()))
}

/// Registry of issue tracker backends
pub struct TrackerRegistry {
    config: TrackerConfig,
    factories: BTreeMap<String, TrackerFactory>,
    instances: Mutex<HashMap<String, TrackerHandle>>,
}

impl TrackerRegistry {
    /// Create a registry with the built-in `jira` and `mock` backends
    pub fn new(config: TrackerConfig) -> Self {
        let mut registry = Self {
            config,
            factories: BTreeMap::new(),
            instances: Mutex::new(HashMap::new()),
        };
        registry.register("jira", build_jira);
        registry.register("mock", build_mock);
        registry
    }

    /// Register a backend, replacing any previous one with the same name
    pub fn register(&mut self, name: &str, factory: TrackerFactory) {
        let key = name.trim().to_lowercase();
        self.instances
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key);
        self.factories.insert(key, factory);
    }

    /// Registered names in sorted order
    pub fn supported(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Look up a backend by name, falling back to the configured default
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::Unsupported` for an unknown name, or whatever
    /// the backend's constructor fails with.
    pub fn resolve(&self, name: Option<&str>) -> Result<TrackerHandle, TrackerError> {
        let key = name
            .map(|n| n.trim().to_lowercase())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| self.config.default_tool.trim().to_lowercase());

        let Some(factory) = self.factories.get(&key) else {
            return Err(TrackerError::Unsupported {
                requested: key,
                supported: self.supported().join(", "),
            });
        };

        let mut instances = self
            .instances
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = instances.get(&key) {
            return Ok(handle.clone());
        }

        let handle = factory(&self.config)?;
        info!(tool = %key, backend = handle.name(), "Initialized issue tracker");
        instances.insert(key, handle.clone());
        Ok(handle)
    }
}
