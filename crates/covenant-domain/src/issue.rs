//! Issue module - work items filed in an external tracker

use crate::Priority;
use serde::{Deserialize, Serialize};

/// A request to file one issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRequest {
    /// Summary line
    pub title: String,

    /// Markdown body
    pub description: String,

    /// Issue priority
    #[serde(default)]
    pub priority: Priority,

    /// Labels to attach
    #[serde(default)]
    pub labels: Vec<String>,

    /// Ask the backend to protect the description from edits
    #[serde(default = "default_lock")]
    pub lock_description: bool,
}

fn default_lock() -> bool {
    true
}

impl IssueRequest {
    /// Create a request with medium priority, no labels and a locked description
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            priority: Priority::Medium,
            labels: Vec::new(),
            lock_description: true,
        }
    }
}

/// Partial update of an issue; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueUpdate {
    /// New summary
    #[serde(default)]
    pub title: Option<String>,

    /// New body
    #[serde(default)]
    pub description: Option<String>,

    /// New priority
    #[serde(default)]
    pub priority: Option<Priority>,

    /// Replacement label set
    #[serde(default)]
    pub labels: Option<Vec<String>>,

    /// New workflow status
    #[serde(default)]
    pub status: Option<String>,
}

impl IssueUpdate {
    /// True when the update changes nothing
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.labels.is_none()
            && self.status.is_none()
    }
}

/// An issue as reported by a tracker backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Backend identifier
    pub id: String,

    /// Human-facing key (e.g. `KAN-12`)
    pub key: String,

    /// Summary line
    pub title: String,

    /// Body text
    #[serde(default)]
    pub description: String,

    /// Priority name as the backend reports it
    #[serde(default)]
    pub priority: Option<String>,

    /// Labels
    #[serde(default)]
    pub labels: Vec<String>,

    /// Workflow status name
    #[serde(default)]
    pub status: Option<String>,

    /// Browser URL
    #[serde(default)]
    pub url: Option<String>,

    /// Whether the description is protected from edits
    #[serde(default)]
    pub description_locked: bool,
}
