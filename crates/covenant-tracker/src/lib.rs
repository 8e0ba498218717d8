//! Covenant Tracker
//!
//! Files extracted obligations as issues in a project tracker.
//!
//! # Backends
//!
//! - [`JiraTracker`]: Jira Cloud REST API v3
//! - [`MockTracker`]: in-memory stand-in, used when Jira credentials are
//!   missing and in tests
//!
//! Backends are looked up by name through [`TrackerRegistry`], which returns a
//! [`TrackerHandle`] that knows at construction whether the backend can also
//! list its issues.

#![warn(missing_docs)]

mod config;
mod error;
mod jira;
mod mock;
mod registry;
mod service;

pub use config::{JiraConfig, TrackerConfig};
pub use error::TrackerError;
pub use jira::JiraTracker;
pub use mock::MockTracker;
pub use registry::{TrackerFactory, TrackerHandle, TrackerRegistry};
pub use service::{FilingOutcome, IssueFiling, ObligationIssueService};
