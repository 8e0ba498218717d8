//! Covenant Domain Layer
//!
//! Core data model and trait seams for the obligation pipeline. Everything
//! that crosses a crate boundary lives here: the shape of an extraction
//! result, the persisted obligation record, and the interfaces the pipeline
//! uses to reach infrastructure.
//!
//! ## Key Concepts
//!
//! - **Party**: a named entity to whom obligations are attributed
//! - **ObligationCandidate**: one obligation as produced by the LLM
//! - **ObligationSet**: `{ "parties": [...] }`, the unit the pipeline emits
//! - **Obligation**: a stored record with identifier and timestamps
//! - **Issue**: a work item filed for an obligation in a project tracker
//!
//! ## Architecture
//!
//! Infrastructure implementations (LLM backends, storage, issue trackers) live in other
//! crates and implement the traits in [`traits`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod issue;
pub mod obligation;
pub mod priority;
pub mod record;
pub mod traits;

// Re-exports for convenience
pub use issue::{Issue, IssueRequest, IssueUpdate};
pub use obligation::{ObligationCandidate, ObligationSet, Party};
pub use priority::Priority;
pub use record::{
    Obligation, ObligationId, ObligationPage, ObligationQuery, ObligationUpdate, Pagination,
};
