//! Obligation module - the shape of an extraction result
//!
//! These types mirror the JSON contract with the LLM:
//!
//! ```json
//! {"parties": [{"name": "Buyer", "obligations": [
//!     {"obligation_text": "Pay $100", "deadline": null, "section": "1"}
//! ]}]}
//! ```

use serde::{Deserialize, Deserializer, Serialize};

/// A single obligation attributed to a party
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObligationCandidate {
    /// Full text of the obligation
    pub obligation_text: String,

    /// Deadline or timeframe, if the source states one
    #[serde(default)]
    pub deadline: Option<String>,

    /// Section reference of the chunk the obligation came from
    #[serde(default, deserialize_with = "nullable_string")]
    pub section: String,

    /// Page the originating chunk was tagged with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
}

impl ObligationCandidate {
    /// Create a candidate with no deadline and no page
    pub fn new(obligation_text: impl Into<String>, section: impl Into<String>) -> Self {
        Self {
            obligation_text: obligation_text.into(),
            deadline: None,
            section: section.into(),
            page_number: None,
        }
    }

    /// Set the deadline
    pub fn with_deadline(mut self, deadline: impl Into<String>) -> Self {
        self.deadline = Some(deadline.into());
        self
    }
}

/// A party and the obligations attributed to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    /// Party name (canonical once it has passed through the tracker)
    pub name: String,

    /// Obligations in encounter order
    #[serde(default)]
    pub obligations: Vec<ObligationCandidate>,
}

impl Party {
    /// Create a party with no obligations
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            obligations: Vec::new(),
        }
    }
}

/// Obligations grouped by responsible party
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObligationSet {
    /// Parties in first-encounter order
    #[serde(default)]
    pub parties: Vec<Party>,
}

impl ObligationSet {
    /// Create a set from a list of parties
    pub fn new(parties: Vec<Party>) -> Self {
        Self { parties }
    }

    /// Total number of obligations across all parties
    pub fn obligation_count(&self) -> usize {
        self.parties.iter().map(|p| p.obligations.len()).sum()
    }

    /// True when no party carries an obligation
    pub fn is_empty(&self) -> bool {
        self.obligation_count() == 0
    }

    /// Iterate over `(party name, obligation)` pairs
    pub fn iter_obligations(&self) -> impl Iterator<Item = (&str, &ObligationCandidate)> {
        self.parties.iter().flat_map(|party| {
            party
                .obligations
                .iter()
                .map(move |obligation| (party.name.as_str(), obligation))
        })
    }
}

fn nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
