//! Record module - obligations as persisted after an extraction run

use crate::Priority;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Unique identifier for a stored obligation based on UUIDv7
///
/// UUIDv7 keeps identifiers chronologically sortable, so listing by id
/// follows insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObligationId(u128);

impl ObligationId {
    /// Generate a new UUIDv7-based ObligationId
    ///
    /// # Examples
    ///
    /// ```
    /// use covenant_domain::ObligationId;
    ///
    /// let id = ObligationId::new();
    /// assert!(id.value() > 0);
    /// ```
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Create an ObligationId from a raw u128 value
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Parse an ObligationId from its hyphenated string form
    ///
    /// # Examples
    ///
    /// ```
    /// use covenant_domain::ObligationId;
    ///
    /// let id = ObligationId::new();
    /// let parsed = ObligationId::from_string(&id.to_string()).unwrap();
    /// assert_eq!(id, parsed);
    /// ```
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(|u| Self(u.as_u128()))
            .map_err(|e| format!("Invalid obligation id: {}", e))
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }
}

impl Default for ObligationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObligationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

impl Serialize for ObligationId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ObligationId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ObligationId::from_string(&s).map_err(serde::de::Error::custom)
    }
}

/// A stored obligation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obligation {
    /// Unique identifier
    pub id: ObligationId,

    /// Full obligation text
    pub obligation_text: String,

    /// Section reference
    pub section: Option<String>,

    /// Deadline, `"Not specified"` when the source gives none
    pub deadline: Option<String>,

    /// Canonical name of the responsible party
    pub party_name: String,

    /// Priority
    pub priority: Priority,

    /// Name of the uploaded document
    pub source_document: Option<String>,

    /// Page the obligation was found on
    pub source_page: Option<u32>,

    /// Creation timestamp (Unix seconds)
    pub created_at: u64,

    /// Last update timestamp (Unix seconds)
    pub updated_at: u64,

    /// Key of the issue filed for this obligation
    pub issue_id: Option<String>,
}

/// Partial update of a stored obligation; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObligationUpdate {
    /// New obligation text
    #[serde(default)]
    pub obligation_text: Option<String>,
    /// New section reference
    #[serde(default)]
    pub section: Option<String>,
    /// New deadline
    #[serde(default)]
    pub deadline: Option<String>,
    /// New party name
    #[serde(default)]
    pub party_name: Option<String>,
    /// New priority
    #[serde(default)]
    pub priority: Option<Priority>,
}

impl ObligationUpdate {
    /// True when the update changes nothing
    pub fn is_empty(&self) -> bool {
        self.obligation_text.is_none()
            && self.section.is_none()
            && self.deadline.is_none()
            && self.party_name.is_none()
            && self.priority.is_none()
    }

    /// Apply the update to a record, bumping `updated_at`
    pub fn apply_to(&self, obligation: &mut Obligation, now: u64) {
        if let Some(text) = &self.obligation_text {
            obligation.obligation_text = text.clone();
        }
        if let Some(section) = &self.section {
            obligation.section = Some(section.clone());
        }
        if let Some(deadline) = &self.deadline {
            obligation.deadline = Some(deadline.clone());
        }
        if let Some(party) = &self.party_name {
            obligation.party_name = party.clone();
        }
        if let Some(priority) = self.priority {
            obligation.priority = priority;
        }
        obligation.updated_at = now;
    }
}

/// Listing criteria for stored obligations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObligationQuery {
    /// Page number, 1-indexed
    pub page: usize,

    /// Items per page
    pub page_size: usize,

    /// Case-insensitive exact party filter
    pub party_name: Option<String>,
}

impl Default for ObligationQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 10,
            party_name: None,
        }
    }
}

/// Navigation flags for a paginated listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// A later page exists
    pub has_next: bool,
    /// An earlier page exists
    pub has_previous: bool,
    /// Number of the next page
    pub next_page: Option<usize>,
    /// Number of the previous page
    pub previous_page: Option<usize>,
}

impl Pagination {
    /// Compute navigation for `page` out of `total_pages`
    pub fn new(page: usize, total_pages: usize) -> Self {
        let has_next = page < total_pages;
        let has_previous = page > 1;
        Self {
            has_next,
            has_previous,
            next_page: has_next.then_some(page + 1),
            previous_page: has_previous.then(|| page - 1),
        }
    }

    /// Number of pages needed for `total` items; at least one
    pub fn total_pages(total: usize, page_size: usize) -> usize {
        if total == 0 || page_size == 0 {
            1
        } else {
            total.div_ceil(page_size)
        }
    }
}

/// One page of stored obligations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObligationPage {
    /// Obligations on this page
    pub obligations: Vec<Obligation>,
    /// Total matching obligations
    pub total: usize,
    /// Page actually returned (clamped)
    pub page: usize,
    /// Items per page
    pub page_size: usize,
    /// Total pages, at least one
    pub total_pages: usize,
    /// Navigation flags
    pub pagination: Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_serializes_as_string() {
        let id = ObligationId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
        let parsed: ObligationId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_invalid_id_string() {
        assert!(ObligationId::from_string("not-a-uuid").is_err());
    }

    #[test]
    fn test_ids_are_ordered() {
        let first = ObligationId::new();
        let second = ObligationId::new();
        assert!(first <= second);
    }

    #[test]
    fn test_pagination() {
        let p = Pagination::new(1, 3);
        assert!(p.has_next);
        assert!(!p.has_previous);
        assert_eq!(p.next_page, Some(2));
        assert_eq!(p.previous_page, None);

        let p = Pagination::new(3, 3);
        assert!(!p.has_next);
        assert_eq!(p.previous_page, Some(2));
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(Pagination::total_pages(0, 10), 1);
        assert_eq!(Pagination::total_pages(10, 10), 1);
        assert_eq!(Pagination::total_pages(11, 10), 2);
    }

    #[test]
    fn test_update_applies_only_set_fields() {
        let mut ob = Obligation {
            id: ObligationId::new(),
            obligation_text: "Pay".to_string(),
            section: Some("1".to_string()),
            deadline: None,
            party_name: "Buyer".to_string(),
            priority: Priority::Medium,
            source_document: None,
            source_page: None,
            created_at: 10,
            updated_at: 10,
            issue_id: None,
        };

        let update = ObligationUpdate {
            priority: Some(Priority::High),
            ..Default::default()
        };
        assert!(!update.is_empty());
        update.apply_to(&mut ob, 20);

        assert_eq!(ob.priority, Priority::High);
        assert_eq!(ob.obligation_text, "Pay");
        assert_eq!(ob.updated_at, 20);
        assert!(ObligationUpdate::default().is_empty());
    }
}
