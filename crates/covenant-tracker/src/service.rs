//! Filing obligations as issues

use crate::{TrackerError, TrackerHandle};
use covenant_domain::{
    Issue, IssueRequest, Obligation, ObligationCandidate, ObligationSet, Priority,
};
use serde::Serialize;
use tracing::{error, info};

const TITLE_PREFIX: &str = "Legal Obligation: ";
const TITLE_TEXT_CHARS: usize = 50;
const LABEL: &str = "legal-obligation";

/// Result of filing one obligation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum FilingOutcome {
    /// The backend created the issue
    Created(Issue),
    /// The backend refused or could not be reached
    Failed(String),
}

impl FilingOutcome {
    /// True for `Created`
    pub fn is_created(&self) -> bool {
        matches!(self, FilingOutcome::Created(_))
    }
}

/// One obligation and what happened when it was filed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueFiling {
    /// Responsible party
    pub party: String,
    /// The obligation as extracted
    pub obligation: ObligationCandidate,
    /// Filing result
    pub outcome: FilingOutcome,
}

/// Turns obligations into issues on one backend
pub struct ObligationIssueService {
    handle: TrackerHandle,
}

impl ObligationIssueService {
    /// Create a service filing into `handle`
    pub fn new(handle: TrackerHandle) -> Self {
        Self { handle }
    }

    /// Build the issue for an obligation owed by `party`
    ///
    /// An empty section reads as `Unknown`; a missing deadline as
    /// `Not specified`. Priority follows the deadline wording.
    pub fn build_request(
        party: &str,
        text: &str,
        section: Option<&str>,
        deadline: Option<&str>,
    ) -> IssueRequest {
        let section = section.map(str::trim).filter(|s| !s.is_empty());
        let deadline = deadline.map(str::trim).filter(|d| !d.is_empty());

        let mut request = IssueRequest::new(
            issue_title(text),
            issue_description(
                party,
                text,
                section.unwrap_or("Unknown"),
                deadline.unwrap_or("Not specified"),
            ),
        );
        request.priority = Priority::from_deadline(deadline);
        request.labels = vec![
            LABEL.to_string(),
            format!("party-{}", party.to_lowercase().replace(' ', "-")),
        ];
        request
    }

    /// Build the issue for a stored obligation
    pub fn build_request_for_record(record: &Obligation) -> IssueRequest {
        Self::build_request(
            &record.party_name,
            &record.obligation_text,
            record.section.as_deref(),
            record.deadline.as_deref(),
        )
    }

    /// Name of the backend issues are filed in
    pub fn backend(&self) -> &str {
        self.handle.name()
    }

    /// File a stored obligation
    pub async fn file_record(&self, record: &Obligation) -> Result<Issue, TrackerError> {
        let request = Self::build_request_for_record(record);
        info!(id = %record.id, party = %record.party_name, "Filing issue for stored obligation");
        self.handle.tracker().create_issue(&request).await
    }

    /// File every obligation in `results`, one at a time
    ///
    /// A failed filing is recorded in its [`IssueFiling`] and does not stop
    /// the rest.
    pub async fn file_all(&self, results: &[ObligationSet]) -> Vec<IssueFiling> {
        let mut filings = Vec::new();

        for set in results {
            for party in &set.parties {
                info!(
                    party = %party.name,
                    count = party.obligations.len(),
                    "Filing issues for party"
                );
                for obligation in &party.obligations {
                    let request = Self::build_request(
                        &party.name,
                        &obligation.obligation_text,
                        Some(obligation.section.as_str()),
                        obligation.deadline.as_deref(),
                    );
                    let outcome = match self.handle.tracker().create_issue(&request).await {
                        Ok(issue) => FilingOutcome::Created(issue),
                        Err(e) => {
                            error!(party = %party.name, error = %e, "Failed to file issue");
                            FilingOutcome::Failed(e.to_string())
                        }
                    };
                    filings.push(IssueFiling {
                        party: party.name.clone(),
                        obligation: obligation.clone(),
                        outcome,
                    });
                }
            }
        }

        let created = filings.iter().filter(|f| f.outcome.is_created()).count();
        info!(
            backend = self.backend(),
            created,
            failed = filings.len() - created,
            "Issue filing complete"
        );
        filings
    }
}

fn issue_title(text: &str) -> String {
    if text.chars().count() > TITLE_TEXT_CHARS {
        let head: String = text.chars().take(TITLE_TEXT_CHARS).collect();
        format!("{}{}...", TITLE_PREFIX, head)
    } else {
        format!("{}{}", TITLE_PREFIX, text)
    }
}

fn issue_description(party: &str, text: &str, section: &str, deadline: &str) -> String {
    format!(
        "## Legal Obligation Details\n\n\
         **Obligation Text:**\n{text}\n\n\
         **Responsible Party:** {party}\n\n\
         **Section:** {section}\n\n\
         **Deadline:** {deadline}\n\n\
         **Additional Notes:**\n\
         This obligation was automatically extracted from a legal document.\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockTracker;
    use covenant_domain::Party;

    #[test]
    fn test_short_title_kept_whole() {
        assert_eq!(issue_title("Pay $100"), "Legal Obligation: Pay $100");
        let exact = "x".repeat(50);
        assert_eq!(issue_title(&exact), format!("Legal Obligation: {}", exact));
    }

    #[test]
    fn test_long_title_truncated() {
        let text = "a".repeat(51);
        assert_eq!(
            issue_title(&text),
            format!("Legal Obligation: {}...", "a".repeat(50))
        );
    }

    #[test]
    fn test_title_truncation_respects_chars() {
        let text = "é".repeat(60);
        let title = issue_title(&text);
        assert_eq!(title.chars().count(), TITLE_PREFIX.len() + 50 + 3);
    }

    #[test]
    fn test_request_fields() {
        let request = ObligationIssueService::build_request(
            "Service Provider",
            "Deliver the report",
            Some("4.2"),
            Some("Immediately upon signing"),
        );
        assert_eq!(request.priority, Priority::High);
        assert_eq!(
            request.labels,
            vec!["legal-obligation", "party-service-provider"]
        );
        assert!(request.description.contains("**Responsible Party:** Service Provider"));
        assert!(request.description.contains("**Section:** 4.2"));
        assert!(request
            .description
            .contains("**Deadline:** Immediately upon signing"));
        assert!(request.lock_description);
    }

    #[test]
    fn test_request_defaults() {
        let request = ObligationIssueService::build_request("Buyer", "Pay", Some(""), None);
        assert_eq!(request.priority, Priority::Medium);
        assert!(request.description.contains("**Section:** Unknown"));
        assert!(request.description.contains("**Deadline:** Not specified"));
    }

    #[test]
    fn test_no_deadline_wording_is_low() {
        let request =
            ObligationIssueService::build_request("Buyer", "Pay", None, Some("No deadline given"));
        assert_eq!(request.priority, Priority::Low);
    }

    #[test]
    fn test_outcome_serialization() {
        let failed = serde_json::to_value(FilingOutcome::Failed("down".into())).unwrap();
        assert_eq!(failed["status"], "failed");
        assert_eq!(failed["detail"], "down");
    }

    #[tokio::test]
    async fn test_file_all_records_failures() {
        let tracker = MockTracker::new();
        tracker.fail_titles_containing("Inspect");
        let service = ObligationIssueService::new(TrackerHandle::searchable(tracker));

        let mut buyer = Party::new("Buyer");
        buyer.obligations.push(ObligationCandidate::new("Pay", "1"));
        buyer.obligations.push(ObligationCandidate::new("Inspect goods", "2"));
        let mut seller = Party::new("Seller");
        seller.obligations.push(ObligationCandidate::new("Deliver", "3"));
        let results = vec![ObligationSet::new(vec![buyer]), ObligationSet::new(vec![seller])];

        let filings = service.file_all(&results).await;

        assert_eq!(filings.len(), 3);
        assert!(filings[0].outcome.is_created());
        assert!(!filings[1].outcome.is_created());
        assert!(filings[2].outcome.is_created());
        assert_eq!(filings[2].party, "Seller");
        assert_eq!(filings[1].obligation.obligation_text, "Inspect goods");
    }

    #[tokio::test]
    async fn test_file_all_empty() {
        let service = ObligationIssueService::new(TrackerHandle::searchable(MockTracker::new()));
        assert!(service.file_all(&[]).await.is_empty());
    }
}
