//! Run-scoped obligation deduplication and party-name canonicalization

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Title-case a name: a letter is uppercased when it follows a non-letter
/// and lowercased otherwise.
///
/// ```
/// use covenant_extractor::title_case;
///
/// assert_eq!(title_case("ACME corp"), "Acme Corp");
/// assert_eq!(title_case("o'neil-smith"), "O'Neil-Smith");
/// ```
pub fn title_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_letter = false;
    for ch in name.chars() {
        if ch.is_alphabetic() {
            if prev_letter {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_letter = true;
        } else {
            out.push(ch);
            prev_letter = false;
        }
    }
    out
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Snapshot of tracker counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackerStats {
    /// Distinct normalized obligation texts seen
    pub seen_obligations: usize,
    /// Distinct normalized party names seen
    pub parties: usize,
    /// Obligations reported as duplicates
    pub duplicates_suppressed: usize,
}

/// Remembers what a single extraction run has already seen
///
/// Obligation texts and party names are compared after trimming and
/// lowercasing. The first spelling of a party decides its canonical
/// (title-cased) name for the rest of the run.
#[derive(Debug, Default)]
pub struct ObligationTracker {
    seen_obligations: HashSet<String>,
    party_names: HashMap<String, String>,
    duplicates_suppressed: usize,
}

impl ObligationTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an obligation text; true if an equivalent text was seen before
    pub fn is_duplicate(&mut self, obligation_text: &str) -> bool {
        let key = normalize(obligation_text);
        if self.seen_obligations.contains(&key) {
            self.duplicates_suppressed += 1;
            return true;
        }
        self.seen_obligations.insert(key);
        false
    }

    /// Canonical name for `name`, registering it on first sight
    ///
    /// The canonical form is the first spelling, trimmed and title-cased.
    pub fn standardize_party_name(&mut self, name: &str) -> String {
        self.party_names
            .entry(normalize(name))
            .or_insert_with(|| title_case(name.trim()))
            .clone()
    }

    /// Current counters
    pub fn stats(&self) -> TrackerStats {
        TrackerStats {
            seen_obligations: self.seen_obligations.len(),
            parties: self.party_names.len(),
            duplicates_suppressed: self.duplicates_suppressed,
        }
    }
}

/// An [`ObligationTracker`] shared by the concurrent chunk tasks of one run
///
/// Each operation takes the lock for its own duration only.
#[derive(Debug, Clone, Default)]
pub struct SharedTracker {
    inner: Arc<Mutex<ObligationTracker>>,
}

impl SharedTracker {
    /// Create a fresh shared tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// See [`ObligationTracker::is_duplicate`]
    pub fn is_duplicate(&self, obligation_text: &str) -> bool {
        self.lock().is_duplicate(obligation_text)
    }

    /// See [`ObligationTracker::standardize_party_name`]
    pub fn standardize_party_name(&self, name: &str) -> String {
        self.lock().standardize_party_name(name)
    }

    /// Current counters
    pub fn stats(&self) -> TrackerStats {
        self.lock().stats()
    }

    fn lock(&self) -> MutexGuard<'_, ObligationTracker> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("buyer"), "Buyer");
        assert_eq!(title_case("THE SELLER"), "The Seller");
        assert_eq!(title_case("acme-widgets inc."), "Acme-Widgets Inc.");
        assert_eq!(title_case("3rd party"), "3Rd Party");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_duplicate_detection_is_normalized() {
        let mut tracker = ObligationTracker::new();
        assert!(!tracker.is_duplicate("Pay $100"));
        assert!(tracker.is_duplicate("pay $100"));
        assert!(tracker.is_duplicate("  PAY $100\n"));
        assert!(!tracker.is_duplicate("Pay $200"));

        let stats = tracker.stats();
        assert_eq!(stats.seen_obligations, 2);
        assert_eq!(stats.duplicates_suppressed, 2);
    }

    #[test]
    fn test_first_spelling_wins() {
        let mut tracker = ObligationTracker::new();
        assert_eq!(tracker.standardize_party_name("the BUYER"), "The Buyer");
        assert_eq!(tracker.standardize_party_name("The Buyer"), "The Buyer");
        assert_eq!(tracker.standardize_party_name("  the buyer "), "The Buyer");
        assert_eq!(tracker.standardize_party_name("Seller"), "Seller");
        assert_eq!(tracker.stats().parties, 2);
    }

    #[test]
    fn test_canonical_name_is_trimmed() {
        let mut tracker = ObligationTracker::new();
        assert_eq!(tracker.standardize_party_name("  acme corp \t"), "Acme Corp");
        assert_eq!(tracker.standardize_party_name("ACME CORP"), "Acme Corp");
        assert_eq!(tracker.stats().parties, 1);
    }

    #[test]
    fn test_shared_tracker_clones_share_state() {
        let tracker = SharedTracker::new();
        let other = tracker.clone();

        assert!(!tracker.is_duplicate("Deliver goods"));
        assert!(other.is_duplicate("deliver goods"));
        assert_eq!(tracker.stats().duplicates_suppressed, 1);
    }

    #[test]
    fn test_shared_tracker_across_threads() {
        let tracker = SharedTracker::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracker = tracker.clone();
                std::thread::spawn(move || tracker.is_duplicate("Maintain insurance"))
            })
            .collect();

        let fresh = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|dup| !dup)
            .count();
        assert_eq!(fresh, 1);
    }

    proptest! {
        #[test]
        fn prop_party_names_idempotent(name in "[A-Za-z ]{1,20}") {
            let mut tracker = ObligationTracker::new();
            let first = tracker.standardize_party_name(&name);
            prop_assert_eq!(tracker.standardize_party_name(&name.to_uppercase()), first.clone());
            prop_assert_eq!(tracker.standardize_party_name(&first), first);
        }
    }
}
