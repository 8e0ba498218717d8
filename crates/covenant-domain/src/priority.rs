//! Priority module - urgency of an obligation or the issue filed for it

use serde::{Deserialize, Serialize};

/// Priority attached to stored obligations and filed issues
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    /// No deadline pressure
    Low,

    /// Default
    #[default]
    Medium,

    /// Immediate action required
    High,
}

impl Priority {
    /// Get the priority name as used by issue trackers
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }

    /// Parse a priority, ignoring case
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }

    /// Derive a priority from a free-text deadline
    ///
    /// "immediate" anywhere in the deadline means `High`; a deadline that
    /// mentions both "no" and "deadline" (e.g. "No deadline specified")
    /// means `Low`; everything else, including no deadline at all, is `Medium`.
    pub fn from_deadline(deadline: Option<&str>) -> Self {
        let Some(deadline) = deadline else {
            return Priority::Medium;
        };
        let lowered = deadline.to_lowercase();
        if lowered.contains("immediate") {
            Priority::High
        } else if lowered.contains("no") && lowered.contains("deadline") {
            Priority::Low
        } else {
            Priority::Medium
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid priority: {}", s))
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
