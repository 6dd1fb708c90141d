//! Short-term action history for a single run.
//!
//! A bounded ring buffer, not a full log: the orchestrator keeps the most
//! recent entries as context for the decision source and discards the rest.
//! Never persisted beyond the run.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Ring-buffer capacity for run history.
pub const HISTORY_CAPACITY: usize = 10;

/// Outcome of one executed action as seen by the decision source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryResult {
    Success,
    Failed(String),
}

impl fmt::Display for HistoryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryResult::Success => write!(f, "success"),
            HistoryResult::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// One entry in the run's short-term history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Action kind tag.
    pub action: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,

    pub result: HistoryResult,
}

impl HistoryEntry {
    pub fn success(action: impl Into<String>, selector: Option<String>) -> Self {
        Self {
            action: action.into(),
            selector,
            result: HistoryResult::Success,
        }
    }

    pub fn failed(
        action: impl Into<String>,
        selector: Option<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            action: action.into(),
            selector,
            result: HistoryResult::Failed(reason.into()),
        }
    }
}

/// Append-only-during-a-run ring buffer of [`HistoryEntry`] values.
#[derive(Debug, Clone)]
pub struct ActionHistory {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl Default for ActionHistory {
    fn default() -> Self {
        Self::new(HISTORY_CAPACITY)
    }
}

impl ActionHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an entry, evicting the oldest once at capacity.
    pub fn push(&mut self, entry: HistoryEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The most recent `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> Vec<HistoryEntry> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).cloned().collect()
    }

    /// Full snapshot, oldest first.
    pub fn snapshot(&self) -> Vec<HistoryEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_never_exceeds_capacity() {
        let mut history = ActionHistory::new(3);
        for i in 0..10 {
            history.push(HistoryEntry::success(format!("click{i}"), None));
        }
        assert_eq!(history.len(), 3);
        let snapshot = history.snapshot();
        assert_eq!(snapshot[0].action, "click7");
        assert_eq!(snapshot[2].action, "click9");
    }

    #[test]
    fn recent_returns_newest_entries_oldest_first() {
        let mut history = ActionHistory::default();
        for i in 0..6 {
            history.push(HistoryEntry::success(format!("a{i}"), None));
        }
        let recent = history.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].action, "a4");
        assert_eq!(recent[1].action, "a5");
    }

    #[test]
    fn failed_result_formats_with_reason() {
        let entry = HistoryEntry::failed("click", Some("#x".into()), "element not found");
        assert_eq!(entry.result.to_string(), "failed: element not found");
    }
}
