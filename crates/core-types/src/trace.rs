//! Recorded action traces.
//!
//! A trace is written one entry per executed step during a learning run and
//! becomes immutable once its workflow leaves learning status. All later
//! deterministic runs treat it as a read-only input.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::action::ActionEnvelope;

/// One persisted step of a learned workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedAction {
    /// Step number as recorded during learning (1-based, consecutive).
    pub step: u32,
    pub timestamp: DateTime<Utc>,
    pub action: ActionEnvelope,
}

impl RecordedAction {
    pub fn new(step: u32, action: ActionEnvelope) -> Self {
        Self {
            step,
            timestamp: Utc::now(),
            action,
        }
    }
}

/// Ordered, append-only sequence of recorded actions for one workflow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub workflow_id: String,
    #[serde(default)]
    pub steps: Vec<RecordedAction>,
}

impl Trace {
    pub fn new(workflow_id: impl Into<String>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            steps: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Entry at a replay cursor position. Replay addresses entries by
    /// position, not by their recorded step number, so duplicated or gapped
    /// step numbers in a partial trace cannot skip or repeat work.
    pub fn get(&self, cursor: usize) -> Option<&RecordedAction> {
        self.steps.get(cursor)
    }

    /// Append an entry during learning.
    pub fn push(&mut self, entry: RecordedAction) {
        self.steps.push(entry);
    }

    /// Diagnose duplicate, out-of-order, or gapped step numbers.
    ///
    /// Issues are advisory: replay still runs positionally. They exist so a
    /// damaged trace is visible before it silently replays oddly.
    pub fn validate(&self) -> Vec<TraceIssue> {
        let mut issues = Vec::new();
        for (index, pair) in self.steps.windows(2).enumerate() {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.step == prev.step {
                issues.push(TraceIssue::DuplicateStep(next.step));
            } else if next.step < prev.step {
                issues.push(TraceIssue::OutOfOrder {
                    index: index + 1,
                    step: next.step,
                });
            } else if next.step > prev.step + 1 {
                issues.push(TraceIssue::Gap {
                    from: prev.step,
                    to: next.step,
                });
            }
        }
        issues
    }
}

/// A structural defect in a recorded trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraceIssue {
    DuplicateStep(u32),
    OutOfOrder { index: usize, step: u32 },
    Gap { from: u32, to: u32 },
}

impl fmt::Display for TraceIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceIssue::DuplicateStep(step) => write!(f, "duplicate step number {step}"),
            TraceIssue::OutOfOrder { index, step } => {
                write!(f, "step number {step} at position {index} is out of order")
            }
            TraceIssue::Gap { from, to } => write!(f, "gap between steps {from} and {to}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trace_with_steps(steps: &[u32]) -> Trace {
        let mut trace = Trace::new("wf-1");
        for &step in steps {
            trace.push(RecordedAction::new(step, ActionEnvelope::noop()));
        }
        trace
    }

    #[test]
    fn clean_trace_validates_empty() {
        assert!(trace_with_steps(&[0, 1, 2]).validate().is_empty());
    }

    #[test]
    fn duplicate_and_gap_are_reported() {
        let issues = trace_with_steps(&[0, 1, 1, 4]).validate();
        assert!(issues.contains(&TraceIssue::DuplicateStep(1)));
        assert!(issues.contains(&TraceIssue::Gap { from: 1, to: 4 }));
    }

    #[test]
    fn out_of_order_is_reported() {
        let issues = trace_with_steps(&[0, 2, 1]).validate();
        assert!(issues
            .iter()
            .any(|i| matches!(i, TraceIssue::OutOfOrder { step: 1, .. })));
    }

    #[test]
    fn cursor_lookup_is_positional() {
        let trace = trace_with_steps(&[5, 5, 9]);
        assert_eq!(trace.get(1).unwrap().step, 5);
        assert!(trace.get(3).is_none());
    }

    #[test]
    fn trace_round_trips_through_json() {
        let trace = trace_with_steps(&[0, 1]);
        let raw = serde_json::to_string(&trace).unwrap();
        let back: Trace = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, trace);
    }
}
