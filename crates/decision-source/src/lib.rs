//! Decision sources: providers of "what to do next".
//!
//! Two interchangeable implementations share one interface: a reasoning
//! service consulted once per iteration, and a deterministic lookup into a
//! previously recorded trace. The orchestrator only ever talks to the
//! [`DecisionSource`] trait.

pub mod errors;
pub mod reasoning;
pub mod substitute;
pub mod trace_source;

pub use errors::DecisionError;
pub use reasoning::{ReasoningConfig, ReasoningSession, ReasoningSource};
pub use substitute::{substitute, substitute_envelope, substitute_with_report, SubstitutionReport};
pub use trace_source::TraceSource;

use async_trait::async_trait;
use listflow_core_types::{ActionEnvelope, ElementSummary, HistoryEntry, Screenshot};
use serde::{Deserialize, Serialize};

/// Everything a decision source may consult for one iteration.
#[derive(Debug, Clone, Default)]
pub struct DecisionContext {
    pub goal: String,
    /// 1-based iteration index within the run.
    pub iteration: u32,
    /// Replay cursor. Owned and advanced by the orchestrator, never by a
    /// decision source, so a failed action retries the same trace entry.
    pub step_cursor: usize,
    pub current_url: String,
    pub screenshot: Option<Screenshot>,
    pub elements: Vec<ElementSummary>,
    /// Most recent action history (the orchestrator passes the last five).
    pub history: Vec<HistoryEntry>,
}

/// One decision: an optional next action, commentary, and a terminal flag.
///
/// A decision may carry both `done = true` and an action; the orchestrator
/// treats `done` as authoritative and does not execute the action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub action: Option<ActionEnvelope>,
    pub rationale: String,
    pub done: bool,
}

impl Decision {
    pub fn done(rationale: impl Into<String>) -> Self {
        Self {
            action: None,
            rationale: rationale.into(),
            done: true,
        }
    }

    pub fn act(action: ActionEnvelope, rationale: impl Into<String>) -> Self {
        Self {
            action: Some(action),
            rationale: rationale.into(),
            done: false,
        }
    }
}

/// Provider of the next action for an agent run.
#[async_trait]
pub trait DecisionSource: Send + Sync {
    async fn decide(&mut self, ctx: &DecisionContext) -> Result<Decision, DecisionError>;
}
