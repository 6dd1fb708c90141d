//! Decision-source error taxonomy.

use thiserror::Error;

/// Failures obtaining a decision.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecisionError {
    /// Network or service-level failure. Retried with backoff by the
    /// orchestrator.
    #[error("decision transport failure: {0}")]
    Transport(String),

    /// Malformed payload. A hard error for the attempt, never retried.
    #[error("malformed decision payload: {0}")]
    Parse(String),
}

impl DecisionError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, DecisionError::Transport(_))
    }
}
