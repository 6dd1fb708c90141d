//! Error taxonomy for action execution.

use listflow_core_types::NormalizeError;
use page_bridge::DriverError;
use thiserror::Error;

/// Structured execution failures.
///
/// Targeting errors (`ElementNotFound`, `NoMatchingElement`) are
/// retryable from the orchestrator's point of view; contract errors
/// (`TextNotString`) fail before any page mutation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecError {
    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("no clickable element matching text '{0}'")]
    NoMatchingElement(String),

    #[error("type action received a non-string text value")]
    TextNotString,

    #[error("'{0}' is not a file input")]
    NotFileInput(String),

    #[error("unknown action kind '{0}'")]
    UnknownAction(String),

    #[error("action '{kind}' is missing required field '{field}'")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },

    #[error("no element holds focus for type_at_cursor")]
    NoFocusedElement,

    #[error("page context is gone")]
    PageGone,

    #[error("driver failure: {0}")]
    Driver(String),
}

impl ExecError {
    /// Whether the orchestrator may retry the iteration that produced this
    /// failure without skipping work.
    pub fn is_targeting(&self) -> bool {
        matches!(
            self,
            ExecError::ElementNotFound(_) | ExecError::NoMatchingElement(_)
        )
    }
}

impl From<NormalizeError> for ExecError {
    fn from(err: NormalizeError) -> Self {
        match err {
            NormalizeError::UnknownKind(kind) => ExecError::UnknownAction(kind),
            NormalizeError::TextNotString(_) => ExecError::TextNotString,
            NormalizeError::MissingField { kind, field } => ExecError::MissingField { kind, field },
        }
    }
}

impl From<DriverError> for ExecError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::Gone => ExecError::PageGone,
            DriverError::Stale(what) => ExecError::ElementNotFound(what),
            DriverError::Io(message) => ExecError::Driver(message),
        }
    }
}
