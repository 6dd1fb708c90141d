use thiserror::Error;

/// Failures that prevent a run from starting at all. Failures *inside* a
/// run end it with a [`crate::RunReport`] instead.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("a run is already in progress")]
    AlreadyRunning,

    #[error("no page context available: {0}")]
    NoPageContext(String),
}
