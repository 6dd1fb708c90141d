//! Error types for the bridge and the driver seam.

use std::time::Duration;
use thiserror::Error;

/// Failures delivering a command to the page context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// The page context did not answer within the configured window.
    #[error("page context did not respond within {0:?}")]
    Timeout(Duration),

    /// The page context is gone (tab closed, host stopped).
    #[error("page context is gone")]
    Disconnected,
}

/// Failures raised by a page driver while touching the page.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// No active page context exists.
    #[error("no active page context")]
    Gone,

    /// The referenced element no longer exists.
    #[error("stale element reference: {0}")]
    Stale(String),

    /// Transport-level failure talking to the page.
    #[error("driver i/o failure: {0}")]
    Io(String),
}
