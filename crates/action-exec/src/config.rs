//! Timing configuration for action execution.

use serde::{Deserialize, Serialize};

/// Delays applied while executing actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Delay between typed characters in milliseconds.
    /// Default: 30
    pub char_delay_ms: u64,

    /// Settle pause after scrolling an element into view or scrolling the
    /// document, in milliseconds.
    /// Default: 300
    pub settle_delay_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            char_delay_ms: 30,
            settle_delay_ms: 300,
        }
    }
}

impl ExecutorConfig {
    /// Zero-delay config for tests.
    pub fn minimal() -> Self {
        Self {
            char_delay_ms: 0,
            settle_delay_ms: 0,
        }
    }
}
