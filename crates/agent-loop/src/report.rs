//! Run outcomes handed back to callers.

use listflow_core_types::HistoryEntry;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Failed,
    Stopped,
}

/// Summary of one finished run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub status: RunStatus,
    pub message: String,
    /// Budget units consumed (failed executions are refunded).
    pub iterations: u32,
    pub history: Vec<HistoryEntry>,
    pub elapsed_ms: u64,
}

impl RunReport {
    pub fn completed(message: impl Into<String>) -> Self {
        Self::with_status(RunStatus::Completed, message)
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::with_status(RunStatus::Failed, message)
    }

    pub fn stopped(message: impl Into<String>) -> Self {
        Self::with_status(RunStatus::Stopped, message)
    }

    fn with_status(status: RunStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            iterations: 0,
            history: Vec::new(),
            elapsed_ms: 0,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }
}
