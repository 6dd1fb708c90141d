//! Command/response vocabulary between the orchestrator and the page side.

use listflow_core_types::ActionEnvelope;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Commands the orchestrator may send into the page context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PageCommand {
    CaptureScreenshot,
    GetPageInfo,
    InspectPage,
    ExecuteAction { action: ActionEnvelope },
    ShowOverlay,
    UpdateOverlay { progress: String },
    AddOverlayMessage { message: String },
    HideOverlay,
    ClearErrorLogs,
}

/// Uniform response envelope from the page side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PageResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn ok_empty() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}
