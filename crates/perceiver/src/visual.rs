//! Visual perception: viewport screenshot capture.

use base64::engine::general_purpose::STANDARD as Base64;
use base64::Engine as _;
use listflow_core_types::Screenshot;
use page_bridge::{DriverError, PageDriver};
use thiserror::Error;
use tracing::debug;

/// Failures while capturing a screenshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// No active page/tab context exists.
    #[error("no active page context to capture")]
    NoActiveContext,

    #[error("capture failed: {0}")]
    Failed(String),
}

impl From<DriverError> for CaptureError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::Gone => CaptureError::NoActiveContext,
            other => CaptureError::Failed(other.to_string()),
        }
    }
}

/// Capture a viewport-bounded snapshot.
///
/// Single request/response, no retry logic of its own.
pub async fn capture(driver: &dyn PageDriver) -> Result<Screenshot, CaptureError> {
    let shot = driver.screenshot().await?;
    debug!(width = shot.width, height = shot.height, bytes = shot.data.len(), "captured viewport");
    Ok(shot)
}

/// Base64 form used in decision-service payloads.
pub fn screenshot_base64(shot: &Screenshot) -> String {
    Base64.encode(&shot.data)
}
