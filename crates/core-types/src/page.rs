//! Page-level snapshot shapes exchanged over the bridge.

use serde::{Deserialize, Serialize};

/// URL and title of the active page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageInfo {
    pub url: String,
    pub title: String,
}

/// Viewport-bounded raster snapshot. Always the visible viewport, never the
/// full page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Screenshot {
    pub width: u32,
    pub height: u32,
    /// Raster format tag, e.g. `png`.
    pub format: String,
    pub data: Vec<u8>,
}

impl Screenshot {
    pub fn png(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            format: "png".to_string(),
            data,
        }
    }
}
