//! Page perception: structural element summaries and visual capture.
//!
//! Both perceivers are pure reads. The structural side turns a DOM
//! snapshot into a bounded list of interactive-element summaries with
//! generated selectors; the visual side produces a viewport screenshot.
//! Neither retries — retry policy lives in the orchestrator.

pub mod structural;
pub mod visual;

pub use structural::{inspect, summarize_dom, InspectError, DEFAULT_ELEMENT_LIMIT};
pub use visual::{capture, screenshot_base64, CaptureError};
