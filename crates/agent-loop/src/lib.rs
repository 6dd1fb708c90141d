//! The perceive → decide → act loop.
//!
//! The orchestrator here owns run lifecycle, iteration budget, retry and
//! backoff, and teardown. It talks to the page exclusively through the
//! [`page_bridge::PageBridge`] RPC surface and gets its next action from a
//! [`decision_source::DecisionSource`], so every other concern stays
//! swappable.

pub mod classify;
pub mod config;
pub mod errors;
pub mod orchestrator;
pub mod recorder;
pub mod report;
pub mod status;

pub use classify::is_conversational;
pub use config::LoopConfig;
pub use errors::RunError;
pub use orchestrator::Orchestrator;
pub use recorder::{MemoryRecorder, RecordError, TraceRecorder};
pub use report::{RunReport, RunStatus};
pub use status::{StatusSink, StatusUpdate};
