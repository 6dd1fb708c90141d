//! Listflow: a "learn once, replay many" browser-automation core.
//!
//! The workspace crates hold the moving parts; this crate wires them into
//! an application: configuration, the page-side command host, and the CLI
//! entry points.

pub mod config;
pub mod host;

pub use config::AppConfig;
pub use host::{OverlayState, PageHost};
