//! Action Executor: one dispatch surface for every action kind.
//!
//! Both decision dialects (reasoning output and recorded traces) funnel
//! their actions through [`ActionExecutor::execute`], which validates the
//! wire envelope, normalizes it into the closed action enum, and performs
//! the kind-specific page operations against a [`page_bridge::PageDriver`].
//! Failures come back as structured [`ExecError`] values; run-continuation
//! policy belongs to the orchestrator, never to this crate.

mod config;
mod errors;
mod executor;

pub use config::ExecutorConfig;
pub use errors::ExecError;
pub use executor::{ActionExecutor, ExecReport};
