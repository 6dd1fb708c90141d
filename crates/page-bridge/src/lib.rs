//! Page bridge: the seam between the orchestrator and the page context.
//!
//! The orchestrator never touches a page directly. It sends
//! [`PageCommand`] requests over a [`PageBridge`] and the page side answers
//! with [`PageResponse`] values; a gone or unresponsive page context fails
//! the request rather than hanging. The page side itself operates through
//! the [`PageDriver`] trait, for which [`MemoryPage`] provides a
//! deterministic in-memory implementation for tests and offline
//! development.

pub mod channel;
pub mod driver;
pub mod errors;
pub mod memory;
pub mod messages;

pub use channel::{BridgeRequest, ChannelBridge, PageEndpoint};
pub use driver::{BoundingBox, Clickable, ElementHandle, FocusedElement, PageDriver};
pub use errors::{BridgeError, DriverError};
pub use memory::{MemoryPage, PageOp};
pub use messages::{PageCommand, PageResponse};

use async_trait::async_trait;

/// Request/response client toward the page context.
#[async_trait]
pub trait PageBridge: Send + Sync {
    async fn request(&self, command: PageCommand) -> Result<PageResponse, BridgeError>;
}
