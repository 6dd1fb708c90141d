//! The page driver seam.
//!
//! Everything the executor and the perceivers need from a live page is
//! expressed through [`PageDriver`]. A production deployment backs this
//! with a real browser protocol; tests and offline development use
//! [`crate::MemoryPage`].

use async_trait::async_trait;
use listflow_core_types::{DomNode, PageInfo, Screenshot};
use serde::{Deserialize, Serialize};

use crate::errors::DriverError;

/// Opaque reference to an element within the current page snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle {
    pub node_id: u64,
}

/// A clickable-role element in document order, with its visible text.
#[derive(Debug, Clone, PartialEq)]
pub struct Clickable {
    pub handle: ElementHandle,
    pub text: String,
}

/// Viewport-relative bounding box of an element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// The element currently holding focus.
#[derive(Debug, Clone, PartialEq)]
pub struct FocusedElement {
    pub handle: ElementHandle,
    /// True for contenteditable-style regions, false for plain form
    /// controls. The two expose different editing primitives.
    pub editable_region: bool,
}

/// Primitive page operations.
///
/// Implementations report failures as [`DriverError`]; policy (retry,
/// abort, record) always belongs to the caller.
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn page_info(&self) -> Result<PageInfo, DriverError>;
    async fn dom(&self) -> Result<DomNode, DriverError>;
    async fn screenshot(&self) -> Result<Screenshot, DriverError>;

    /// First element matching a selector, if any.
    async fn query(&self, selector: &str) -> Result<Option<ElementHandle>, DriverError>;

    /// Clickable-role elements (links, buttons, role=button, click handlers)
    /// in document order.
    async fn clickables(&self) -> Result<Vec<Clickable>, DriverError>;

    async fn bounding_box(&self, el: ElementHandle) -> Result<BoundingBox, DriverError>;

    /// `type` attribute for input elements, `None` otherwise.
    async fn input_type(&self, el: ElementHandle) -> Result<Option<String>, DriverError>;

    async fn scroll_into_view(&self, el: ElementHandle) -> Result<(), DriverError>;

    /// Native activation (click) of an element.
    async fn activate(&self, el: ElementHandle) -> Result<(), DriverError>;

    /// Synthetic pointer event at an absolute viewport coordinate.
    async fn pointer_click(&self, x: f64, y: f64) -> Result<(), DriverError>;

    async fn clear_value(&self, el: ElementHandle) -> Result<(), DriverError>;

    /// Append one character and fire the per-keystroke input notification.
    async fn append_char(&self, el: ElementHandle, ch: char) -> Result<(), DriverError>;

    /// Fire the final change notification after typing.
    async fn fire_change(&self, el: ElementHandle) -> Result<(), DriverError>;

    async fn scroll_to(&self, x: f64, y: f64) -> Result<(), DriverError>;
    async fn navigate(&self, url: &str) -> Result<(), DriverError>;
    async fn press_key(&self, key: &str) -> Result<(), DriverError>;
    async fn mouse_move(&self, x: f64, y: f64) -> Result<(), DriverError>;

    async fn focused(&self) -> Result<Option<FocusedElement>, DriverError>;

    /// Insert text at the caret of an editable region, firing input/change.
    async fn insert_at_caret(&self, text: &str) -> Result<(), DriverError>;

    /// Set a plain form control's value and selection range directly.
    async fn set_value_with_selection(
        &self,
        el: ElementHandle,
        text: &str,
    ) -> Result<(), DriverError>;

    /// Open the native file picker on an input element.
    async fn open_file_picker(&self, el: ElementHandle) -> Result<(), DriverError>;
}
