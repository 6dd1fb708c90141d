//! Shared primitives for the listflow automation core.
//!
//! Hosts the action vocabulary used by both decision dialects, the recorded
//! trace and listing-record shapes that drive deterministic replay, and the
//! page-perception data types exchanged over the page bridge.

pub mod action;
pub mod element;
pub mod history;
pub mod page;
pub mod record;
pub mod trace;

pub use action::{Action, ActionEnvelope, NormalizeError};
pub use element::{DomNode, ElementSummary};
pub use history::{ActionHistory, HistoryEntry, HistoryResult, HISTORY_CAPACITY};
pub use page::{PageInfo, Screenshot};
pub use record::{ListingRecord, CANONICAL_FIELDS};
pub use trace::{RecordedAction, Trace, TraceIssue};
