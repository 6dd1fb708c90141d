//! The action vocabulary shared by both decision sources.
//!
//! Actions arrive on the wire as an open [`ActionEnvelope`] (whatever a
//! reasoning service or a recorded trace produced) and are normalized into
//! the closed [`Action`] enum before dispatch, so every executor site gets
//! exhaustive, compile-time-checked matching over the kinds.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Default duration for `wait` actions that omit one, in milliseconds.
pub const DEFAULT_WAIT_MS: u64 = 1_000;

/// Raw wire shape of an action as produced by a decision source.
///
/// Fields that are meaningless for a given kind are simply ignored during
/// normalization — an envelope is never rejected for carrying extras.
/// `text` is kept as a raw JSON value so that a non-string payload can be
/// rejected with a typed error instead of failing whole-envelope
/// deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEnvelope {
    /// Action kind tag, e.g. `click`, `type`, `navigate`.
    pub kind: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub filepath: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    /// Free-text commentary from the decision source. Surfaced to the
    /// operator, never used as control data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl ActionEnvelope {
    /// Build a bare envelope of the given kind.
    pub fn of_kind(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            selector: None,
            text: None,
            url: None,
            filepath: None,
            x: None,
            y: None,
            key: None,
            duration_ms: None,
            reasoning: None,
        }
    }

    /// Convenience constructor for a selector click.
    pub fn click(selector: impl Into<String>) -> Self {
        let mut env = Self::of_kind("click");
        env.selector = Some(selector.into());
        env
    }

    /// Convenience constructor for typing into an element.
    pub fn type_text(selector: impl Into<String>, text: impl Into<String>) -> Self {
        let mut env = Self::of_kind("type");
        env.selector = Some(selector.into());
        env.text = Some(Value::String(text.into()));
        env
    }

    /// Convenience constructor for navigation.
    pub fn navigate(url: impl Into<String>) -> Self {
        let mut env = Self::of_kind("navigate");
        env.url = Some(url.into());
        env
    }

    /// Convenience constructor for a fixed wait.
    pub fn wait(duration_ms: u64) -> Self {
        let mut env = Self::of_kind("wait");
        env.duration_ms = Some(duration_ms);
        env
    }

    /// Convenience constructor for a no-op.
    pub fn noop() -> Self {
        Self::of_kind("noop")
    }

    /// Attach reasoning commentary.
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    /// Apply `f` to every string-valued field of the envelope.
    ///
    /// This is the substitution surface for replay: selector, text (when it
    /// is a string), url, filepath and key are candidates; numeric fields
    /// and the reasoning commentary pass through untouched.
    pub fn map_strings(&self, mut f: impl FnMut(&str) -> String) -> Self {
        let mut out = self.clone();
        out.selector = self.selector.as_deref().map(&mut f);
        out.url = self.url.as_deref().map(&mut f);
        out.filepath = self.filepath.as_deref().map(&mut f);
        out.key = self.key.as_deref().map(&mut f);
        if let Some(Value::String(text)) = &self.text {
            out.text = Some(Value::String(f(text)));
        }
        out
    }

    /// Normalize the open wire shape into the closed [`Action`] enum.
    pub fn normalize(&self) -> Result<Action, NormalizeError> {
        match self.kind.as_str() {
            "click" => Ok(Action::Click {
                selector: self.selector.clone(),
                offset: match (self.x, self.y) {
                    (Some(x), Some(y)) => Some((x, y)),
                    _ => None,
                },
            }),
            "click_text" => Ok(Action::ClickText {
                text: self.required_text("click_text")?,
            }),
            "type" => Ok(Action::Type {
                selector: self.required_selector("type")?,
                text: self.required_text("type")?,
            }),
            "scroll" => Ok(Action::Scroll {
                x: self.x.unwrap_or(0.0),
                y: self.y.unwrap_or(0.0),
            }),
            "navigate" => Ok(Action::Navigate {
                url: self
                    .url
                    .clone()
                    .ok_or(NormalizeError::MissingField { kind: "navigate", field: "url" })?,
            }),
            "upload" => Ok(Action::Upload {
                selector: self.required_selector("upload")?,
            }),
            "wait" => Ok(Action::Wait {
                duration_ms: self.duration_ms.unwrap_or(DEFAULT_WAIT_MS),
            }),
            "click_coordinates" => Ok(Action::ClickCoordinates {
                x: self.required_coord("click_coordinates", "x", self.x)?,
                y: self.required_coord("click_coordinates", "y", self.y)?,
            }),
            "type_at_cursor" => Ok(Action::TypeAtCursor {
                text: self.required_text("type_at_cursor")?,
            }),
            "key_press" => Ok(Action::KeyPress {
                key: self
                    .key
                    .clone()
                    .ok_or(NormalizeError::MissingField { kind: "key_press", field: "key" })?,
            }),
            "mouse_move" => Ok(Action::MouseMove {
                x: self.required_coord("mouse_move", "x", self.x)?,
                y: self.required_coord("mouse_move", "y", self.y)?,
            }),
            // A screenshot-only step from the reasoning dialect is a look
            // without an act.
            "noop" | "screenshot" => Ok(Action::Noop),
            other => Err(NormalizeError::UnknownKind(other.to_string())),
        }
    }

    fn required_selector(&self, kind: &'static str) -> Result<String, NormalizeError> {
        self.selector
            .clone()
            .ok_or(NormalizeError::MissingField { kind, field: "selector" })
    }

    fn required_text(&self, kind: &'static str) -> Result<String, NormalizeError> {
        match &self.text {
            Some(Value::String(text)) => Ok(text.clone()),
            Some(_) => Err(NormalizeError::TextNotString(kind)),
            None => Err(NormalizeError::MissingField { kind, field: "text" }),
        }
    }

    fn required_coord(
        &self,
        kind: &'static str,
        field: &'static str,
        value: Option<f64>,
    ) -> Result<f64, NormalizeError> {
        value.ok_or(NormalizeError::MissingField { kind, field })
    }
}

/// Closed, exhaustive action vocabulary.
///
/// Adding a kind here is a compile-time-checked change: every dispatch site
/// matches exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    /// Click an element. Without a selector the executor reports
    /// `ElementNotFound`; with an offset the click lands relative to the
    /// element's bounding box.
    Click {
        selector: Option<String>,
        offset: Option<(f64, f64)>,
    },
    /// Click the first clickable-role element whose visible text contains
    /// the given text (case-insensitive, document order).
    ClickText { text: String },
    /// Clear and re-type a value character by character.
    Type { selector: String, text: String },
    /// Smooth-scroll the document to an absolute position.
    Scroll { x: f64, y: f64 },
    /// Fire-and-forget location change.
    Navigate { url: String },
    /// Open the native file picker on a `file`-typed input. The contract
    /// ends at opening the dialog.
    Upload { selector: String },
    /// Suspend for the given duration.
    Wait { duration_ms: u64 },
    /// Click at an absolute viewport coordinate.
    ClickCoordinates { x: f64, y: f64 },
    /// Type into whatever element currently holds focus.
    TypeAtCursor { text: String },
    /// Press a named key.
    KeyPress { key: String },
    /// Move the pointer to a viewport coordinate.
    MouseMove { x: f64, y: f64 },
    /// Do nothing, successfully.
    Noop,
}

impl Action {
    /// Kind tag matching the wire vocabulary.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Click { .. } => "click",
            Action::ClickText { .. } => "click_text",
            Action::Type { .. } => "type",
            Action::Scroll { .. } => "scroll",
            Action::Navigate { .. } => "navigate",
            Action::Upload { .. } => "upload",
            Action::Wait { .. } => "wait",
            Action::ClickCoordinates { .. } => "click_coordinates",
            Action::TypeAtCursor { .. } => "type_at_cursor",
            Action::KeyPress { .. } => "key_press",
            Action::MouseMove { .. } => "mouse_move",
            Action::Noop => "noop",
        }
    }
}

/// Failures turning a wire envelope into a normalized action.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormalizeError {
    /// The kind tag is not part of the vocabulary. Never silently ignored.
    #[error("unknown action kind '{0}'")]
    UnknownKind(String),

    /// A field the kind requires was absent.
    #[error("action '{kind}' is missing required field '{field}'")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },

    /// The text payload was present but not a JSON string.
    #[error("action '{0}' received a non-string text value")]
    TextNotString(&'static str),
}
