//! DOM snapshot and interactive-element summary shapes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lightweight DOM snapshot node, as surfaced by a page driver.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomNode {
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attrs: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DomNode>,
}

impl DomNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// Own text plus descendant text, whitespace-normalized.
    pub fn visible_text(&self) -> String {
        let mut parts = Vec::new();
        self.collect_text(&mut parts);
        parts.join(" ")
    }

    fn collect_text(&self, parts: &mut Vec<String>) {
        if let Some(text) = &self.text {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                parts.push(trimmed.to_string());
            }
        }
        for child in &self.children {
            child.collect_text(parts);
        }
    }
}

/// One interactive element as reported by the page inspector.
///
/// The decision source grounds its targeting in these summaries; selectors
/// are generated by the inspector (id, then unique class combination, then
/// a structural path).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum ElementSummary {
    Input {
        tag: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        input_type: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        label: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        placeholder: Option<String>,
        selector: String,
    },
    Button {
        text: String,
        selector: String,
    },
    Link {
        text: String,
        href: String,
    },
}

impl ElementSummary {
    /// Selector or href used to address the element, for logging.
    pub fn target(&self) -> &str {
        match self {
            ElementSummary::Input { selector, .. } => selector,
            ElementSummary::Button { selector, .. } => selector,
            ElementSummary::Link { href, .. } => href,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visible_text_joins_descendants() {
        let mut node = DomNode::new("div");
        node.text = Some("  Hello ".into());
        let mut child = DomNode::new("span");
        child.text = Some("world".into());
        node.children.push(child);
        assert_eq!(node.visible_text(), "Hello world");
    }

    #[test]
    fn summary_serializes_with_role_tag() {
        let summary = ElementSummary::Button {
            text: "Submit".into(),
            selector: "#go".into(),
        };
        let raw = serde_json::to_string(&summary).unwrap();
        assert!(raw.contains("\"role\":\"button\""));
    }
}
