//! Structural perception: bounded interactive-element summaries.

use listflow_core_types::{DomNode, ElementSummary};
use page_bridge::{DriverError, PageDriver};
use thiserror::Error;
use tracing::debug;

/// Default cap on the number of summarized elements.
pub const DEFAULT_ELEMENT_LIMIT: usize = 50;

/// Failures while inspecting a page.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InspectError {
    #[error("no active page context")]
    NoContext,

    #[error("inspect failed: {0}")]
    Failed(String),
}

impl From<DriverError> for InspectError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::Gone => InspectError::NoContext,
            other => InspectError::Failed(other.to_string()),
        }
    }
}

/// Snapshot the page DOM and summarize its interactive elements.
pub async fn inspect(
    driver: &dyn PageDriver,
    limit: usize,
) -> Result<Vec<ElementSummary>, InspectError> {
    let dom = driver.dom().await?;
    let summaries = summarize_dom(&dom, limit);
    debug!(count = summaries.len(), "inspected page");
    Ok(summaries)
}

/// Pure summarization of a DOM snapshot: idempotent, no side effects.
///
/// Elements are reported in document order, capped at `limit`. Hidden
/// elements (`hidden` attribute, `type="hidden"`, or display:none inline
/// style) are skipped.
pub fn summarize_dom(root: &DomNode, limit: usize) -> Vec<ElementSummary> {
    let mut out = Vec::new();
    let mut path = Vec::new();
    walk(root, root, &mut path, &mut out, limit);
    out
}

fn walk(
    root: &DomNode,
    node: &DomNode,
    path: &mut Vec<(String, usize)>,
    out: &mut Vec<ElementSummary>,
    limit: usize,
) {
    if out.len() >= limit || is_hidden(node) {
        return;
    }

    if let Some(summary) = summarize_node(root, node, path) {
        out.push(summary);
    }

    for (index, child) in node.children.iter().enumerate() {
        path.push((child.tag.clone(), index + 1));
        walk(root, child, path, out, limit);
        path.pop();
        if out.len() >= limit {
            return;
        }
    }
}

fn is_hidden(node: &DomNode) -> bool {
    if node.attrs.contains_key("hidden") {
        return true;
    }
    if node.attr("type") == Some("hidden") {
        return true;
    }
    node.attr("style")
        .map(|style| style.replace(' ', "").contains("display:none"))
        .unwrap_or(false)
}

fn summarize_node(
    root: &DomNode,
    node: &DomNode,
    path: &[(String, usize)],
) -> Option<ElementSummary> {
    match node.tag.as_str() {
        "input" => {
            let input_type = node.attr("type").unwrap_or("text").to_string();
            if matches!(input_type.as_str(), "submit" | "button") {
                return Some(ElementSummary::Button {
                    text: node
                        .attr("value")
                        .map(str::to_string)
                        .unwrap_or_else(|| node.visible_text()),
                    selector: selector_for(root, node, path),
                });
            }
            Some(ElementSummary::Input {
                tag: node.tag.clone(),
                input_type: Some(input_type),
                label: best_effort_label(node),
                placeholder: node.attr("placeholder").map(str::to_string),
                selector: selector_for(root, node, path),
            })
        }
        "textarea" | "select" => Some(ElementSummary::Input {
            tag: node.tag.clone(),
            input_type: None,
            label: best_effort_label(node),
            placeholder: node.attr("placeholder").map(str::to_string),
            selector: selector_for(root, node, path),
        }),
        "button" => Some(ElementSummary::Button {
            text: node.visible_text(),
            selector: selector_for(root, node, path),
        }),
        "a" => node.attr("href").map(|href| ElementSummary::Link {
            text: node.visible_text(),
            href: href.to_string(),
        }),
        _ if node.attr("role") == Some("button") => Some(ElementSummary::Button {
            text: node.visible_text(),
            selector: selector_for(root, node, path),
        }),
        _ => None,
    }
}

fn best_effort_label(node: &DomNode) -> Option<String> {
    node.attr("aria-label")
        .or_else(|| node.attr("name"))
        .map(str::to_string)
}

/// Generate a selector: id first, then a class combination if it is unique
/// in the document, else a structural nth-child path from the body.
fn selector_for(root: &DomNode, node: &DomNode, path: &[(String, usize)]) -> String {
    if let Some(id) = &node.id {
        return format!("#{id}");
    }

    if !node.classes.is_empty() {
        let candidate = format!("{}.{}", node.tag, node.classes.join("."));
        if count_with_classes(root, &node.tag, &node.classes) == 1 {
            return candidate;
        }
    }

    // The path is anchored at the body element, not the snapshot root,
    // so the selector stays stable whether the driver hands back a full
    // document or a fragment.
    let below_body = path
        .iter()
        .position(|(tag, _)| tag == "body")
        .map(|idx| &path[idx + 1..])
        .unwrap_or(path);
    let mut segments = if root.tag == "body" || below_body.len() < path.len() {
        vec!["body".to_string()]
    } else {
        vec![root.tag.clone()]
    };
    for (tag, position) in below_body {
        segments.push(format!("{tag}:nth-child({position})"));
    }
    segments.join(" > ")
}

fn count_with_classes(root: &DomNode, tag: &str, classes: &[String]) -> usize {
    let mut count = usize::from(
        root.tag == tag && classes.iter().all(|c| root.classes.iter().any(|rc| rc == c)),
    );
    for child in &root.children {
        count += count_with_classes(child, tag, classes);
    }
    count
}
