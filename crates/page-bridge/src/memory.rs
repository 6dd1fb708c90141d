//! Deterministic in-memory page driver.
//!
//! Backs the [`PageDriver`] seam with a mutable DOM snapshot and an
//! operation log, for tests and offline development. Selector support
//! covers what the inspector generates: `#id`, `.class`, `tag`,
//! `tag.class` compounds, and `>`-separated paths with `:nth-child(n)`.

use listflow_core_types::{DomNode, PageInfo, Screenshot};
use parking_lot::Mutex;

use async_trait::async_trait;

use crate::driver::{BoundingBox, Clickable, ElementHandle, FocusedElement, PageDriver};
use crate::errors::DriverError;

/// One recorded page mutation, in execution order.
#[derive(Debug, Clone, PartialEq)]
pub enum PageOp {
    Navigated(String),
    Activated(u64),
    PointerClick { x: f64, y: f64 },
    ScrolledIntoView(u64),
    ClearedValue(u64),
    InputChar { node: u64, ch: char },
    ChangeFired(u64),
    ScrolledTo { x: f64, y: f64 },
    KeyPressed(String),
    MouseMoved { x: f64, y: f64 },
    CaretInsert(String),
    ValueSet { node: u64, text: String },
    PickerOpened(u64),
}

#[derive(Debug)]
struct PageState {
    dom: DomNode,
    url: String,
    title: String,
    values: std::collections::HashMap<u64, String>,
    focused: Option<(u64, bool)>,
    ops: Vec<PageOp>,
    alive: bool,
}

/// In-memory [`PageDriver`] implementation.
pub struct MemoryPage {
    state: Mutex<PageState>,
}

impl MemoryPage {
    pub fn new(dom: DomNode, url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(PageState {
                dom,
                url: url.into(),
                title: title.into(),
                values: Default::default(),
                focused: None,
                ops: Vec::new(),
                alive: true,
            }),
        }
    }

    /// Snapshot of the operation log.
    pub fn ops(&self) -> Vec<PageOp> {
        self.state.lock().ops.clone()
    }

    /// Current value of the first element matching `selector`.
    pub fn value_of(&self, selector: &str) -> Option<String> {
        let state = self.state.lock();
        let id = query_selector(&state.dom, selector)?;
        state.values.get(&id).cloned()
    }

    /// Focus the first element matching `selector`.
    pub fn focus(&self, selector: &str) -> bool {
        let mut state = self.state.lock();
        match query_selector(&state.dom, selector) {
            Some(id) => {
                let editable = node_by_id(&state.dom, id)
                    .map(|n| n.attr("contenteditable") == Some("true"))
                    .unwrap_or(false);
                state.focused = Some((id, editable));
                true
            }
            None => false,
        }
    }

    /// Simulate the page context going away.
    pub fn close(&self) {
        self.state.lock().alive = false;
    }

    fn with_live_state<T>(
        &self,
        f: impl FnOnce(&mut PageState) -> Result<T, DriverError>,
    ) -> Result<T, DriverError> {
        let mut state = self.state.lock();
        if !state.alive {
            return Err(DriverError::Gone);
        }
        f(&mut state)
    }

    fn require_node(state: &PageState, el: ElementHandle) -> Result<(), DriverError> {
        if node_by_id(&state.dom, el.node_id).is_some() {
            Ok(())
        } else {
            Err(DriverError::Stale(format!("node {}", el.node_id)))
        }
    }
}

#[async_trait]
impl PageDriver for MemoryPage {
    async fn page_info(&self) -> Result<PageInfo, DriverError> {
        self.with_live_state(|state| {
            Ok(PageInfo {
                url: state.url.clone(),
                title: state.title.clone(),
            })
        })
    }

    async fn dom(&self) -> Result<DomNode, DriverError> {
        self.with_live_state(|state| Ok(state.dom.clone()))
    }

    async fn screenshot(&self) -> Result<Screenshot, DriverError> {
        self.with_live_state(|state| {
            // Deterministic stand-in raster derived from the page URL.
            let mut data = vec![0x89, b'P', b'N', b'G'];
            data.extend_from_slice(state.url.as_bytes());
            Ok(Screenshot::png(1280, 800, data))
        })
    }

    async fn query(&self, selector: &str) -> Result<Option<ElementHandle>, DriverError> {
        self.with_live_state(|state| {
            Ok(query_selector(&state.dom, selector).map(|node_id| ElementHandle { node_id }))
        })
    }

    async fn clickables(&self) -> Result<Vec<Clickable>, DriverError> {
        self.with_live_state(|state| {
            let mut out = Vec::new();
            visit(&state.dom, &mut |id, node, _, _| {
                let role_button = node.attr("role") == Some("button");
                let has_handler = node.attrs.contains_key("onclick");
                if matches!(node.tag.as_str(), "a" | "button") || role_button || has_handler {
                    out.push(Clickable {
                        handle: ElementHandle { node_id: id },
                        text: node.visible_text(),
                    });
                }
            });
            Ok(out)
        })
    }

    async fn bounding_box(&self, el: ElementHandle) -> Result<BoundingBox, DriverError> {
        self.with_live_state(|state| {
            Self::require_node(state, el)?;
            // Synthetic layout: each node gets a fixed-size box offset by id.
            Ok(BoundingBox {
                x: 10.0 * el.node_id as f64,
                y: 20.0 * el.node_id as f64,
                width: 100.0,
                height: 24.0,
            })
        })
    }

    async fn input_type(&self, el: ElementHandle) -> Result<Option<String>, DriverError> {
        self.with_live_state(|state| {
            Self::require_node(state, el)?;
            let node = node_by_id(&state.dom, el.node_id).expect("checked above");
            if node.tag == "input" {
                Ok(Some(node.attr("type").unwrap_or("text").to_string()))
            } else {
                Ok(None)
            }
        })
    }

    async fn scroll_into_view(&self, el: ElementHandle) -> Result<(), DriverError> {
        self.with_live_state(|state| {
            Self::require_node(state, el)?;
            state.ops.push(PageOp::ScrolledIntoView(el.node_id));
            Ok(())
        })
    }

    async fn activate(&self, el: ElementHandle) -> Result<(), DriverError> {
        self.with_live_state(|state| {
            Self::require_node(state, el)?;
            if let Some(node) = node_by_id(&state.dom, el.node_id) {
                if node.tag == "a" {
                    if let Some(href) = node.attr("href") {
                        state.url = href.to_string();
                    }
                }
            }
            state.ops.push(PageOp::Activated(el.node_id));
            Ok(())
        })
    }

    async fn pointer_click(&self, x: f64, y: f64) -> Result<(), DriverError> {
        self.with_live_state(|state| {
            state.ops.push(PageOp::PointerClick { x, y });
            Ok(())
        })
    }

    async fn clear_value(&self, el: ElementHandle) -> Result<(), DriverError> {
        self.with_live_state(|state| {
            Self::require_node(state, el)?;
            state.values.insert(el.node_id, String::new());
            state.ops.push(PageOp::ClearedValue(el.node_id));
            Ok(())
        })
    }

    async fn append_char(&self, el: ElementHandle, ch: char) -> Result<(), DriverError> {
        self.with_live_state(|state| {
            Self::require_node(state, el)?;
            state.values.entry(el.node_id).or_default().push(ch);
            state.ops.push(PageOp::InputChar {
                node: el.node_id,
                ch,
            });
            Ok(())
        })
    }

    async fn fire_change(&self, el: ElementHandle) -> Result<(), DriverError> {
        self.with_live_state(|state| {
            Self::require_node(state, el)?;
            state.ops.push(PageOp::ChangeFired(el.node_id));
            Ok(())
        })
    }

    async fn scroll_to(&self, x: f64, y: f64) -> Result<(), DriverError> {
        self.with_live_state(|state| {
            state.ops.push(PageOp::ScrolledTo { x, y });
            Ok(())
        })
    }

    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        self.with_live_state(|state| {
            state.url = url.to_string();
            state.ops.push(PageOp::Navigated(url.to_string()));
            Ok(())
        })
    }

    async fn press_key(&self, key: &str) -> Result<(), DriverError> {
        self.with_live_state(|state| {
            state.ops.push(PageOp::KeyPressed(key.to_string()));
            Ok(())
        })
    }

    async fn mouse_move(&self, x: f64, y: f64) -> Result<(), DriverError> {
        self.with_live_state(|state| {
            state.ops.push(PageOp::MouseMoved { x, y });
            Ok(())
        })
    }

    async fn focused(&self) -> Result<Option<FocusedElement>, DriverError> {
        self.with_live_state(|state| {
            Ok(state.focused.map(|(node_id, editable_region)| FocusedElement {
                handle: ElementHandle { node_id },
                editable_region,
            }))
        })
    }

    async fn insert_at_caret(&self, text: &str) -> Result<(), DriverError> {
        self.with_live_state(|state| {
            if let Some((id, _)) = state.focused {
                state.values.entry(id).or_default().push_str(text);
            }
            state.ops.push(PageOp::CaretInsert(text.to_string()));
            Ok(())
        })
    }

    async fn set_value_with_selection(
        &self,
        el: ElementHandle,
        text: &str,
    ) -> Result<(), DriverError> {
        self.with_live_state(|state| {
            Self::require_node(state, el)?;
            state.values.insert(el.node_id, text.to_string());
            state.ops.push(PageOp::ValueSet {
                node: el.node_id,
                text: text.to_string(),
            });
            Ok(())
        })
    }

    async fn open_file_picker(&self, el: ElementHandle) -> Result<(), DriverError> {
        self.with_live_state(|state| {
            Self::require_node(state, el)?;
            state.ops.push(PageOp::PickerOpened(el.node_id));
            Ok(())
        })
    }
}

/// Depth-first visit assigning stable ids; `f(id, node, parent_id,
/// child_position)` with 1-based positions.
fn visit(root: &DomNode, f: &mut impl FnMut(u64, &DomNode, Option<u64>, usize)) {
    fn walk(
        node: &DomNode,
        parent: Option<u64>,
        position: usize,
        next_id: &mut u64,
        f: &mut impl FnMut(u64, &DomNode, Option<u64>, usize),
    ) {
        let id = *next_id;
        *next_id += 1;
        f(id, node, parent, position);
        for (index, child) in node.children.iter().enumerate() {
            walk(child, Some(id), index + 1, next_id, f);
        }
    }
    let mut next_id = 0;
    walk(root, None, 1, &mut next_id, f);
}

fn node_by_id(root: &DomNode, wanted: u64) -> Option<DomNode> {
    let mut found = None;
    visit(root, &mut |id, node, _, _| {
        if id == wanted && found.is_none() {
            found = Some(node.clone());
        }
    });
    found
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    nth_child: Option<usize>,
}

fn parse_compound(raw: &str) -> Compound {
    let mut compound = Compound::default();
    let mut rest = raw.trim();

    if let Some(idx) = rest.find(":nth-child(") {
        let tail = &rest[idx + ":nth-child(".len()..];
        if let Some(end) = tail.find(')') {
            compound.nth_child = tail[..end].trim().parse().ok();
        }
        rest = &raw.trim()[..idx];
    }

    let mut current = String::new();
    let mut mode = 't';
    for ch in rest.chars() {
        match ch {
            '#' | '.' => {
                push_part(&mut compound, mode, &mut current);
                mode = ch as u8 as char;
            }
            _ => current.push(ch),
        }
    }
    push_part(&mut compound, mode, &mut current);
    compound
}

fn push_part(compound: &mut Compound, mode: char, current: &mut String) {
    if current.is_empty() {
        return;
    }
    let part = std::mem::take(current);
    match mode {
        '#' => compound.id = Some(part),
        '.' => compound.classes.push(part),
        _ => compound.tag = Some(part),
    }
}

fn compound_matches(compound: &Compound, node: &DomNode, position: usize) -> bool {
    if let Some(tag) = &compound.tag {
        if &node.tag != tag {
            return false;
        }
    }
    if let Some(id) = &compound.id {
        if node.id.as_deref() != Some(id.as_str()) {
            return false;
        }
    }
    for class in &compound.classes {
        if !node.classes.iter().any(|c| c == class) {
            return false;
        }
    }
    if let Some(nth) = compound.nth_child {
        if nth != position {
            return false;
        }
    }
    true
}

/// Resolve a selector to the first matching node id, document order.
pub(crate) fn query_selector(root: &DomNode, selector: &str) -> Option<u64> {
    let segments: Vec<Compound> = selector.split('>').map(parse_compound).collect();
    if segments.is_empty() {
        return None;
    }

    // Flat snapshot with parent and sibling-position metadata.
    let mut nodes: Vec<(u64, DomNode, Option<u64>, usize)> = Vec::new();
    visit(root, &mut |id, node, parent, position| {
        nodes.push((id, node.clone(), parent, position));
    });

    let children_of = |parent: u64| -> Vec<&(u64, DomNode, Option<u64>, usize)> {
        nodes.iter().filter(|(_, _, p, _)| *p == Some(parent)).collect()
    };

    let mut candidates: Vec<u64> = nodes
        .iter()
        .filter(|(_, node, _, position)| compound_matches(&segments[0], node, *position))
        .map(|(id, _, _, _)| *id)
        .collect();

    for segment in &segments[1..] {
        let mut next = Vec::new();
        for parent in &candidates {
            for (id, node, _, position) in children_of(*parent) {
                if compound_matches(segment, node, *position) {
                    next.push(*id);
                }
            }
        }
        candidates = next;
    }

    candidates.into_iter().min()
}
