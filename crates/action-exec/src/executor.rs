//! Kind-by-kind action dispatch.

use std::sync::Arc;
use std::time::{Duration, Instant};

use listflow_core_types::{Action, ActionEnvelope};
use page_bridge::{ElementHandle, PageDriver};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::ExecutorConfig;
use crate::errors::ExecError;

/// Outcome of a successfully executed action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecReport {
    pub latency_ms: u64,
    /// Optional result payload, e.g. the navigation target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Executes normalized actions against a page driver.
pub struct ActionExecutor {
    driver: Arc<dyn PageDriver>,
    config: ExecutorConfig,
}

impl ActionExecutor {
    pub fn new(driver: Arc<dyn PageDriver>, config: ExecutorConfig) -> Self {
        Self { driver, config }
    }

    /// Validate, normalize, and perform one action.
    ///
    /// Validation happens before any page mutation: an unknown kind, a
    /// missing required field, or a non-string text payload fails here
    /// with no partial writes.
    pub async fn execute(&self, envelope: &ActionEnvelope) -> Result<ExecReport, ExecError> {
        let action = envelope.normalize()?;
        let action_id = uuid::Uuid::new_v4().to_string();
        let start = Instant::now();

        info!(action_id = %action_id, kind = action.kind(), "executing action");

        let data = self.dispatch(&action).await.map_err(|err| {
            warn!(action_id = %action_id, kind = action.kind(), error = %err, "action failed");
            err
        })?;

        let latency_ms = start.elapsed().as_millis() as u64;
        debug!(action_id = %action_id, latency_ms, "action completed");
        Ok(ExecReport { latency_ms, data })
    }

    async fn dispatch(&self, action: &Action) -> Result<Option<Value>, ExecError> {
        match action {
            Action::Click { selector, offset } => {
                let selector = selector
                    .as_deref()
                    .ok_or_else(|| ExecError::ElementNotFound("no selector given".into()))?;
                let el = self.require(selector).await?;
                match offset {
                    Some((dx, dy)) => {
                        let bbox = self.driver.bounding_box(el).await?;
                        self.driver.pointer_click(bbox.x + dx, bbox.y + dy).await?;
                    }
                    None => {
                        self.driver.scroll_into_view(el).await?;
                        self.settle().await;
                        self.driver.activate(el).await?;
                    }
                }
                Ok(None)
            }

            Action::ClickText { text } => {
                let needle = text.to_lowercase();
                let clickables = self.driver.clickables().await?;
                // First match in document order, not best match.
                let found = clickables
                    .iter()
                    .find(|c| c.text.to_lowercase().contains(&needle))
                    .ok_or_else(|| ExecError::NoMatchingElement(text.clone()))?;
                self.driver.activate(found.handle).await?;
                Ok(None)
            }

            Action::Type { selector, text } => {
                let el = self.require(selector).await?;
                self.driver.clear_value(el).await?;
                for ch in text.chars() {
                    self.driver.append_char(el, ch).await?;
                    if self.config.char_delay_ms > 0 {
                        tokio::time::sleep(Duration::from_millis(self.config.char_delay_ms)).await;
                    }
                }
                self.driver.fire_change(el).await?;
                Ok(None)
            }

            Action::Scroll { x, y } => {
                self.driver.scroll_to(*x, *y).await?;
                self.settle().await;
                Ok(None)
            }

            Action::Navigate { url } => {
                // Fire-and-forget: the page transition itself is the
                // completion signal, not awaited here.
                self.driver.navigate(url).await?;
                Ok(Some(json!({ "navigated": url })))
            }

            Action::Upload { selector } => {
                let el = self.require(selector).await?;
                match self.driver.input_type(el).await?.as_deref() {
                    Some("file") => {}
                    _ => return Err(ExecError::NotFileInput(selector.clone())),
                }
                self.driver.scroll_into_view(el).await?;
                // The contract ends at opening the dialog; actual file
                // selection needs a human or an OS-level layer.
                self.driver.open_file_picker(el).await?;
                Ok(None)
            }

            Action::Wait { duration_ms } => {
                tokio::time::sleep(Duration::from_millis(*duration_ms)).await;
                Ok(None)
            }

            Action::ClickCoordinates { x, y } => {
                self.driver.pointer_click(*x, *y).await?;
                Ok(None)
            }

            Action::TypeAtCursor { text } => {
                let focused = self
                    .driver
                    .focused()
                    .await?
                    .ok_or(ExecError::NoFocusedElement)?;
                if focused.editable_region {
                    self.driver.insert_at_caret(text).await?;
                } else {
                    self.driver
                        .set_value_with_selection(focused.handle, text)
                        .await?;
                }
                Ok(None)
            }

            Action::KeyPress { key } => {
                self.driver.press_key(key).await?;
                Ok(None)
            }

            Action::MouseMove { x, y } => {
                self.driver.mouse_move(*x, *y).await?;
                Ok(None)
            }

            Action::Noop => Ok(None),
        }
    }

    async fn require(&self, selector: &str) -> Result<ElementHandle, ExecError> {
        self.driver
            .query(selector)
            .await?
            .ok_or_else(|| ExecError::ElementNotFound(selector.to_string()))
    }

    async fn settle(&self) {
        if self.config.settle_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.settle_delay_ms)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use listflow_core_types::DomNode;
    use page_bridge::{MemoryPage, PageOp};
    use serde_json::json;
    use std::collections::HashMap;

    fn page() -> Arc<MemoryPage> {
        let mut user = DomNode::new("input");
        user.id = Some("user".into());
        user.attrs = HashMap::from([("type".into(), "text".into())]);

        let mut upload = DomNode::new("input");
        upload.id = Some("photos".into());
        upload.attrs = HashMap::from([("type".into(), "file".into())]);

        let mut save_all = DomNode::new("button");
        save_all.text = Some("Save All Listings".into());
        let mut save = DomNode::new("button");
        save.text = Some("Save".into());

        let mut note = DomNode::new("div");
        note.id = Some("note".into());
        note.attrs = HashMap::from([("contenteditable".into(), "true".into())]);

        let mut body = DomNode::new("body");
        body.children = vec![user, upload, save_all, save, note];
        Arc::new(MemoryPage::new(body, "https://example.com", "Example"))
    }

    fn executor(page: &Arc<MemoryPage>) -> ActionExecutor {
        ActionExecutor::new(page.clone(), ExecutorConfig::minimal())
    }

    #[tokio::test]
    async fn type_rejects_non_string_text_before_any_mutation() {
        let page = page();
        let exec = executor(&page);

        let mut env = ActionEnvelope::of_kind("type");
        env.selector = Some("#user".into());
        env.text = Some(json!(12345));

        let err = exec.execute(&env).await.unwrap_err();
        assert_eq!(err, ExecError::TextNotString);
        assert!(page.ops().is_empty(), "no partial writes allowed");
    }

    #[tokio::test]
    async fn typing_clears_then_types_per_character_then_changes() {
        let page = page();
        let exec = executor(&page);

        exec.execute(&ActionEnvelope::type_text("#user", "ab"))
            .await
            .unwrap();

        assert_eq!(page.value_of("#user").as_deref(), Some("ab"));
        let ops = page.ops();
        assert!(matches!(ops[0], PageOp::ClearedValue(_)));
        assert!(matches!(ops[1], PageOp::InputChar { ch: 'a', .. }));
        assert!(matches!(ops[2], PageOp::InputChar { ch: 'b', .. }));
        assert!(matches!(ops[3], PageOp::ChangeFired(_)));
    }

    #[tokio::test]
    async fn click_without_selector_is_element_not_found() {
        let page = page();
        let exec = executor(&page);
        let err = exec
            .execute(&ActionEnvelope::of_kind("click"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::ElementNotFound(_)));
    }

    #[tokio::test]
    async fn click_with_offset_uses_bounding_box_point() {
        let page = page();
        let exec = executor(&page);

        let mut env = ActionEnvelope::click("#user");
        env.x = Some(5.0);
        env.y = Some(7.0);
        exec.execute(&env).await.unwrap();

        let ops = page.ops();
        assert_eq!(ops.len(), 1);
        assert!(matches!(ops[0], PageOp::PointerClick { .. }));
    }

    #[tokio::test]
    async fn plain_click_scrolls_settles_and_activates() {
        let page = page();
        let exec = executor(&page);
        exec.execute(&ActionEnvelope::click("#user")).await.unwrap();

        let ops = page.ops();
        assert!(matches!(ops[0], PageOp::ScrolledIntoView(_)));
        assert!(matches!(ops[1], PageOp::Activated(_)));
    }

    #[tokio::test]
    async fn click_text_first_match_in_document_order_wins() {
        let page = page();
        let exec = executor(&page);

        let mut env = ActionEnvelope::of_kind("click_text");
        env.text = Some(json!("save"));
        exec.execute(&env).await.unwrap();

        // "Save All Listings" precedes "Save" in document order, so the
        // substring match picks it even though "Save" is exact.
        let clicked = match page.ops().first() {
            Some(PageOp::Activated(id)) => *id,
            other => panic!("unexpected op: {other:?}"),
        };
        let all = page.clickables().await.unwrap();
        assert_eq!(all[0].handle.node_id, clicked);
    }

    #[tokio::test]
    async fn click_text_miss_is_no_matching_element() {
        let page = page();
        let exec = executor(&page);
        let mut env = ActionEnvelope::of_kind("click_text");
        env.text = Some(json!("Delete Everything"));
        let err = exec.execute(&env).await.unwrap_err();
        assert_eq!(err, ExecError::NoMatchingElement("Delete Everything".into()));
    }

    #[tokio::test]
    async fn upload_requires_a_file_input() {
        let page = page();
        let exec = executor(&page);

        let mut env = ActionEnvelope::of_kind("upload");
        env.selector = Some("#user".into());
        let err = exec.execute(&env).await.unwrap_err();
        assert_eq!(err, ExecError::NotFileInput("#user".into()));

        env.selector = Some("#photos".into());
        exec.execute(&env).await.unwrap();
        assert!(page
            .ops()
            .iter()
            .any(|op| matches!(op, PageOp::PickerOpened(_))));
    }

    #[tokio::test]
    async fn unknown_kind_is_never_silently_ignored() {
        let page = page();
        let exec = executor(&page);
        let err = exec
            .execute(&ActionEnvelope::of_kind("hover"))
            .await
            .unwrap_err();
        assert_eq!(err, ExecError::UnknownAction("hover".into()));
    }

    #[tokio::test]
    async fn type_at_cursor_targets_editable_region_or_control() {
        let page = page();
        let exec = executor(&page);

        let mut env = ActionEnvelope::of_kind("type_at_cursor");
        env.text = Some(json!("hello"));

        // No focus at all: typed error, no mutation.
        let err = exec.execute(&env).await.unwrap_err();
        assert_eq!(err, ExecError::NoFocusedElement);

        // Editable region goes through the caret path.
        assert!(page.focus("#note"));
        exec.execute(&env).await.unwrap();
        assert!(matches!(page.ops().last(), Some(PageOp::CaretInsert(_))));

        // Plain control gets its value and selection set directly.
        assert!(page.focus("#user"));
        exec.execute(&env).await.unwrap();
        assert!(matches!(page.ops().last(), Some(PageOp::ValueSet { .. })));
    }

    #[tokio::test]
    async fn navigate_reports_its_target() {
        let page = page();
        let exec = executor(&page);
        let report = exec
            .execute(&ActionEnvelope::navigate("https://mls.example/listings"))
            .await
            .unwrap();
        assert_eq!(
            report.data.unwrap()["navigated"],
            json!("https://mls.example/listings")
        );
    }

    #[tokio::test]
    async fn noop_succeeds_without_touching_the_page() {
        let page = page();
        let exec = executor(&page);
        exec.execute(&ActionEnvelope::noop()).await.unwrap();
        assert!(page.ops().is_empty());
    }
}
