//! Vision-reasoning decision source.
//!
//! Each iteration ships the latest screenshot, interactable elements and a
//! history window to an external reasoning service, then interprets the
//! reply: an explicit structured action when the service provides one,
//! otherwise the first balanced JSON block embedded in its prose.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use listflow_core_types::ActionEnvelope;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::DecisionError;
use crate::{Decision, DecisionContext, DecisionSource};

/// Completion phrases accepted when the service sets no explicit flag.
static DONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(task (is )?complete|task completed|finished|all done)\b")
        .expect("static regex")
});

#[derive(Debug, Clone)]
pub struct ReasoningConfig {
    pub service_url: String,
    pub timeout_ms: u64,
    /// How many recent history entries accompany each request.
    pub history_window: usize,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            service_url: "http://127.0.0.1:8765/decide".into(),
            timeout_ms: 60_000,
            history_window: 5,
        }
    }
}

/// One conversational exchange kept for the life of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTurn {
    pub role: String,
    pub content: String,
}

/// Run-scoped conversation state. Created fresh per run and dropped with
/// the source, so no state leaks between runs.
#[derive(Debug, Clone)]
pub struct ReasoningSession {
    pub id: String,
    pub turns: Vec<SessionTurn>,
}

impl ReasoningSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            turns: Vec::new(),
        }
    }
}

impl Default for ReasoningSession {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ReasoningSource {
    client: reqwest::Client,
    config: ReasoningConfig,
    session: ReasoningSession,
}

#[derive(Debug, Deserialize)]
struct ServiceReply {
    success: bool,
    data: Option<ReplyData>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReplyData {
    response: String,
    #[serde(default)]
    action: Option<Value>,
    #[serde(default)]
    done: Option<bool>,
}

impl ReasoningSource {
    pub fn new(config: ReasoningConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            config,
            session: ReasoningSession::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session.id
    }

    fn build_payload(&self, ctx: &DecisionContext) -> Value {
        let screenshot = ctx
            .screenshot
            .as_ref()
            .map(|shot| STANDARD.encode(&shot.data))
            .unwrap_or_default();
        let window = ctx
            .history
            .iter()
            .rev()
            .take(self.config.history_window)
            .rev()
            .collect::<Vec<_>>();
        json!({
            "sessionId": self.session.id,
            "goal": ctx.goal,
            "iteration": ctx.iteration,
            "currentUrl": ctx.current_url,
            "screenshot": screenshot,
            "availableElements": ctx.elements,
            "actionHistory": window,
        })
    }
}

#[async_trait::async_trait]
impl DecisionSource for ReasoningSource {
    async fn decide(&mut self, ctx: &DecisionContext) -> Result<Decision, DecisionError> {
        let payload = self.build_payload(ctx);
        let reply = self
            .client
            .post(&self.config.service_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| DecisionError::Transport(e.to_string()))?;
        let reply: ServiceReply = reply
            .json()
            .await
            .map_err(|e| DecisionError::Transport(e.to_string()))?;

        if !reply.success {
            return Err(DecisionError::Transport(
                reply.error.unwrap_or_else(|| "service reported failure".into()),
            ));
        }
        let data = reply
            .data
            .ok_or_else(|| DecisionError::Parse("success reply carried no data".into()))?;

        self.session.turns.push(SessionTurn {
            role: "assistant".into(),
            content: data.response.clone(),
        });
        debug!(iteration = ctx.iteration, turns = self.session.turns.len(), "reasoning reply");

        interpret_reply(&data.response, data.action, data.done)
    }
}

/// Turn a service reply into a decision. Explicit `done` flags are
/// authoritative; without one, completion phrasing in the prose counts,
/// and a reply with no action at all is treated as finished.
fn interpret_reply(
    response: &str,
    structured: Option<Value>,
    done_flag: Option<bool>,
) -> Result<Decision, DecisionError> {
    let mut action_value = structured;
    let mut embedded_done: Option<bool> = None;

    if action_value.is_none() {
        if let Some(block) = extract_balanced_block(response) {
            let parsed: Value = serde_json::from_str(&block)
                .map_err(|e| DecisionError::Parse(format!("embedded block: {e}")))?;
            if parsed.get("kind").is_some() {
                action_value = Some(parsed);
            } else {
                embedded_done = parsed.get("done").and_then(Value::as_bool);
                if let Some(inner) = parsed.get("action") {
                    if !inner.is_null() {
                        action_value = Some(inner.clone());
                    }
                }
            }
        }
    }

    let action = match action_value {
        Some(value) => Some(
            serde_json::from_value::<ActionEnvelope>(value)
                .map_err(|e| DecisionError::Parse(format!("action shape: {e}")))?,
        ),
        None => None,
    };

    let done = match done_flag.or(embedded_done) {
        Some(flag) => flag,
        None if DONE_RE.is_match(response) => true,
        None => action.is_none(),
    };

    if done && action.is_some() {
        warn!("reply carried both an action and a done signal; honoring done");
    }

    Ok(Decision {
        action,
        rationale: response.to_string(),
        done,
    })
}

/// First balanced `{ ... }` block in `text`, string- and escape-aware.
fn extract_balanced_block(text: &str) -> Option<String> {
    let bytes = text.as_bytes();
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, &b) in bytes[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(text[start..start + offset + 1].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_action_wins_over_prose() {
        let decision = interpret_reply(
            "clicking the search box now",
            Some(json!({"kind": "click", "selector": "#search"})),
            None,
        )
        .unwrap();
        assert!(!decision.done);
        assert_eq!(decision.action.unwrap().kind, "click");
    }

    #[test]
    fn embedded_envelope_is_extracted_from_prose() {
        let decision = interpret_reply(
            r##"Next I will type. {"kind": "type", "selector": "#q", "text": "3 bed"}"##,
            None,
            None,
        )
        .unwrap();
        let action = decision.action.unwrap();
        assert_eq!(action.kind, "type");
        assert_eq!(action.selector.as_deref(), Some("#q"));
    }

    #[test]
    fn wrapper_block_with_done_flag() {
        let decision = interpret_reply(
            r#"{"done": true, "action": null}"#,
            None,
            None,
        )
        .unwrap();
        assert!(decision.done);
        assert!(decision.action.is_none());
    }

    #[test]
    fn explicit_done_false_overrides_phrase_heuristic() {
        let decision = interpret_reply(
            "the first form is finished, moving on",
            Some(json!({"kind": "scroll", "y": 400.0})),
            Some(false),
        )
        .unwrap();
        assert!(!decision.done);
        assert!(decision.action.is_some());
    }

    #[test]
    fn completion_phrase_marks_done() {
        let decision = interpret_reply("Task complete, all fields saved.", None, None).unwrap();
        assert!(decision.done);
    }

    #[test]
    fn no_action_no_phrase_means_done() {
        let decision = interpret_reply("Hello! How can I help today?", None, None).unwrap();
        assert!(decision.done);
        assert!(decision.action.is_none());
    }

    #[test]
    fn done_beats_accompanying_action() {
        let decision = interpret_reply(
            "all done",
            Some(json!({"kind": "click", "selector": "#x"})),
            Some(true),
        )
        .unwrap();
        assert!(decision.done);
        // Action survives in the decision; the caller decides not to run it.
        assert!(decision.action.is_some());
    }

    #[test]
    fn garbage_block_is_a_parse_error() {
        let err = interpret_reply(r#"try {"kind": }"#, None, None).unwrap_err();
        assert!(matches!(err, DecisionError::Parse(_)));
    }

    #[test]
    fn balanced_extraction_survives_nested_and_strings() {
        let text = r#"note {"a": {"b": "} tricky"}, "c": 1} trailing"#;
        assert_eq!(
            extract_balanced_block(text).unwrap(),
            r#"{"a": {"b": "} tricky"}, "c": 1}"#
        );
        assert!(extract_balanced_block("no json here").is_none());
    }
}
