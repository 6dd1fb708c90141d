//! Deterministic replay: decisions come from a recorded trace, with
//! listing data substituted into each step's placeholders.

use listflow_core_types::{ListingRecord, Trace};
use tracing::{debug, warn};

use crate::errors::DecisionError;
use crate::substitute::substitute_envelope;
use crate::{Decision, DecisionContext, DecisionSource};

pub struct TraceSource {
    trace: Trace,
    record: ListingRecord,
}

impl TraceSource {
    pub fn new(trace: Trace, record: ListingRecord) -> Self {
        Self { trace, record }
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }
}

#[async_trait::async_trait]
impl DecisionSource for TraceSource {
    async fn decide(&mut self, ctx: &DecisionContext) -> Result<Decision, DecisionError> {
        let total = self.trace.len();
        if ctx.step_cursor >= total {
            return Ok(Decision::done(format!("trace finished after {total} steps")));
        }
        // Cursor bounds checked above.
        let entry = self
            .trace
            .get(ctx.step_cursor)
            .ok_or_else(|| DecisionError::Parse(format!("no trace entry at {}", ctx.step_cursor)))?;

        let (action, report) = substitute_envelope(&entry.action, &self.record);
        if !report.unresolved.is_empty() {
            warn!(
                step = entry.step,
                tokens = ?report.unresolved,
                "placeholders left unresolved, replaying literally"
            );
        }
        debug!(step = entry.step, kind = %action.kind, resolved = report.resolved, "replay step");

        Ok(Decision::act(
            action,
            format!("replaying step {} of {total}", ctx.step_cursor + 1),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use listflow_core_types::{ActionEnvelope, RecordedAction};

    fn trace() -> Trace {
        let mut trace = Trace::new("fill-listing-form");
        trace.push(RecordedAction::new(1, ActionEnvelope::click("#new-listing")));
        trace.push(RecordedAction::new(
            2,
            ActionEnvelope::type_text("#address", "{{ADDRESS}}"),
        ));
        trace
    }

    fn record() -> ListingRecord {
        ListingRecord {
            address: Some("9 Elm Ct".into()),
            ..Default::default()
        }
    }

    fn ctx_at(cursor: usize) -> DecisionContext {
        DecisionContext {
            step_cursor: cursor,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn replays_steps_in_cursor_order_with_substitution() {
        let mut source = TraceSource::new(trace(), record());

        let first = source.decide(&ctx_at(0)).await.unwrap();
        assert_eq!(first.action.unwrap().selector.as_deref(), Some("#new-listing"));
        assert!(!first.done);

        let second = source.decide(&ctx_at(1)).await.unwrap();
        assert_eq!(
            second.action.unwrap().text,
            Some(serde_json::json!("9 Elm Ct"))
        );
    }

    #[tokio::test]
    async fn cursor_past_end_signals_done() {
        let mut source = TraceSource::new(trace(), record());
        let decision = source.decide(&ctx_at(2)).await.unwrap();
        assert!(decision.done);
        assert!(decision.action.is_none());
        assert!(decision.rationale.contains("2 steps"));
    }

    #[tokio::test]
    async fn repeated_decide_at_same_cursor_is_identical() {
        let mut source = TraceSource::new(trace(), record());
        let a = source.decide(&ctx_at(1)).await.unwrap();
        let b = source.decide(&ctx_at(1)).await.unwrap();
        assert_eq!(a, b);
    }
}
