//! Trace recording hook: executed actions streamed out after each success.
//!
//! Recording is advisory. A sink that errors is logged and forgotten; the
//! run itself never fails because a trace write did.

use async_trait::async_trait;
use listflow_core_types::{ActionEnvelope, RecordedAction, Trace};
use parking_lot::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("trace sink unavailable: {0}")]
    Sink(String),
}

#[async_trait]
pub trait TraceRecorder: Send + Sync {
    async fn record(&self, workflow_id: &str, action: &ActionEnvelope) -> Result<(), RecordError>;
}

/// In-process recorder backing the learn flow and tests.
#[derive(Default)]
pub struct MemoryRecorder {
    steps: Mutex<Vec<(String, ActionEnvelope)>>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble everything recorded under `workflow_id` into a trace,
    /// numbering steps in arrival order.
    pub fn into_trace(&self, workflow_id: &str) -> Trace {
        let mut trace = Trace::new(workflow_id);
        let steps = self.steps.lock();
        for (step, (_, action)) in steps
            .iter()
            .filter(|(id, _)| id == workflow_id)
            .enumerate()
        {
            trace.push(RecordedAction::new(step as u32 + 1, action.clone()));
        }
        trace
    }

    pub fn len(&self) -> usize {
        self.steps.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.lock().is_empty()
    }
}

#[async_trait]
impl TraceRecorder for MemoryRecorder {
    async fn record(&self, workflow_id: &str, action: &ActionEnvelope) -> Result<(), RecordError> {
        self.steps
            .lock()
            .push((workflow_id.to_string(), action.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recorded_steps_become_a_numbered_trace() {
        let recorder = MemoryRecorder::new();
        recorder
            .record("wf-1", &ActionEnvelope::click("#a"))
            .await
            .unwrap();
        recorder
            .record("wf-2", &ActionEnvelope::click("#other"))
            .await
            .unwrap();
        recorder
            .record("wf-1", &ActionEnvelope::type_text("#b", "x"))
            .await
            .unwrap();

        let trace = recorder.into_trace("wf-1");
        assert_eq!(trace.len(), 2);
        assert_eq!(trace.get(0).unwrap().step, 1);
        assert_eq!(trace.get(1).unwrap().step, 2);
        assert_eq!(trace.get(1).unwrap().action.kind, "type");
    }
}
