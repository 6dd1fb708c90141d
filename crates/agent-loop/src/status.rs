//! Best-effort status fan-out. Nobody listening is fine.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    /// Human-readable description of what the loop is doing.
    pub current_action: String,
    /// Budget fraction consumed, 0.0 ..= 1.0.
    pub progress: f32,
    pub running: bool,
}

impl StatusUpdate {
    pub fn running(current_action: impl Into<String>, progress: f32) -> Self {
        Self {
            current_action: current_action.into(),
            progress,
            running: true,
        }
    }

    pub fn idle(message: impl Into<String>) -> Self {
        Self {
            current_action: message.into(),
            progress: 0.0,
            running: false,
        }
    }
}

/// Broadcast wrapper that swallows delivery failures.
#[derive(Debug, Clone)]
pub struct StatusSink {
    tx: broadcast::Sender<StatusUpdate>,
}

impl StatusSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusUpdate> {
        self.tx.subscribe()
    }

    /// Send errors mean no subscribers, which is not our problem.
    pub fn emit(&self, update: StatusUpdate) {
        let _ = self.tx.send(update);
    }
}

impl Default for StatusSink {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emit_with_no_subscribers_is_silent() {
        let sink = StatusSink::default();
        sink.emit(StatusUpdate::running("typing address", 0.2));
    }

    #[tokio::test]
    async fn subscribers_see_updates_in_order() {
        let sink = StatusSink::default();
        let mut rx = sink.subscribe();
        sink.emit(StatusUpdate::running("clicking", 0.1));
        sink.emit(StatusUpdate::idle("done"));
        assert_eq!(rx.recv().await.unwrap().current_action, "clicking");
        assert!(!rx.recv().await.unwrap().running);
    }
}
