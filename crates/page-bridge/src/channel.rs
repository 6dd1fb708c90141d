//! In-process request/response transport between orchestrator and page.

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::errors::BridgeError;
use crate::messages::{PageCommand, PageResponse};
use crate::PageBridge;

const REQUEST_QUEUE_DEPTH: usize = 32;

/// One pending command awaiting a reply from the page side.
#[derive(Debug)]
pub struct BridgeRequest {
    pub command: PageCommand,
    pub reply: oneshot::Sender<PageResponse>,
}

/// Page-side end of the channel: a stream of pending requests.
pub struct PageEndpoint {
    rx: mpsc::Receiver<BridgeRequest>,
}

impl PageEndpoint {
    /// Next pending request; `None` once every client handle is dropped.
    pub async fn next(&mut self) -> Option<BridgeRequest> {
        self.rx.recv().await
    }
}

/// Orchestrator-side client over an in-process channel.
#[derive(Clone)]
pub struct ChannelBridge {
    tx: mpsc::Sender<BridgeRequest>,
    timeout: Duration,
}

impl ChannelBridge {
    /// Create a connected client/endpoint pair with a per-request timeout.
    pub fn pair(timeout: Duration) -> (Self, PageEndpoint) {
        let (tx, rx) = mpsc::channel(REQUEST_QUEUE_DEPTH);
        (Self { tx, timeout }, PageEndpoint { rx })
    }
}

#[async_trait]
impl PageBridge for ChannelBridge {
    async fn request(&self, command: PageCommand) -> Result<PageResponse, BridgeError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        debug!(command = ?command, "sending page command");

        self.tx
            .send(BridgeRequest {
                command,
                reply: reply_tx,
            })
            .await
            .map_err(|_| BridgeError::Disconnected)?;

        match tokio::time::timeout(self.timeout, reply_rx).await {
            Ok(Ok(response)) => Ok(response),
            // Reply sender dropped without answering.
            Ok(Err(_)) => Err(BridgeError::Disconnected),
            Err(_) => Err(BridgeError::Timeout(self.timeout)),
        }
    }
}
