//! Page-side command host: serves the bridge RPC surface with the action
//! executor and the perceivers, against whatever [`PageDriver`] is wired in.

use std::sync::Arc;

use action_exec::{ActionExecutor, ExecutorConfig};
use base64::{engine::general_purpose::STANDARD as Base64, Engine as _};
use page_bridge::{PageCommand, PageDriver, PageEndpoint, PageResponse};
use parking_lot::Mutex;
use perceiver::DEFAULT_ELEMENT_LIMIT;
use serde_json::json;
use tracing::{debug, info};

/// What the in-page overlay would currently show.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlayState {
    pub visible: bool,
    pub progress: String,
    pub messages: Vec<String>,
}

pub struct PageHost {
    driver: Arc<dyn PageDriver>,
    executor: ActionExecutor,
    overlay: Mutex<OverlayState>,
    error_log: Mutex<Vec<String>>,
}

impl PageHost {
    pub fn new(driver: Arc<dyn PageDriver>, config: ExecutorConfig) -> Self {
        Self {
            executor: ActionExecutor::new(driver.clone(), config),
            driver,
            overlay: Mutex::new(OverlayState::default()),
            error_log: Mutex::new(Vec::new()),
        }
    }

    /// Pump requests until the orchestrator side hangs up.
    pub async fn serve(&self, mut endpoint: PageEndpoint) {
        info!("page host serving");
        while let Some(request) = endpoint.next().await {
            let response = self.handle(request.command).await;
            // A dropped reply sender means the caller timed out; fine.
            let _ = request.reply.send(response);
        }
        debug!("page host endpoint closed");
    }

    pub fn overlay(&self) -> OverlayState {
        self.overlay.lock().clone()
    }

    pub fn error_log(&self) -> Vec<String> {
        self.error_log.lock().clone()
    }

    async fn handle(&self, command: PageCommand) -> PageResponse {
        match command {
            PageCommand::CaptureScreenshot => match perceiver::capture(self.driver.as_ref()).await
            {
                Ok(shot) => PageResponse::ok(json!({
                    "base64": Base64.encode(&shot.data),
                    "width": shot.width,
                    "height": shot.height,
                    "format": shot.format,
                })),
                Err(err) => PageResponse::err(err.to_string()),
            },
            PageCommand::GetPageInfo => match self.driver.page_info().await {
                Ok(info) => match serde_json::to_value(&info) {
                    Ok(value) => PageResponse::ok(value),
                    Err(err) => PageResponse::err(err.to_string()),
                },
                Err(err) => PageResponse::err(err.to_string()),
            },
            PageCommand::InspectPage => {
                match perceiver::inspect(self.driver.as_ref(), DEFAULT_ELEMENT_LIMIT).await {
                    Ok(elements) => match serde_json::to_value(&elements) {
                        Ok(value) => PageResponse::ok(value),
                        Err(err) => PageResponse::err(err.to_string()),
                    },
                    Err(err) => PageResponse::err(err.to_string()),
                }
            }
            PageCommand::ExecuteAction { action } => match self.executor.execute(&action).await {
                Ok(report) => match report.data {
                    Some(data) => PageResponse::ok(data),
                    None => PageResponse::ok_empty(),
                },
                Err(err) => {
                    let message = err.to_string();
                    self.error_log.lock().push(message.clone());
                    PageResponse::err(message)
                }
            },
            PageCommand::ShowOverlay => {
                self.overlay.lock().visible = true;
                PageResponse::ok_empty()
            }
            PageCommand::UpdateOverlay { progress } => {
                self.overlay.lock().progress = progress;
                PageResponse::ok_empty()
            }
            PageCommand::AddOverlayMessage { message } => {
                self.overlay.lock().messages.push(message);
                PageResponse::ok_empty()
            }
            PageCommand::HideOverlay => {
                let mut overlay = self.overlay.lock();
                overlay.visible = false;
                overlay.progress.clear();
                PageResponse::ok_empty()
            }
            PageCommand::ClearErrorLogs => {
                self.error_log.lock().clear();
                PageResponse::ok_empty()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use listflow_core_types::{ActionEnvelope, DomNode};
    use page_bridge::{ChannelBridge, MemoryPage, PageBridge};
    use std::time::Duration;

    fn page() -> Arc<MemoryPage> {
        let mut input = DomNode::new("input");
        input.id = Some("address".into());
        let mut body = DomNode::new("body");
        body.children.push(input);
        let mut html = DomNode::new("html");
        html.children.push(body);
        Arc::new(MemoryPage::new(html, "https://listings.test/new", "New Listing"))
    }

    #[tokio::test]
    async fn serves_inspect_and_execute_over_the_channel() {
        let page = page();
        let host = Arc::new(PageHost::new(page.clone(), ExecutorConfig::minimal()));
        let (bridge, endpoint) = ChannelBridge::pair(Duration::from_secs(1));
        let server = {
            let host = host.clone();
            tokio::spawn(async move { host.serve(endpoint).await })
        };

        let resp = bridge.request(PageCommand::InspectPage).await.unwrap();
        assert!(resp.success);
        let elements = resp.data.unwrap();
        assert_eq!(elements.as_array().unwrap().len(), 1);

        let action = ActionEnvelope::type_text("#address", "9 Elm Ct");
        let resp = bridge
            .request(PageCommand::ExecuteAction { action })
            .await
            .unwrap();
        assert!(resp.success);
        assert_eq!(page.value_of("#address").as_deref(), Some("9 Elm Ct"));

        drop(bridge);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn failed_actions_land_in_the_error_log_until_cleared() {
        let host = Arc::new(PageHost::new(page(), ExecutorConfig::minimal()));
        let (bridge, endpoint) = ChannelBridge::pair(Duration::from_secs(1));
        let server = {
            let host = host.clone();
            tokio::spawn(async move { host.serve(endpoint).await })
        };

        let action = ActionEnvelope::click("#missing");
        let resp = bridge
            .request(PageCommand::ExecuteAction { action })
            .await
            .unwrap();
        assert!(!resp.success);
        assert_eq!(host.error_log().len(), 1);

        let resp = bridge.request(PageCommand::ClearErrorLogs).await.unwrap();
        assert!(resp.success);
        assert!(host.error_log().is_empty());

        drop(bridge);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn overlay_commands_mutate_host_state() {
        let host = Arc::new(PageHost::new(page(), ExecutorConfig::minimal()));
        let (bridge, endpoint) = ChannelBridge::pair(Duration::from_secs(1));
        let server = {
            let host = host.clone();
            tokio::spawn(async move { host.serve(endpoint).await })
        };

        bridge.request(PageCommand::ShowOverlay).await.unwrap();
        bridge
            .request(PageCommand::UpdateOverlay { progress: "2/50".into() })
            .await
            .unwrap();
        bridge
            .request(PageCommand::AddOverlayMessage { message: "typing address".into() })
            .await
            .unwrap();

        let overlay = host.overlay();
        assert!(overlay.visible);
        assert_eq!(overlay.progress, "2/50");
        assert_eq!(overlay.messages, vec!["typing address".to_string()]);

        bridge.request(PageCommand::HideOverlay).await.unwrap();
        assert!(!host.overlay().visible);

        drop(bridge);
        server.await.unwrap();
    }
}
