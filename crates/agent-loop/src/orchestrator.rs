//! Run lifecycle: single-flight entry, the iteration loop, retry/backoff
//! around decisions, and teardown on every exit path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use decision_source::{Decision, DecisionContext, DecisionError, DecisionSource};
use listflow_core_types::{
    ActionEnvelope, ActionHistory, ElementSummary, HistoryEntry, PageInfo, Screenshot,
};
use page_bridge::{BridgeError, PageBridge, PageCommand};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::classify;
use crate::config::LoopConfig;
use crate::errors::RunError;
use crate::recorder::TraceRecorder;
use crate::report::RunReport;
use crate::status::{StatusSink, StatusUpdate};

enum ExecFailure {
    /// Transport to the page is gone. Ends the run.
    Bridge(BridgeError),
    /// The action itself failed on the page. Recoverable.
    Action(String),
}

pub struct Orchestrator {
    bridge: Arc<dyn PageBridge>,
    config: LoopConfig,
    status: StatusSink,
    recorder: Option<(Arc<dyn TraceRecorder>, String)>,
    running: AtomicBool,
    cancel: Mutex<CancellationToken>,
}

impl Orchestrator {
    pub fn new(bridge: Arc<dyn PageBridge>, config: LoopConfig) -> Self {
        Self {
            bridge,
            config,
            status: StatusSink::default(),
            recorder: None,
            running: AtomicBool::new(false),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    /// Stream executed actions to `recorder` under `workflow_id`.
    pub fn with_recorder(
        mut self,
        recorder: Arc<dyn TraceRecorder>,
        workflow_id: impl Into<String>,
    ) -> Self {
        self.recorder = Some((recorder, workflow_id.into()));
        self
    }

    pub fn status_sink(&self) -> &StatusSink {
        &self.status
    }

    /// Request a cooperative stop. The loop observes it at the top of the
    /// next iteration; whatever is in flight finishes first.
    pub fn stop(&self) {
        self.cancel.lock().cancel();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Drive one goal to a terminal state. Only one run at a time; a
    /// second caller gets [`RunError::AlreadyRunning`] and the first run
    /// is untouched.
    pub async fn run<S>(&self, goal: &str, source: &mut S) -> Result<RunReport, RunError>
    where
        S: DecisionSource + ?Sized,
    {
        // Conversation costs nothing and never enters the running state.
        if classify::is_conversational(goal) {
            debug!(goal, "conversational goal, replying without a run");
            return Ok(RunReport::completed(classify::help_message()));
        }

        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(RunError::AlreadyRunning);
        }

        let cancel = {
            let mut slot = self.cancel.lock();
            *slot = CancellationToken::new();
            slot.clone()
        };

        let started = Instant::now();
        let result = self.drive(goal, source, &cancel).await;
        self.running.store(false, Ordering::SeqCst);

        result.map(|mut report| {
            report.elapsed_ms = started.elapsed().as_millis() as u64;
            self.status.emit(StatusUpdate::idle(report.message.clone()));
            info!(status = ?report.status, iterations = report.iterations, "run finished");
            report
        })
    }

    async fn drive<S>(
        &self,
        goal: &str,
        source: &mut S,
        cancel: &CancellationToken,
    ) -> Result<RunReport, RunError>
    where
        S: DecisionSource + ?Sized,
    {
        let info = self
            .page_info()
            .await
            .map_err(RunError::NoPageContext)?;
        let mut current_url = info.url;

        self.request_quiet(PageCommand::ShowOverlay).await;

        let mut history = ActionHistory::default();
        let mut consumed: u32 = 0;
        let mut passes: u32 = 0;
        let mut cursor: usize = 0;

        let mut report = loop {
            if cancel.is_cancelled() {
                info!("stop requested, ending run");
                break RunReport::stopped("stopped by request");
            }
            if consumed >= self.config.max_iterations {
                break RunReport::failed(format!(
                    "reached the iteration cap of {}",
                    self.config.max_iterations
                ));
            }
            // Refunded failures do not consume budget, so a step that can
            // never succeed needs its own bound.
            if passes >= self.config.max_iterations.saturating_mul(3) {
                break RunReport::failed(format!(
                    "stalled: {passes} passes without finishing"
                ));
            }
            passes += 1;

            let screenshot = self.capture().await;
            let elements = self.inspect().await;
            if let Ok(info) = self.page_info().await {
                current_url = info.url;
            }

            let ctx = DecisionContext {
                goal: goal.to_string(),
                iteration: passes,
                step_cursor: cursor,
                current_url: current_url.clone(),
                screenshot,
                elements,
                history: history.recent(self.config.history_window),
            };

            let decision = match self.decide_with_retry(source, &ctx).await {
                Ok(decision) => decision,
                Err(message) => break RunReport::failed(message),
            };

            // A terminal decision wins even when it also carries an action.
            if decision.done {
                if decision.action.is_some() {
                    info!("terminal decision carried an action; not executing it");
                }
                break RunReport::completed(decision.rationale);
            }

            let Some(action) = decision.action else {
                warn!(iteration = passes, "decision carried neither an action nor completion");
                consumed += 1;
                continue;
            };

            self.status.emit(StatusUpdate::running(
                describe(&action, &decision.rationale),
                consumed as f32 / self.config.max_iterations as f32,
            ));

            match self.execute(&action).await {
                Ok(_) => {
                    history.push(HistoryEntry::success(
                        action.kind.clone(),
                        action.selector.clone(),
                    ));
                    cursor += 1;
                    consumed += 1;
                    self.record(&action).await;
                    self.request_quiet(PageCommand::UpdateOverlay {
                        progress: format!("{consumed}/{}", self.config.max_iterations),
                    })
                    .await;
                    if self.config.inter_action_delay_ms > 0 {
                        sleep(Duration::from_millis(self.config.inter_action_delay_ms)).await;
                    }
                }
                Err(ExecFailure::Bridge(err)) => {
                    break RunReport::failed(format!("page bridge lost: {err}"));
                }
                Err(ExecFailure::Action(reason)) => {
                    // Recorded and surfaced, but the budget is refunded so
                    // a flaky step does not eat the run.
                    warn!(kind = %action.kind, reason, "action failed on page");
                    history.push(HistoryEntry::failed(
                        action.kind.clone(),
                        action.selector.clone(),
                        reason.clone(),
                    ));
                    self.status.emit(StatusUpdate::running(
                        format!("{} failed: {reason}", action.kind),
                        consumed as f32 / self.config.max_iterations as f32,
                    ));
                }
            }
        };

        self.request_quiet(PageCommand::HideOverlay).await;

        report.iterations = consumed;
        report.history = history.snapshot();
        Ok(report)
    }

    /// Decide, retrying transport errors with doubling backoff. Parse
    /// errors are never retried; a malformed reply will stay malformed.
    async fn decide_with_retry<S>(
        &self,
        source: &mut S,
        ctx: &DecisionContext,
    ) -> Result<Decision, String>
    where
        S: DecisionSource + ?Sized,
    {
        let attempts = self.config.decide_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match source.decide(ctx).await {
                Ok(decision) => return Ok(decision),
                Err(DecisionError::Parse(message)) => {
                    return Err(format!("decision reply unusable: {message}"));
                }
                Err(err) => {
                    if attempt >= attempts {
                        return Err(format!(
                            "decision source failed after {attempt} attempts: {err}"
                        ));
                    }
                    let delay_ms = self.config.backoff_base_ms << (attempt - 1);
                    warn!(attempt, delay_ms, %err, "decision transport error, retrying");
                    sleep(Duration::from_millis(delay_ms)).await;
                }
            }
        }
    }

    async fn execute(&self, action: &ActionEnvelope) -> Result<Option<Value>, ExecFailure> {
        let command = PageCommand::ExecuteAction {
            action: action.clone(),
        };
        match self.bridge.request(command).await {
            Ok(resp) if resp.success => Ok(resp.data),
            Ok(resp) => Err(ExecFailure::Action(
                resp.error.unwrap_or_else(|| "action failed".into()),
            )),
            Err(err) => Err(ExecFailure::Bridge(err)),
        }
    }

    async fn capture(&self) -> Option<Screenshot> {
        match self.bridge.request(PageCommand::CaptureScreenshot).await {
            Ok(resp) if resp.success => resp.data.and_then(decode_screenshot),
            Ok(resp) => {
                warn!(error = resp.error.as_deref().unwrap_or("unknown"), "screenshot refused");
                None
            }
            Err(err) => {
                warn!(%err, "screenshot request failed");
                None
            }
        }
    }

    async fn inspect(&self) -> Vec<ElementSummary> {
        match self.bridge.request(PageCommand::InspectPage).await {
            Ok(resp) if resp.success => resp
                .data
                .and_then(|data| serde_json::from_value(data).ok())
                .unwrap_or_default(),
            Ok(resp) => {
                warn!(error = resp.error.as_deref().unwrap_or("unknown"), "inspect refused");
                Vec::new()
            }
            Err(err) => {
                warn!(%err, "inspect request failed");
                Vec::new()
            }
        }
    }

    async fn page_info(&self) -> Result<PageInfo, String> {
        let resp = self
            .bridge
            .request(PageCommand::GetPageInfo)
            .await
            .map_err(|e| e.to_string())?;
        if !resp.success {
            return Err(resp.error.unwrap_or_else(|| "page info refused".into()));
        }
        let data = resp.data.ok_or("page info reply carried no data")?;
        serde_json::from_value(data).map_err(|e| e.to_string())
    }

    async fn record(&self, action: &ActionEnvelope) {
        if let Some((recorder, workflow_id)) = &self.recorder {
            if let Err(err) = recorder.record(workflow_id, action).await {
                warn!(%err, "trace record failed, continuing");
            }
        }
    }

    /// Overlay traffic is cosmetic. Errors are dropped.
    async fn request_quiet(&self, command: PageCommand) {
        let _ = self.bridge.request(command).await;
    }
}

fn describe(action: &ActionEnvelope, rationale: &str) -> String {
    if rationale.is_empty() {
        match &action.selector {
            Some(selector) => format!("{} {selector}", action.kind),
            None => action.kind.clone(),
        }
    } else {
        rationale.to_string()
    }
}

fn decode_screenshot(data: Value) -> Option<Screenshot> {
    let obj = data.as_object()?;
    let bytes = STANDARD.decode(obj.get("base64")?.as_str()?).ok()?;
    Some(Screenshot {
        width: obj.get("width").and_then(Value::as_u64).unwrap_or(0) as u32,
        height: obj.get("height").and_then(Value::as_u64).unwrap_or(0) as u32,
        format: obj
            .get("format")
            .and_then(Value::as_str)
            .unwrap_or("png")
            .to_string(),
        data: bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::MemoryRecorder;
    use crate::report::RunStatus;
    use async_trait::async_trait;
    use listflow_core_types::HistoryResult;
    use page_bridge::PageResponse;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    struct ScriptedBridge {
        exec_results: Mutex<VecDeque<PageResponse>>,
        exec_delay_ms: u64,
        requests: AtomicUsize,
        exec_count: AtomicUsize,
    }

    impl ScriptedBridge {
        fn new() -> Self {
            Self {
                exec_results: Mutex::new(VecDeque::new()),
                exec_delay_ms: 0,
                requests: AtomicUsize::new(0),
                exec_count: AtomicUsize::new(0),
            }
        }

        fn with_exec_results(results: Vec<PageResponse>) -> Self {
            let mut bridge = Self::new();
            bridge.exec_results = Mutex::new(results.into());
            bridge
        }
    }

    #[async_trait]
    impl PageBridge for ScriptedBridge {
        async fn request(&self, command: PageCommand) -> Result<PageResponse, BridgeError> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            Ok(match command {
                PageCommand::GetPageInfo => PageResponse::ok(json!({
                    "url": "https://listings.test/new",
                    "title": "New Listing",
                })),
                PageCommand::CaptureScreenshot => PageResponse::ok(json!({
                    "base64": "", "width": 0, "height": 0, "format": "png",
                })),
                PageCommand::InspectPage => PageResponse::ok(json!([])),
                PageCommand::ExecuteAction { .. } => {
                    self.exec_count.fetch_add(1, Ordering::SeqCst);
                    if self.exec_delay_ms > 0 {
                        sleep(Duration::from_millis(self.exec_delay_ms)).await;
                    }
                    self.exec_results
                        .lock()
                        .pop_front()
                        .unwrap_or_else(PageResponse::ok_empty)
                }
                _ => PageResponse::ok_empty(),
            })
        }
    }

    struct Script {
        decisions: VecDeque<Result<Decision, DecisionError>>,
        fallback: Option<Decision>,
    }

    impl Script {
        fn of(decisions: Vec<Result<Decision, DecisionError>>) -> Self {
            Self {
                decisions: decisions.into(),
                fallback: None,
            }
        }

        fn repeating(decision: Decision) -> Self {
            Self {
                decisions: VecDeque::new(),
                fallback: Some(decision),
            }
        }
    }

    #[async_trait]
    impl DecisionSource for Script {
        async fn decide(&mut self, _ctx: &DecisionContext) -> Result<Decision, DecisionError> {
            match self.decisions.pop_front() {
                Some(next) => next,
                None => Ok(self
                    .fallback
                    .clone()
                    .unwrap_or_else(|| Decision::done("script exhausted"))),
            }
        }
    }

    fn click() -> Decision {
        Decision::act(ActionEnvelope::click("#submit"), "click submit")
    }

    fn orch(bridge: ScriptedBridge, config: LoopConfig) -> (Arc<ScriptedBridge>, Orchestrator) {
        let bridge = Arc::new(bridge);
        let orchestrator = Orchestrator::new(bridge.clone(), config);
        (bridge, orchestrator)
    }

    #[tokio::test]
    async fn conversational_goal_never_touches_the_page() {
        let (bridge, orchestrator) = orch(ScriptedBridge::new(), LoopConfig::minimal());
        let mut source = Script::of(vec![]);
        let report = orchestrator.run("hello", &mut source).await.unwrap();

        assert_eq!(report.status, RunStatus::Completed);
        assert!(report.message.contains("Describe a task"));
        assert_eq!(bridge.requests.load(Ordering::SeqCst), 0);
        assert_eq!(report.iterations, 0);
    }

    #[tokio::test]
    async fn done_decision_beats_bundled_action() {
        let (bridge, orchestrator) = orch(ScriptedBridge::new(), LoopConfig::minimal());
        let mut source = Script::of(vec![Ok(Decision {
            action: Some(ActionEnvelope::click("#x")),
            rationale: "everything is filled in".into(),
            done: true,
        })]);

        let report = orchestrator.run("fill the listing form", &mut source).await.unwrap();
        assert_eq!(report.status, RunStatus::Completed);
        assert_eq!(bridge.exec_count.load(Ordering::SeqCst), 0);
        assert_eq!(report.iterations, 0);
        assert!(report.history.is_empty());
    }

    #[tokio::test]
    async fn failed_execution_is_recorded_and_refunded() {
        let bridge = ScriptedBridge::with_exec_results(vec![
            PageResponse::err("element not found: #submit"),
            PageResponse::err("element not found: #submit"),
            PageResponse::ok_empty(),
        ]);
        let orchestrator = Orchestrator::new(Arc::new(bridge), LoopConfig::minimal());
        let mut source = Script::of(vec![
            Ok(click()),
            Ok(click()),
            Ok(click()),
            Ok(Decision::done("form submitted")),
        ]);

        let report = orchestrator.run("click submit on the form", &mut source).await.unwrap();
        assert_eq!(report.status, RunStatus::Completed);
        // Two failures refunded, one success consumed.
        assert_eq!(report.iterations, 1);
        assert_eq!(report.history.len(), 3);
        assert!(matches!(report.history[0].result, HistoryResult::Failed(_)));
        assert_eq!(report.history[2].result, HistoryResult::Success);
    }

    #[tokio::test]
    async fn transport_exhaustion_fails_with_attempt_count() {
        let (_bridge, orchestrator) = orch(ScriptedBridge::new(), LoopConfig::minimal());
        let mut source = Script::of(vec![
            Err(DecisionError::Transport("connection refused".into())),
            Err(DecisionError::Transport("connection refused".into())),
            Err(DecisionError::Transport("connection refused".into())),
        ]);

        let report = orchestrator.run("fill the listing form", &mut source).await.unwrap();
        assert_eq!(report.status, RunStatus::Failed);
        assert!(report.message.contains("3 attempts"), "{}", report.message);
    }

    #[tokio::test]
    async fn parse_error_is_not_retried() {
        let (_bridge, orchestrator) = orch(ScriptedBridge::new(), LoopConfig::minimal());
        let mut source = Script::of(vec![
            Err(DecisionError::Parse("mangled json".into())),
            Ok(click()),
        ]);

        let report = orchestrator.run("fill the listing form", &mut source).await.unwrap();
        assert_eq!(report.status, RunStatus::Failed);
        assert!(report.message.contains("mangled json"));
        // The scripted success after the parse error was never consulted.
        assert_eq!(source.decisions.len(), 1);
    }

    #[tokio::test]
    async fn iteration_cap_ends_the_run_failed() {
        let config = LoopConfig::minimal().with_max_iterations(2);
        let (_bridge, orchestrator) = orch(ScriptedBridge::new(), config);
        let mut source = Script::repeating(click());

        let report = orchestrator.run("click submit forever", &mut source).await.unwrap();
        assert_eq!(report.status, RunStatus::Failed);
        assert!(report.message.contains("iteration cap"));
        assert_eq!(report.iterations, 2);
    }

    #[tokio::test]
    async fn history_keeps_only_the_last_ten() {
        let config = LoopConfig::minimal().with_max_iterations(12);
        let (_bridge, orchestrator) = orch(ScriptedBridge::new(), config);
        let mut source = Script::repeating(click());

        let report = orchestrator.run("click submit forever", &mut source).await.unwrap();
        assert_eq!(report.iterations, 12);
        assert_eq!(report.history.len(), 10);
    }

    #[tokio::test]
    async fn permanently_failing_step_ends_in_a_stall_failure() {
        let errors = (0..10)
            .map(|_| PageResponse::err("element not found: #submit"))
            .collect();
        let bridge = ScriptedBridge::with_exec_results(errors);
        let config = LoopConfig::minimal().with_max_iterations(2);
        let orchestrator = Orchestrator::new(Arc::new(bridge), config);
        let mut source = Script::repeating(click());

        let report = orchestrator.run("click submit forever", &mut source).await.unwrap();
        assert_eq!(report.status, RunStatus::Failed);
        assert!(report.message.contains("stalled"), "{}", report.message);
        assert_eq!(report.iterations, 0);
    }

    #[tokio::test]
    async fn decision_without_action_or_done_consumes_and_continues() {
        let (_bridge, orchestrator) = orch(ScriptedBridge::new(), LoopConfig::minimal());
        let mut source = Script::of(vec![
            Ok(Decision {
                action: None,
                rationale: "thinking".into(),
                done: false,
            }),
            Ok(Decision::done("nothing left to do")),
        ]);

        let report = orchestrator.run("fill the listing form", &mut source).await.unwrap();
        assert_eq!(report.status, RunStatus::Completed);
        assert_eq!(report.iterations, 1);
    }

    #[tokio::test]
    async fn second_run_is_rejected_while_the_first_is_live() {
        let mut bridge = ScriptedBridge::new();
        bridge.exec_delay_ms = 30;
        let orchestrator = Arc::new(Orchestrator::new(Arc::new(bridge), LoopConfig::minimal()));

        let background = orchestrator.clone();
        let first = tokio::spawn(async move {
            let mut source = Script::repeating(click());
            background.run("click submit forever", &mut source).await
        });

        sleep(Duration::from_millis(15)).await;
        assert!(orchestrator.is_running());

        let mut source = Script::of(vec![]);
        let second = orchestrator.run("fill another form", &mut source).await;
        assert!(matches!(second, Err(RunError::AlreadyRunning)));

        orchestrator.stop();
        let report = first.await.unwrap().unwrap();
        assert_eq!(report.status, RunStatus::Stopped);
    }

    #[tokio::test]
    async fn successful_actions_stream_to_the_recorder() {
        let recorder = Arc::new(MemoryRecorder::new());
        let bridge = ScriptedBridge::with_exec_results(vec![
            PageResponse::err("element not found: #submit"),
            PageResponse::ok_empty(),
        ]);
        let orchestrator = Orchestrator::new(Arc::new(bridge), LoopConfig::minimal())
            .with_recorder(recorder.clone(), "wf-7");
        let mut source = Script::of(vec![
            Ok(click()),
            Ok(click()),
            Ok(Decision::done("submitted")),
        ]);

        let report = orchestrator.run("click submit on the form", &mut source).await.unwrap();
        assert_eq!(report.status, RunStatus::Completed);
        // Only the successful execution was recorded.
        assert_eq!(recorder.len(), 1);
        assert_eq!(recorder.into_trace("wf-7").len(), 1);
    }

    #[tokio::test]
    async fn status_updates_end_idle() {
        let (_bridge, orchestrator) = orch(ScriptedBridge::new(), LoopConfig::minimal());
        let mut rx = orchestrator.status_sink().subscribe();
        let mut source = Script::of(vec![Ok(click()), Ok(Decision::done("submitted"))]);

        orchestrator.run("click submit on the form", &mut source).await.unwrap();

        let mut last = None;
        while let Ok(update) = rx.try_recv() {
            last = Some(update);
        }
        let last = last.expect("at least one status update");
        assert!(!last.running);
        assert_eq!(last.current_action, "submitted");
    }
}
