use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use agent_loop::{MemoryRecorder, Orchestrator, RunReport};
use decision_source::{DecisionSource, ReasoningSource, TraceSource};
use listflow_cli::{AppConfig, PageHost};
use listflow_core_types::{DomNode, ListingRecord, Trace};
use page_bridge::{ChannelBridge, MemoryPage};

const BRIDGE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(
    name = "listflow",
    version,
    long_version = concat!(env!("CARGO_PKG_VERSION"), " (built ", env!("BUILD_DATE"), ")"),
    about = "Learn-once, replay-many browser automation for listing workflows"
)]
struct Cli {
    /// Config file path; defaults to the user config directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Drive a goal with the reasoning service, recording a trace.
    Learn {
        /// Natural-language task, e.g. "fill the new listing form".
        goal: String,

        /// JSON page fixture (url, title, dom) standing in for the live page.
        #[arg(long)]
        dom: PathBuf,

        #[arg(long, default_value = "listing-workflow")]
        workflow_id: String,

        /// Where to write the recorded trace.
        #[arg(long)]
        trace_out: Option<PathBuf>,
    },

    /// Replay a recorded trace against a page fixture with listing data.
    Replay {
        #[arg(long)]
        trace: PathBuf,

        /// Listing record JSON providing `{{FIELD}}` values.
        #[arg(long)]
        record: PathBuf,

        #[arg(long)]
        dom: PathBuf,

        /// Where to write the run report (stdout when omitted).
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Check a trace file for structural problems.
    Validate {
        #[arg(long)]
        trace: PathBuf,
    },
}

/// On-disk stand-in for a live page.
#[derive(Debug, Deserialize)]
struct PageFixture {
    #[serde(default = "default_url")]
    url: String,
    #[serde(default)]
    title: String,
    dom: DomNode,
}

fn default_url() -> String {
    "about:blank".into()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Command::Learn {
            goal,
            dom,
            workflow_id,
            trace_out,
        } => {
            let recorder = Arc::new(MemoryRecorder::new());
            let mut source = ReasoningSource::new(config.reasoning_config());
            let report = run_against_fixture(
                &config,
                &dom,
                &goal,
                &mut source,
                Some((recorder.clone(), workflow_id.clone())),
            )
            .await?;

            if let Some(path) = trace_out {
                let trace = recorder.into_trace(&workflow_id);
                let json = serde_json::to_string_pretty(&trace)?;
                std::fs::write(&path, json)
                    .with_context(|| format!("writing trace to {}", path.display()))?;
                info!(steps = trace.len(), path = %path.display(), "trace written");
            }
            emit_report(&report, None)?;
            finish(report)
        }
        Command::Replay {
            trace,
            record,
            dom,
            out,
        } => {
            let trace = load_trace(&trace)?;
            for issue in trace.validate() {
                warn!(%issue, "trace issue");
            }
            let record: ListingRecord = read_json(&record).context("loading listing record")?;
            let goal = format!("replay workflow {}", trace.workflow_id);
            let mut source = TraceSource::new(trace, record);

            let report = run_against_fixture(&config, &dom, &goal, &mut source, None).await?;
            emit_report(&report, out.as_deref())?;
            finish(report)
        }
        Command::Validate { trace } => {
            let trace = load_trace(&trace)?;
            let issues = trace.validate();
            if issues.is_empty() {
                println!("{}: {} steps, no issues", trace.workflow_id, trace.len());
                Ok(())
            } else {
                for issue in &issues {
                    println!("{issue}");
                }
                anyhow::bail!("{} issues found", issues.len());
            }
        }
    }
}

async fn run_against_fixture<S>(
    config: &AppConfig,
    fixture_path: &Path,
    goal: &str,
    source: &mut S,
    recorder: Option<(Arc<MemoryRecorder>, String)>,
) -> Result<RunReport>
where
    S: DecisionSource + ?Sized,
{
    let fixture: PageFixture = read_json(fixture_path).context("loading page fixture")?;
    let page = Arc::new(MemoryPage::new(fixture.dom, fixture.url, fixture.title));
    let host = Arc::new(PageHost::new(page, config.executor_config()));

    let (bridge, endpoint) = ChannelBridge::pair(BRIDGE_TIMEOUT);
    let server = {
        let host = host.clone();
        tokio::spawn(async move { host.serve(endpoint).await })
    };

    let mut orchestrator = Orchestrator::new(Arc::new(bridge), config.loop_config());
    if let Some((recorder, workflow_id)) = recorder {
        orchestrator = orchestrator.with_recorder(recorder, workflow_id);
    }

    let report = orchestrator.run(goal, source).await?;
    drop(orchestrator);
    server.await.ok();
    Ok(report)
}

fn load_trace(path: &Path) -> Result<Trace> {
    read_json(path).with_context(|| format!("loading trace from {}", path.display()))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn emit_report(report: &RunReport, out: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    match out {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("writing report to {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}

fn finish(report: RunReport) -> Result<()> {
    if report.is_completed() {
        Ok(())
    } else {
        anyhow::bail!("run ended {:?}: {}", report.status, report.message)
    }
}
