//! Application configuration: defaults, an optional TOML file under the
//! user config directory, and `LISTFLOW_*` environment overrides, layered
//! in that order.

use std::path::{Path, PathBuf};

use agent_loop::LoopConfig;
use config::{Config, ConfigError, Environment, File};
use decision_source::ReasoningConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub reasoning: ReasoningSettings,
    pub agent: AgentSettings,
    pub executor: ExecutorSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningSettings {
    pub service_url: String,
    pub timeout_ms: u64,
    pub history_window: usize,
}

impl Default for ReasoningSettings {
    fn default() -> Self {
        let base = ReasoningConfig::default();
        Self {
            service_url: base.service_url,
            timeout_ms: base.timeout_ms,
            history_window: base.history_window,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub max_iterations: u32,
    pub decide_attempts: u32,
    pub backoff_base_ms: u64,
    pub inter_action_delay_ms: u64,
}

impl Default for AgentSettings {
    fn default() -> Self {
        let base = LoopConfig::default();
        Self {
            max_iterations: base.max_iterations,
            decide_attempts: base.decide_attempts,
            backoff_base_ms: base.backoff_base_ms,
            inter_action_delay_ms: base.inter_action_delay_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorSettings {
    pub char_delay_ms: u64,
    pub settle_delay_ms: u64,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        let base = action_exec::ExecutorConfig::default();
        Self {
            char_delay_ms: base.char_delay_ms,
            settle_delay_ms: base.settle_delay_ms,
        }
    }
}

impl AppConfig {
    /// `~/.config/listflow/config.toml` on Linux, platform equivalent
    /// elsewhere.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("listflow").join("config.toml"))
    }

    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        match path {
            Some(explicit) => builder = builder.add_source(File::from(explicit.to_path_buf())),
            None => {
                if let Some(default_path) = Self::default_path() {
                    if default_path.exists() {
                        builder = builder.add_source(File::from(default_path));
                    }
                }
            }
        }
        builder
            .add_source(Environment::with_prefix("LISTFLOW").separator("__"))
            .build()?
            .try_deserialize()
    }

    pub fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            max_iterations: self.agent.max_iterations,
            decide_attempts: self.agent.decide_attempts,
            backoff_base_ms: self.agent.backoff_base_ms,
            inter_action_delay_ms: self.agent.inter_action_delay_ms,
            ..LoopConfig::default()
        }
    }

    pub fn reasoning_config(&self) -> ReasoningConfig {
        ReasoningConfig {
            service_url: self.reasoning.service_url.clone(),
            timeout_ms: self.reasoning.timeout_ms,
            history_window: self.reasoning.history_window,
        }
    }

    pub fn executor_config(&self) -> action_exec::ExecutorConfig {
        action_exec::ExecutorConfig {
            char_delay_ms: self.executor.char_delay_ms,
            settle_delay_ms: self.executor.settle_delay_ms,
        }
    }
}
