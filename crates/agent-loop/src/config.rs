//! Loop tuning knobs.

/// Budget and timing configuration for one orchestrator.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Successful or consumed iterations before the run fails.
    pub max_iterations: u32,
    /// Total attempts per decision when the source reports transport
    /// trouble. Counts the first try, so 3 attempts sleep twice (2s, 4s
    /// with the default base) before giving up.
    pub decide_attempts: u32,
    /// Base delay for decision retries; doubles on each failed attempt.
    pub backoff_base_ms: u64,
    /// Pause between executed actions, letting the page settle.
    pub inter_action_delay_ms: u64,
    /// History entries handed to the decision source each iteration.
    pub history_window: usize,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            decide_attempts: 3,
            backoff_base_ms: 2_000,
            inter_action_delay_ms: 500,
            history_window: 5,
        }
    }
}

impl LoopConfig {
    /// Zero-delay variant for tests and dry runs.
    pub fn minimal() -> Self {
        Self {
            backoff_base_ms: 0,
            inter_action_delay_ms: 0,
            ..Self::default()
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_decide_attempts(mut self, decide_attempts: u32) -> Self {
        self.decide_attempts = decide_attempts;
        self
    }

    pub fn with_inter_action_delay_ms(mut self, delay_ms: u64) -> Self {
        self.inter_action_delay_ms = delay_ms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_budget() {
        let config = LoopConfig::default();
        assert_eq!(config.max_iterations, 50);
        assert_eq!(config.decide_attempts, 3);
        assert_eq!(config.backoff_base_ms, 2_000);
    }

    #[test]
    fn builder_overrides() {
        let config = LoopConfig::minimal().with_max_iterations(3).with_decide_attempts(1);
        assert_eq!(config.max_iterations, 3);
        assert_eq!(config.decide_attempts, 1);
        assert_eq!(config.inter_action_delay_ms, 0);
    }
}
