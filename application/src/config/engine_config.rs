//! [`EngineConfig`]: process-wide engine configuration.

use conduct_domain::ExecutionMode;
use conduct_domain::voting::QuorumRule;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Process-wide configuration for the engine, loaded once at startup and
/// shared across every run it drives. Contrast with a [`conduct_domain::Manifest`],
/// which is per-run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Default execution mode when a run does not override it.
    pub mode: ExecutionMode,
    /// Maximum fix attempts before a component is escalated to a strategy
    /// vote (see [`conduct_domain::orchestration::FixStrategy`]).
    pub max_fix_attempts: u32,
    /// Number of consecutive identical issues that marks a fix loop as
    /// stuck (passed to [`conduct_domain::ComponentState::is_stuck`]).
    pub same_issue_threshold: usize,
    /// Quorum rule used by voting gates.
    pub voting_rule: QuorumRule,
    /// Number of transient spawn failures the runner retries before
    /// giving up on an agent invocation.
    pub runner_retries: u32,
    /// Wall-clock timeout applied to every agent invocation unless the
    /// agent's own definition overrides it.
    #[serde(with = "duration_secs")]
    pub default_agent_timeout: Duration,
    /// Maximum number of agent invocations the engine runs concurrently
    /// (bounds voting-gate and parallel-component fan-out).
    pub max_concurrent_agents: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Standard,
            max_fix_attempts: 3,
            same_issue_threshold: 2,
            voting_rule: QuorumRule::Majority,
            runner_retries: 2,
            default_agent_timeout: Duration::from_secs(120),
            max_concurrent_agents: 4,
        }
    }
}

impl EngineConfig {
    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_max_fix_attempts(mut self, max: u32) -> Self {
        self.max_fix_attempts = max;
        self
    }

    pub fn with_max_concurrent_agents(mut self, max: usize) -> Self {
        self.max_concurrent_agents = max;
        self
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}
