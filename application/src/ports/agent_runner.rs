//! Port for invoking an agent process.
//!
//! Implemented in infrastructure by spawning the assistant CLI as a
//! subprocess; use cases depend only on this trait so they can be tested
//! against a scripted stub.

use async_trait::async_trait;
use conduct_domain::{AgentDefinition, AgentResult};

/// Invokes one agent and returns its result.
///
/// Implementations own retry-on-spawn-failure and timeout enforcement —
/// use cases see only the final [`AgentResult`], success or failure.
#[async_trait]
pub trait AgentRunnerPort: Send + Sync {
    /// Run `agent` with the given composed prompt and return its result.
    /// `prompt` is the fully composed text (context + template + task +
    /// schema directive) — the runner does not re-compose it.
    async fn invoke(&self, agent: &AgentDefinition, prompt: &str) -> AgentResult;
}
