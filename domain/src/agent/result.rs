//! [`AgentResult`]: the outcome of one agent invocation.

use serde::{Deserialize, Serialize};

/// Why an agent invocation failed to produce a usable result.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error, PartialEq)]
pub enum AgentOutcomeError {
    #[error("agent {0} timed out")]
    Timeout(String),
    #[error("failed to spawn agent process: {0}")]
    SpawnError(String),
    #[error("agent output was not valid JSON: {0}")]
    MalformedOutput(String),
    #[error("agent output violated its schema: {0}")]
    SchemaViolation(String),
}

impl AgentOutcomeError {
    /// Whether the runner should retry the invocation (transient spawn
    /// failures only — a malformed or schema-violating response means the
    /// agent itself misbehaved and retrying unchanged input won't help).
    pub fn is_retryable(&self) -> bool {
        matches!(self, AgentOutcomeError::SpawnError(_))
    }
}

/// Outcome of invoking one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult {
    pub success: bool,
    /// Parsed structured output, present only on success.
    pub data: Option<serde_json::Value>,
    /// Raw stdout captured from the agent process, kept for the context
    /// log regardless of success.
    pub raw_output: String,
    pub error: Option<AgentOutcomeError>,
    pub tokens_in: u64,
    pub tokens_out: u64,
}

impl AgentResult {
    pub fn success(data: serde_json::Value, raw_output: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            raw_output: raw_output.into(),
            error: None,
            tokens_in: 0,
            tokens_out: 0,
        }
    }

    pub fn failure(error: AgentOutcomeError, raw_output: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            raw_output: raw_output.into(),
            error: Some(error),
            tokens_in: 0,
            tokens_out: 0,
        }
    }

    pub fn with_tokens(mut self, tokens_in: u64, tokens_out: u64) -> Self {
        self.tokens_in = tokens_in;
        self.tokens_out = tokens_out;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_error_is_retryable_but_schema_violation_is_not() {
        assert!(AgentOutcomeError::SpawnError("econnreset".into()).is_retryable());
        assert!(!AgentOutcomeError::SchemaViolation("missing field".into()).is_retryable());
        assert!(!AgentOutcomeError::Timeout("validator".into()).is_retryable());
    }

    #[test]
    fn success_result_carries_data() {
        let result = AgentResult::success(serde_json::json!({"status": "ok"}), "{\"status\":\"ok\"}");
        assert!(result.success);
        assert_eq!(result.data.unwrap()["status"], "ok");
    }
}
