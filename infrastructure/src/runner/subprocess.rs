//! Invokes an agent by spawning it as a subprocess: a child process with
//! piped stdin/stdout. conduct's agent contract is a single
//! request/response over stdio, not a long-lived session protocol, so
//! there's no transport layer beyond the spawn-and-pipe itself.

use async_trait::async_trait;
use conduct_application::ports::agent_runner::AgentRunnerPort;
use conduct_domain::{AgentDefinition, AgentOutcomeError, AgentResult, SchemaRegistry};
use serde_json::Value;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::warn;

/// Spawns `command` (with `extra_args` appended to every invocation) once
/// per agent call, writes the composed prompt to its stdin, parses its
/// stdout as JSON, and validates the parsed object against the agent's
/// registered [`SchemaRegistry`] entry before returning success — the
/// mechanism the engine relies on to keep an agent from informally
/// "deciding" it's done with free-form prose.
pub struct SubprocessAgentRunner {
    command: String,
    extra_args: Vec<String>,
    retries: u32,
    schemas: Arc<SchemaRegistry>,
}

impl SubprocessAgentRunner {
    pub fn new(command: impl Into<String>, extra_args: Vec<String>, retries: u32, schemas: Arc<SchemaRegistry>) -> Self {
        Self { command: command.into(), extra_args, retries, schemas }
    }

    async fn invoke_once(&self, agent: &AgentDefinition, prompt: &str) -> Result<AgentResult, AgentOutcomeError> {
        let mut child = Command::new(&self.command)
            .args(&self.extra_args)
            .arg("--agent")
            .arg(&agent.name)
            .arg("--model")
            .arg(&agent.model)
            .arg("--schema")
            .arg(&agent.output_schema)
            .args(agent.allowed_tools.iter().flat_map(|tool| ["--tool".to_string(), tool.clone()]))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AgentOutcomeError::SpawnError(e.to_string()))?;

        let mut stdin = child.stdin.take().expect("stdin was piped");
        stdin
            .write_all(prompt.as_bytes())
            .await
            .map_err(|e| AgentOutcomeError::SpawnError(e.to_string()))?;
        drop(stdin);

        let output = timeout(agent.timeout, child.wait_with_output())
            .await
            .map_err(|_| AgentOutcomeError::Timeout(agent.name.clone()))?
            .map_err(|e| AgentOutcomeError::SpawnError(e.to_string()))?;

        let raw = String::from_utf8_lossy(&output.stdout).into_owned();

        if !output.status.success() {
            return Ok(AgentResult::failure(
                AgentOutcomeError::MalformedOutput(format!("process exited with {}", output.status)),
                raw,
            ));
        }

        let data: Value = serde_json::from_str(&raw)
            .map_err(|e| AgentOutcomeError::MalformedOutput(e.to_string()))?;

        if let Err(reason) = self.schemas.validate(&agent.output_schema, &data) {
            // Schema violations are recorded, not retried — the agent's
            // JSON was well-formed but didn't comply with its contract.
            // The partial payload is kept so callers can still log it.
            let (tokens_in, tokens_out) = extract_token_counts(&data);
            return Ok(AgentResult {
                success: false,
                data: Some(data),
                raw_output: raw,
                error: Some(AgentOutcomeError::SchemaViolation(reason)),
                tokens_in,
                tokens_out,
            });
        }

        let (tokens_in, tokens_out) = extract_token_counts(&data);
        Ok(AgentResult::success(data, raw).with_tokens(tokens_in, tokens_out))
    }
}

#[async_trait]
impl AgentRunnerPort for SubprocessAgentRunner {
    async fn invoke(&self, agent: &AgentDefinition, prompt: &str) -> AgentResult {
        let mut attempt = 0;
        loop {
            match self.invoke_once(agent, prompt).await {
                Ok(result) => return result,
                Err(err) if err.is_retryable() && attempt < self.retries => {
                    let backoff = std::time::Duration::from_millis(100 * 2u64.pow(attempt));
                    warn!(agent = %agent.name, attempt, %err, backoff_ms = backoff.as_millis(), "retrying agent invocation after spawn failure");
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(err) => return AgentResult::failure(err, String::new()),
            }
        }
    }
}

fn extract_token_counts(data: &Value) -> (u64, u64) {
    let tokens_in = data.get("tokens_in").and_then(Value::as_u64).unwrap_or(0);
    let tokens_out = data.get("tokens_out").and_then(Value::as_u64).unwrap_or(0);
    (tokens_in, tokens_out)
}
