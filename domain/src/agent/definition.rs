//! [`AgentDefinition`]: the data record for one registered agent kind.
//!
//! Agent kinds are configuration, not a closed Rust hierarchy — a new
//! review specialization is a new `AgentDefinition`, not a new type.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A registered agent kind, e.g. `"skeleton_builder"` or `"validator"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDefinition {
    /// Unique name, matched against the schema registry and used in logs.
    pub name: String,
    /// Model identifier passed through to the runner, e.g. a vendor/model
    /// string read from config. The engine never interprets this value —
    /// only the runner's subprocess invocation does.
    pub model: String,
    /// Wall-clock budget for one invocation before the runner kills the
    /// child process and returns `AgentOutcomeError::Timeout`.
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    /// Tool names this agent is permitted to call, passed to the
    /// subprocess as part of its prompt/config.
    #[serde(default)]
    pub allowed_tools: Vec<String>,
    /// Name of the prompt template used to compose this agent's system
    /// prompt (see the application layer's prompt composition).
    pub prompt_template: String,
    /// Name of the output schema this agent's result must satisfy,
    /// looked up in the schema registry.
    pub output_schema: String,
}

impl AgentDefinition {
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        prompt_template: impl Into<String>,
        output_schema: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            timeout: Duration::from_secs(120),
            allowed_tools: Vec::new(),
            prompt_template: prompt_template.into(),
            output_schema: output_schema.into(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_allowed_tools(mut self, tools: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.allowed_tools = tools.into_iter().map(Into::into).collect();
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
