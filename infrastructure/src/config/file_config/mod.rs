//! Raw, serde-deserializable configuration shape as it appears on disk.
//!
//! Scoped to what the engine actually needs: engine-wide run parameters,
//! the subprocess runner command, and the agent roster.
//! [`super::loader::ConfigLoader`] merges layered sources into this shape
//! before [`FileConfig::into_parts`] converts it into the typed
//! `EngineConfig`/`AgentRoster`/runner command the rest of the engine uses.

use conduct_application::config::EngineConfig;
use conduct_application::use_cases::AgentRoster;
use conduct_domain::voting::QuorumRule;
use conduct_domain::{AgentDefinition, ExecutionMode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigValidationError {
    #[error("unknown execution mode '{0}', expected one of: quick, standard, full")]
    UnknownMode(String),
    #[error("unknown voting rule '{0}', expected one of: majority, unanimous, or 'at_least:N'")]
    UnknownVotingRule(String),
    #[error("agent '{0}' has no prompt_template configured")]
    MissingPromptTemplate(String),
    #[error("runner.command is empty")]
    EmptyRunnerCommand,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileEngineConfig {
    pub mode: String,
    pub max_fix_attempts: u32,
    pub same_issue_threshold: usize,
    pub voting_rule: String,
    pub runner_retries: u32,
    pub default_agent_timeout_secs: u64,
    pub max_concurrent_agents: usize,
}

impl Default for FileEngineConfig {
    fn default() -> Self {
        Self {
            mode: "standard".to_string(),
            max_fix_attempts: 3,
            same_issue_threshold: 2,
            voting_rule: "majority".to_string(),
            runner_retries: 2,
            default_agent_timeout_secs: 120,
            max_concurrent_agents: 4,
        }
    }
}

/// One agent entry under `[agents.<role>]` in the project config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileAgentConfig {
    pub model: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub allowed_tools: Vec<String>,
    pub prompt_template: String,
    pub output_schema: String,
}

/// Subprocess command used to invoke every agent, e.g. a Copilot CLI or a
/// thin wrapper script. Individual agents only vary the arguments they're
/// given, not the program.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRunnerConfig {
    pub command: String,
    pub args: Vec<String>,
}

impl Default for FileRunnerConfig {
    fn default() -> Self {
        Self { command: "conduct-agent".to_string(), args: Vec::new() }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub engine: FileEngineConfig,
    pub runner: FileRunnerConfig,
    pub agents: HashMap<String, FileAgentConfig>,
}

impl FileConfig {
    /// Validate and convert into the typed pieces the rest of the engine
    /// consumes: an [`EngineConfig`], a populated [`AgentRoster`], and the
    /// runner command/args pair.
    pub fn into_parts(self) -> Result<(EngineConfig, AgentRoster, FileRunnerConfig), ConfigValidationError> {
        let mode = match self.engine.mode.as_str() {
            "quick" => ExecutionMode::Quick,
            "standard" => ExecutionMode::Standard,
            "full" => ExecutionMode::Full,
            other => return Err(ConfigValidationError::UnknownMode(other.to_string())),
        };

        let voting_rule = match self.engine.voting_rule.as_str() {
            "majority" => QuorumRule::Majority,
            "unanimous" => QuorumRule::Unanimous,
            other => match other.strip_prefix("at_least:").and_then(|n| n.parse::<usize>().ok()) {
                Some(n) => QuorumRule::AtLeast(n),
                None => return Err(ConfigValidationError::UnknownVotingRule(other.to_string())),
            },
        };

        if self.runner.command.trim().is_empty() {
            return Err(ConfigValidationError::EmptyRunnerCommand);
        }

        let engine_config = EngineConfig {
            mode,
            max_fix_attempts: self.engine.max_fix_attempts,
            same_issue_threshold: self.engine.same_issue_threshold,
            voting_rule,
            runner_retries: self.engine.runner_retries,
            default_agent_timeout: Duration::from_secs(self.engine.default_agent_timeout_secs),
            max_concurrent_agents: self.engine.max_concurrent_agents,
        };

        let mut roster = AgentRoster::new();
        for (role, agent) in self.agents {
            if agent.prompt_template.trim().is_empty() {
                return Err(ConfigValidationError::MissingPromptTemplate(role));
            }
            let mut definition =
                AgentDefinition::new(role.clone(), agent.model, agent.prompt_template, agent.output_schema);
            if let Some(secs) = agent.timeout_secs {
                definition = definition.with_timeout(Duration::from_secs(secs));
            }
            definition = definition.with_allowed_tools(agent.allowed_tools);
            roster.register(role, definition);
        }

        Ok((engine_config, roster, self.runner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_converts_cleanly() {
        let (engine_config, _roster, runner) = FileConfig::default().into_parts().unwrap();
        assert_eq!(engine_config.max_fix_attempts, 3);
        assert_eq!(runner.command, "conduct-agent");
    }

    #[test]
    fn rejects_unknown_mode() {
        let mut config = FileConfig::default();
        config.engine.mode = "turbo".to_string();
        assert!(matches!(config.into_parts(), Err(ConfigValidationError::UnknownMode(_))));
    }

    #[test]
    fn rejects_agent_missing_prompt_template() {
        let mut config = FileConfig::default();
        config.agents.insert(
            "validator".to_string(),
            FileAgentConfig {
                model: "m".to_string(),
                timeout_secs: None,
                allowed_tools: vec![],
                prompt_template: "   ".to_string(),
                output_schema: "validator_output".to_string(),
            },
        );
        assert!(matches!(config.into_parts(), Err(ConfigValidationError::MissingPromptTemplate(_))));
    }
}
