//! Application-level error types: use cases wrap port and domain errors
//! into one place the CLI can match on for exit codes.

use crate::ports::state_store::StateStoreError;
use conduct_domain::{AgentOutcomeError, EngineError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunEngineError {
    #[error(transparent)]
    Manifest(#[from] EngineError),

    #[error(transparent)]
    StateStore(#[from] StateStoreError),

    #[error("agent invocation failed: {0}")]
    AgentFailed(#[from] AgentOutcomeError),

    #[error("component {component} failed validation after {attempts} fix attempts")]
    ValidationFailed { component: String, attempts: u32 },

    #[error("integration validation failed: {summary}")]
    IntegrationValidationFailed { summary: String },

    #[error("voting gate for {gate} did not reach quorum")]
    VotingNoQuorum { gate: String },

    #[error("run interrupted by user")]
    UserInterrupt,
}
