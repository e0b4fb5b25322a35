//! Application layer for conduct.
//!
//! Hosts the use cases that drive one engine run (manifest validation,
//! the per-component validation loop, voting gates) and the ports those
//! use cases depend on. Implementations of the ports live in
//! `conduct-infrastructure`; this crate depends only on `conduct-domain`.

pub mod config;
pub mod error;
pub mod ports;
pub mod use_cases;

pub use config::EngineConfig;
pub use error::RunEngineError;
pub use ports::{AgentRunnerPort, ContextStorePort, EngineProgressPort, NoProgress, StateStorePort};
pub use use_cases::{AgentRoster, ComponentAgents, RunEngineUseCase, ValidationLoopUseCase, VotingGateUseCase};
