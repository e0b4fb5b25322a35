//! Ports: traits implemented by the infrastructure layer and consumed by
//! use cases. Defined here (not in domain) because they describe
//! interactions with the outside world — subprocess invocation, file
//! persistence — which the domain layer does not concern itself with.

pub mod agent_runner;
pub mod context_store;
pub mod progress;
pub mod state_store;

pub use agent_runner::AgentRunnerPort;
pub use context_store::ContextStorePort;
pub use progress::{EngineProgressPort, NoProgress};
pub use state_store::StateStorePort;
