//! Subprocess-based [`AgentRunnerPort`] implementation.

mod subprocess;

pub use subprocess::SubprocessAgentRunner;
