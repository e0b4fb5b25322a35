//! Agent invocation contract: what an agent is registered as, and what it
//! returns.

pub mod definition;
pub mod result;

pub use definition::AgentDefinition;
pub use result::{AgentOutcomeError, AgentResult};
