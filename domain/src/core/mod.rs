//! Core cross-cutting domain types: errors and identifiers.

pub mod error;
pub mod ids;

pub use error::EngineError;
pub use ids::{AgentName, ComponentId, RunId};
