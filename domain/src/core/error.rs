//! Domain-level error type.

use thiserror::Error;

/// Errors raised by pure domain logic — manifest validation, schema lookup,
/// state transitions. Adapters and use cases wrap this in their own error
/// types rather than returning it directly to callers.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("manifest is invalid: {0}")]
    ManifestInvalid(String),

    #[error("dependency cycle detected among components: {0:?}")]
    CycleDetected(Vec<String>),

    #[error("components {a} and {b} both claim file {path}")]
    FileOwnershipConflict { a: String, b: String, path: String },

    #[error("unknown agent: {0}")]
    UnknownAgent(String),

    #[error("unknown component: {0}")]
    UnknownComponent(String),

    #[error("invalid state transition for component {component}: {from} -> {to}")]
    InvalidTransition {
        component: String,
        from: String,
        to: String,
    },
}
