//! Port for the append-only context log of a run.
//!
//! Every agent prompt, response, and validator finding is appended here
//! for audit and resume — never mutated or truncated.

use serde_json::Value;

/// One entry appended to a run's context log.
pub struct ContextEntry {
    pub entry_type: &'static str,
    pub payload: Value,
}

impl ContextEntry {
    pub fn new(entry_type: &'static str, payload: Value) -> Self {
        Self { entry_type, payload }
    }
}

/// Append-only context log for one run. `append` is synchronous and
/// non-fallible at the call site — implementations log their own write
/// failures rather than disrupt the engine loop.
pub trait ContextStorePort: Send + Sync {
    fn append(&self, entry: ContextEntry);

    /// Render the "Context from Previous Work" section injected at the
    /// front of every agent prompt: global discoveries, the decisions
    /// log, and — when `component_id` is given — that
    /// component's own accumulated entries. The default renders nothing,
    /// for stores with no read-back path (e.g. [`NoContextStore`]).
    fn context_for_prompt(&self, _component_id: Option<&str>) -> String {
        String::new()
    }
}

pub struct NoContextStore;

impl ContextStorePort for NoContextStore {
    fn append(&self, _entry: ContextEntry) {}
}
