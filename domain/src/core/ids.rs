//! Identifier value objects shared across the engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of a component as declared in the manifest (e.g. `"auth"`).
///
/// Components are addressed by name rather than a generated id: the
/// manifest is the source of truth and names must be unique within it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentId(String);

impl ComponentId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<T: Into<String>> From<T> for ComponentId {
    fn from(s: T) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for one engine run, used to namespace state and
/// context files under the spec directory (e.g. `.conduct/runs/<id>/`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(String);

impl RunId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive a run id from a manifest name and a caller-supplied
    /// timestamp string (callers own the clock — see the crate-level note
    /// on why `conduct` never calls `SystemTime::now()` directly in domain
    /// code).
    pub fn derive(manifest_name: &str, timestamp: &str) -> Self {
        let slug: String = manifest_name
            .chars()
            .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
            .collect();
        Self(format!("{slug}-{timestamp}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name of a registered agent kind (e.g. `"skeleton_builder"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentName(String);

impl AgentName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<T: Into<String>> From<T> for AgentName {
    fn from(s: T) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for AgentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_derive_slugifies_name() {
        let id = RunId::derive("Payments Service", "20260727T101500Z");
        assert_eq!(id.as_str(), "payments-service-20260727T101500Z");
    }

    #[test]
    fn component_id_display() {
        let id = ComponentId::new("auth");
        assert_eq!(format!("{id}"), "auth");
    }
}
