//! The schemas registry: the set of known agent output contracts.
//!
//! Seeded from a static default table and wrapped in a [`SchemaRegistry`]
//! so a project can additionally `register` entries for custom review
//! specializations without touching engine code.

use std::collections::HashMap;

/// Required shape of one agent kind's structured output.
#[derive(Debug, Clone)]
pub struct AgentSchema {
    /// Name matching [`crate::agent::AgentDefinition::output_schema`].
    pub name: &'static str,
    /// Field names that must be present in the agent's JSON output.
    pub required_fields: &'static [&'static str],
    /// If `status` is a required field, the values it may take.
    pub status_values: &'static [&'static str],
}

/// All built-in agent output schemas.
pub fn known_schemas() -> &'static [AgentSchema] {
    &KNOWN_SCHEMAS
}

static KNOWN_SCHEMAS: [AgentSchema; 8] = [
    AgentSchema {
        name: "skeleton_builder",
        required_fields: &["status", "files", "summary"],
        status_values: &["complete", "blocked", "needs_input"],
    },
    AgentSchema {
        name: "implementation_executor",
        required_fields: &["status", "files_changed", "summary"],
        status_values: &["complete", "blocked", "needs_input"],
    },
    AgentSchema {
        name: "validator",
        required_fields: &["status", "issues"],
        status_values: &["pass", "fail"],
    },
    AgentSchema {
        name: "finding_validator",
        required_fields: &["status", "confirmed"],
        status_values: &["confirmed", "refuted"],
    },
    AgentSchema {
        name: "fix_executor",
        required_fields: &["status", "files_changed", "summary"],
        status_values: &["complete", "blocked", "needs_input"],
    },
    AgentSchema {
        name: "voter",
        required_fields: &["option", "reasoning"],
        status_values: &[],
    },
    AgentSchema {
        name: "investigator",
        required_fields: &["status", "findings"],
        status_values: &["complete", "blocked", "needs_input"],
    },
    AgentSchema {
        name: "test_runner",
        required_fields: &["status", "passed", "failed"],
        status_values: &["complete", "blocked", "needs_input"],
    },
];

/// Lookup table of known agent output schemas, seeded from
/// [`known_schemas`] and open to project-specific additions via
/// [`SchemaRegistry::register`].
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schemas: HashMap<String, AgentSchema>,
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        let schemas = known_schemas()
            .iter()
            .map(|s| (s.name.to_string(), s.clone()))
            .collect();
        Self { schemas }
    }
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a schema, for project-specific agent kinds.
    pub fn register(&mut self, schema: AgentSchema) {
        self.schemas.insert(schema.name.to_string(), schema);
    }

    pub fn get(&self, name: &str) -> Result<&AgentSchema, crate::core::error::EngineError> {
        self.schemas
            .get(name)
            .ok_or_else(|| crate::core::error::EngineError::UnknownAgent(name.to_string()))
    }

    /// Check a parsed agent output against its registered schema: every
    /// required field must be present, and if `status` is required its
    /// value must be one of `status_values`.
    pub fn validate(
        &self,
        schema_name: &str,
        output: &serde_json::Value,
    ) -> Result<(), String> {
        let schema = self
            .schemas
            .get(schema_name)
            .ok_or_else(|| format!("unknown schema: {schema_name}"))?;

        let object = output
            .as_object()
            .ok_or_else(|| "agent output is not a JSON object".to_string())?;

        for field in schema.required_fields {
            if !object.contains_key(*field) {
                return Err(format!("missing required field: {field}"));
            }
        }

        if !schema.status_values.is_empty()
            && let Some(status) = object.get("status").and_then(|v| v.as_str())
            && !schema.status_values.contains(&status)
        {
            return Err(format!(
                "invalid status {status:?}, expected one of {:?}",
                schema.status_values
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_knows_builtin_agents() {
        let registry = SchemaRegistry::new();
        assert!(registry.get("validator").is_ok());
        assert!(registry.get("unknown_agent").is_err());
    }

    #[test]
    fn validate_rejects_missing_field() {
        let registry = SchemaRegistry::new();
        let output = serde_json::json!({"status": "pass"});
        let err = registry.validate("validator", &output).unwrap_err();
        assert!(err.contains("issues"));
    }

    #[test]
    fn validate_rejects_invalid_status() {
        let registry = SchemaRegistry::new();
        let output = serde_json::json!({"status": "maybe", "issues": []});
        assert!(registry.validate("validator", &output).is_err());
    }

    #[test]
    fn validate_accepts_well_formed_output() {
        let registry = SchemaRegistry::new();
        let output = serde_json::json!({"status": "pass", "issues": []});
        assert!(registry.validate("validator", &output).is_ok());
    }

    #[test]
    fn register_adds_project_specific_schema() {
        let mut registry = SchemaRegistry::new();
        registry.register(AgentSchema {
            name: "security_reviewer",
            required_fields: &["status"],
            status_values: &["pass", "fail"],
        });
        assert!(registry.get("security_reviewer").is_ok());
    }
}
