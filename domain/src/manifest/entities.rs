//! Manifest entities: the declared shape of one engine run.

use crate::core::ids::ComponentId;
use crate::orchestration::ExecutionMode;
use crate::risk::RiskLevel;
use serde::{Deserialize, Serialize};

/// Declaration of one component to be built by the engine.
///
/// `depends_on` and `owns_files` are declared up front; the engine never
/// infers either from agent output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentDef {
    /// Unique name within the manifest (e.g. `"auth"`).
    pub name: ComponentId,
    /// Human-readable description handed to the implementing agent.
    pub description: String,
    /// Names of components that must reach `Validated` before this one
    /// may start.
    #[serde(default)]
    pub depends_on: Vec<ComponentId>,
    /// Paths this component is allowed to create or modify. Two
    /// components may not claim the same path.
    pub owns_files: Vec<String>,
    /// Declared risk level, drives validator count per [`crate::orchestration::mode`].
    #[serde(default)]
    pub risk: RiskLevel,
}

impl ComponentDef {
    pub fn new(name: impl Into<ComponentId>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            depends_on: Vec::new(),
            owns_files: Vec::new(),
            risk: RiskLevel::default(),
        }
    }

    pub fn with_owns_files(mut self, files: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.owns_files = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_depends_on(
        mut self,
        deps: impl IntoIterator<Item = impl Into<ComponentId>>,
    ) -> Self {
        self.depends_on = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_risk(mut self, risk: RiskLevel) -> Self {
        self.risk = risk;
        self
    }
}

/// Quality bar a run is expected to clear, passed through to the
/// test-runner and final-validation agents rather than enforced by the
/// engine itself (the engine has no way to measure coverage or run a
/// linter — it only knows whether the manifest asked for one).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Quality {
    /// Minimum line/branch coverage percentage the test-runner agent
    /// should target, if the project tracks one.
    pub coverage_target: Option<u8>,
    pub lint_required: bool,
    pub security_scan_required: bool,
}

/// The full declared unit of work for one engine run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Name of the run, used to derive the run id and state directory.
    pub name: String,
    /// Project this spec belongs to, used to namespace its spec directory
    /// (`<specs-root>/<project>/<name>-<hash>/`).
    #[serde(default)]
    pub project: String,
    /// Working directory the implementing agents operate in, relative or
    /// absolute (`~`-prefixed paths are resolved at load time).
    #[serde(default)]
    pub work_dir: String,
    /// Spec directory this manifest was loaded from. Not serialized back
    /// out with `new`-created manifests — populated by the loader once
    /// the directory is known.
    #[serde(default)]
    pub spec_dir: String,
    /// Creation timestamp, caller-supplied (domain code never reads the
    /// clock itself — see [`crate::core::ids::RunId::derive`]).
    #[serde(default)]
    pub created: String,
    /// Declared complexity on a 1-10 scale, informational — the engine
    /// does not derive behavior from it directly (risk level does that).
    #[serde(default)]
    pub complexity: u8,
    /// Overall risk level for phases that are not scoped to a single
    /// component (impact analysis, the production gate). Per-component
    /// risk on [`ComponentDef`] still governs validator counts within
    /// `component_loop`.
    #[serde(default)]
    pub risk_level: RiskLevel,
    /// Execution mode this run uses unless the CLI overrides it.
    #[serde(default)]
    pub mode: ExecutionMode,
    /// Components to build, in declaration order (not execution order —
    /// execution order is derived from `depends_on` at run time).
    pub components: Vec<ComponentDef>,
    #[serde(default)]
    pub quality: Quality,
    /// Free-form warnings or constraints surfaced to every agent prompt
    /// verbatim (e.g. "do not touch the legacy billing path").
    #[serde(default)]
    pub gotchas: Vec<String>,
    /// Opaque command used to run the project's test suite, passed to the
    /// test-runner agent untouched — the engine never parses or executes
    /// it directly.
    #[serde(default)]
    pub validation_command: String,
}

impl Manifest {
    pub fn new(name: impl Into<String>, components: Vec<ComponentDef>) -> Self {
        Self {
            name: name.into(),
            project: String::new(),
            work_dir: String::new(),
            spec_dir: String::new(),
            created: String::new(),
            complexity: 1,
            risk_level: RiskLevel::default(),
            mode: ExecutionMode::default(),
            components,
            quality: Quality::default(),
            gotchas: Vec::new(),
            validation_command: String::new(),
        }
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = project.into();
        self
    }

    pub fn with_work_dir(mut self, work_dir: impl Into<String>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    pub fn with_created(mut self, created: impl Into<String>) -> Self {
        self.created = created.into();
        self
    }

    pub fn with_risk_level(mut self, risk_level: RiskLevel) -> Self {
        self.risk_level = risk_level;
        self
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_validation_command(mut self, command: impl Into<String>) -> Self {
        self.validation_command = command.into();
        self
    }

    pub fn with_gotchas(mut self, gotchas: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.gotchas = gotchas.into_iter().map(Into::into).collect();
        self
    }

    pub fn component(&self, id: &ComponentId) -> Option<&ComponentDef> {
        self.components.iter().find(|c| &c.name == id)
    }

    pub fn component_ids(&self) -> impl Iterator<Item = &ComponentId> {
        self.components.iter().map(|c| &c.name)
    }
}
