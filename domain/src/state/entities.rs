//! State entities: the persisted record of a run's progress.
//!
//! `State` is the only thing `conduct resume` reads to figure out where a
//! run left off. It is saved after every component status change — see
//! the atomicity property in the state store port — so a crash can only
//! ever lose the in-flight agent invocation, never the record of what
//! already completed.

use crate::core::ids::{ComponentId, RunId};
use crate::issue::Issue;
use crate::orchestration::phase::{Phase, PhaseStatus};
use crate::voting::VoteRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lifecycle status of one component within a run.
///
/// `Pending -> InProgress -> {Validated, Failed}`. A component can cycle
/// back from `InProgress` to itself across fix attempts; it never regresses
/// to `Pending` once started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentStatus {
    /// Waiting on its dependencies.
    Pending,
    /// Currently being built and/or validated.
    InProgress,
    /// Passed final validation for its phase.
    Validated,
    /// Exhausted fix attempts or was escalated and rejected.
    Failed,
}

impl ComponentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ComponentStatus::Validated | ComponentStatus::Failed)
    }
}

impl std::fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ComponentStatus::Pending => "pending",
            ComponentStatus::InProgress => "in_progress",
            ComponentStatus::Validated => "validated",
            ComponentStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Per-component progress within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentState {
    pub status: ComponentStatus,
    /// Number of fix attempts made so far for the current issue streak.
    pub fix_attempts: u32,
    /// Normalized descriptions of the last N issues raised against this
    /// component, oldest first — used for same-issue detection.
    pub issue_history: Vec<String>,
    /// The full `Issue` records from the most recent validation pass, kept
    /// alongside the normalized `issue_history` strings for reporting and
    /// resume display.
    #[serde(default)]
    pub last_issues: Vec<Issue>,
    /// Free-form blockers an agent reported via `status: BLOCKED` or
    /// `status: NEEDS_INPUT` — distinct from a validator `Issue`, since a
    /// blocker means the agent could not proceed at all rather than
    /// produced work with a defect.
    #[serde(default)]
    pub blockers: Vec<String>,
}

impl Default for ComponentState {
    fn default() -> Self {
        Self {
            status: ComponentStatus::Pending,
            fix_attempts: 0,
            issue_history: Vec::new(),
            last_issues: Vec::new(),
            blockers: Vec::new(),
        }
    }
}

impl ComponentState {
    pub fn start(&mut self) {
        self.status = ComponentStatus::InProgress;
    }

    pub fn record_issue(&mut self, normalized_description: impl Into<String>) {
        self.fix_attempts += 1;
        self.issue_history.push(normalized_description.into());
    }

    /// Replace the component's most recent issue set, overwriting rather
    /// than accumulating — this is a snapshot of "what's wrong right now",
    /// not a history (that's what `State.fix_attempts` and `issue_history`
    /// are for).
    pub fn set_last_issues(&mut self, issues: Vec<Issue>) {
        self.last_issues = issues;
    }

    /// Record a blocker an agent surfaced via `status: BLOCKED` or
    /// `status: NEEDS_INPUT` instead of finishing.
    pub fn record_blocker(&mut self, blocker: impl Into<String>) {
        self.blockers.push(blocker.into());
    }

    pub fn mark_validated(&mut self) {
        self.status = ComponentStatus::Validated;
        self.last_issues.clear();
    }

    pub fn mark_failed(&mut self) {
        self.status = ComponentStatus::Failed;
    }

    /// Clears the attempt counter and issue-history streak after a
    /// strategy vote grants the component another attempt window (`retry_same_fix`
    /// or `try_different_approach`) — a granted retry buys a fresh
    /// `max_fix_attempts` budget rather than immediately re-tripping the
    /// same exhaustion check it just voted on.
    pub fn reset_attempts(&mut self) {
        self.fix_attempts = 0;
        self.issue_history.clear();
    }

    /// True once the last `threshold` issues are identical, signalling the
    /// fix loop is stuck rather than converging. See [`crate::issue`].
    pub fn is_stuck(&self, threshold: usize) -> bool {
        if self.issue_history.len() < threshold {
            return false;
        }
        let tail = &self.issue_history[self.issue_history.len() - threshold..];
        tail.windows(2).all(|w| w[0] == w[1])
    }
}

/// A discovery surfaced by an agent and recorded for later prompts:
/// `{text, source agent, phase, timestamp}`. This is the state-level audit
/// trail; [`crate::state`]'s sibling context store (infrastructure layer)
/// is what's actually re-injected into prompts — the two overlap by
/// design, since a discovery is both a `State` field and a context-manager
/// concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Discovery {
    pub text: String,
    pub source_agent: String,
    pub phase: Phase,
    pub timestamp: String,
}

impl Discovery {
    pub fn new(text: impl Into<String>, source_agent: impl Into<String>, phase: Phase, timestamp: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_agent: source_agent.into(),
            phase,
            timestamp: timestamp.into(),
        }
    }
}

/// The full persisted state of one engine run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct State {
    pub run_id: RunId,
    pub manifest_name: String,
    pub current_phase: Phase,
    /// Status of `current_phase`'s execution — distinct from the phase
    /// itself so a resumed run can tell "phase X completed" apart from
    /// "phase X was running when the process died".
    #[serde(default)]
    pub phase_status: PhaseStatus,
    pub components: HashMap<ComponentId, ComponentState>,
    /// Every voting-gate round this run has raised, in the order they
    /// were tallied.
    #[serde(default)]
    pub voting_results: Vec<VoteRecord>,
    /// Discoveries surfaced by agents, in the order they were reported.
    #[serde(default)]
    pub discoveries: Vec<Discovery>,
    /// Per-component history of the full issue set raised on each fix
    /// attempt, oldest first. [`ComponentState::issue_history`] tracks the
    /// same attempts as normalized strings for same-issue detection; this
    /// field keeps the original `Issue` records for audit/review.
    #[serde(default)]
    pub fix_attempts: HashMap<ComponentId, Vec<Vec<Issue>>>,
}

impl State {
    pub fn new(run_id: RunId, manifest_name: impl Into<String>, components: Vec<ComponentId>) -> Self {
        Self {
            run_id,
            manifest_name: manifest_name.into(),
            current_phase: Phase::ParseSpec,
            phase_status: PhaseStatus::default(),
            components: components
                .into_iter()
                .map(|id| (id, ComponentState::default()))
                .collect(),
            voting_results: Vec::new(),
            discoveries: Vec::new(),
            fix_attempts: HashMap::new(),
        }
    }

    pub fn record_vote(&mut self, record: VoteRecord) {
        self.voting_results.push(record);
    }

    pub fn record_discovery(&mut self, discovery: Discovery) {
        self.discoveries.push(discovery);
    }

    pub fn record_fix_attempt_issues(&mut self, id: &ComponentId, issues: Vec<Issue>) {
        self.fix_attempts.entry(id.clone()).or_default().push(issues);
    }

    pub fn component(&self, id: &ComponentId) -> Option<&ComponentState> {
        self.components.get(id)
    }

    pub fn component_mut(&mut self, id: &ComponentId) -> Option<&mut ComponentState> {
        self.components.get_mut(id)
    }

    /// Components whose dependencies (per `ready_ids`, already known
    /// validated) are all satisfied and which have not yet been started.
    pub fn pending_with_satisfied_deps<'a>(
        &'a self,
        dependency_map: &'a HashMap<ComponentId, Vec<ComponentId>>,
    ) -> Vec<&'a ComponentId> {
        self.components
            .iter()
            .filter(|(_, state)| state.status == ComponentStatus::Pending)
            .filter(|(id, _)| {
                dependency_map
                    .get(*id)
                    .map(|deps| {
                        deps.iter().all(|dep| {
                            self.components
                                .get(dep)
                                .map(|s| s.status == ComponentStatus::Validated)
                                .unwrap_or(false)
                        })
                    })
                    .unwrap_or(true)
            })
            .map(|(id, _)| id)
            .collect()
    }

    pub fn all_terminal(&self) -> bool {
        self.components.values().all(|c| c.status.is_terminal())
    }

    pub fn all_validated(&self) -> bool {
        self.components
            .values()
            .all(|c| c.status == ComponentStatus::Validated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_state_lifecycle() {
        let mut state = ComponentState::default();
        assert_eq!(state.status, ComponentStatus::Pending);
        state.start();
        assert_eq!(state.status, ComponentStatus::InProgress);
        state.mark_validated();
        assert!(state.status.is_terminal());
    }

    #[test]
    fn is_stuck_detects_repeated_issue() {
        let mut state = ComponentState::default();
        state.record_issue("type error in handler");
        state.record_issue("type error in handler");
        state.record_issue("type error in handler");
        assert!(state.is_stuck(3));
        assert!(!state.is_stuck(4));
    }

    #[test]
    fn is_stuck_false_when_issues_differ() {
        let mut state = ComponentState::default();
        state.record_issue("type error in handler");
        state.record_issue("missing null check");
        assert!(!state.is_stuck(2));
    }

    #[test]
    fn reset_attempts_clears_both_counter_and_history() {
        let mut state = ComponentState::default();
        state.record_issue("type error in handler");
        state.record_issue("type error in handler");
        assert_eq!(state.fix_attempts, 2);

        state.reset_attempts();

        assert_eq!(state.fix_attempts, 0);
        assert!(state.issue_history.is_empty());
        assert!(!state.is_stuck(1));
    }

    #[test]
    fn pending_with_satisfied_deps_respects_dependency_map() {
        let mut deps = HashMap::new();
        deps.insert(ComponentId::new("auth"), vec![ComponentId::new("core")]);
        deps.insert(ComponentId::new("core"), vec![]);

        let mut state = State::new(
            RunId::new("run-1"),
            "demo",
            vec![ComponentId::new("auth"), ComponentId::new("core")],
        );

        let ready = state.pending_with_satisfied_deps(&deps);
        assert_eq!(ready, vec![&ComponentId::new("core")]);

        state
            .component_mut(&ComponentId::new("core"))
            .unwrap()
            .mark_validated();
        let ready = state.pending_with_satisfied_deps(&deps);
        assert_eq!(ready, vec![&ComponentId::new("auth")]);
    }
}
