//! The validation loop: build a component, validate it, and retry fixes
//! until it passes, gets escalated, or exhausts its attempt budget.
//!
//! An outer loop advances through work items, and an inner loop retries a
//! single item on rejection, escalating once a cascade is detected. Here
//! the "item" is one component, "rejection" is a validator issue, and a
//! cascade is a [`ComponentState::is_stuck`] check that triggers a
//! [`FixStrategy`] vote instead of a fixed policy table.
//!
//! `state` is threaded through as `&Mutex<State>` rather than `&mut State`
//! because independent components may run concurrently within one
//! dependency level; the lock is only ever held across a read-modify-persist
//! step, never across an agent invocation, so concurrent components don't
//! serialize on each other's network calls.

use crate::error::RunEngineError;
use crate::ports::agent_runner::AgentRunnerPort;
use crate::ports::context_store::{ContextEntry, ContextStorePort};
use crate::ports::progress::EngineProgressPort;
use crate::ports::state_store::StateStorePort;
use crate::use_cases::voting_gate::VotingGateUseCase;
use conduct_domain::issue::has_blocking_issue;
use conduct_domain::orchestration::{FixStrategy, Phase, SkeletonGateChoice, SkeletonReviewPolicy};
use conduct_domain::voting::QuorumRule;
use conduct_domain::{
    AgentDefinition, AgentResult, ComponentDef, ComponentId, ComponentStatus, Discovery, Issue, Severity, State,
};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Maximum number of skeleton-builder revisions a `ReviewAll` gate will
/// request before proceeding anyway. Bounds what would otherwise be an
/// unbounded approve/revise cycle; the skeleton gate is advisory-bounded
/// rather than a hard block.
const MAX_SKELETON_REVISIONS: u32 = 2;

/// Agents involved in driving one component through the validation loop.
pub struct ComponentAgents<'a> {
    pub implementer: &'a AgentDefinition,
    pub validator: &'a AgentDefinition,
    pub strategy_voter: &'a AgentDefinition,
    pub validator_count: usize,
    /// Severities that must be clear before the component is marked
    /// validated, per the run's [`conduct_domain::orchestration::ModeProfile::final_fix_severities`].
    pub gating_severities: &'a [Severity],
    /// The skeleton-builder agent and the mode's review policy for it.
    /// `None` when the policy is [`SkeletonReviewPolicy::Skip`] or the
    /// component's risk doesn't trigger review under the mode's policy —
    /// callers resolve this per component before spawning so a manifest
    /// that never needs skeleton review never requires a
    /// `skeleton_builder` role to be registered.
    pub skeleton_builder: Option<&'a AgentDefinition>,
    pub skeleton_review: SkeletonReviewPolicy,
    pub voting_rule: QuorumRule,
}

pub struct ValidationLoopUseCase {
    runner: Arc<dyn AgentRunnerPort>,
    state_store: Arc<dyn StateStorePort>,
    context_store: Arc<dyn ContextStorePort>,
    progress: Arc<dyn EngineProgressPort>,
    concurrency: Arc<Semaphore>,
}

impl ValidationLoopUseCase {
    pub fn new(
        runner: Arc<dyn AgentRunnerPort>,
        state_store: Arc<dyn StateStorePort>,
        context_store: Arc<dyn ContextStorePort>,
        progress: Arc<dyn EngineProgressPort>,
        concurrency: Arc<Semaphore>,
    ) -> Self {
        Self {
            runner,
            state_store,
            context_store,
            progress,
            concurrency,
        }
    }

    /// Drive `component` through implement-then-validate cycles until it
    /// reaches a terminal [`ComponentStatus`]. `state` is mutated and
    /// persisted after every status transition; the lock is released
    /// before every agent invocation.
    pub async fn run(
        &self,
        component: &ComponentDef,
        state: &Mutex<State>,
        agents: &ComponentAgents<'_>,
        max_fix_attempts: u32,
        same_issue_threshold: usize,
        voting_rule: QuorumRule,
    ) -> Result<ComponentStatus, RunEngineError> {
        let id = &component.name;

        {
            let mut guard = state.lock().await;
            guard
                .component_mut(id)
                .ok_or_else(|| conduct_domain::EngineError::UnknownComponent(id.to_string()))?
                .start();
        }
        self.persist(state).await?;
        self.progress.on_component_start(id);

        if let Some(skeleton_builder) = agents.skeleton_builder {
            self.run_skeleton_phase(component, skeleton_builder, agents, state).await?;
        }

        let mut approach_hint: Option<String> = None;

        loop {
            let attempt = {
                let guard = state.lock().await;
                guard.component(id).map(|c| c.fix_attempts).unwrap_or(0)
            };
            let context = self.context_store.context_for_prompt(Some(id.as_str()));
            let prompt = build_implementation_prompt(component, approach_hint.as_deref(), &context);
            let impl_result = self.runner.invoke(agents.implementer, &prompt).await;
            self.context_store.append(ContextEntry::new(
                "implementation",
                serde_json::json!({"component": id.to_string(), "attempt": attempt, "raw": impl_result.raw_output}),
            ));
            self.record_discoveries(state, Phase::ComponentLoop, agents.implementer, &impl_result)
                .await;

            if !impl_result.success {
                warn!(component = %id, ?impl_result.error, "implementer invocation failed");
                {
                    let mut guard = state.lock().await;
                    guard
                        .component_mut(id)
                        .unwrap()
                        .record_issue("implementer_failure|n/a|agent invocation failed");
                }
                if self.should_give_up(state, id, max_fix_attempts, same_issue_threshold).await {
                    return self
                        .escalate_or_fail(component, state, agents, voting_rule, &mut approach_hint, true)
                        .await;
                }
                continue;
            }

            // `status: BLOCKED`/`status: NEEDS_INPUT`: the invocation
            // succeeded and validated against its schema, but the agent is
            // reporting it cannot proceed rather than that it finished.
            // Recorded as a blocker and routed straight to the strategy
            // vote rather than treated as done.
            if let Some(reason) = blocked_reason(&impl_result) {
                warn!(component = %id, %reason, "implementer reported it is blocked");
                {
                    let mut guard = state.lock().await;
                    guard.component_mut(id).unwrap().record_blocker(reason);
                }
                self.persist(state).await?;
                let outcome = self
                    .escalate_or_fail(component, state, agents, voting_rule, &mut approach_hint, false)
                    .await?;
                if outcome == ComponentStatus::Failed {
                    return Ok(ComponentStatus::Failed);
                }
                continue;
            }

            let issues = self.validate(component, agents, &context).await?;
            self.context_store.append(ContextEntry::new(
                "validation",
                serde_json::json!({"component": id.to_string(), "issue_count": issues.len()}),
            ));

            if !has_blocking_issue(&issues, agents.gating_severities) {
                {
                    let mut guard = state.lock().await;
                    guard.component_mut(id).unwrap().mark_validated();
                }
                self.persist(state).await?;
                self.progress.on_component_validated(id);
                info!(component = %id, "component validated");
                return Ok(ComponentStatus::Validated);
            }

            let fix_attempts = {
                let mut guard = state.lock().await;
                {
                    let component_state = guard.component_mut(id).unwrap();
                    for issue in &issues {
                        component_state.record_issue(issue.normalize());
                    }
                    component_state.set_last_issues(issues.clone());
                }
                guard.record_fix_attempt_issues(id, issues.clone());
                guard.component(id).unwrap().fix_attempts
            };
            self.persist(state).await?;
            self.progress.on_fix_attempt(id, fix_attempts);

            if self.should_give_up(state, id, max_fix_attempts, same_issue_threshold).await {
                let outcome = self
                    .escalate_or_fail(component, state, agents, voting_rule, &mut approach_hint, false)
                    .await?;
                if outcome == ComponentStatus::Failed {
                    return Ok(ComponentStatus::Failed);
                }
                // RetrySameFix / TryDifferentApproach: the vote bought the
                // component another attempt window, not completion. Reset
                // both the issue streak (so `is_stuck` re-arms) and the
                // attempt counter (so a retry granted at `max_fix_attempts`
                // doesn't immediately re-trip `should_give_up` on the very
                // next issue).
                {
                    let mut guard = state.lock().await;
                    guard.component_mut(id).unwrap().reset_attempts();
                }
                continue;
            }
        }
    }

    async fn should_give_up(
        &self,
        state: &Mutex<State>,
        id: &ComponentId,
        max_fix_attempts: u32,
        same_issue_threshold: usize,
    ) -> bool {
        let guard = state.lock().await;
        let component_state = guard.component(id).expect("component registered in state");
        component_state.fix_attempts >= max_fix_attempts || component_state.is_stuck(same_issue_threshold)
    }

    /// Raise a [`FixStrategy`] vote when a fix loop is stuck or exhausted,
    /// and act on the result: retry, adopt a different approach, or give
    /// up on the component.
    async fn escalate_or_fail(
        &self,
        component: &ComponentDef,
        state: &Mutex<State>,
        agents: &ComponentAgents<'_>,
        voting_rule: QuorumRule,
        approach_hint: &mut Option<String>,
        force_fail: bool,
    ) -> Result<ComponentStatus, RunEngineError> {
        let id = &component.name;
        if force_fail {
            {
                let mut guard = state.lock().await;
                guard.component_mut(id).unwrap().mark_failed();
            }
            self.persist(state).await?;
            self.progress.on_component_failed(id, "repeated agent invocation failure");
            return Ok(ComponentStatus::Failed);
        }

        let voting_gate = VotingGateUseCase::new(Arc::clone(&self.runner), Arc::clone(&self.concurrency));
        let prompt = {
            let guard = state.lock().await;
            build_strategy_vote_prompt(component, &guard)
        };
        let round = voting_gate
            .run(
                &format!("fix-strategy:{id}"),
                agents.strategy_voter,
                &prompt,
                agents.validator_count.max(1),
                voting_rule,
            )
            .await?;
        {
            let mut guard = state.lock().await;
            guard.record_vote(round.record);
        }
        self.persist(state).await?;

        self.progress.on_voting_gate(
            &format!("fix strategy for {id}"),
            round.outcome.option().map(|_| 1).unwrap_or(0),
            agents.validator_count.max(1),
        );

        let strategy = round
            .outcome
            .option()
            .and_then(|s| s.parse::<FixStrategy>().ok())
            .unwrap_or(FixStrategy::EscalateToUser);

        match strategy {
            FixStrategy::RetrySameFix => {
                info!(component = %id, "strategy vote: retrying same fix");
                Ok(ComponentStatus::InProgress)
            }
            FixStrategy::TryDifferentApproach => {
                info!(component = %id, "strategy vote: trying a different approach");
                *approach_hint = Some(
                    "Abandon the previous approach entirely and implement this component differently."
                        .to_string(),
                );
                Ok(ComponentStatus::InProgress)
            }
            FixStrategy::EscalateToUser => {
                {
                    let mut guard = state.lock().await;
                    guard.component_mut(id).unwrap().mark_failed();
                }
                self.persist(state).await?;
                self.progress.on_component_failed(id, "escalated to user after repeated fix attempts");
                Ok(ComponentStatus::Failed)
            }
        }
    }

    /// Run `agents.validator_count` validators concurrently (derived from
    /// the manifest's risk level) and merge their findings, deduplicating
    /// on [`Issue::normalize`] so two validators flagging the same defect
    /// count once.
    async fn validate(
        &self,
        component: &ComponentDef,
        agents: &ComponentAgents<'_>,
        context: &str,
    ) -> Result<Vec<Issue>, RunEngineError> {
        let prompt = build_validation_prompt(component, context);
        let validator_count = agents.validator_count.max(1);

        let mut join_set = JoinSet::new();
        for _ in 0..validator_count {
            let runner = Arc::clone(&self.runner);
            let concurrency = Arc::clone(&self.concurrency);
            let validator = agents.validator.clone();
            let prompt = prompt.clone();
            join_set.spawn(async move {
                let _permit = concurrency.acquire_owned().await.expect("semaphore never closed");
                runner.invoke(&validator, &prompt).await
            });
        }

        let mut seen = HashSet::new();
        let mut merged = Vec::new();
        let mut any_failed = false;
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(result) => {
                    if !result.success {
                        any_failed = true;
                        continue;
                    }
                    for issue in issues_from_result(&result) {
                        if seen.insert(issue.normalize()) {
                            merged.push(issue);
                        }
                    }
                }
                Err(join_err) => warn!(%join_err, "validator task panicked"),
            }
        }

        if any_failed && merged.is_empty() {
            merged.push(Issue::new(
                "validator_failure",
                "n/a",
                "validator invocation failed",
                Severity::Critical,
            ));
        }

        Ok(merged)
    }

    /// Build (and, per the mode's [`SkeletonReviewPolicy`], review) a
    /// component's structural plan before implementation starts: a
    /// `[pending] -> build skeleton -> [skeletonizing]` step.
    /// `ReviewHighRiskOnly` runs an advisory
    /// review whose findings are recorded but never block; `ReviewAll`
    /// additionally puts the skeleton through a
    /// [`SkeletonGateChoice`] vote and asks for a revision on `Revise`,
    /// up to [`MAX_SKELETON_REVISIONS`] times.
    async fn run_skeleton_phase(
        &self,
        component: &ComponentDef,
        skeleton_builder: &AgentDefinition,
        agents: &ComponentAgents<'_>,
        state: &Mutex<State>,
    ) -> Result<(), RunEngineError> {
        let id = &component.name;
        let mut revise_hint: Option<String> = None;

        for attempt in 0..=MAX_SKELETON_REVISIONS {
            let prompt = build_skeleton_prompt(component, revise_hint.as_deref());
            let result = self.runner.invoke(skeleton_builder, &prompt).await;
            self.context_store.append(ContextEntry::new(
                "skeleton",
                serde_json::json!({"component": id.to_string(), "attempt": attempt, "raw": result.raw_output}),
            ));
            self.record_discoveries(state, Phase::ComponentLoop, skeleton_builder, &result)
                .await;

            if !result.success {
                warn!(component = %id, ?result.error, "skeleton builder invocation failed");
                return Ok(());
            }

            match agents.skeleton_review {
                SkeletonReviewPolicy::Skip => return Ok(()),
                SkeletonReviewPolicy::ReviewHighRiskOnly => {
                    let issues = self.review_skeleton_advisory(component, agents).await?;
                    if !issues.is_empty() {
                        self.context_store.append(ContextEntry::new(
                            "skeleton_review",
                            serde_json::json!({"component": id.to_string(), "issue_count": issues.len()}),
                        ));
                    }
                    return Ok(());
                }
                SkeletonReviewPolicy::ReviewAll => {
                    let outcome = self.run_skeleton_gate_vote(component, agents, state).await?;
                    if outcome == SkeletonGateChoice::Approve || attempt == MAX_SKELETON_REVISIONS {
                        if outcome != SkeletonGateChoice::Approve {
                            warn!(
                                component = %id,
                                "skeleton gate still not approved after {MAX_SKELETON_REVISIONS} revisions, proceeding anyway"
                            );
                        }
                        return Ok(());
                    }
                    revise_hint =
                        Some("The skeleton gate requested a revision. Revise the structural plan.".to_string());
                }
            }
        }

        Ok(())
    }

    /// Non-blocking skeleton review for [`SkeletonReviewPolicy::ReviewHighRiskOnly`]:
    /// two reviewers invoked concurrently, reusing the `validator` role's
    /// output contract since a
    /// skeleton review reports the same `{status, issues}` shape as a code
    /// review. Findings are recorded to context but never gate progress.
    async fn review_skeleton_advisory(
        &self,
        component: &ComponentDef,
        agents: &ComponentAgents<'_>,
    ) -> Result<Vec<Issue>, RunEngineError> {
        const QUICK_REVIEW_COUNT: usize = 2;
        let prompt = format!(
            "Review the structural skeleton proposed for component '{}' (owned files: {}). \
             Report any structural issues as findings; this review is advisory.",
            component.name,
            component.owns_files.join(", ")
        );

        let mut join_set = JoinSet::new();
        for _ in 0..QUICK_REVIEW_COUNT {
            let runner = Arc::clone(&self.runner);
            let concurrency = Arc::clone(&self.concurrency);
            let validator = agents.validator.clone();
            let prompt = prompt.clone();
            join_set.spawn(async move {
                let _permit = concurrency.acquire_owned().await.expect("semaphore never closed");
                runner.invoke(&validator, &prompt).await
            });
        }

        let mut seen = HashSet::new();
        let mut merged = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(result) if result.success => {
                    for issue in issues_from_result(&result) {
                        if seen.insert(issue.normalize()) {
                            merged.push(issue);
                        }
                    }
                }
                Ok(_) => {}
                Err(join_err) => warn!(%join_err, "skeleton reviewer task panicked"),
            }
        }

        Ok(merged)
    }

    /// Binding skeleton-gate vote for [`SkeletonReviewPolicy::ReviewAll`]:
    /// `agents.validator_count` voters choose `approve` or `revise`.
    /// No-quorum and split outcomes are treated as `Revise` so a stuck
    /// vote asks for another pass rather than silently approving.
    async fn run_skeleton_gate_vote(
        &self,
        component: &ComponentDef,
        agents: &ComponentAgents<'_>,
        state: &Mutex<State>,
    ) -> Result<SkeletonGateChoice, RunEngineError> {
        let id = &component.name;
        let voting_gate = VotingGateUseCase::new(Arc::clone(&self.runner), Arc::clone(&self.concurrency));
        let prompt = format!(
            "Vote on the structural skeleton proposed for component '{}' (owned files: {}). \
             Choose approve or revise.",
            component.name,
            component.owns_files.join(", ")
        );
        let round = voting_gate
            .run(
                &format!("skeleton_gate:{id}"),
                agents.strategy_voter,
                &prompt,
                agents.validator_count.max(1),
                agents.voting_rule,
            )
            .await?;
        {
            let mut guard = state.lock().await;
            guard.record_vote(round.record);
        }
        self.persist(state).await?;

        let choice = round
            .outcome
            .option()
            .and_then(|s| s.parse::<SkeletonGateChoice>().ok());

        Ok(match choice {
            Some(choice) if round.outcome.is_consensus() => choice,
            _ => SkeletonGateChoice::Revise,
        })
    }

    /// Parse the `discoveries` field an orchestration-participating agent's
    /// JSON output carries and append each one to both `State.discoveries`
    /// and the context store,
    /// so later phases see what this agent reported without a bespoke
    /// per-agent parser. A result with no `discoveries` array, or a failed
    /// invocation, contributes nothing.
    async fn record_discoveries(&self, state: &Mutex<State>, phase: Phase, agent: &AgentDefinition, result: &AgentResult) {
        let texts = discoveries_from_result(result);
        if texts.is_empty() {
            return;
        }
        let timestamp = now_timestamp();
        let mut guard = state.lock().await;
        for text in texts {
            self.context_store.append(ContextEntry::new(
                "discovery",
                serde_json::json!({"text": text, "source_agent": agent.name, "phase": phase.as_str()}),
            ));
            guard.record_discovery(Discovery::new(text, agent.name.clone(), phase, timestamp.clone()));
        }
    }

    async fn persist(&self, state: &Mutex<State>) -> Result<(), RunEngineError> {
        let snapshot = state.lock().await.clone();
        self.state_store.save(&snapshot).await?;
        Ok(())
    }
}

/// Extract a human-readable blocker reason when a successful, schema-valid
/// agent response reports `status: "blocked"` or `status: "needs_input"`
/// rather than `"complete"`. Returns `None` for `COMPLETE` or for any
/// response that carries no `status` field at all (agent kinds like
/// `voter` don't use this status vocabulary).
fn blocked_reason(result: &conduct_domain::AgentResult) -> Option<String> {
    let data = result.data.as_ref()?;
    let status = data.get("status")?.as_str()?;
    if !status.eq_ignore_ascii_case("blocked") && !status.eq_ignore_ascii_case("needs_input") {
        return None;
    }
    let detail = data
        .get("blockers")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str())
                .collect::<Vec<_>>()
                .join("; ")
        })
        .filter(|s| !s.is_empty())
        .or_else(|| data.get("summary").and_then(|v| v.as_str()).map(str::to_string))
        .unwrap_or_else(|| format!("agent reported status={status}"));
    Some(detail)
}

fn discoveries_from_result(result: &conduct_domain::AgentResult) -> Vec<String> {
    let Some(data) = result.data.as_ref() else {
        return vec![];
    };
    data.get("discoveries")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

/// Timestamp stamped on each [`Discovery`], formatted as Unix seconds — the
/// same convention `run_engine`'s run-id timestamp uses, duplicated rather
/// than shared since the two live in sibling use cases with no common
/// "clock" port to put it behind.
fn now_timestamp() -> String {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
        .to_string()
}

fn issues_from_result(result: &conduct_domain::AgentResult) -> Vec<Issue> {
    let Some(data) = result.data.as_ref() else {
        return vec![];
    };
    data.get("issues")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| serde_json::from_value::<Issue>(v.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

fn build_skeleton_prompt(component: &ComponentDef, revise_hint: Option<&str>) -> String {
    let mut prompt = format!(
        "Produce a structural skeleton for component '{}': {}\nOwned files: {}\n",
        component.name,
        component.description,
        component.owns_files.join(", ")
    );
    if let Some(hint) = revise_hint {
        prompt.push_str(hint);
        prompt.push('\n');
    }
    prompt
}

fn build_implementation_prompt(component: &ComponentDef, approach_hint: Option<&str>, context: &str) -> String {
    let mut prompt = String::new();
    if !context.is_empty() {
        prompt.push_str(context);
        prompt.push_str("\n\n");
    }
    prompt.push_str(&format!(
        "Implement component '{}': {}\nOwned files: {}\n",
        component.name,
        component.description,
        component.owns_files.join(", ")
    ));
    if let Some(hint) = approach_hint {
        prompt.push_str(hint);
        prompt.push('\n');
    }
    prompt
}

fn build_validation_prompt(component: &ComponentDef, context: &str) -> String {
    let mut prompt = String::new();
    if !context.is_empty() {
        prompt.push_str(context);
        prompt.push_str("\n\n");
    }
    prompt.push_str(&format!(
        "Validate component '{}' against its owned files: {}",
        component.name,
        component.owns_files.join(", ")
    ));
    prompt
}

fn build_strategy_vote_prompt(component: &ComponentDef, state: &State) -> String {
    let history = state
        .component(&component.name)
        .map(|c| c.issue_history.join("; "))
        .unwrap_or_default();
    format!(
        "Component '{}' is stuck after repeated fix attempts. Recent issues: {}. \
         Choose one of: {}",
        component.name,
        history,
        FixStrategy::options().join(", ")
    )
}
