//! The top-level driver: validates a manifest, then walks it through every
//! [`Phase`] from `ParseSpec` to `Completion`.
//!
//! Split into one method per phase: each phase method owns its slice of
//! the run and reports back through [`EngineProgressPort`] rather than the
//! caller polling state.

use crate::config::EngineConfig;
use crate::error::RunEngineError;
use crate::ports::agent_runner::AgentRunnerPort;
use crate::ports::context_store::ContextStorePort;
use crate::ports::progress::EngineProgressPort;
use crate::ports::state_store::StateStorePort;
use crate::use_cases::validation_loop::{ComponentAgents, ValidationLoopUseCase};
use crate::use_cases::voting_gate::VotingGateUseCase;
use conduct_domain::manifest::validate_manifest;
use conduct_domain::orchestration::{ProductionGateChoice, SkeletonGateChoice};
use conduct_domain::{AgentDefinition, ComponentId, ComponentStatus, Manifest, Phase, PhaseStatus, RunId, State};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Named agent definitions a run is configured with, keyed by role (the
/// same names used by the schema registry: `"skeleton_builder"`,
/// `"implementation_executor"`, `"validator"`, `"voter"`, and so on). The
/// engine never hardcodes which roles exist — it looks up whatever the
/// caller registered and fails loudly if a phase needs a role that is
/// missing.
#[derive(Default, Clone)]
pub struct AgentRoster {
    agents: HashMap<String, AgentDefinition>,
}

impl AgentRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, role: impl Into<String>, definition: AgentDefinition) {
        self.agents.insert(role.into(), definition);
    }

    pub fn get(&self, role: &str) -> Result<&AgentDefinition, RunEngineError> {
        self.agents
            .get(role)
            .ok_or_else(|| conduct_domain::EngineError::UnknownAgent(role.to_string()).into())
    }
}

pub struct RunEngineUseCase {
    runner: Arc<dyn AgentRunnerPort>,
    state_store: Arc<dyn StateStorePort>,
    context_store: Arc<dyn ContextStorePort>,
    progress: Arc<dyn EngineProgressPort>,
    config: EngineConfig,
    /// Caps the number of agent invocations in flight at once across every
    /// fan-out point (voting-gate voters, parallel validators, parallel
    /// components) — a single configured concurrency bound, shared rather
    /// than reallocated per use case.
    concurrency: Arc<Semaphore>,
}

impl RunEngineUseCase {
    pub fn new(
        runner: Arc<dyn AgentRunnerPort>,
        state_store: Arc<dyn StateStorePort>,
        context_store: Arc<dyn ContextStorePort>,
        progress: Arc<dyn EngineProgressPort>,
        config: EngineConfig,
    ) -> Self {
        let concurrency = Arc::new(Semaphore::new(config.max_concurrent_agents.max(1)));
        Self {
            runner,
            state_store,
            context_store,
            progress,
            config,
            concurrency,
        }
    }

    /// Run `manifest` to completion (or to the first component that fails
    /// validation terminally). Returns the final [`State`].
    ///
    /// When `resume` is true, the most recently saved state for this
    /// manifest is loaded and the run continues from its `current_phase`
    /// and per-component statuses instead of starting over — this is what
    /// backs both the `resume` CLI command and a plain `run` that isn't
    /// given `--fresh`: if no saved state exists, a freshly initialized
    /// state is returned instead. A result whose agent invocation finished
    /// but was never persisted is conservatively treated as lost and
    /// re-invoked (see DESIGN.md Open Question 2).
    pub async fn run(&self, manifest: &Manifest, roster: &AgentRoster, resume: bool) -> Result<State, RunEngineError> {
        validate_manifest(manifest)?;

        let mut state = if resume {
            match self.state_store.latest().await {
                Ok(found) if found.manifest_name == manifest.name => {
                    info!(run_id = %found.run_id, phase = %found.current_phase, "resuming existing run");
                    self.reconcile_with_manifest(found, manifest)
                }
                _ => self.fresh_state(manifest),
            }
        } else {
            self.fresh_state(manifest)
        };
        self.state_store.save(&state).await?;

        let dependency_map: HashMap<ComponentId, Vec<ComponentId>> = manifest
            .components
            .iter()
            .map(|c| (c.name.clone(), c.depends_on.clone()))
            .collect();

        let mut phase = state.current_phase;
        loop {
            state.current_phase = phase;
            state.phase_status = PhaseStatus::Running;
            self.state_store.save(&state).await?;
            self.progress.on_phase_start(phase);

            let phase_result: Result<(), RunEngineError> = match phase {
                Phase::ParseSpec | Phase::ImpactAnalysis => Ok(()),
                Phase::ComponentLoop => self.phase_component_loop(manifest, &mut state, roster, &dependency_map).await,
                Phase::IntegrationValidation => self.phase_integration_validation(manifest, roster).await,
                Phase::FinalValidation => self.phase_gate_vote(manifest, &mut state, roster, phase, "voter").await,
                Phase::ProductionGate => self.phase_production_gate(manifest, &mut state, roster).await,
                Phase::Completion => Ok(()),
            };

            if let Err(err) = phase_result {
                state.phase_status = PhaseStatus::Failed;
                self.state_store.save(&state).await?;
                return Err(err);
            }

            state.phase_status = PhaseStatus::Completed;
            self.state_store.save(&state).await?;
            self.progress.on_phase_complete(phase);

            if phase == Phase::Completion {
                break;
            }
            phase = phase.next().expect("Completion handled above");
        }

        Ok(state)
    }

    /// Run every dependency-ready batch of components until all reach a
    /// terminal status. A batch never contains two components with an edge
    /// between them (that's what "ready" means), so every component in it
    /// is spawned concurrently onto a shared, mutex-guarded `State`; how
    /// much of the batch actually overlaps in time is capped by the mode's
    /// [`conduct_domain::orchestration::ParallelismPolicy`] (full mode
    /// narrows every batch down to one component at a time). Every
    /// dependent component still waits for the full prior batch to finish
    /// and persist before it can become ready — the happens-before
    /// guarantee applies across batches, not within one.
    async fn phase_component_loop(
        &self,
        manifest: &Manifest,
        state: &mut State,
        roster: &AgentRoster,
        dependency_map: &HashMap<ComponentId, Vec<ComponentId>>,
    ) -> Result<(), RunEngineError> {
        let implementer = roster.get("implementation_executor")?.clone();
        let validator = roster.get("validator")?.clone();
        let strategy_voter = roster.get("voter")?.clone();
        let profile = self.config.mode.profile();

        loop {
            let mut ready: Vec<ComponentId> = state
                .pending_with_satisfied_deps(dependency_map)
                .into_iter()
                .cloned()
                .collect();
            ready.sort();

            if ready.is_empty() {
                break;
            }

            let batch_size = profile.parallelism.batch_size(ready.len());
            ready.truncate(batch_size);

            let shared_state = Arc::new(Mutex::new(state.clone()));
            let mut join_set = JoinSet::new();

            for component_id in ready {
                let component = manifest
                    .component(&component_id)
                    .ok_or_else(|| conduct_domain::EngineError::UnknownComponent(component_id.to_string()))?
                    .clone();

                let validation_loop = ValidationLoopUseCase::new(
                    Arc::clone(&self.runner),
                    Arc::clone(&self.state_store),
                    Arc::clone(&self.context_store),
                    Arc::clone(&self.progress),
                    Arc::clone(&self.concurrency),
                );
                let implementer = implementer.clone();
                let validator = validator.clone();
                let strategy_voter = strategy_voter.clone();
                let validator_count = profile.validator_count(component.risk);
                let gating_severities = profile.final_fix_severities;
                let max_fix_attempts = self.config.max_fix_attempts;
                let same_issue_threshold = self.config.same_issue_threshold;
                let voting_rule = self.config.voting_rule;
                let shared_state = Arc::clone(&shared_state);

                // Only resolved (and required) when this component's risk
                // actually triggers the mode's skeleton review policy, so a
                // manifest that never needs skeleton review never forces a
                // `skeleton_builder` role to be registered.
                let skeleton_builder = if profile.skeleton_review.applies_to(component.risk) {
                    Some(roster.get("skeleton_builder")?.clone())
                } else {
                    None
                };
                let skeleton_review = profile.skeleton_review;

                join_set.spawn(async move {
                    let agents = ComponentAgents {
                        implementer: &implementer,
                        validator: &validator,
                        strategy_voter: &strategy_voter,
                        validator_count,
                        gating_severities,
                        skeleton_builder: skeleton_builder.as_ref(),
                        skeleton_review,
                        voting_rule,
                    };
                    let status = validation_loop
                        .run(
                            &component,
                            &shared_state,
                            &agents,
                            max_fix_attempts,
                            same_issue_threshold,
                            voting_rule,
                        )
                        .await;
                    (component_id, status)
                });
            }

            let mut failures = Vec::new();
            while let Some(joined) = join_set.join_next().await {
                match joined {
                    Ok((component_id, Ok(status))) => {
                        if status == ComponentStatus::Failed {
                            failures.push(component_id);
                        }
                    }
                    Ok((component_id, Err(err))) => {
                        warn!(component = %component_id, error = %err, "component task returned an error");
                        return Err(err);
                    }
                    Err(join_err) => warn!(%join_err, "component task panicked"),
                }
            }

            *state = Arc::try_unwrap(shared_state)
                .expect("every component task in this batch has joined")
                .into_inner();
            self.state_store.save(state).await?;

            if let Some(component_id) = failures.into_iter().next()
                && !profile.allow_backtrack
            {
                warn!(component = %component_id, "component failed with backtracking disabled, aborting run");
                return Err(RunEngineError::ValidationFailed {
                    component: component_id.to_string(),
                    attempts: self.config.max_fix_attempts,
                });
            }
        }

        if !state.all_terminal() {
            warn!("component loop ended with unreachable components (unsatisfiable dependencies on failed components)");
        }

        Ok(())
    }

    /// Runs the manifest's test suite via the `test_runner` role (spec
    /// §4.7 step 4). `Manifest::validation_command` is opaque to the
    /// engine — it's injected into the prompt verbatim and the agent is
    /// trusted to run it and report back `{status, passed, failed}`. A
    /// failed invocation, a non-`complete` status, or any reported
    /// failures gates the run here rather than letting it proceed to
    /// `final_validation`.
    async fn phase_integration_validation(&self, manifest: &Manifest, roster: &AgentRoster) -> Result<(), RunEngineError> {
        let test_runner = roster.get("test_runner")?;
        let prompt = format!(
            "Run the project's test suite with this validation command and report pass/fail counts: `{}`",
            manifest.validation_command
        );

        let result = self.runner.invoke(test_runner, &prompt).await;
        if !result.success {
            warn!(error = ?result.error, "test runner invocation failed");
            return Err(RunEngineError::IntegrationValidationFailed {
                summary: format!("test runner invocation failed: {:?}", result.error),
            });
        }

        let data = result.data.as_ref();
        let status = data.and_then(|d| d.get("status")).and_then(|v| v.as_str()).unwrap_or_default();
        let failed = data.and_then(|d| d.get("failed")).and_then(|v| v.as_u64()).unwrap_or(0);

        if status != "complete" || failed > 0 {
            let summary = data
                .and_then(|d| d.get("summary"))
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| format!("test runner reported status={status}, failed={failed}"));
            warn!(status, failed, "integration validation failed");
            return Err(RunEngineError::IntegrationValidationFailed { summary });
        }

        info!(failed, "integration validation passed");
        Ok(())
    }

    /// A voting gate that must reach consensus before the run proceeds
    /// (final validation gates this way).
    async fn phase_gate_vote(
        &self,
        manifest: &Manifest,
        state: &mut State,
        roster: &AgentRoster,
        phase: Phase,
        voter_role: &str,
    ) -> Result<(), RunEngineError> {
        if !phase.requires_voting_gate() {
            return Ok(());
        }

        let voter = roster.get(voter_role)?;
        let gate = VotingGateUseCase::new(Arc::clone(&self.runner), Arc::clone(&self.concurrency));
        let prompt = format!("Review the run for the '{}' gate and vote approve or revise.", phase.display_name());
        let voter_count = self.config.mode.profile().validator_count(manifest.risk_level);

        let round = gate
            .run(phase.as_str(), voter, &prompt, voter_count, self.config.voting_rule)
            .await?;
        state.record_vote(round.record);
        self.state_store.save(state).await?;

        let choice = round
            .outcome
            .option()
            .and_then(|s| s.parse::<SkeletonGateChoice>().ok());

        if matches!(choice, Some(SkeletonGateChoice::Revise)) || !round.outcome.is_consensus() {
            return Err(RunEngineError::VotingNoQuorum {
                gate: phase.as_str().to_string(),
            });
        }

        Ok(())
    }

    /// Only high/critical-risk manifests pass through this gate;
    /// lower-risk runs complete without a production-readiness vote.
    async fn phase_production_gate(
        &self,
        manifest: &Manifest,
        state: &mut State,
        roster: &AgentRoster,
    ) -> Result<(), RunEngineError> {
        if !manifest.risk_level.requires_voting_gate() {
            info!(risk = %manifest.risk_level, "skipping production gate for non-high-risk manifest");
            return Ok(());
        }

        let voter = roster.get("voter")?;
        let gate = VotingGateUseCase::new(Arc::clone(&self.runner), Arc::clone(&self.concurrency));
        let prompt = "Review the completed run for production readiness. Vote ship or block_on_findings.";
        let voter_count = self.config.mode.profile().validator_count(manifest.risk_level);

        let round = gate
            .run("production_gate", voter, prompt, voter_count, self.config.voting_rule)
            .await?;
        state.record_vote(round.record);
        self.state_store.save(state).await?;

        let choice = round
            .outcome
            .option()
            .and_then(|s| s.parse::<ProductionGateChoice>().ok())
            .unwrap_or(ProductionGateChoice::BlockOnFindings);

        info!(?choice, "production gate decided");

        if choice == ProductionGateChoice::BlockOnFindings {
            return Err(RunEngineError::VotingNoQuorum {
                gate: "production_gate".to_string(),
            });
        }

        Ok(())
    }

    fn fresh_state(&self, manifest: &Manifest) -> State {
        let run_id = RunId::derive(&manifest.name, &run_timestamp());
        State::new(run_id, manifest.name.clone(), manifest.component_ids().cloned().collect())
    }

    /// Reconcile a loaded state against the manifest it's about to resume
    /// against: components the manifest added since the state was last
    /// saved start out `Pending`; components the state has that the
    /// manifest no longer lists are dropped (the manifest, not a stale
    /// state file, is the authority on what components exist).
    fn reconcile_with_manifest(&self, mut state: State, manifest: &Manifest) -> State {
        for id in manifest.component_ids() {
            state.components.entry(id.clone()).or_default();
        }
        let known: std::collections::HashSet<_> = manifest.component_ids().collect();
        state.components.retain(|id, _| known.contains(id));
        state
    }
}

/// Timestamp used to derive a fresh run id, formatted as Unix seconds.
/// Kept as a thin seam rather than threading a clock through every caller
/// — see [`RunId::derive`] for why domain code never reads the clock
/// itself.
fn run_timestamp() -> String {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
        .to_string()
}
