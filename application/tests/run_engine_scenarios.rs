//! End-to-end scenarios driving [`RunEngineUseCase`] against scripted
//! stub ports: trivial happy path, fix-loop convergence, a same-issue
//! strategy vote, and resume after an interrupted component loop.

use async_trait::async_trait;
use conduct_application::ports::state_store::{StateStoreError, StateStorePort};
use conduct_application::{
    AgentRoster, EngineConfig, NoProgress, RunEngineUseCase, RunEngineError,
};
use conduct_application::ports::agent_runner::AgentRunnerPort;
use conduct_application::ports::context_store::NoContextStore;
use conduct_domain::{AgentDefinition, AgentResult, ComponentDef, ComponentStatus, Manifest, RiskLevel, RunId, State};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::Arc;

/// Scripted agent runner: each role (`agent.name`) has its own queue of
/// canned responses, consumed in call order. A role whose queue runs dry
/// falls back to its last scripted response, so tests only need to
/// script as many entries as the scenario actually varies.
struct ScriptedRunner {
    scripts: Mutex<HashMap<String, VecDeque<AgentResult>>>,
    calls: Mutex<HashMap<String, u32>>,
}

impl ScriptedRunner {
    fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
        }
    }

    fn script(self, role: &str, responses: Vec<AgentResult>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(role.to_string(), responses.into_iter().collect());
        self
    }

    fn call_count(&self, role: &str) -> u32 {
        *self.calls.lock().unwrap().get(role).unwrap_or(&0)
    }
}

#[async_trait]
impl AgentRunnerPort for ScriptedRunner {
    async fn invoke(&self, agent: &AgentDefinition, _prompt: &str) -> AgentResult {
        *self.calls.lock().unwrap().entry(agent.name.clone()).or_insert(0) += 1;

        let mut scripts = self.scripts.lock().unwrap();
        let queue = scripts.entry(agent.name.clone()).or_default();
        if queue.len() > 1 {
            queue.pop_front().expect("checked len above")
        } else if let Some(last) = queue.front() {
            last.clone()
        } else {
            AgentResult::success(serde_json::json!({"status": "complete", "issues": []}), "")
        }
    }
}

/// In-memory state store keyed by run id, with `latest()` tracking
/// whichever run was saved most recently — mirrors
/// [`conduct_infrastructure::JsonFileStateStore`] without touching disk.
struct MemoryStateStore {
    runs: Mutex<HashMap<String, State>>,
    last: Mutex<Option<String>>,
}

impl MemoryStateStore {
    fn new() -> Self {
        Self {
            runs: Mutex::new(HashMap::new()),
            last: Mutex::new(None),
        }
    }

    fn seed(&self, state: State) {
        let id = state.run_id.as_str().to_string();
        self.runs.lock().unwrap().insert(id.clone(), state);
        *self.last.lock().unwrap() = Some(id);
    }
}

#[async_trait]
impl StateStorePort for MemoryStateStore {
    async fn save(&self, state: &State) -> Result<(), StateStoreError> {
        let id = state.run_id.as_str().to_string();
        self.runs.lock().unwrap().insert(id.clone(), state.clone());
        *self.last.lock().unwrap() = Some(id);
        Ok(())
    }

    async fn load(&self, run_id: &RunId) -> Result<State, StateStoreError> {
        self.runs
            .lock()
            .unwrap()
            .get(run_id.as_str())
            .cloned()
            .ok_or_else(|| StateStoreError::NotFound(run_id.as_str().to_string()))
    }

    async fn exists(&self, run_id: &RunId) -> bool {
        self.runs.lock().unwrap().contains_key(run_id.as_str())
    }

    async fn latest(&self) -> Result<State, StateStoreError> {
        let last = self.last.lock().unwrap().clone();
        match last {
            Some(id) => self.load(&RunId::new(id)).await,
            None => Err(StateStoreError::NotFound("<no runs>".to_string())),
        }
    }
}

fn solo_manifest() -> Manifest {
    Manifest::new(
        "demo",
        vec![ComponentDef::new("foo", "a single file component").with_owns_files(["src/foo.py"])],
    )
    .with_risk_level(RiskLevel::Low)
}

fn roster() -> AgentRoster {
    let mut roster = AgentRoster::new();
    for role in ["implementation_executor", "validator", "voter", "fix_executor", "test_runner"] {
        roster.register(role, AgentDefinition::new(role, "stub-model", "template", "schema"));
    }
    roster
}

fn complete(fields: serde_json::Value) -> AgentResult {
    AgentResult::success(fields, "")
}

fn passing_validation() -> AgentResult {
    complete(serde_json::json!({"status": "pass", "issues": []}))
}

fn failing_validation(description: &str) -> AgentResult {
    complete(serde_json::json!({
        "status": "fail",
        "issues": [{
            "severity": "critical",
            "file": "src/foo.py",
            "line": 10,
            "description": description,
            "evidence": "",
            "suggested_fix": "",
            "category": "type_error",
        }],
    }))
}

fn approve_vote() -> AgentResult {
    complete(serde_json::json!({"option": "approve", "reasoning": "looks fine"}))
}

/// S1 — trivial happy path: one component, no deps, low risk, quick mode.
/// Implementation succeeds, validator reports no issues; the run should
/// reach `Completion` with the component `Validated`.
#[tokio::test]
async fn s1_trivial_happy_path_completes() {
    let manifest = solo_manifest();
    let runner = Arc::new(
        ScriptedRunner::new()
            .script("implementation_executor", vec![complete(serde_json::json!({"status": "complete"}))])
            .script("validator", vec![passing_validation()])
            .script("voter", vec![approve_vote(), approve_vote(), approve_vote()]),
    );
    let state_store = Arc::new(MemoryStateStore::new());
    let engine = RunEngineUseCase::new(
        runner,
        state_store,
        Arc::new(NoContextStore),
        Arc::new(NoProgress),
        EngineConfig::default(),
    );

    let state = engine.run(&manifest, &roster(), false).await.expect("run succeeds");

    assert!(state.all_validated());
    let foo = state.component(&"foo".into()).unwrap();
    assert_eq!(foo.status, ComponentStatus::Validated);
    assert_eq!(foo.fix_attempts, 0);
}

/// S2 — fix loop converges: the validator flags one issue on the first
/// pass, then nothing on the second, after the fix-executor's change.
#[tokio::test]
async fn s2_fix_loop_converges() {
    let manifest = solo_manifest();
    let runner = Arc::new(
        ScriptedRunner::new()
            .script(
                "implementation_executor",
                vec![
                    complete(serde_json::json!({"status": "complete"})),
                    complete(serde_json::json!({"status": "complete"})),
                ],
            )
            .script("validator", vec![failing_validation("off by one"), passing_validation()])
            .script("voter", vec![approve_vote(), approve_vote(), approve_vote()]),
    );
    let state_store = Arc::new(MemoryStateStore::new());
    let engine = RunEngineUseCase::new(
        runner.clone(),
        state_store,
        Arc::new(NoContextStore),
        Arc::new(NoProgress),
        EngineConfig::default(),
    );

    let state = engine.run(&manifest, &roster(), false).await.expect("run succeeds");

    let foo = state.component(&"foo".into()).unwrap();
    assert_eq!(foo.status, ComponentStatus::Validated);
    assert_eq!(foo.fix_attempts, 1);
    assert_eq!(runner.call_count("validator"), 2);
}

/// S3 — same issue survives repeated fix attempts: the strategy vote
/// fires and, on `try_different_approach`, the loop keeps going with an
/// approach hint rather than failing the component outright.
#[tokio::test]
async fn s3_same_issue_triggers_strategy_vote() {
    let manifest = solo_manifest();
    let config = EngineConfig::default().with_max_fix_attempts(5);
    let same_issue = "off by one error in handler";
    let runner = Arc::new(
        ScriptedRunner::new()
            .script(
                "implementation_executor",
                vec![
                    complete(serde_json::json!({"status": "complete"})),
                    complete(serde_json::json!({"status": "complete"})),
                    complete(serde_json::json!({"status": "complete"})),
                ],
            )
            .script(
                "validator",
                vec![
                    failing_validation(same_issue),
                    failing_validation(same_issue),
                    failing_validation(same_issue),
                    passing_validation(),
                ],
            )
            .script(
                "voter",
                vec![
                    complete(serde_json::json!({"option": "try_different_approach", "reasoning": "stuck"})),
                    complete(serde_json::json!({"option": "try_different_approach", "reasoning": "stuck"})),
                    complete(serde_json::json!({"option": "retry_same_fix", "reasoning": "close"})),
                    approve_vote(),
                    approve_vote(),
                    approve_vote(),
                ],
            ),
    );
    let state_store = Arc::new(MemoryStateStore::new());
    let engine = RunEngineUseCase::new(
        runner,
        state_store,
        Arc::new(NoContextStore),
        Arc::new(NoProgress),
        config,
    );

    let state = engine.run(&manifest, &roster(), false).await.expect("run survives the strategy vote");

    let foo = state.component(&"foo".into()).unwrap();
    assert_eq!(foo.status, ComponentStatus::Validated);
}

/// S6 — resume after a crash mid-`component_loop`: a state store seeded
/// with one component already `Validated` and a second still `Pending`
/// should only invoke agents for the remaining work when the engine is
/// asked to resume.
#[tokio::test]
async fn s6_resume_only_drives_unfinished_components() {
    let manifest = Manifest::new(
        "demo",
        vec![
            ComponentDef::new("core", "core module").with_owns_files(["src/core.py"]),
            ComponentDef::new("auth", "auth module")
                .with_owns_files(["src/auth.py"])
                .with_depends_on(["core"]),
        ],
    )
    .with_risk_level(RiskLevel::Low);

    let state_store = Arc::new(MemoryStateStore::new());
    let mut seeded = State::new(
        RunId::new("demo-seed"),
        "demo",
        vec!["core".into(), "auth".into()],
    );
    seeded.current_phase = conduct_domain::Phase::ComponentLoop;
    seeded.component_mut(&"core".into()).unwrap().mark_validated();
    state_store.seed(seeded);

    let runner = Arc::new(
        ScriptedRunner::new()
            .script("implementation_executor", vec![complete(serde_json::json!({"status": "complete"}))])
            .script("validator", vec![passing_validation()])
            .script("voter", vec![approve_vote(), approve_vote(), approve_vote()]),
    );
    let engine = RunEngineUseCase::new(
        runner.clone(),
        state_store,
        Arc::new(NoContextStore),
        Arc::new(NoProgress),
        EngineConfig::default(),
    );

    let state = engine.run(&manifest, &roster(), true).await.expect("resumed run succeeds");

    assert!(state.all_validated());
    // Only "auth" needed driving through the loop; "core" was already done.
    assert_eq!(runner.call_count("implementation_executor"), 1);
}

/// A manifest whose risk level doesn't require a production gate skips
/// that vote entirely: `final_validation` still votes (scaled to a single
/// low-risk voter), but `production_gate` contributes no further calls.
#[tokio::test]
async fn low_risk_manifest_skips_production_gate() {
    let manifest = solo_manifest();
    let runner = Arc::new(
        ScriptedRunner::new()
            .script("implementation_executor", vec![complete(serde_json::json!({"status": "complete"}))])
            .script("validator", vec![passing_validation()])
            .script("voter", vec![approve_vote()]),
    );
    let state_store = Arc::new(MemoryStateStore::new());
    let engine = RunEngineUseCase::new(
        runner.clone(),
        state_store,
        Arc::new(NoContextStore),
        Arc::new(NoProgress),
        EngineConfig::default(),
    );

    let result = engine.run(&manifest, &roster(), false).await;
    assert!(result.is_ok(), "expected low-risk run to complete, got {result:?}");
    // Low risk => 1 voter for final_validation, 0 for the skipped production gate.
    assert_eq!(runner.call_count("voter"), 1);
}

/// An implementer that reports `status: blocked` should route to the
/// strategy vote rather than straight to validation; on
/// `try_different_approach` it gets another attempt with an approach hint
/// and eventually completes once it reports done.
#[tokio::test]
async fn blocked_implementer_routes_to_strategy_vote_and_recovers() {
    let manifest = solo_manifest();
    let config = EngineConfig::default().with_max_fix_attempts(5);
    let runner = Arc::new(
        ScriptedRunner::new()
            .script(
                "implementation_executor",
                vec![
                    complete(serde_json::json!({
                        "status": "blocked",
                        "files_changed": [],
                        "summary": "missing credentials to continue",
                        "blockers": ["needs an API key for the payment provider"],
                    })),
                    complete(serde_json::json!({"status": "complete", "files_changed": ["src/foo.py"], "summary": "done"})),
                ],
            )
            .script("validator", vec![passing_validation()])
            .script(
                // Low risk under the default Standard mode scales to a
                // single voter per gate (`RiskLevel::base_validator_count`),
                // so each gate below consumes exactly one scripted ballot:
                // the fix-strategy round first, then `final_validation`'s
                // gate vote.
                "voter",
                vec![
                    complete(serde_json::json!({"option": "try_different_approach", "reasoning": "work around it"})),
                    approve_vote(),
                ],
            ),
    );
    let state_store = Arc::new(MemoryStateStore::new());
    let engine = RunEngineUseCase::new(
        runner,
        state_store,
        Arc::new(NoContextStore),
        Arc::new(NoProgress),
        config,
    );

    let state = engine.run(&manifest, &roster(), false).await.expect("run recovers from the blocker");

    let foo = state.component(&"foo".into()).unwrap();
    assert_eq!(foo.status, ComponentStatus::Validated);
    assert_eq!(foo.blockers.len(), 1);
    assert!(foo.blockers[0].contains("API key"));
}

/// S4 — voting no-quorum pauses the engine: a high-risk manifest routes
/// `production_gate` through 3 voters, 2 of which return malformed
/// ballots (missing the `option` field). Too few ballots parsed to reach
/// even the no-quorum floor, so the run surfaces `VotingNoQuorum` rather
/// than treating the one well-formed ballot as a landslide.
#[tokio::test]
async fn s4_voting_no_quorum_pauses_the_run() {
    let manifest = Manifest::new(
        "demo",
        vec![ComponentDef::new("foo", "a single file component").with_owns_files(["src/foo.py"])],
    )
    .with_risk_level(RiskLevel::High);

    let malformed = complete(serde_json::json!({"reasoning": "no option field here"}));
    let runner = Arc::new(
        ScriptedRunner::new()
            .script("implementation_executor", vec![complete(serde_json::json!({"status": "complete"}))])
            .script("validator", vec![passing_validation()])
            .script(
                "voter",
                vec![
                    approve_vote(),
                    approve_vote(),
                    approve_vote(),
                    malformed.clone(),
                    malformed,
                    approve_vote(),
                ],
            ),
    );
    let state_store = Arc::new(MemoryStateStore::new());
    let engine = RunEngineUseCase::new(
        runner,
        Arc::clone(&state_store),
        Arc::new(NoContextStore),
        Arc::new(NoProgress),
        EngineConfig::default(),
    );

    let result = engine.run(&manifest, &roster(), false).await;

    assert!(matches!(result, Err(RunEngineError::VotingNoQuorum { .. })), "expected a no-quorum error, got {result:?}");

    let persisted = state_store.latest().await.expect("engine persists state before returning the error");
    assert_eq!(persisted.phase_status, conduct_domain::PhaseStatus::Failed);
    assert!(
        persisted.voting_results.iter().any(|v| v.gate_name == "production_gate" && v.outcome == "no_quorum"),
        "expected a no_quorum production_gate vote recorded, got {:?}",
        persisted.voting_results
    );
}

/// `integration_validation` invokes the `test_runner` role with the
/// manifest's `validation_command` and gates the run on its report.
#[tokio::test]
async fn integration_validation_runs_the_test_command_and_gates_on_it() {
    let manifest = solo_manifest().with_validation_command("cargo test --workspace");
    let runner = Arc::new(
        ScriptedRunner::new()
            .script("implementation_executor", vec![complete(serde_json::json!({"status": "complete"}))])
            .script("validator", vec![passing_validation()])
            .script("test_runner", vec![complete(serde_json::json!({"status": "complete", "passed": 12, "failed": 0}))])
            .script("voter", vec![approve_vote()]),
    );
    let state_store = Arc::new(MemoryStateStore::new());
    let engine = RunEngineUseCase::new(
        runner.clone(),
        state_store,
        Arc::new(NoContextStore),
        Arc::new(NoProgress),
        EngineConfig::default(),
    );

    let result = engine.run(&manifest, &roster(), false).await;
    assert!(result.is_ok(), "expected the run to complete, got {result:?}");
    assert_eq!(runner.call_count("test_runner"), 1);
}

/// A `test_runner` report with failing tests stops the run before
/// `final_validation` ever votes.
#[tokio::test]
async fn integration_validation_failure_blocks_the_run() {
    let manifest = solo_manifest().with_validation_command("cargo test --workspace");
    let runner = Arc::new(
        ScriptedRunner::new()
            .script("implementation_executor", vec![complete(serde_json::json!({"status": "complete"}))])
            .script("validator", vec![passing_validation()])
            .script(
                "test_runner",
                vec![complete(serde_json::json!({"status": "complete", "passed": 10, "failed": 2, "summary": "2 tests failed"}))],
            ),
    );
    let state_store = Arc::new(MemoryStateStore::new());
    let engine = RunEngineUseCase::new(
        runner.clone(),
        Arc::clone(&state_store),
        Arc::new(NoContextStore),
        Arc::new(NoProgress),
        EngineConfig::default(),
    );

    let result = engine.run(&manifest, &roster(), false).await;
    assert!(
        matches!(result, Err(RunEngineError::IntegrationValidationFailed { .. })),
        "expected an integration-validation failure, got {result:?}"
    );
    // final_validation's gate vote never runs once integration validation fails.
    assert_eq!(runner.call_count("voter"), 0);

    let persisted = state_store.latest().await.expect("engine persists state before returning the error");
    assert_eq!(persisted.phase_status, conduct_domain::PhaseStatus::Failed);
    assert_eq!(persisted.current_phase, conduct_domain::Phase::IntegrationValidation);
}

#[allow(dead_code)]
fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn run_engine_error_display_is_non_empty() {
    let err = RunEngineError::VotingNoQuorum { gate: "production_gate".to_string() };
    assert!(!err.to_string().is_empty());
}
