//! The voting-gate use case: fan out a voter agent N times, collect
//! [`Ballot`]s, and tally them against the configured [`QuorumRule`].
//!
//! The fan-out spawns one task per participant into a `JoinSet`, drains it
//! to completion, then reconciles. There is no streaming channel to drain
//! here (ballots are single JSON objects, not incremental text), so the
//! loop is a plain `join_next` drain.

use crate::error::RunEngineError;
use crate::ports::agent_runner::AgentRunnerPort;
use conduct_domain::voting::{Ballot, QuorumRule, Tally, VoteOutcome, VoteRecord};
use conduct_domain::{AgentDefinition, AgentResult};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Everything one voting-gate round produced: the reconciled outcome the
/// caller acts on, and the [`VoteRecord`] it should append to
/// [`conduct_domain::State::voting_results`] for audit.
pub struct VoteRound {
    pub outcome: VoteOutcome,
    pub record: VoteRecord,
}

/// One round of voting: the same agent definition invoked `voter_count`
/// times (each a fresh subprocess) with the same prompt, each expected to
/// return `{"option": ..., "reasoning": ...}`.
///
/// Fan-out is bounded by a shared [`Semaphore`] sized from
/// `EngineConfig::max_concurrent_agents` — voting-gate voters are one of
/// the engine's three points of fan-out, and all of them share the same
/// concurrency cap.
pub struct VotingGateUseCase {
    runner: Arc<dyn AgentRunnerPort>,
    concurrency: Arc<Semaphore>,
}

impl VotingGateUseCase {
    pub fn new(runner: Arc<dyn AgentRunnerPort>, concurrency: Arc<Semaphore>) -> Self {
        Self { runner, concurrency }
    }

    pub async fn run(
        &self,
        gate_name: &str,
        voter: &AgentDefinition,
        prompt: &str,
        voter_count: usize,
        rule: QuorumRule,
    ) -> Result<VoteRound, RunEngineError> {
        info!(gate = gate_name, voter_count, "starting voting gate");

        let mut join_set = JoinSet::new();
        for i in 0..voter_count {
            let runner = Arc::clone(&self.runner);
            let concurrency = Arc::clone(&self.concurrency);
            let voter = voter.clone();
            let prompt = prompt.to_string();
            let voter_name = format!("{}-{}", voter.name, i + 1);
            join_set.spawn(async move {
                let _permit = concurrency.acquire_owned().await.expect("semaphore never closed");
                let result = runner.invoke(&voter, &prompt).await;
                (voter_name, result)
            });
        }

        let mut ballots = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((voter_name, result)) => match ballot_from_result(&voter_name, &result) {
                    Ok(ballot) => ballots.push(ballot),
                    Err(reason) => warn!(voter = %voter_name, %reason, "dropping unparsable ballot"),
                },
                Err(join_err) => warn!(%join_err, "voter task panicked"),
            }
        }

        let tally = Tally::from_ballots(ballots);
        let outcome = VoteOutcome::from_tally(tally.clone(), rule, voter_count);

        if outcome.is_split() {
            warn!(gate = gate_name, "voting gate split, no option reached quorum");
        } else if outcome.is_no_quorum() {
            warn!(gate = gate_name, "voting gate did not reach quorum (too few parseable ballots)");
        }

        let record = VoteRecord::new(gate_name, &tally, &outcome);
        Ok(VoteRound { outcome, record })
    }
}

fn ballot_from_result(voter_name: &str, result: &AgentResult) -> Result<Ballot, String> {
    if !result.success {
        return Err(format!("agent invocation did not succeed: {:?}", result.error));
    }
    let data = result.data.as_ref().ok_or("missing result data")?;
    let option = data
        .get("option")
        .and_then(|v| v.as_str())
        .ok_or("missing 'option' field")?;
    let reasoning = data
        .get("reasoning")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    Ok(Ballot::new(voter_name, option, reasoning))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ballot_from_result_requires_option_field() {
        let result = AgentResult::success(serde_json::json!({"reasoning": "no option here"}), "");
        assert!(ballot_from_result("v1", &result).is_err());
    }

    #[test]
    fn ballot_from_result_parses_well_formed_output() {
        let result = AgentResult::success(
            serde_json::json!({"option": "retry_same_fix", "reasoning": "close"}),
            "",
        );
        let ballot = ballot_from_result("v1", &result).unwrap();
        assert_eq!(ballot.option, "retry_same_fix");
        assert_eq!(ballot.reasoning, "close");
    }

    #[test]
    fn ballot_from_result_rejects_failed_invocation() {
        let result = AgentResult::failure(
            conduct_domain::AgentOutcomeError::Timeout("voter".to_string()),
            "",
        );
        assert!(ballot_from_result("v1", &result).is_err());
    }
}
