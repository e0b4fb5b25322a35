//! The result of tallying a voting-gate round against a [`QuorumRule`].

use crate::voting::rule::QuorumRule;
use crate::voting::vote::Tally;
use serde::{Deserialize, Serialize};

/// Outcome of reconciling a [`Tally`] against a [`QuorumRule`].
///
/// Three-way: `consensus` when some option reaches the rule's threshold,
/// `split` when enough voters returned a parseable ballot but no option
/// reached it, and `no_quorum` when too few voters did. The threshold and
/// the no-quorum floor are both computed from the
/// *configured* voter count, not from how many ballots happened to parse —
/// three voters where only one returns valid JSON is `no_quorum`, not a
/// one-ballot landslide.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum VoteOutcome {
    /// `option` reached the quorum rule with this many of `total` votes.
    Consensus { option: String, votes: usize, total: usize },
    /// Enough voters returned parseable ballots, but no option reached
    /// the quorum rule.
    Split { tally: Tally },
    /// Fewer than `ceil(voter_count / 2)` voters produced a parseable
    /// ballot at all.
    NoQuorum { tally: Tally },
}

impl VoteOutcome {
    /// `voter_count` is the number of voters the gate *intended* to spawn,
    /// which may exceed `tally.total` when some invocations failed or
    /// returned unparsable output.
    pub fn from_tally(tally: Tally, rule: QuorumRule, voter_count: usize) -> Self {
        let quorum_floor = voter_count.div_ceil(2);
        if tally.total < quorum_floor {
            return VoteOutcome::NoQuorum { tally };
        }

        match tally.leader() {
            Some((option, count)) if rule.is_satisfied(count, voter_count) => VoteOutcome::Consensus {
                option: option.to_string(),
                votes: count,
                total: tally.total,
            },
            _ => VoteOutcome::Split { tally },
        }
    }

    pub fn is_consensus(&self) -> bool {
        matches!(self, VoteOutcome::Consensus { .. })
    }

    pub fn is_split(&self) -> bool {
        matches!(self, VoteOutcome::Split { .. })
    }

    pub fn is_no_quorum(&self) -> bool {
        matches!(self, VoteOutcome::NoQuorum { .. })
    }

    pub fn option(&self) -> Option<&str> {
        match self {
            VoteOutcome::Consensus { option, .. } => Some(option),
            VoteOutcome::Split { .. } | VoteOutcome::NoQuorum { .. } => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            VoteOutcome::Consensus { .. } => "consensus",
            VoteOutcome::Split { .. } => "split",
            VoteOutcome::NoQuorum { .. } => "no_quorum",
        }
    }
}

/// A voting-gate round recorded to [`crate::state::State::voting_results`]:
/// the gate's name, every voter's raw ballot, and the reconciled outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteRecord {
    pub gate_name: String,
    /// `(voter name, chosen option, reasoning)` per ballot actually cast.
    pub voters: Vec<(String, String, String)>,
    /// `"consensus"`, `"split"`, or `"no_quorum"`.
    pub outcome: String,
    pub chosen: Option<String>,
}

impl VoteRecord {
    pub fn new(gate_name: impl Into<String>, tally: &Tally, outcome: &VoteOutcome) -> Self {
        let voters = tally
            .ballots
            .iter()
            .map(|b| (b.voter.clone(), b.option.clone(), b.reasoning.clone()))
            .collect();
        Self {
            gate_name: gate_name.into(),
            voters,
            outcome: outcome.label().to_string(),
            chosen: outcome.option().map(String::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voting::vote::Ballot;

    #[test]
    fn consensus_when_rule_satisfied() {
        let tally = Tally::from_ballots(vec![
            Ballot::new("v1", "retry_same_fix", ""),
            Ballot::new("v2", "retry_same_fix", ""),
            Ballot::new("v3", "escalate_to_user", ""),
        ]);
        let outcome = VoteOutcome::from_tally(tally, QuorumRule::Majority, 3);
        assert!(outcome.is_consensus());
        assert_eq!(outcome.option(), Some("retry_same_fix"));
    }

    #[test]
    fn split_when_parseable_but_no_option_reaches_threshold() {
        // 3 voters, all parsed, three-way tie under majority: nobody
        // reaches a strict majority, but two-thirds of them did vote.
        let tally = Tally::from_ballots(vec![
            Ballot::new("v1", "retry_same_fix", ""),
            Ballot::new("v2", "try_different_approach", ""),
            Ballot::new("v3", "escalate_to_user", ""),
        ]);
        let outcome = VoteOutcome::from_tally(tally, QuorumRule::Majority, 3);
        assert!(outcome.is_split());
        assert!(outcome.option().is_none());
    }

    #[test]
    fn no_quorum_when_too_few_voters_parsed() {
        // 3 intended voters, only 1 ballot parsed (the other 2 were
        // malformed and never reached the tally).
        let tally = Tally::from_ballots(vec![Ballot::new("v1", "retry_same_fix", "")]);
        let outcome = VoteOutcome::from_tally(tally, QuorumRule::Majority, 3);
        assert!(outcome.is_no_quorum());
        assert!(!outcome.is_consensus());
    }

    #[test]
    fn no_quorum_when_split_under_unanimous() {
        let tally = Tally::from_ballots(vec![
            Ballot::new("v1", "retry_same_fix", ""),
            Ballot::new("v2", "escalate_to_user", ""),
        ]);
        let outcome = VoteOutcome::from_tally(tally, QuorumRule::Unanimous, 2);
        assert!(!outcome.is_consensus());
        assert!(outcome.is_split());
        assert!(outcome.option().is_none());
    }

    #[test]
    fn five_voter_quorum_floor_is_three() {
        let tally = Tally::from_ballots(vec![
            Ballot::new("v1", "approve", ""),
            Ballot::new("v2", "approve", ""),
        ]);
        let outcome = VoteOutcome::from_tally(tally, QuorumRule::Majority, 5);
        assert!(outcome.is_no_quorum());
    }
}
