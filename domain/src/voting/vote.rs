//! Ballots cast by voter agents and their tally.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single agent's vote in a voting-gate round.
///
/// # Example
///
/// ```
/// use conduct_domain::voting::Ballot;
///
/// let ballot = Ballot::new("validator-1", "retry_same_fix", "the fix is close, one more pass should do it");
/// assert_eq!(ballot.option, "retry_same_fix");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ballot {
    /// Name of the voting agent instance (e.g. `"validator-1"`).
    pub voter: String,
    /// The option this ballot selects, one of the gate's enumerated
    /// options (e.g. `"retry_same_fix"`, `"escalate_to_user"`).
    pub option: String,
    /// The voter's stated reasoning.
    pub reasoning: String,
}

impl Ballot {
    pub fn new(voter: impl Into<String>, option: impl Into<String>, reasoning: impl Into<String>) -> Self {
        Self {
            voter: voter.into(),
            option: option.into(),
            reasoning: reasoning.into(),
        }
    }
}

/// Tally of ballots grouped by option.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tally {
    pub counts: HashMap<String, usize>,
    pub total: usize,
    pub ballots: Vec<Ballot>,
}

impl Tally {
    pub fn from_ballots(ballots: Vec<Ballot>) -> Self {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for ballot in &ballots {
            *counts.entry(ballot.option.clone()).or_insert(0) += 1;
        }
        let total = ballots.len();
        Self {
            counts,
            total,
            ballots,
        }
    }

    /// The option with the most votes, and its count. Ties break toward
    /// the option that appears first in voting order.
    pub fn leader(&self) -> Option<(&str, usize)> {
        let mut best: Option<(&str, usize)> = None;
        for ballot in &self.ballots {
            let count = self.counts[&ballot.option];
            match best {
                Some((_, best_count)) if best_count >= count => {}
                _ => best = Some((ballot.option.as_str(), count)),
            }
        }
        best
    }

    pub fn count_for(&self, option: &str) -> usize {
        self.counts.get(option).copied().unwrap_or(0)
    }

    pub fn reasoning_for(&self, option: &str) -> Vec<&str> {
        self.ballots
            .iter()
            .filter(|b| b.option == option)
            .map(|b| b.reasoning.as_str())
            .collect()
    }
}
