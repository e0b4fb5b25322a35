//! Quorum rules for determining whether a tally reaches consensus.

use serde::{Deserialize, Serialize};

/// Rule for determining whether a voting round has reached consensus.
///
/// # Example
///
/// ```
/// use conduct_domain::voting::QuorumRule;
///
/// let rule = QuorumRule::Majority;
/// assert!(rule.is_satisfied(2, 3));
/// assert!(!rule.is_satisfied(1, 3));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QuorumRule {
    /// More than half of all votes must agree on the same option.
    #[default]
    Majority,
    /// Every vote must agree.
    Unanimous,
    /// At least n votes must agree.
    AtLeast(usize),
}

impl QuorumRule {
    pub fn is_satisfied(&self, leading_count: usize, total: usize) -> bool {
        if total == 0 {
            return false;
        }
        match self {
            QuorumRule::Majority => leading_count > total / 2,
            QuorumRule::Unanimous => leading_count == total,
            QuorumRule::AtLeast(n) => leading_count >= *n,
        }
    }

    pub fn min_needed(&self, total: usize) -> usize {
        match self {
            QuorumRule::Majority => total / 2 + 1,
            QuorumRule::Unanimous => total,
            QuorumRule::AtLeast(n) => *n,
        }
    }
}

impl std::fmt::Display for QuorumRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuorumRule::Majority => write!(f, "majority"),
            QuorumRule::Unanimous => write!(f, "unanimous"),
            QuorumRule::AtLeast(n) => write!(f, "at least {n}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn majority_needs_more_than_half() {
        let rule = QuorumRule::Majority;
        assert!(!rule.is_satisfied(1, 3));
        assert!(rule.is_satisfied(2, 3));
    }

    #[test]
    fn unanimous_needs_all() {
        let rule = QuorumRule::Unanimous;
        assert!(!rule.is_satisfied(2, 3));
        assert!(rule.is_satisfied(3, 3));
    }

    #[test]
    fn zero_total_never_satisfied() {
        assert!(!QuorumRule::Majority.is_satisfied(0, 0));
    }

    #[test]
    fn min_needed_matches_is_satisfied_boundary() {
        for total in 1..6 {
            let needed = QuorumRule::Majority.min_needed(total);
            assert!(QuorumRule::Majority.is_satisfied(needed, total));
            if needed > 0 {
                assert!(!QuorumRule::Majority.is_satisfied(needed - 1, total));
            }
        }
    }
}
