//! Enumerated gate verdicts the voting gate tallies ballots over.
//!
//! Each is the option set for one kind of voting-gate round; none carry
//! configuration themselves, because the engine's gates choose between
//! fixed outcomes, not between alternative execution strategies.

use serde::{Deserialize, Serialize};

/// Outcome of a strategy vote raised when a component's fix loop is stuck
/// (see [`crate::state::ComponentState::is_stuck`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixStrategy {
    /// Keep the current approach, attempt the same fix again.
    RetrySameFix,
    /// Abandon the current approach and try something structurally
    /// different.
    TryDifferentApproach,
    /// Stop and surface the stuck component to the user.
    EscalateToUser,
}

impl FixStrategy {
    pub fn as_str(&self) -> &str {
        match self {
            FixStrategy::RetrySameFix => "retry_same_fix",
            FixStrategy::TryDifferentApproach => "try_different_approach",
            FixStrategy::EscalateToUser => "escalate_to_user",
        }
    }

    pub fn options() -> &'static [&'static str] {
        &["retry_same_fix", "try_different_approach", "escalate_to_user"]
    }
}

impl std::fmt::Display for FixStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for FixStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "retry_same_fix" => Ok(FixStrategy::RetrySameFix),
            "try_different_approach" => Ok(FixStrategy::TryDifferentApproach),
            "escalate_to_user" => Ok(FixStrategy::EscalateToUser),
            _ => Err(format!("invalid fix strategy: {s}")),
        }
    }
}

/// Verdict of the skeleton-review gate: approve the structural plan for a
/// component before implementation starts, or send it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkeletonGateChoice {
    Approve,
    Revise,
}

impl SkeletonGateChoice {
    pub fn as_str(&self) -> &str {
        match self {
            SkeletonGateChoice::Approve => "approve",
            SkeletonGateChoice::Revise => "revise",
        }
    }

    pub fn options() -> &'static [&'static str] {
        &["approve", "revise"]
    }
}

impl std::fmt::Display for SkeletonGateChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SkeletonGateChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(SkeletonGateChoice::Approve),
            "revise" => Ok(SkeletonGateChoice::Revise),
            _ => Err(format!("invalid skeleton gate choice: {s}")),
        }
    }
}

/// Verdict of the final production-readiness gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductionGateChoice {
    Ship,
    BlockOnFindings,
}

impl ProductionGateChoice {
    pub fn as_str(&self) -> &str {
        match self {
            ProductionGateChoice::Ship => "ship",
            ProductionGateChoice::BlockOnFindings => "block_on_findings",
        }
    }

    pub fn options() -> &'static [&'static str] {
        &["ship", "block_on_findings"]
    }
}

impl std::fmt::Display for ProductionGateChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ProductionGateChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ship" => Ok(ProductionGateChoice::Ship),
            "block_on_findings" => Ok(ProductionGateChoice::BlockOnFindings),
            _ => Err(format!("invalid production gate choice: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fix_strategy_round_trips_through_str() {
        for s in FixStrategy::options() {
            let parsed: FixStrategy = s.parse().unwrap();
            assert_eq!(&parsed.to_string(), s);
        }
    }

    #[test]
    fn fix_strategy_rejects_unknown() {
        assert!("give_up".parse::<FixStrategy>().is_err());
    }

    #[test]
    fn gate_choice_options_are_stable() {
        assert_eq!(SkeletonGateChoice::options(), &["approve", "revise"]);
        assert_eq!(
            ProductionGateChoice::options(),
            &["ship", "block_on_findings"]
        );
    }
}
