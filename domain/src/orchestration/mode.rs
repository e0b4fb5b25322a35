//! Execution modes: the single user-facing axis controlling how
//! thoroughly the engine validates each component.
//!
//! An enum whose behavior is entirely derived, never matched on ad hoc at
//! call sites.

use crate::issue::Severity;
use crate::risk::RiskLevel;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How thoroughly the engine validates each component.
///
/// - **Quick**: minimal validation, no skeleton review, no backtracking —
///   for prototypes and throwaway scripts.
/// - **Standard** (default): the full validation loop with skeleton
///   review, risk-scaled validator counts, and voting gates at
///   high/critical risk.
/// - **Full**: standard plus an extra validator at high/critical risk and
///   fix-severity escalation that runs the final-fix pass on minor
///   findings too, not just major/blocking ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExecutionMode {
    Quick,
    #[default]
    Standard,
    Full,
}

impl ExecutionMode {
    pub fn profile(&self) -> ModeProfile {
        match self {
            ExecutionMode::Quick => ModeProfile {
                mode: *self,
                skeleton_review: SkeletonReviewPolicy::Skip,
                allow_backtrack: false,
                parallelism: ParallelismPolicy::Aggressive,
                final_fix_severities: &[Severity::Critical],
                validator_count_fn: |risk| (risk.base_validator_count() / 2).max(1),
            },
            ExecutionMode::Standard => ModeProfile {
                mode: *self,
                skeleton_review: SkeletonReviewPolicy::ReviewHighRiskOnly,
                allow_backtrack: true,
                parallelism: ParallelismPolicy::ByDependencyLevel,
                final_fix_severities: &[Severity::Critical, Severity::High],
                validator_count_fn: |risk| risk.base_validator_count(),
            },
            ExecutionMode::Full => ModeProfile {
                mode: *self,
                skeleton_review: SkeletonReviewPolicy::ReviewAll,
                allow_backtrack: true,
                parallelism: ParallelismPolicy::Conservative,
                final_fix_severities: &Severity::ALL,
                validator_count_fn: |risk| {
                    let base = risk.base_validator_count();
                    if risk.requires_voting_gate() { base + 1 } else { base }
                },
            },
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ExecutionMode::Quick => "Quick: minimal validation, no skeleton review",
            ExecutionMode::Standard => "Standard: full validation loop with risk-scaled gates",
            ExecutionMode::Full => "Full: standard plus extra validators and deeper fix passes",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExecutionMode::Quick => "quick",
            ExecutionMode::Standard => "standard",
            ExecutionMode::Full => "full",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "quick" | "q" => Ok(ExecutionMode::Quick),
            "standard" | "std" | "s" => Ok(ExecutionMode::Standard),
            "full" | "f" => Ok(ExecutionMode::Full),
            _ => Err(format!("invalid execution mode: {s}")),
        }
    }
}

/// How aggressively independent components may run concurrently within
/// `component_loop`.
///
/// All three still respect the happens-before rule across dependency
/// levels: a component never starts before every dependency it lists
/// has reached a terminal, persisted status, and no batch is recomputed
/// until every component in the current one has finished. `Aggressive`
/// and `ByDependencyLevel` coincide in practice — a DAG-respecting
/// scheduler already processes one dependency level at a time, so
/// "aggressive" parallelism is simply that level run without further
/// throttling. `Conservative` is the one policy that narrows a ready
/// batch down to one component regardless of how many are ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParallelismPolicy {
    /// Every component in the current ready batch runs concurrently,
    /// bounded only by `EngineConfig::max_concurrent_agents`.
    Aggressive,
    /// One ready batch (one dependency level) runs concurrently; the next
    /// level does not start until the current one is fully resolved.
    ByDependencyLevel,
    /// Components run one at a time regardless of how many are ready.
    Conservative,
}

impl ParallelismPolicy {
    /// Maximum number of components this policy allows to run at once out
    /// of a ready batch of `ready_count`.
    pub fn batch_size(&self, ready_count: usize) -> usize {
        match self {
            ParallelismPolicy::Conservative => 1,
            ParallelismPolicy::ByDependencyLevel | ParallelismPolicy::Aggressive => {
                ready_count.max(1)
            }
        }
    }
}

/// Whether the skeleton gate reviews a component's structural plan before
/// implementation starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkeletonReviewPolicy {
    Skip,
    ReviewHighRiskOnly,
    ReviewAll,
}

impl SkeletonReviewPolicy {
    pub fn applies_to(&self, risk: RiskLevel) -> bool {
        match self {
            SkeletonReviewPolicy::Skip => false,
            SkeletonReviewPolicy::ReviewHighRiskOnly => risk.requires_voting_gate(),
            SkeletonReviewPolicy::ReviewAll => true,
        }
    }
}

/// The derived validation-depth and parallelism parameters for a mode.
///
/// Not user-facing — computed once from [`ExecutionMode::profile`] and
/// consulted throughout the validation loop instead of matching on the
/// mode at each call site.
#[derive(Clone, Copy)]
pub struct ModeProfile {
    pub mode: ExecutionMode,
    pub skeleton_review: SkeletonReviewPolicy,
    pub allow_backtrack: bool,
    pub parallelism: ParallelismPolicy,
    /// Severities that must have zero open findings before a component
    /// can be marked validated. Quick only gates on critical findings;
    /// standard adds high; full gates on every severity, including style.
    pub final_fix_severities: &'static [Severity],
    validator_count_fn: fn(RiskLevel) -> usize,
}

impl ModeProfile {
    pub fn validator_count(&self, risk: RiskLevel) -> usize {
        (self.validator_count_fn)(risk)
    }
}

impl fmt::Debug for ModeProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModeProfile")
            .field("mode", &self.mode)
            .field("allow_backtrack", &self.allow_backtrack)
            .field("parallelism", &self.parallelism)
            .field("final_fix_severities", &self.final_fix_severities)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quick_never_reviews_skeleton() {
        let profile = ExecutionMode::Quick.profile();
        assert!(!profile.skeleton_review.applies_to(RiskLevel::Critical));
    }

    #[test]
    fn full_reviews_skeleton_even_at_low_risk() {
        let profile = ExecutionMode::Full.profile();
        assert!(profile.skeleton_review.applies_to(RiskLevel::Low));
    }

    #[test]
    fn validator_count_scales_by_mode() {
        let quick = ExecutionMode::Quick.profile().validator_count(RiskLevel::High);
        let standard = ExecutionMode::Standard.profile().validator_count(RiskLevel::High);
        let full = ExecutionMode::Full.profile().validator_count(RiskLevel::High);
        assert!(quick <= standard);
        assert!(standard <= full);
    }

    #[test]
    fn from_str_accepts_abbreviations() {
        assert_eq!("q".parse::<ExecutionMode>().unwrap(), ExecutionMode::Quick);
        assert_eq!("std".parse::<ExecutionMode>().unwrap(), ExecutionMode::Standard);
        assert_eq!("f".parse::<ExecutionMode>().unwrap(), ExecutionMode::Full);
        assert!("bogus".parse::<ExecutionMode>().is_err());
    }

    #[test]
    fn default_is_standard() {
        assert_eq!(ExecutionMode::default(), ExecutionMode::Standard);
    }

    #[test]
    fn final_fix_severities_widen_with_mode() {
        assert_eq!(ExecutionMode::Quick.profile().final_fix_severities, &[Severity::Critical]);
        assert_eq!(
            ExecutionMode::Standard.profile().final_fix_severities,
            &[Severity::Critical, Severity::High]
        );
        assert_eq!(ExecutionMode::Full.profile().final_fix_severities.len(), 4);
    }

    #[test]
    fn only_full_mode_runs_components_one_at_a_time() {
        assert_eq!(ExecutionMode::Quick.profile().parallelism.batch_size(5), 5);
        assert_eq!(ExecutionMode::Standard.profile().parallelism.batch_size(5), 5);
        assert_eq!(ExecutionMode::Full.profile().parallelism.batch_size(5), 1);
    }
}
