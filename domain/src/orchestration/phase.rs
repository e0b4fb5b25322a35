//! The engine's top-level phase sequence for a run.

use serde::{Deserialize, Serialize};

/// A top-level phase of one engine run.
///
/// `ParseSpec -> ImpactAnalysis -> ComponentLoop -> IntegrationValidation
/// -> FinalValidation -> ProductionGate -> Completion`. `ComponentLoop` is
/// re-entered once per dependency-ready batch of components; the other
/// phases run exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    ParseSpec,
    ImpactAnalysis,
    ComponentLoop,
    IntegrationValidation,
    FinalValidation,
    ProductionGate,
    Completion,
}

impl Phase {
    pub fn as_str(&self) -> &str {
        match self {
            Phase::ParseSpec => "parse_spec",
            Phase::ImpactAnalysis => "impact_analysis",
            Phase::ComponentLoop => "component_loop",
            Phase::IntegrationValidation => "integration_validation",
            Phase::FinalValidation => "final_validation",
            Phase::ProductionGate => "production_gate",
            Phase::Completion => "completion",
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Phase::ParseSpec => "Parse Spec",
            Phase::ImpactAnalysis => "Impact Analysis",
            Phase::ComponentLoop => "Component Loop",
            Phase::IntegrationValidation => "Integration Validation",
            Phase::FinalValidation => "Final Validation",
            Phase::ProductionGate => "Production Gate",
            Phase::Completion => "Completion",
        }
    }

    /// The phase that follows this one in the standard sequence, or
    /// `None` for `Completion`. `ComponentLoop`'s self-transition (staying
    /// in the loop for the next ready batch) is handled by the caller, not
    /// this table.
    pub fn next(&self) -> Option<Phase> {
        match self {
            Phase::ParseSpec => Some(Phase::ImpactAnalysis),
            Phase::ImpactAnalysis => Some(Phase::ComponentLoop),
            Phase::ComponentLoop => Some(Phase::IntegrationValidation),
            Phase::IntegrationValidation => Some(Phase::FinalValidation),
            Phase::FinalValidation => Some(Phase::ProductionGate),
            Phase::ProductionGate => Some(Phase::Completion),
            Phase::Completion => None,
        }
    }

    pub fn requires_voting_gate(&self) -> bool {
        matches!(self, Phase::FinalValidation | Phase::ProductionGate)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Status of a single phase execution, tracked for progress reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PhaseStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

impl PhaseStatus {
    pub fn as_str(&self) -> &str {
        match self {
            PhaseStatus::Pending => "pending",
            PhaseStatus::Running => "running",
            PhaseStatus::Completed => "completed",
            PhaseStatus::Failed => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_sequence_reaches_completion() {
        let mut phase = Phase::ParseSpec;
        let mut count = 0;
        while let Some(next) = phase.next() {
            phase = next;
            count += 1;
            assert!(count <= 10, "sequence did not terminate");
        }
        assert_eq!(phase, Phase::Completion);
    }

    #[test]
    fn only_final_validation_and_production_gate_require_voting() {
        assert!(!Phase::ParseSpec.requires_voting_gate());
        assert!(!Phase::ComponentLoop.requires_voting_gate());
        assert!(Phase::FinalValidation.requires_voting_gate());
        assert!(Phase::ProductionGate.requires_voting_gate());
    }
}
