//! Risk classification for components and the validator counts it implies.
//!
//! Generalizes the binary low/high risk split used for tool calls into the
//! four-level scale the engine uses to size its validation loop.

use serde::{Deserialize, Serialize};

/// Declared risk level of a component's change surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }

    /// Number of independent validators the standard mode runs for a
    /// component at this risk level. Quick mode halves this (minimum 1);
    /// full mode adds one additional validator at high/critical.
    pub fn base_validator_count(&self) -> usize {
        match self {
            RiskLevel::Low => 1,
            RiskLevel::Medium => 2,
            RiskLevel::High => 3,
            RiskLevel::Critical => 4,
        }
    }

    /// Whether a finding at this risk level must clear a voting gate
    /// rather than a single validator's say-so.
    pub fn requires_voting_gate(&self) -> bool {
        matches!(self, RiskLevel::High | RiskLevel::Critical)
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            "critical" => Ok(RiskLevel::Critical),
            _ => Err(format!("invalid risk level: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_ascending_by_severity() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
        assert!(RiskLevel::High < RiskLevel::Critical);
    }

    #[test]
    fn validator_count_increases_with_risk() {
        assert_eq!(RiskLevel::Low.base_validator_count(), 1);
        assert_eq!(RiskLevel::Critical.base_validator_count(), 4);
    }

    #[test]
    fn only_high_and_critical_require_voting_gate() {
        assert!(!RiskLevel::Low.requires_voting_gate());
        assert!(!RiskLevel::Medium.requires_voting_gate());
        assert!(RiskLevel::High.requires_voting_gate());
        assert!(RiskLevel::Critical.requires_voting_gate());
    }

    #[test]
    fn from_str_roundtrips() {
        for level in [
            RiskLevel::Low,
            RiskLevel::Medium,
            RiskLevel::High,
            RiskLevel::Critical,
        ] {
            assert_eq!(level.to_string().parse::<RiskLevel>().unwrap(), level);
        }
        assert!("unknown".parse::<RiskLevel>().is_err());
    }
}
