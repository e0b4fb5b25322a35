//! Issues raised by validators and the same-issue normalization used to
//! detect a stuck fix loop.

use serde::{Deserialize, Serialize};

/// Severity of a validator finding, ordered low to high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];
}

/// One finding raised by a validator against a component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub category: String,
    pub file: String,
    pub description: String,
    pub severity: Severity,
    /// Line the finding applies to, if the validator located one. Excluded
    /// from the same-issue key — see [`Issue::normalize`].
    #[serde(default)]
    pub line: Option<u32>,
    /// Supporting excerpt (a code snippet, a log line) the validator cited.
    #[serde(default)]
    pub evidence: Option<String>,
    /// The validator's proposed remedy, handed to the fix-executor prompt
    /// verbatim when present.
    #[serde(default)]
    pub suggested_fix: Option<String>,
}

impl Issue {
    pub fn new(
        category: impl Into<String>,
        file: impl Into<String>,
        description: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            category: category.into(),
            file: file.into(),
            description: description.into(),
            severity,
            line: None,
            evidence: None,
            suggested_fix: None,
        }
    }

    pub fn with_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence = Some(evidence.into());
        self
    }

    pub fn with_suggested_fix(mut self, fix: impl Into<String>) -> Self {
        self.suggested_fix = Some(fix.into());
        self
    }

    /// Normalize to the same-issue key: `(category, file, normalized_description)`
    /// per spec — lowercased, whitespace-collapsed, and with any run of
    /// digits (line numbers, column numbers) stripped so a finding that
    /// shifts by a line between fix attempts still counts as "the same".
    pub fn normalize(&self) -> String {
        let lowered = self.description.to_lowercase();
        let mut collapsed = String::with_capacity(lowered.len());
        let mut last_was_digit = false;
        for word in lowered.split_whitespace() {
            let stripped: String = word.chars().filter(|c| !c.is_ascii_digit()).collect();
            if stripped.is_empty() {
                last_was_digit = true;
                continue;
            }
            if !collapsed.is_empty() {
                collapsed.push(' ');
            }
            collapsed.push_str(&stripped);
            last_was_digit = false;
        }
        let _ = last_was_digit;
        format!("{}|{}|{}", self.category, self.file, collapsed)
    }
}

/// True once `issues` contains at least one finding whose severity is in
/// `gating_severities` — the set of severities a mode profile requires
/// clear before a component can be marked validated (see
/// [`crate::orchestration::mode::ModeProfile::final_fix_severities`]).
pub fn has_blocking_issue(issues: &[Issue], gating_severities: &[Severity]) -> bool {
    issues.iter().any(|i| gating_severities.contains(&i.severity))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_whitespace_and_case() {
        let a = Issue::new("correctness", "src/lib.rs", "  Null   Pointer deref", Severity::High);
        let b = Issue::new("correctness", "src/lib.rs", "null pointer deref", Severity::High);
        assert_eq!(a.normalize(), b.normalize());
    }

    #[test]
    fn normalize_is_invariant_under_line_number_changes() {
        let a = Issue::new("correctness", "src/lib.rs", "null deref at line 42", Severity::High).with_line(42);
        let b = Issue::new("correctness", "src/lib.rs", "null deref at line 57", Severity::High).with_line(57);
        assert_eq!(a.normalize(), b.normalize());
    }

    #[test]
    fn normalize_distinguishes_by_category_and_file() {
        let a = Issue::new("correctness", "src/lib.rs", "off by one", Severity::Low);
        let b = Issue::new("style", "src/lib.rs", "off by one", Severity::Low);
        assert_ne!(a.normalize(), b.normalize());
    }

    #[test]
    fn has_blocking_issue_detects_threshold() {
        let issues = vec![
            Issue::new("a", "f", "x", Severity::Low),
            Issue::new("b", "f", "y", Severity::Critical),
        ];
        assert!(has_blocking_issue(&issues, &[Severity::Critical]));
        assert!(!has_blocking_issue(&issues[..1], &[Severity::Critical]));
    }

    #[test]
    fn has_blocking_issue_respects_wider_gating_set() {
        let issues = vec![Issue::new("style", "f", "line too long", Severity::Low)];
        assert!(!has_blocking_issue(&issues, &[Severity::Critical, Severity::High]));
        assert!(has_blocking_issue(&issues, &Severity::ALL));
    }

    #[test]
    fn builder_methods_set_optional_fields() {
        let issue = Issue::new("correctness", "f", "desc", Severity::High)
            .with_line(10)
            .with_evidence("x == null")
            .with_suggested_fix("add a guard clause");
        assert_eq!(issue.line, Some(10));
        assert_eq!(issue.evidence.as_deref(), Some("x == null"));
        assert_eq!(issue.suggested_fix.as_deref(), Some("add a guard clause"));
    }
}
