// Error taxonomy for rule loading and rule application.
//
// LoadError and ScopeMismatchError abort before any document is touched.
// UnitError is recovered locally by the engine and ends up in the report.
// ConvergenceWarning is informational and never stops a run.

use crate::types::UnitRef;
use serde::Serialize;
use std::path::PathBuf;

/// Result type for rule-set loading
pub type Result<T> = std::result::Result<T, RuleSetError>;

#[derive(Debug, thiserror::Error)]
pub enum RuleSetError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("{} rule(s) pair an action with an incompatible scope:\n{}", .0.len(), format_mismatches(.0))]
    ScopeMismatch(Vec<ScopeMismatchError>),
}

fn format_mismatches(errors: &[ScopeMismatchError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Failed to read rule set {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Rule set {origin} is not valid {format}: {message}")]
    Syntax {
        origin: String,
        format: &'static str,
        message: String,
    },

    #[error("Rule #{index} ('{name}') is malformed: {message}")]
    InvalidRule {
        index: usize,
        name: String,
        message: String,
    },

    #[error("Rule '{rule}' has an invalid {field}: {message}")]
    InvalidPattern {
        rule: String,
        field: &'static str,
        message: String,
    },

    #[error("Unknown preset '{0}'")]
    UnknownPreset(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("rule '{rule}': {action} action at {scope} scope {reason}")]
pub struct ScopeMismatchError {
    pub rule: String,
    pub action: &'static str,
    pub scope: &'static str,
    pub reason: String,
}

/// A single paragraph or run that could not be read or mutated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{unit}: {message}")]
pub struct UnitError {
    pub unit: UnitRef,
    /// Rule being applied when the failure happened, if any
    pub rule: Option<String>,
    pub message: String,
}

impl UnitError {
    pub fn new(unit: UnitRef, message: impl Into<String>) -> Self {
        Self {
            unit,
            rule: None,
            message: message.into(),
        }
    }

    pub fn for_rule(mut self, rule: &str) -> Self {
        self.rule = Some(rule.to_string());
        self
    }
}

/// Static self-check result: the rule may keep changing text on every pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConvergenceWarning {
    pub rule: String,
    pub message: String,
}

impl std::fmt::Display for ConvergenceWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rule '{}' may not converge: {}", self.rule, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_mismatch_lists_every_rule() {
        let err = RuleSetError::ScopeMismatch(vec![
            ScopeMismatchError {
                rule: "a".to_string(),
                action: "format",
                scope: "run",
                reason: "cannot set space_after".to_string(),
            },
            ScopeMismatchError {
                rule: "b".to_string(),
                action: "format",
                scope: "run",
                reason: "cannot set style".to_string(),
            },
        ]);
        let message = err.to_string();
        assert!(message.starts_with("2 rule(s)"));
        assert!(message.contains("rule 'a'"));
        assert!(message.contains("rule 'b'"));
    }

    #[test]
    fn unit_error_names_the_unit() {
        let err = UnitError::new(UnitRef::Paragraph { index: 4 }, "node is malformed")
            .for_rule("Format Narrative Text");
        assert_eq!(err.to_string(), "paragraph 5: node is malformed");
        assert_eq!(err.rule.as_deref(), Some("Format Narrative Text"));
    }
}
