//! Error types shared across the core.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Why the planner could not produce a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoPlanReason {
    /// No sequence of registered actions reaches the goal
    Unreachable,
    /// The expansion budget ran out before a goal state was found
    ExhaustedExpansions,
    /// Every remaining path exceeds the plan length bound
    ExhaustedLength,
}

impl std::fmt::Display for NoPlanReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Unreachable => "unreachable",
            Self::ExhaustedExpansions => "exhausted_expansions",
            Self::ExhaustedLength => "exhausted_length",
        };
        f.write_str(text)
    }
}

/// Errors produced by the observer, planner, executor, and facade.
#[derive(Debug, Error)]
pub enum Error {
    /// Git output could not be decoded.
    #[error("failed to parse git output: {detail} (line: {line:?})")]
    Parse { line: String, detail: String },

    /// Git exited with a non-zero status.
    #[error("git exited with status {code}: {stderr}")]
    External { code: i32, stderr: String },

    /// A subprocess exceeded its per-call timeout.
    #[error("git command timed out after {0:?}")]
    Timeout(Duration),

    /// The planner cannot reach the goal.
    #[error("no plan found: {0}")]
    NoPlan(NoPlanReason),

    /// The observed state diverged from the predicted post-state.
    #[error("state drift: predicted {predicted}, observed {observed}")]
    Drift { predicted: String, observed: String },

    /// An action would violate a configured safety policy.
    #[error("policy violation: {rule}")]
    Policy { rule: String },

    /// The git binary is absent or too old.
    #[error("environment missing: {0}")]
    Environment(String),

    /// Filesystem access failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Convenience constructor for parse failures.
    pub fn parse(line: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Parse { line: line.into(), detail: detail.into() }
    }

    /// Whether the executor may recover from this error by replanning.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::External { .. } | Self::Timeout(_) | Self::Drift { .. })
    }

    /// Process exit code surfaced to the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::NoPlan(_) => 3,
            Self::Environment(_) => 4,
            _ => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(Error::External { code: 1, stderr: String::new() }.is_transient());
        assert!(Error::Timeout(Duration::from_secs(30)).is_transient());
        assert!(!Error::NoPlan(NoPlanReason::Unreachable).is_transient());
        assert!(!Error::Policy { rule: "allow_force_push".into() }.is_transient());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(Error::NoPlan(NoPlanReason::Unreachable).exit_code(), 3);
        assert_eq!(Error::Environment("git not found".into()).exit_code(), 4);
        assert_eq!(Error::Policy { rule: "x".into() }.exit_code(), 2);
    }

    #[test]
    fn test_no_plan_reason_display() {
        assert_eq!(NoPlanReason::ExhaustedExpansions.to_string(), "exhausted_expansions");
    }
}
