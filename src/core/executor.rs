//! Perceive-plan-act executor.
//!
//! Drives the repository toward the configured goal one action at a time:
//! observe, plan, verify the next action still applies, execute its hook,
//! observe again, and replan whenever the world disagrees with the
//! prediction. Replans are bounded; correlation ids are monotone per
//! execution and owned by the executor instance.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::actions::{ActionKind, ActionRegistry};
use crate::git::{GitFacade, RepoObserver};

use super::config::Config;
use super::error::{Error, Result};
use super::models::{Plan, RepoState};

/// Severity of a step record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordLevel {
    Info,
    Warn,
    Error,
}

/// One structured record emitted by the executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// When the record was emitted
    pub timestamp: DateTime<Utc>,

    /// Severity
    pub level: RecordLevel,

    /// Monotone correlation id within this execution
    pub correlation_id: u64,

    /// Action name, when the record belongs to an action invocation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    /// Digest of the predicted post-state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicted_state_digest: Option<String>,

    /// Digest of the observed post-state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_state_digest: Option<String>,

    /// Exit code of the underlying subprocess, when one ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,

    /// Human-readable message
    pub message: String,
}

/// How an execution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalStatus {
    GoalReached,
    Aborted,
    ExhaustedReplans,
    Fatal,
}

impl TerminalStatus {
    /// Process exit code surfaced to the CLI.
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::GoalReached => 0,
            Self::ExhaustedReplans => 1,
            Self::Aborted | Self::Fatal => 2,
        }
    }
}

/// Full record of one execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// Terminal status
    pub status: TerminalStatus,

    /// Step records in causal order
    pub steps: Vec<StepRecord>,

    /// Number of replans performed
    pub replan_count: u32,
}

/// The perceive-plan-act loop.
pub struct Executor<'a> {
    facade: &'a GitFacade,
    config: &'a Config,
    cancel: Arc<AtomicBool>,
    correlation: u64,
    records: Vec<StepRecord>,
    backup_ref: Option<String>,
    rebased: bool,
}

impl<'a> Executor<'a> {
    /// Create an executor over a facade and frozen configuration.
    pub fn new(facade: &'a GitFacade, config: &'a Config) -> Self {
        Self {
            facade,
            config,
            cancel: Arc::new(AtomicBool::new(false)),
            correlation: 0,
            records: Vec::new(),
            backup_ref: None,
            rebased: false,
        }
    }

    /// Shared flag a signal handler can set to stop after the current step.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Run the loop until the goal is reached or the execution terminates.
    ///
    /// Structural failures (no plan, policy violations, missing
    /// environment, persistent parse errors) surface as `Err`; completed
    /// loops return a report.
    pub fn execute(&mut self) -> Result<ExecutionReport> {
        let observer = RepoObserver::new(self.facade, self.config);
        let mut replan_count = 0u32;
        let mut tail: Vec<crate::core::ActionSpec> = Vec::new();

        loop {
            if self.cancel.load(Ordering::SeqCst) {
                self.record(RecordLevel::Warn, None, None, None, None, "cancelled by operator");
                return Ok(self.report(TerminalStatus::Aborted, replan_count));
            }

            let state = observer.observe()?;
            if self.config.goal.is_satisfied(&state) {
                self.record(
                    RecordLevel::Info,
                    None,
                    None,
                    Some(state.digest()),
                    None,
                    "goal satisfied",
                );
                self.summarize_rewrite();
                return Ok(self.report(TerminalStatus::GoalReached, replan_count));
            }

            let registry = ActionRegistry::for_observation(self.facade, &state)?;

            if tail.is_empty() {
                let planner = super::planner::Planner::new(self.config, &registry);
                let plan = planner.plan(&state, &self.config.goal)?;
                self.record_plan(&plan);
                if plan.is_empty() {
                    // Goal unsatisfied but nothing to do: planner and goal
                    // disagree, treat as replan exhaustion.
                    return Ok(self.report(TerminalStatus::ExhaustedReplans, replan_count));
                }
                tail = plan.actions;
            }

            let spec = tail.remove(0);
            let Some(action) = registry.get(&spec.name).cloned() else {
                self.record(
                    RecordLevel::Error,
                    Some(spec.name.clone()),
                    None,
                    None,
                    None,
                    "planned action missing from registry",
                );
                return Ok(self.report(TerminalStatus::Fatal, replan_count));
            };

            // The state must still satisfy the action's precondition; a
            // mismatch here means it drifted between observe and plan.
            if !action.applicable(&state, self.config) {
                self.record(
                    RecordLevel::Error,
                    Some(spec.name.clone()),
                    None,
                    Some(state.digest()),
                    None,
                    "planned action no longer applicable",
                );
                return Ok(self.report(TerminalStatus::Fatal, replan_count));
            }

            let predicted = action.predict(&state, self.config);

            match action.execute(self.facade, self.config, &state) {
                Ok(message) => {
                    self.note_side_effects(&action, &message);
                    self.record(
                        RecordLevel::Info,
                        Some(spec.name.clone()),
                        Some(predicted.safety_digest()),
                        None,
                        Some(0),
                        &message,
                    );
                }
                Err(error @ Error::Policy { .. }) => {
                    self.record(
                        RecordLevel::Error,
                        Some(spec.name.clone()),
                        None,
                        None,
                        None,
                        &error.to_string(),
                    );
                    return Err(error);
                }
                Err(error) => {
                    let exit_code = match &error {
                        Error::External { code, .. } => Some(*code),
                        _ => None,
                    };
                    let level = if action.unrecoverable() {
                        RecordLevel::Error
                    } else {
                        RecordLevel::Warn
                    };
                    self.record(
                        level,
                        Some(spec.name.clone()),
                        Some(predicted.safety_digest()),
                        None,
                        exit_code,
                        &error.to_string(),
                    );
                    if action.unrecoverable() {
                        return Ok(self.report(TerminalStatus::Fatal, replan_count));
                    }
                    // Transient failure: drop the plan tail and replan.
                    tail.clear();
                    replan_count += 1;
                    if replan_count > self.config.planner.max_replans {
                        return Ok(self.report(TerminalStatus::ExhaustedReplans, replan_count));
                    }
                    continue;
                }
            }

            let observed = observer.observe()?;
            if self.within_tolerance(&predicted, &observed) {
                self.record(
                    RecordLevel::Info,
                    Some(spec.name),
                    Some(predicted.safety_digest()),
                    Some(observed.safety_digest()),
                    None,
                    "post-state matches prediction",
                );
            } else {
                self.record(
                    RecordLevel::Warn,
                    Some(spec.name),
                    Some(predicted.safety_digest()),
                    Some(observed.safety_digest()),
                    None,
                    "drift detected; replanning",
                );
                tail.clear();
                replan_count += 1;
                if replan_count > self.config.planner.max_replans {
                    return Ok(self.report(TerminalStatus::ExhaustedReplans, replan_count));
                }
            }
        }
    }

    /// Drift comparison on the safety-relevant fields: conflict set
    /// equality, in-flight flags, tree cleanliness, and diverged counts
    /// within the configured tolerance (absorbs concurrent external
    /// fetches).
    fn within_tolerance(&self, predicted: &RepoState, observed: &RepoState) -> bool {
        if predicted.conflict_paths() != observed.conflict_paths() {
            return false;
        }
        if predicted.ongoing_rebase != observed.ongoing_rebase
            || predicted.ongoing_merge != observed.ongoing_merge
        {
            return false;
        }
        if predicted.working_tree_clean != observed.working_tree_clean
            || predicted.staged_changes != observed.staged_changes
        {
            return false;
        }
        let tolerance = i64::from(self.config.planner.drift_divergence_tolerance);
        let local_delta =
            (i64::from(predicted.diverged_local) - i64::from(observed.diverged_local)).abs();
        let remote_delta =
            (i64::from(predicted.diverged_remote) - i64::from(observed.diverged_remote)).abs();
        local_delta <= tolerance && remote_delta <= tolerance
    }

    fn note_side_effects(&mut self, action: &ActionKind, message: &str) {
        match action {
            ActionKind::BackupRef => {
                // "created backup ref <name> at <sha>"
                self.backup_ref = message.split_whitespace().nth(3).map(str::to_string);
            }
            ActionKind::RebaseOntoUpstream { .. } | ActionKind::RebaseContinue => {
                self.rebased = true;
            }
            _ => {}
        }
    }

    /// After a successful rewrite, record a range-diff summary between the
    /// backup ref and the new head for operator review.
    fn summarize_rewrite(&mut self) {
        if self.facade.dry_run() || !self.rebased {
            return;
        }
        let Some(backup) = self.backup_ref.clone() else { return };
        match crate::actions::quality::explain_range_diff(self.facade, &backup, "HEAD") {
            Ok(summary) if !summary.is_empty() => {
                self.record(
                    RecordLevel::Info,
                    None,
                    None,
                    None,
                    None,
                    &format!("range-diff vs {backup}:\n{summary}"),
                );
            }
            Ok(_) => {}
            Err(error) => {
                tracing::debug!(%error, "range-diff summary unavailable");
            }
        }
    }

    fn record_plan(&mut self, plan: &Plan) {
        let names: Vec<&str> = plan.actions.iter().map(|a| a.name.as_str()).collect();
        self.record(
            RecordLevel::Info,
            None,
            None,
            None,
            None,
            &format!(
                "planned {} action(s): [{}] (estimated cost {:.2})",
                plan.actions.len(),
                names.join(", "),
                plan.estimated_cost
            ),
        );
    }

    fn record(
        &mut self,
        level: RecordLevel,
        action: Option<String>,
        predicted: Option<String>,
        observed: Option<String>,
        exit_code: Option<i32>,
        message: &str,
    ) {
        self.correlation += 1;
        match level {
            RecordLevel::Info => {
                tracing::info!(correlation = self.correlation, action = ?action, "{message}");
            }
            RecordLevel::Warn => {
                tracing::warn!(correlation = self.correlation, action = ?action, "{message}");
            }
            RecordLevel::Error => {
                tracing::error!(correlation = self.correlation, action = ?action, "{message}");
            }
        }
        self.records.push(StepRecord {
            timestamp: Utc::now(),
            level,
            correlation_id: self.correlation,
            action,
            predicted_state_digest: predicted,
            observed_state_digest: observed,
            exit_code,
            message: message.to_string(),
        });
    }

    fn report(&mut self, status: TerminalStatus, replan_count: u32) -> ExecutionReport {
        ExecutionReport { status, steps: std::mem::take(&mut self.records), replan_count }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ConflictDetail, RepoRef};

    fn state() -> RepoState {
        RepoState::new("/tmp/repo", RepoRef::new("main").with_tracking("origin/main"))
            .recompute_derived()
    }

    fn executor_parts() -> (GitFacade, Config) {
        (GitFacade::new("/tmp/repo", true), Config::default())
    }

    #[test]
    fn test_terminal_status_exit_codes() {
        assert_eq!(TerminalStatus::GoalReached.exit_code(), 0);
        assert_eq!(TerminalStatus::ExhaustedReplans.exit_code(), 1);
        assert_eq!(TerminalStatus::Fatal.exit_code(), 2);
        assert_eq!(TerminalStatus::Aborted.exit_code(), 2);
    }

    #[test]
    fn test_tolerance_accepts_small_divergence_drift() {
        let (facade, config) = executor_parts();
        let executor = Executor::new(&facade, &config);

        let predicted = state();
        let mut observed = state();
        observed.diverged_remote = 1;
        assert!(executor.within_tolerance(&predicted, &observed.recompute_derived()));

        let mut too_far = state();
        too_far.diverged_remote = 2;
        assert!(!executor.within_tolerance(&predicted, &too_far.recompute_derived()));
    }

    #[test]
    fn test_tolerance_requires_conflict_set_equality() {
        let (facade, config) = executor_parts();
        let executor = Executor::new(&facade, &config);

        let predicted = state();
        let mut observed = state();
        observed.working_tree_clean = false;
        observed.conflicts = vec![ConflictDetail::new("a.rs").with_hunks(1)];
        assert!(!executor.within_tolerance(&predicted, &observed.recompute_derived()));
    }

    #[test]
    fn test_tolerance_requires_matching_flags() {
        let (facade, config) = executor_parts();
        let executor = Executor::new(&facade, &config);

        let predicted = state();
        let mut observed = state();
        observed.ongoing_merge = true;
        assert!(!executor.within_tolerance(&predicted, &observed.recompute_derived()));
    }

    #[test]
    fn test_correlation_ids_are_monotone() {
        let (facade, config) = executor_parts();
        let mut executor = Executor::new(&facade, &config);
        executor.record(RecordLevel::Info, None, None, None, None, "one");
        executor.record(RecordLevel::Warn, None, None, None, None, "two");
        executor.record(RecordLevel::Error, None, None, None, None, "three");

        let ids: Vec<u64> = executor.records.iter().map(|r| r.correlation_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_backup_ref_captured_from_message() {
        let (facade, config) = executor_parts();
        let mut executor = Executor::new(&facade, &config);
        executor.note_side_effects(
            &ActionKind::BackupRef,
            "created backup ref refs/backup/goap/20240101T000000Z at abcd",
        );
        assert_eq!(
            executor.backup_ref.as_deref(),
            Some("refs/backup/goap/20240101T000000Z")
        );
    }

    #[test]
    fn test_cancel_handle_is_shared() {
        let (facade, config) = executor_parts();
        let executor = Executor::new(&facade, &config);
        let handle = executor.cancel_handle();
        handle.store(true, Ordering::SeqCst);
        assert!(executor.cancel.load(Ordering::SeqCst));
    }

    #[test]
    fn test_step_record_serialization_shape() {
        let record = StepRecord {
            timestamp: Utc::now(),
            level: RecordLevel::Info,
            correlation_id: 7,
            action: Some("FetchAll".to_string()),
            predicted_state_digest: None,
            observed_state_digest: None,
            exit_code: Some(0),
            message: "fetched".to_string(),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"correlation_id\":7"));
        assert!(json.contains("\"level\":\"info\""));
        assert!(!json.contains("predicted_state_digest"));
    }
}
