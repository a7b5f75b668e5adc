//! Atomic action catalogue.
//!
//! Each action is a variant of [`ActionKind`] with four pure functions the
//! planner sees (`name`, `applicable`, `predict`, `cost`) and one impure
//! execute hook the executor dispatches. The registry is built from the
//! current observation (the rebase action carries its merge-tree predicted
//! conflict set as variant data, keeping `predict` pure) and is immutable
//! for the duration of a planning round.

pub mod conflict;
pub mod quality;
pub mod rebase;
pub mod safety;
pub mod sync;

use crate::core::{ActionSpec, Config, ConflictDetail, Resolution, RepoState, Result, RiskLevel};
use crate::git::{classify_path, GitFacade};

/// Heuristic dimensions an action can reduce.
///
/// Feeds the planner's admissibility clamp: each heuristic coefficient is
/// capped by the cheapest action reducing its dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Conflicts,
    Divergence,
    InFlight,
    Staleness,
    Tests,
    Push,
}

/// Risk multiplier applied to mutating actions in a high-risk state.
const HIGH_RISK_MULTIPLIER: f64 = 1.5;

/// An atomic action with declarative preconditions, effects, and cost.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionKind {
    /// Record a backup ref at HEAD before mutating history
    BackupRef,
    /// Stash a dirty working tree
    EnsureClean,
    /// Fetch all remotes, refreshing tracking state
    FetchAll,
    /// Start a rebase onto the tracking ref; carries the merge-tree
    /// predicted conflict set captured at observation time
    RebaseOntoUpstream { predicted_conflicts: Vec<ConflictDetail> },
    /// Replay recorded resolutions over trivial conflicts
    AutoTrivialResolve,
    /// Resolve conflicts matching a configured ours/theirs rule
    ApplyPathStrategy,
    /// Re-merge structured files through a configured merge driver
    UseMergeDriver,
    /// Continue a conflict-free rebase
    RebaseContinue,
    /// Abort an irrecoverable rebase
    RebaseAbort,
    /// Run the configured test suite
    RunTests,
    /// Push local commits with a lease guard
    PushWithLease,
}

impl ActionKind {
    /// Unique action name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::BackupRef => "BackupRef",
            Self::EnsureClean => "EnsureClean",
            Self::FetchAll => "FetchAll",
            Self::RebaseOntoUpstream { .. } => "RebaseOntoUpstream",
            Self::AutoTrivialResolve => "AutoTrivialResolve",
            Self::ApplyPathStrategy => "ApplyPathStrategy",
            Self::UseMergeDriver => "UseMergeDriver",
            Self::RebaseContinue => "RebaseContinue",
            Self::RebaseAbort => "RebaseAbort",
            Self::RunTests => "RunTests",
            Self::PushWithLease => "PushWithLease",
        }
    }

    /// State-independent minimum cost, used for the admissibility clamp.
    pub const fn base_cost(&self) -> f64 {
        match self {
            Self::BackupRef => 0.2,
            Self::EnsureClean => 0.6,
            Self::FetchAll => 0.3,
            Self::RebaseOntoUpstream { .. } => 1.0,
            Self::AutoTrivialResolve => 0.1,
            Self::ApplyPathStrategy => 1.2,
            Self::UseMergeDriver => 1.5,
            Self::RebaseContinue => 0.3,
            Self::RebaseAbort => 5.0,
            Self::RunTests => 3.0,
            Self::PushWithLease => 1.0,
        }
    }

    /// Heuristic dimensions this action reduces.
    pub const fn reduces(&self) -> &'static [Dimension] {
        match self {
            Self::BackupRef | Self::EnsureClean | Self::RebaseOntoUpstream { .. } => &[],
            Self::FetchAll => &[Dimension::Staleness],
            Self::AutoTrivialResolve | Self::ApplyPathStrategy | Self::UseMergeDriver => {
                &[Dimension::Conflicts]
            }
            Self::RebaseContinue => &[Dimension::Divergence, Dimension::InFlight],
            Self::RebaseAbort => &[Dimension::Conflicts, Dimension::InFlight],
            Self::RunTests => &[Dimension::Tests],
            Self::PushWithLease => &[Dimension::Push, Dimension::Divergence],
        }
    }

    /// Whether a failed execution of this action ends the run.
    pub const fn unrecoverable(&self) -> bool {
        matches!(self, Self::PushWithLease | Self::RebaseAbort)
    }

    /// Precondition predicate.
    pub fn applicable(&self, state: &RepoState, config: &Config) -> bool {
        match self {
            Self::BackupRef | Self::FetchAll => true,
            Self::EnsureClean => !state.working_tree_clean && state.conflicts.is_empty(),
            Self::RebaseOntoUpstream { .. } => {
                state.diverged_remote > 0
                    && !state.ongoing_rebase
                    && !state.ongoing_merge
                    && state.working_tree_clean
                    && state.head.tracking.is_some()
            }
            Self::AutoTrivialResolve => {
                state.ongoing_rebase
                    && config.strategy.enable_rerere
                    && state.conflicts.iter().any(ConflictDetail::is_fully_trivial)
            }
            Self::ApplyPathStrategy => {
                state.conflicts.iter().any(|c| path_rule_applies(c, config))
            }
            Self::UseMergeDriver => {
                state.conflicts.iter().any(|c| driver_rule_applies(c, config))
            }
            Self::RebaseContinue => state.ongoing_rebase && state.conflicts.is_empty(),
            Self::RebaseAbort => {
                state.ongoing_rebase
                    && config.safety.allow_rebase_abort
                    && state.conflicts.iter().any(|c| !resolvable(c, config))
            }
            Self::RunTests => {
                config.goal.tests_must_pass
                    && state.tests_last_result != crate::core::TestStatus::Passed
                    && state.working_tree_clean
                    && !state.in_flight()
                    && !config.safety.test_command.is_empty()
            }
            Self::PushWithLease => {
                state.has_unpushed_commits
                    && config.goal.push_required()
                    && config.safety.allow_force_push
                    && state.conflicts.is_empty()
                    && !state.in_flight()
                    && state.diverged_remote == 0
            }
        }
    }

    /// Pure effect transformer producing the expected post-state.
    pub fn predict(&self, state: &RepoState, config: &Config) -> RepoState {
        let mut next = state.clone();
        match self {
            Self::BackupRef => {}
            Self::EnsureClean => {
                next.working_tree_clean = true;
                next.staged_changes = false;
                next.stash_entries += 1;
            }
            Self::FetchAll => {
                next.staleness_score = 0.0;
            }
            Self::RebaseOntoUpstream { predicted_conflicts } => {
                next.ongoing_rebase = true;
                next.conflicts = predicted_conflicts.clone();
                if !predicted_conflicts.is_empty() {
                    next.working_tree_clean = false;
                }
            }
            Self::AutoTrivialResolve => {
                next.conflicts.retain(|c| !c.is_fully_trivial());
            }
            Self::ApplyPathStrategy => {
                next.conflicts.retain(|c| !path_rule_applies(c, config));
            }
            Self::UseMergeDriver => {
                next.conflicts.retain(|c| !driver_rule_applies(c, config));
            }
            Self::RebaseContinue => {
                next.ongoing_rebase = false;
                next.diverged_remote = 0;
                next.working_tree_clean = true;
                next.staged_changes = false;
                next.has_unpushed_commits =
                    state.has_unpushed_commits || state.diverged_local > 0;
            }
            Self::RebaseAbort => {
                next.ongoing_rebase = false;
                next.conflicts.clear();
                next.working_tree_clean = true;
                next.staged_changes = false;
            }
            Self::RunTests => {
                next.tests_last_result = crate::core::TestStatus::Passed;
            }
            Self::PushWithLease => {
                next.has_unpushed_commits = false;
                next.diverged_local = 0;
            }
        }
        next.recompute_derived()
    }

    /// Cost function: base cost plus state terms, times a risk penalty.
    pub fn cost(&self, state: &RepoState, config: &Config) -> f64 {
        let base = match self {
            Self::FetchAll => self.base_cost() + 0.05 * state.staleness_score.max(0.0),
            Self::RebaseOntoUpstream { predicted_conflicts } => {
                let difficulty: f64 =
                    predicted_conflicts.iter().map(ConflictDetail::difficulty).sum();
                self.base_cost() + 0.5 * difficulty
            }
            Self::AutoTrivialResolve => {
                let trivial_hunks: u32 = state
                    .conflicts
                    .iter()
                    .filter(|c| c.is_fully_trivial())
                    .map(|c| c.hunk_count)
                    .sum();
                self.base_cost() * f64::from(trivial_hunks.max(1))
            }
            Self::RunTests => {
                self.base_cost() + config.safety.max_test_runtime_sec as f64 / 600.0
            }
            _ => self.base_cost(),
        };

        if self.mutates_history() && state.risk_level == RiskLevel::High {
            base * HIGH_RISK_MULTIPLIER
        } else {
            base
        }
    }

    /// Declarative spec for this action at the given state.
    pub fn to_spec(&self, state: &RepoState, config: &Config) -> ActionSpec {
        let mut spec = ActionSpec::new(self.name(), self.cost(state, config))
            .with_rationale(self.rationale());
        match self {
            Self::FetchAll | Self::PushWithLease => {
                spec = spec.with_param("remote", "origin");
            }
            Self::RebaseOntoUpstream { predicted_conflicts } => {
                if let Some(tracking) = &state.head.tracking {
                    spec = spec.with_param("upstream", tracking.clone());
                }
                spec = spec
                    .with_param("predicted_conflicts", predicted_conflicts.len().to_string());
            }
            _ => {}
        }
        spec
    }

    /// Canned rationale line for plans and explanations.
    pub const fn rationale(&self) -> &'static str {
        match self {
            Self::BackupRef => "Record a recoverable snapshot before changing history.",
            Self::EnsureClean => "Stash local modifications so automated steps start clean.",
            Self::FetchAll => "Refresh remote tracking state before acting on divergence.",
            Self::RebaseOntoUpstream { .. } => "Replay local commits onto the tracking ref.",
            Self::AutoTrivialResolve => "Reuse recorded resolutions for trivial conflicts.",
            Self::ApplyPathStrategy => "Resolve matching paths with the configured side.",
            Self::UseMergeDriver => "Re-merge structured files with their merge driver.",
            Self::RebaseContinue => "Conflicts are clear; finish the rebase.",
            Self::RebaseAbort => "Back out of a rebase that cannot be completed safely.",
            Self::RunTests => "Confirm the rewritten history still passes the suite.",
            Self::PushWithLease => "Publish the rewritten branch, guarded by a lease.",
        }
    }

    const fn mutates_history(&self) -> bool {
        matches!(
            self,
            Self::EnsureClean
                | Self::RebaseOntoUpstream { .. }
                | Self::ApplyPathStrategy
                | Self::UseMergeDriver
                | Self::RebaseContinue
                | Self::RebaseAbort
                | Self::PushWithLease
        )
    }

    /// Execute the impure hook for this action. Returns a summary line for
    /// the step record.
    pub fn execute(
        &self,
        facade: &GitFacade,
        config: &Config,
        state: &RepoState,
    ) -> Result<String> {
        match self {
            Self::BackupRef => safety::create_backup_ref(facade),
            Self::EnsureClean => safety::ensure_clean_or_stash(facade),
            Self::FetchAll => sync::fetch_all(facade, "origin"),
            Self::RebaseOntoUpstream { .. } => rebase::rebase_onto_upstream(facade, state),
            Self::AutoTrivialResolve => conflict::auto_trivial_resolve(facade),
            Self::ApplyPathStrategy => {
                conflict::apply_path_strategy(facade, &state.conflicts, &config.strategy.rules)
            }
            Self::UseMergeDriver => conflict::use_merge_driver(facade, &state.conflicts, config),
            Self::RebaseContinue => rebase::rebase_continue(facade),
            Self::RebaseAbort => rebase::rebase_abort(facade),
            Self::RunTests => quality::run_tests(config),
            Self::PushWithLease => sync::push_with_lease(facade, config, "origin"),
        }
    }
}

/// Whether an ours/theirs rule covers this conflict.
fn path_rule_applies(conflict: &ConflictDetail, config: &Config) -> bool {
    match config.rule_for(&conflict.path) {
        Some(rule) => match rule.resolution {
            Resolution::Ours | Resolution::Theirs => match rule.when.as_deref() {
                Some("whitespace_only") => conflict.is_fully_trivial(),
                _ => true,
            },
            Resolution::MergeDriver(_) => false,
        },
        None => false,
    }
}

/// Whether a merge-driver rule covers this structured conflict.
fn driver_rule_applies(conflict: &ConflictDetail, config: &Config) -> bool {
    use crate::core::ConflictType;
    matches!(conflict.kind, ConflictType::Json | ConflictType::Yaml)
        && matches!(
            config.rule_for(&conflict.path).map(|r| &r.resolution),
            Some(Resolution::MergeDriver(_))
        )
}

/// Whether any registered action can clear this conflict.
fn resolvable(conflict: &ConflictDetail, config: &Config) -> bool {
    conflict.is_fully_trivial()
        || path_rule_applies(conflict, config)
        || driver_rule_applies(conflict, config)
}

/// Immutable catalogue of actions for one planning round.
#[derive(Debug, Clone)]
pub struct ActionRegistry {
    actions: Vec<ActionKind>,
}

impl ActionRegistry {
    /// Build the standard catalogue with a known rebase conflict prediction.
    pub fn with_prediction(predicted_conflicts: Vec<ConflictDetail>) -> Self {
        Self {
            actions: vec![
                ActionKind::BackupRef,
                ActionKind::EnsureClean,
                ActionKind::FetchAll,
                ActionKind::RebaseOntoUpstream { predicted_conflicts },
                ActionKind::AutoTrivialResolve,
                ActionKind::ApplyPathStrategy,
                ActionKind::UseMergeDriver,
                ActionKind::RebaseContinue,
                ActionKind::RebaseAbort,
                ActionKind::RunTests,
                ActionKind::PushWithLease,
            ],
        }
    }

    /// Build the catalogue for the current observation, running a merge
    /// preview when a rebase could be on the table.
    pub fn for_observation(
        facade: &GitFacade,
        state: &RepoState,
    ) -> Result<Self> {
        let mut predicted = Vec::new();
        if state.diverged_remote > 0 && !state.in_flight() {
            if let Some(tracking) = &state.head.tracking {
                let preview = crate::git::preview(facade, "HEAD", tracking)?;
                tracing::debug!(
                    conflicts = preview.conflicts.len(),
                    tree_id = ?preview.tree_id,
                    "merge preview for rebase prediction"
                );
                predicted = preview
                    .conflicts
                    .into_iter()
                    .map(|path| {
                        let kind = classify_path(&path);
                        ConflictDetail::new(path).with_kind(kind).with_hunks(1)
                    })
                    .collect();
            }
        }
        Ok(Self::with_prediction(predicted))
    }

    /// The catalogue in registration order.
    pub fn actions(&self) -> &[ActionKind] {
        &self.actions
    }

    /// Look up an action by name.
    pub fn get(&self, name: &str) -> Option<&ActionKind> {
        self.actions.iter().find(|action| action.name() == name)
    }

    /// Minimum base cost among actions reducing the given dimension.
    pub fn min_cost_reducing(&self, dimension: Dimension) -> Option<f64> {
        self.actions
            .iter()
            .filter(|action| action.reduces().contains(&dimension))
            .map(ActionKind::base_cost)
            .min_by(f64::total_cmp)
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::with_prediction(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ConflictType, GoalMode, RepoRef, StrategyRule, TestStatus};

    fn base_state() -> RepoState {
        RepoState::new("/tmp/repo", RepoRef::new("main").with_tracking("origin/main"))
            .recompute_derived()
    }

    fn config() -> Config {
        Config::default()
    }

    #[test]
    fn test_registry_contains_full_catalogue() {
        let registry = ActionRegistry::default();
        assert_eq!(registry.actions().len(), 11);
        assert!(registry.get("RebaseOntoUpstream").is_some());
        assert!(registry.get("NoSuchAction").is_none());
    }

    #[test]
    fn test_backup_ref_is_identity() {
        let state = base_state();
        let action = ActionKind::BackupRef;
        assert!(action.applicable(&state, &config()));
        assert_eq!(action.predict(&state, &config()), state);
    }

    #[test]
    fn test_ensure_clean_stashes() {
        let mut state = base_state();
        state.working_tree_clean = false;
        let state = state.recompute_derived();

        let action = ActionKind::EnsureClean;
        assert!(action.applicable(&state, &config()));
        let next = action.predict(&state, &config());
        assert!(next.working_tree_clean);
        assert!(!next.staged_changes);
        assert_eq!(next.stash_entries, 1);
    }

    #[test]
    fn test_ensure_clean_refuses_conflicted_tree() {
        let mut state = base_state();
        state.working_tree_clean = false;
        state.conflicts = vec![ConflictDetail::new("a.rs").with_hunks(1)];
        assert!(!ActionKind::EnsureClean.applicable(&state.recompute_derived(), &config()));
    }

    #[test]
    fn test_fetch_resets_staleness() {
        let mut state = base_state();
        state.staleness_score = 4.2;
        let next = ActionKind::FetchAll.predict(&state, &config());
        assert_eq!(next.staleness_score, 0.0);
    }

    #[test]
    fn test_rebase_preconditions() {
        let action = ActionKind::RebaseOntoUpstream { predicted_conflicts: Vec::new() };

        let mut behind = base_state();
        behind.diverged_remote = 3;
        assert!(action.applicable(&behind.clone().recompute_derived(), &config()));

        behind.ongoing_rebase = true;
        assert!(!action.applicable(&behind.clone().recompute_derived(), &config()));

        behind.ongoing_rebase = false;
        behind.working_tree_clean = false;
        assert!(!action.applicable(&behind.recompute_derived(), &config()));

        let mut untracked = base_state();
        untracked.diverged_remote = 3;
        untracked.head.tracking = None;
        assert!(!action.applicable(&untracked.recompute_derived(), &config()));
    }

    #[test]
    fn test_rebase_predicts_conflicts() {
        let predicted = vec![ConflictDetail::new("a.rs").with_hunks(2)];
        let action = ActionKind::RebaseOntoUpstream { predicted_conflicts: predicted };

        let mut state = base_state();
        state.diverged_remote = 2;
        let next = action.predict(&state.recompute_derived(), &config());
        assert!(next.ongoing_rebase);
        assert_eq!(next.conflicts.len(), 1);
        assert!(!next.working_tree_clean);
        assert!(next.conflict_difficulty > 0.0);
    }

    #[test]
    fn test_auto_trivial_removes_only_trivial() {
        let mut state = base_state();
        state.ongoing_rebase = true;
        state.working_tree_clean = false;
        state.conflicts = vec![
            ConflictDetail::new("trivial.rs").with_hunks(1).with_trivial_ratio(1.0),
            ConflictDetail::new("hard.rs").with_hunks(3),
        ];
        let state = state.recompute_derived();

        let action = ActionKind::AutoTrivialResolve;
        assert!(action.applicable(&state, &config()));
        let next = action.predict(&state, &config());
        assert_eq!(next.conflicts.len(), 1);
        assert_eq!(next.conflicts[0].path, "hard.rs");

        let mut disabled = config();
        disabled.strategy.enable_rerere = false;
        assert!(!action.applicable(&state, &disabled));
    }

    #[test]
    fn test_path_strategy_follows_rules() {
        let mut cfg = config();
        cfg.strategy.rules =
            vec![StrategyRule::new("**/*.lock", crate::core::Resolution::Theirs)];

        let mut state = base_state();
        state.ongoing_rebase = true;
        state.working_tree_clean = false;
        state.conflicts = vec![
            ConflictDetail::new("Cargo.lock").with_hunks(1).with_kind(ConflictType::Lock),
            ConflictDetail::new("src/lib.rs").with_hunks(1),
        ];
        let state = state.recompute_derived();

        let action = ActionKind::ApplyPathStrategy;
        assert!(action.applicable(&state, &cfg));
        let next = action.predict(&state, &cfg);
        assert_eq!(next.conflicts.len(), 1);
        assert_eq!(next.conflicts[0].path, "src/lib.rs");

        assert!(!action.applicable(&state, &config()));
    }

    #[test]
    fn test_merge_driver_covers_structured_conflicts() {
        let mut cfg = config();
        cfg.strategy.rules = vec![StrategyRule::new(
            "**/*.json",
            crate::core::Resolution::MergeDriver("jsonmerge".to_string()),
        )];

        let mut state = base_state();
        state.ongoing_merge = true;
        state.working_tree_clean = false;
        state.conflicts =
            vec![ConflictDetail::new("app.json").with_hunks(2).with_kind(ConflictType::Json)];
        let state = state.recompute_derived();

        let action = ActionKind::UseMergeDriver;
        assert!(action.applicable(&state, &cfg));
        assert!(action.predict(&state, &cfg).conflicts.is_empty());
        assert!(!ActionKind::ApplyPathStrategy.applicable(&state, &cfg));
    }

    #[test]
    fn test_rebase_continue_clears_divergence() {
        let mut state = base_state();
        state.ongoing_rebase = true;
        state.diverged_remote = 3;
        state.diverged_local = 2;
        state.working_tree_clean = false;
        let state = state.recompute_derived();

        let action = ActionKind::RebaseContinue;
        assert!(action.applicable(&state, &config()));
        let next = action.predict(&state, &config());
        assert!(!next.ongoing_rebase);
        assert_eq!(next.diverged_remote, 0);
        assert!(next.working_tree_clean);
        assert!(next.has_unpushed_commits);
    }

    #[test]
    fn test_rebase_abort_requires_opt_in() {
        let mut state = base_state();
        state.ongoing_rebase = true;
        state.working_tree_clean = false;
        state.conflicts = vec![ConflictDetail::new("logo.png")
            .with_hunks(1)
            .with_kind(ConflictType::Binary)];
        let state = state.recompute_derived();

        assert!(!ActionKind::RebaseAbort.applicable(&state, &config()));

        let mut cfg = config();
        cfg.safety.allow_rebase_abort = true;
        assert!(ActionKind::RebaseAbort.applicable(&state, &cfg));

        let next = ActionKind::RebaseAbort.predict(&state, &cfg);
        assert!(!next.ongoing_rebase);
        assert!(next.conflicts.is_empty());
    }

    #[test]
    fn test_run_tests_requires_command_and_goal() {
        let mut state = base_state();
        state.tests_last_result = TestStatus::Unknown;

        let mut cfg = config();
        cfg.goal.tests_must_pass = true;
        assert!(!ActionKind::RunTests.applicable(&state, &cfg));

        cfg.safety.test_command = "cargo test".to_string();
        assert!(ActionKind::RunTests.applicable(&state, &cfg));

        let next = ActionKind::RunTests.predict(&state, &cfg);
        assert_eq!(next.tests_last_result, TestStatus::Passed);
        assert!(!ActionKind::RunTests.applicable(&next, &cfg));
    }

    #[test]
    fn test_push_gated_by_policy() {
        let mut state = base_state();
        state.has_unpushed_commits = true;
        state.diverged_local = 2;
        let state = state.recompute_derived();

        let mut cfg = config();
        cfg.goal.mode = GoalMode::PushWithLease;
        assert!(!ActionKind::PushWithLease.applicable(&state, &cfg));

        cfg.safety.allow_force_push = true;
        assert!(ActionKind::PushWithLease.applicable(&state, &cfg));

        let next = ActionKind::PushWithLease.predict(&state, &cfg);
        assert!(!next.has_unpushed_commits);
        assert_eq!(next.diverged_local, 0);

        let mut behind = state;
        behind.diverged_remote = 1;
        assert!(!ActionKind::PushWithLease.applicable(&behind.recompute_derived(), &cfg));
    }

    #[test]
    fn test_costs_are_non_negative_and_risk_scaled() {
        let mut state = base_state();
        state.ongoing_rebase = true;
        state.working_tree_clean = false;
        state.conflicts = vec![ConflictDetail::new("a.rs").with_hunks(2)];
        let high_risk = state.recompute_derived();
        let cfg = config();

        for action in ActionRegistry::default().actions() {
            assert!(action.cost(&high_risk, &cfg) >= 0.0, "{}", action.name());
            assert!(action.cost(&base_state(), &cfg) >= 0.0, "{}", action.name());
        }

        let continue_cheap = ActionKind::RebaseContinue.cost(&base_state(), &cfg);
        let continue_risky = ActionKind::RebaseContinue.cost(&high_risk, &cfg);
        assert!(continue_risky > continue_cheap);
    }

    #[test]
    fn test_rebase_cost_tracks_predicted_difficulty() {
        let state = base_state();
        let cfg = config();
        let clean = ActionKind::RebaseOntoUpstream { predicted_conflicts: Vec::new() };
        let messy = ActionKind::RebaseOntoUpstream {
            predicted_conflicts: vec![ConflictDetail::new("a.rs").with_hunks(4)],
        };
        assert!(messy.cost(&state, &cfg) > clean.cost(&state, &cfg));
    }

    #[test]
    fn test_min_cost_reducing_dimensions() {
        let registry = ActionRegistry::default();
        assert_eq!(registry.min_cost_reducing(Dimension::Conflicts), Some(0.1));
        assert_eq!(registry.min_cost_reducing(Dimension::Divergence), Some(0.3));
        assert_eq!(registry.min_cost_reducing(Dimension::InFlight), Some(0.3));
        assert_eq!(registry.min_cost_reducing(Dimension::Staleness), Some(0.3));
        assert_eq!(registry.min_cost_reducing(Dimension::Tests), Some(3.0));
        assert_eq!(registry.min_cost_reducing(Dimension::Push), Some(1.0));
    }

    #[test]
    fn test_predictions_never_go_negative() {
        let cfg = config();
        let mut state = base_state();
        state.diverged_remote = 1;
        state.conflicts = vec![ConflictDetail::new("x.rs").with_hunks(1)];
        state.ongoing_rebase = true;
        state.working_tree_clean = false;
        let state = state.recompute_derived();

        for action in ActionRegistry::default().actions() {
            if action.applicable(&state, &cfg) {
                let next = action.predict(&state, &cfg);
                assert!(next.conflict_difficulty >= 0.0);
                assert!(next.staleness_score >= 0.0);
            }
        }
    }
}
