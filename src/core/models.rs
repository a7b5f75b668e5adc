//! Core data model.
//!
//! Every state-carrying value here is an immutable snapshot: transitions
//! produce new values, identity is structural equality. The planner's closed
//! set and the executor's drift comparison both rely on that.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Assessed risk for a repository state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl Default for RiskLevel {
    fn default() -> Self {
        Self::Low
    }
}

/// Conflict categories used to tune resolution strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    Text,
    Json,
    Yaml,
    Lock,
    Binary,
}

impl ConflictType {
    /// Difficulty weight applied when summing per-hunk difficulty.
    pub const fn difficulty_weight(self) -> f64 {
        match self {
            Self::Text => 1.0,
            Self::Json | Self::Yaml => 0.7,
            Self::Lock => 0.4,
            Self::Binary => 2.5,
        }
    }

    /// Short name for digests and log records.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Lock => "lock",
            Self::Binary => "binary",
        }
    }
}

impl Default for ConflictType {
    fn default() -> Self {
        Self::Text
    }
}

/// Goal modes, ordered by how much they demand from the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalMode {
    ResolveOnly,
    RebaseToUpstream,
    PushWithLease,
}

impl Default for GoalMode {
    fn default() -> Self {
        Self::RebaseToUpstream
    }
}

/// Outcome of the most recent test run, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    Unknown,
    Passed,
    Failed,
}

impl Default for TestStatus {
    fn default() -> Self {
        Self::Unknown
    }
}

impl TestStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Passed => "passed",
            Self::Failed => "failed",
        }
    }
}

/// Named reference with optional upstream tracking ref and resolved commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoRef {
    /// Branch name, or "HEAD" when detached
    pub name: String,

    /// Upstream tracking reference, e.g. "origin/main"
    pub tracking: Option<String>,

    /// Resolved commit id of the ref
    pub commit: Option<String>,
}

impl RepoRef {
    /// Create a ref with just a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), tracking: None, commit: None }
    }

    /// Set the tracking reference.
    #[must_use]
    pub fn with_tracking(mut self, tracking: impl Into<String>) -> Self {
        self.tracking = Some(tracking.into());
        self
    }

    /// Set the resolved commit id.
    #[must_use]
    pub fn with_commit(mut self, commit: impl Into<String>) -> Self {
        self.commit = Some(commit.into());
        self
    }
}

/// One conflicted path and what we know about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictDetail {
    /// Repository-relative path
    pub path: String,

    /// Estimated number of conflict regions in the working copy
    pub hunk_count: u32,

    /// Conflict category derived from the path and content
    pub kind: ConflictType,

    /// Share of hunks resolvable by rule, in [0, 1]
    pub trivial_ratio: f64,

    /// Resolution hint from the first matching strategy rule
    pub preferred_resolution: Option<String>,
}

impl ConflictDetail {
    /// Create a conflict detail with defaults for the estimated fields.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            hunk_count: 0,
            kind: ConflictType::Text,
            trivial_ratio: 0.0,
            preferred_resolution: None,
        }
    }

    /// Set the hunk count.
    #[must_use]
    pub fn with_hunks(mut self, hunk_count: u32) -> Self {
        self.hunk_count = hunk_count;
        self
    }

    /// Set the conflict type.
    #[must_use]
    pub fn with_kind(mut self, kind: ConflictType) -> Self {
        self.kind = kind;
        self
    }

    /// Set the triviality ratio, clamped into [0, 1].
    #[must_use]
    pub fn with_trivial_ratio(mut self, ratio: f64) -> Self {
        self.trivial_ratio = ratio.clamp(0.0, 1.0);
        self
    }

    /// Set the preferred resolution hint.
    #[must_use]
    pub fn with_preferred(mut self, resolution: impl Into<String>) -> Self {
        self.preferred_resolution = Some(resolution.into());
        self
    }

    /// Weighted difficulty contribution of this conflict.
    pub fn difficulty(&self) -> f64 {
        f64::from(self.hunk_count)
            * (1.0 - self.trivial_ratio.clamp(0.0, 1.0))
            * self.kind.difficulty_weight()
    }

    /// Whether every hunk in this conflict is rule-resolvable.
    pub fn is_fully_trivial(&self) -> bool {
        self.hunk_count > 0 && self.trivial_ratio >= 1.0 && self.kind != ConflictType::Binary
    }
}

/// Immutable observation snapshot of the repository.
///
/// Derived fields (`conflict_difficulty`, `risk_level`) are recomputed by
/// [`RepoState::recompute_derived`] whenever the snapshot is reconstructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoState {
    /// Repository root path
    pub repo_path: PathBuf,

    /// Current head reference
    pub head: RepoRef,

    /// Commits ahead of the tracking ref
    pub diverged_local: u32,

    /// Commits behind the tracking ref
    pub diverged_remote: u32,

    /// Whether the working tree has no modifications or untracked files
    pub working_tree_clean: bool,

    /// Whether the index holds staged changes
    pub staged_changes: bool,

    /// Whether a rebase is in flight
    pub ongoing_rebase: bool,

    /// Whether a merge is in flight
    pub ongoing_merge: bool,

    /// Number of stash entries
    pub stash_entries: u32,

    /// Conflicted paths, in status order
    pub conflicts: Vec<ConflictDetail>,

    /// Sum of weighted per-hunk difficulty over all conflicts
    pub conflict_difficulty: f64,

    /// Outcome of the most recent test run
    pub tests_last_result: TestStatus,

    /// Whether local commits exist that the remote does not have
    pub has_unpushed_commits: bool,

    /// Monotone function of remote divergence and time since last fetch
    pub staleness_score: f64,

    /// Risk level derived from the fields above
    pub risk_level: RiskLevel,
}

impl RepoState {
    /// Create a clean baseline state for the given repository root.
    pub fn new(repo_path: impl Into<PathBuf>, head: RepoRef) -> Self {
        Self {
            repo_path: repo_path.into(),
            head,
            diverged_local: 0,
            diverged_remote: 0,
            working_tree_clean: true,
            staged_changes: false,
            ongoing_rebase: false,
            ongoing_merge: false,
            stash_entries: 0,
            conflicts: Vec::new(),
            conflict_difficulty: 0.0,
            tests_last_result: TestStatus::Unknown,
            has_unpushed_commits: false,
            staleness_score: 0.0,
            risk_level: RiskLevel::Low,
        }
    }

    /// Whether a rebase or merge is in flight.
    pub const fn in_flight(&self) -> bool {
        self.ongoing_rebase || self.ongoing_merge
    }

    /// Recompute the derived fields from the observed ones.
    ///
    /// Must be called after any field-level reconstruction so that
    /// `conflict_difficulty` and `risk_level` stay consistent.
    #[must_use]
    pub fn recompute_derived(mut self) -> Self {
        self.conflict_difficulty =
            self.conflicts.iter().map(ConflictDetail::difficulty).sum::<f64>();
        self.risk_level = if !self.conflicts.is_empty() {
            RiskLevel::High
        } else if self.in_flight() || !self.working_tree_clean || self.staged_changes {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };
        self
    }

    /// Canonical digest over all fields, used as the planner's closed-set key.
    pub fn digest(&self) -> String {
        let mut canonical = String::new();
        canonical.push_str(&self.head.name);
        canonical.push('|');
        canonical.push_str(self.head.tracking.as_deref().unwrap_or("-"));
        canonical.push('|');
        canonical.push_str(&format!(
            "{}|{}|{}|{}|{}|{}|{}",
            self.diverged_local,
            self.diverged_remote,
            self.working_tree_clean,
            self.staged_changes,
            self.ongoing_rebase,
            self.ongoing_merge,
            self.stash_entries,
        ));
        for conflict in &self.conflicts {
            canonical.push_str(&format!(
                "|{}:{}:{}:{:.4}",
                conflict.path,
                conflict.hunk_count,
                conflict.kind.as_str(),
                conflict.trivial_ratio,
            ));
        }
        canonical.push_str(&format!(
            "|{}|{}|{:.4}|{:.4}",
            self.tests_last_result.as_str(),
            self.has_unpushed_commits,
            self.staleness_score,
            self.conflict_difficulty,
        ));
        hash_hex(&canonical)
    }

    /// Digest over the safety-relevant fields only.
    ///
    /// Conflict path set, in-flight flags, diverged counts, and tree
    /// cleanliness: the fields the executor compares between predicted and
    /// observed states.
    pub fn safety_digest(&self) -> String {
        let mut paths: Vec<&str> = self.conflicts.iter().map(|c| c.path.as_str()).collect();
        paths.sort_unstable();
        let canonical = format!(
            "{}|{}|{}|{}|{}|{}|{}",
            paths.join(","),
            self.ongoing_rebase,
            self.ongoing_merge,
            self.diverged_local,
            self.diverged_remote,
            self.working_tree_clean,
            self.staged_changes,
        );
        hash_hex(&canonical)
    }

    /// Sorted conflict path set, for drift comparison.
    pub fn conflict_paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.conflicts.iter().map(|c| c.path.as_str()).collect();
        paths.sort_unstable();
        paths
    }
}

fn hash_hex(canonical: &str) -> String {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    canonical.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// The user-declared goal predicate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoalSpec {
    /// Goal mode
    pub mode: GoalMode,

    /// Whether the goal requires a passing test run
    pub tests_must_pass: bool,

    /// Whether the goal requires local commits to be lease-pushed
    pub push_with_lease: bool,
}

impl GoalSpec {
    /// Whether reaching the goal requires a push.
    pub fn push_required(&self) -> bool {
        self.push_with_lease || self.mode == GoalMode::PushWithLease
    }

    /// Whether a state satisfies this goal.
    pub fn is_satisfied(&self, state: &RepoState) -> bool {
        if !state.conflicts.is_empty() || state.in_flight() {
            return false;
        }
        if !state.working_tree_clean || state.staged_changes {
            return false;
        }
        if self.mode >= GoalMode::RebaseToUpstream && state.diverged_remote > 0 {
            return false;
        }
        if self.tests_must_pass && state.tests_last_result != TestStatus::Passed {
            return false;
        }
        if self.push_required() && state.has_unpushed_commits {
            return false;
        }
        true
    }
}

/// A planned action: a declarative edge chosen by the planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSpec {
    /// Action name, unique within a plan
    pub name: String,

    /// Free-form parameters attached by the registry
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,

    /// Cost charged for this edge
    pub cost: f64,

    /// Human-readable rationale
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl ActionSpec {
    /// Create a spec with a name and cost.
    pub fn new(name: impl Into<String>, cost: f64) -> Self {
        Self { name: name.into(), params: BTreeMap::new(), cost, rationale: None }
    }

    /// Attach a parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Attach a rationale.
    #[must_use]
    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }
}

/// An ordered plan with its estimated cost and explanation notes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Actions in execution order
    pub actions: Vec<ActionSpec>,

    /// Sum of edge costs
    pub estimated_cost: f64,

    /// Free-form explanation lines, in plan order
    pub notes: Vec<String>,
}

impl Plan {
    /// An empty plan (the goal already holds).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether the plan contains no actions.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
