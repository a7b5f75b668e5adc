//! Configuration loading and validation.
//!
//! The `Config` value is constructed once (TOML file plus CLI overrides),
//! validated, frozen, and passed by shared reference thereafter. No
//! subsystem mutates it.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::models::GoalSpec;

/// Conflict marker style to configure for merges and rebases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictStyle {
    Merge,
    Diff3,
    Zdiff3,
}

impl Default for ConflictStyle {
    fn default() -> Self {
        Self::Zdiff3
    }
}

impl ConflictStyle {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Diff3 => "diff3",
            Self::Zdiff3 => "zdiff3",
        }
    }
}

/// How a strategy rule resolves matching conflicts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Resolution {
    /// Keep our side
    Ours,
    /// Take their side
    Theirs,
    /// Delegate to a named merge driver
    MergeDriver(String),
}

impl TryFrom<String> for Resolution {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "ours" => Ok(Self::Ours),
            "theirs" => Ok(Self::Theirs),
            other => match other.strip_prefix("merge-driver:") {
                Some(name) if !name.is_empty() => Ok(Self::MergeDriver(name.to_string())),
                _ => Err(format!("unknown resolution '{other}'")),
            },
        }
    }
}

impl From<Resolution> for String {
    fn from(value: Resolution) -> Self {
        match value {
            Resolution::Ours => "ours".to_string(),
            Resolution::Theirs => "theirs".to_string(),
            Resolution::MergeDriver(name) => format!("merge-driver:{name}"),
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ours => f.write_str("ours"),
            Self::Theirs => f.write_str("theirs"),
            Self::MergeDriver(name) => write!(f, "merge-driver:{name}"),
        }
    }
}

/// A path-matching rule hinting how conflicts should be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyRule {
    /// Repository-relative glob pattern
    pub pattern: String,

    /// Resolution applied to matching paths
    pub resolution: Resolution,

    /// Optional guard, e.g. "whitespace_only"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,
}

impl StrategyRule {
    /// Create a rule from a pattern and resolution.
    pub fn new(pattern: impl Into<String>, resolution: Resolution) -> Self {
        Self { pattern: pattern.into(), resolution, when: None }
    }

    /// Whether this rule matches a repository-relative path.
    ///
    /// A leading `**/` also matches paths at the repository root, so
    /// `**/*.lock` covers both `Cargo.lock` and `sub/dir/Cargo.lock`.
    pub fn matches(&self, path: &str) -> bool {
        if wildcard_match(&self.pattern, path) {
            return true;
        }
        if let Some(rest) = self.pattern.strip_prefix("**/") {
            return wildcard_match(rest, path);
        }
        false
    }
}

/// Wildcard matcher where `*` matches any run of characters (including
/// path separators) and `?` matches exactly one.
fn wildcard_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0usize, 0usize);
    let (mut star, mut mark) = (usize::MAX, 0usize);
    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = pi;
            mark = ti;
            pi += 1;
        } else if star != usize::MAX {
            pi = star + 1;
            mark += 1;
            ti = mark;
        } else {
            return false;
        }
    }
    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}

/// Conflict strategy settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Whether to reuse recorded resolutions (git rerere)
    pub enable_rerere: bool,

    /// Conflict marker style
    pub conflict_style: ConflictStyle,

    /// Ordered resolution rules, first match wins
    pub rules: Vec<StrategyRule>,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self { enable_rerere: true, conflict_style: ConflictStyle::Zdiff3, rules: Vec::new() }
    }
}

/// Safety gates for mutating operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    /// Suppress every mutating subprocess, journaling it instead
    pub dry_run: bool,

    /// Whether lease pushes are permitted at all
    pub allow_force_push: bool,

    /// Whether the planner may schedule RebaseAbort on its own
    pub allow_rebase_abort: bool,

    /// Upper bound for a test run, in seconds
    pub max_test_runtime_sec: u64,

    /// Shell command that runs the test suite; empty disables RunTests
    pub test_command: String,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            dry_run: true,
            allow_force_push: false,
            allow_rebase_abort: false,
            max_test_runtime_sec: 600,
            test_command: String::new(),
        }
    }
}

/// Planner tuning: heuristic coefficients and search bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Weight per open conflict
    pub alpha: f64,

    /// Weight per diverged commit (local + remote)
    pub beta: f64,

    /// Weight while a rebase or merge is in flight
    pub gamma: f64,

    /// Weight per unit of staleness
    pub delta: f64,

    /// Weight while a required test run is outstanding
    pub epsilon: f64,

    /// Weight while a required push is outstanding
    pub zeta: f64,

    /// Maximum number of node expansions per search
    pub max_expansions: u32,

    /// Maximum number of actions in a returned plan
    pub max_plan_length: u32,

    /// Maximum replans per execution before giving up
    pub max_replans: u32,

    /// Timeout for observation commands, in seconds
    pub observe_timeout_sec: u64,

    /// Timeout for mutating commands, in seconds
    pub mutate_timeout_sec: u64,

    /// Allowed drift in diverged counts between prediction and observation
    pub drift_divergence_tolerance: u32,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            beta: 1.2,
            gamma: 0.5,
            delta: 0.3,
            epsilon: 1.0,
            zeta: 0.5,
            max_expansions: 5_000,
            max_plan_length: 32,
            max_replans: 3,
            observe_timeout_sec: 30,
            mutate_timeout_sec: 120,
            drift_divergence_tolerance: 1,
        }
    }
}

/// Top-level configuration, validated from TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Goal declaration
    pub goal: GoalSpec,

    /// Conflict strategy settings
    pub strategy: StrategyConfig,

    /// Safety gates
    pub safety: SafetyConfig,

    /// Planner tuning
    pub planner: PlannerConfig,
}

impl Config {
    /// Load configuration for a repository.
    ///
    /// Order: explicit `--config` path if given, else `goapgit.toml` at the
    /// repository root, else `~/.config/goapgit/goapgit.toml`, else
    /// defaults. The first file found wins; files are not merged.
    pub fn load(repo_root: &Path, explicit: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_file(path);
        }

        let project = repo_root.join("goapgit.toml");
        if project.exists() {
            tracing::debug!(path = %project.display(), "loading project config");
            return Self::load_from_file(&project);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user = config_dir.join("goapgit").join("goapgit.toml");
            if user.exists() {
                tracing::debug!(path = %user.display(), "loading user config");
                return Self::load_from_file(&user);
            }
        }

        Ok(Self::default())
    }

    /// Load and validate configuration from a specific file.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate().map_err(|detail| anyhow::anyhow!("{}: {detail}", path.display()))?;
        Ok(config)
    }

    /// Reject structurally invalid configurations.
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("alpha", self.planner.alpha),
            ("beta", self.planner.beta),
            ("gamma", self.planner.gamma),
            ("delta", self.planner.delta),
            ("epsilon", self.planner.epsilon),
            ("zeta", self.planner.zeta),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("planner.{name} must be a non-negative number"));
            }
        }
        if self.planner.max_plan_length == 0 {
            return Err("planner.max_plan_length must be at least 1".to_string());
        }
        if self.planner.max_expansions == 0 {
            return Err("planner.max_expansions must be at least 1".to_string());
        }
        Ok(())
    }

    /// First strategy rule matching a path, if any.
    pub fn rule_for(&self, path: &str) -> Option<&StrategyRule> {
        self.strategy.rules.iter().find(|rule| rule.matches(path))
    }

    /// Timeout applied to observation commands.
    pub fn observe_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.planner.observe_timeout_sec)
    }

    /// Timeout applied to mutating commands.
    pub fn mutate_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.planner.mutate_timeout_sec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.safety.dry_run);
        assert!(!config.safety.allow_force_push);
        assert!(config.strategy.enable_rerere);
        assert_eq!(config.strategy.conflict_style, ConflictStyle::Zdiff3);
        assert_eq!(config.planner.max_expansions, 5_000);
        assert_eq!(config.planner.max_plan_length, 32);
        assert_eq!(config.planner.max_replans, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_toml() {
        let toml = r#"
            [goal]
            mode = "push_with_lease"
            tests_must_pass = true
            push_with_lease = true

            [strategy]
            enable_rerere = false
            conflict_style = "diff3"

            [[strategy.rules]]
            pattern = "**/*.lock"
            resolution = "theirs"

            [[strategy.rules]]
            pattern = "config/*.json"
            resolution = "merge-driver:jsonmerge"
            when = "whitespace_only"

            [safety]
            dry_run = false
            allow_force_push = true

            [planner]
            alpha = 2.0
            max_expansions = 100
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.goal.mode, crate::core::GoalMode::PushWithLease);
        assert!(config.goal.tests_must_pass);
        assert!(!config.strategy.enable_rerere);
        assert_eq!(config.strategy.rules.len(), 2);
        assert_eq!(config.strategy.rules[0].resolution, Resolution::Theirs);
        assert_eq!(
            config.strategy.rules[1].resolution,
            Resolution::MergeDriver("jsonmerge".to_string())
        );
        assert!(config.safety.allow_force_push);
        assert_eq!(config.planner.alpha, 2.0);
        assert_eq!(config.planner.max_expansions, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_unknown_resolution() {
        let toml = r#"
            [[strategy.rules]]
            pattern = "*.txt"
            resolution = "both"
        "#;
        assert!(toml::from_str::<Config>(toml).is_err());
    }

    #[test]
    fn test_validate_rejects_negative_coefficients() {
        let mut config = Config::default();
        config.planner.beta = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rule_matching() {
        let rule = StrategyRule::new("**/*.lock", Resolution::Theirs);
        assert!(rule.matches("Cargo.lock"));
        assert!(rule.matches("nested/dir/yarn.lock"));
        assert!(!rule.matches("src/main.rs"));

        let exact = StrategyRule::new("config/settings.json", Resolution::Ours);
        assert!(exact.matches("config/settings.json"));
        assert!(!exact.matches("other/settings.json"));

        let question = StrategyRule::new("file?.txt", Resolution::Ours);
        assert!(question.matches("file1.txt"));
        assert!(!question.matches("file12.txt"));
    }

    #[test]
    fn test_rule_for_first_match_wins() {
        let mut config = Config::default();
        config.strategy.rules = vec![
            StrategyRule::new("**/*.lock", Resolution::Theirs),
            StrategyRule::new("*", Resolution::Ours),
        ];
        let rule = config.rule_for("a/b.lock").unwrap();
        assert_eq!(rule.resolution, Resolution::Theirs);
        let fallback = config.rule_for("src/lib.rs").unwrap();
        assert_eq!(fallback.resolution, Resolution::Ours);
    }

    #[test]
    fn test_resolution_round_trip() {
        for text in ["ours", "theirs", "merge-driver:json"] {
            let parsed = Resolution::try_from(text.to_string()).unwrap();
            assert_eq!(String::from(parsed), text);
        }
        assert!(Resolution::try_from("merge-driver:".to_string()).is_err());
    }
}
