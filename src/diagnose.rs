//! Repository health diagnosis.
//!
//! Checks recommended git configuration for conflict-heavy workflows and
//! gathers size statistics to flag repositories where rebase automation
//! needs extra care.

use serde::{Deserialize, Serialize};

use crate::core::Result;
use crate::git::GitFacade;

/// Working trees above this tracked-file count get large-repo guidance.
const TRACKED_FILE_THRESHOLD: u64 = 100_000;

/// Pack sizes above this many KiB (about 1 GiB) get large-repo guidance.
const SIZE_PACK_THRESHOLD_KIB: u64 = 1_000_000;

/// Histories above this commit count get large-repo guidance.
const COMMIT_COUNT_THRESHOLD: u64 = 50_000;

const RECOMMENDED_SETTINGS: &[(&str, &str)] = &[
    ("merge.conflictStyle", "zdiff3"),
    ("rerere.enabled", "true"),
    ("pull.rebase", "true"),
];

/// State of one recommended git configuration key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitConfigCheck {
    /// Configuration key
    pub key: String,

    /// Recommended value
    pub recommended: String,

    /// Detected value, if set
    pub detected: Option<String>,

    /// Whether the detected value matches the recommendation
    pub matches_recommendation: bool,
}

/// Aggregated repository statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoStats {
    /// Number of tracked files
    pub tracked_files: Option<u64>,

    /// Packed object size in KiB
    pub size_pack_kib: Option<u64>,

    /// Loose object size in KiB
    pub size_loose_kib: Option<u64>,

    /// Total commits reachable from HEAD
    pub commit_count: Option<u64>,
}

/// Advice for handling large repositories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LargeRepoGuidance {
    /// Whether any threshold tripped
    pub triggered: bool,

    /// Which thresholds tripped
    pub reasons: Vec<String>,

    /// Suggested mitigations
    pub suggestions: Vec<String>,
}

/// Full diagnosis report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnoseReport {
    /// Recommended-setting checks
    pub git_config: Vec<GitConfigCheck>,

    /// Repository statistics, when gatherable
    pub repo_stats: Option<RepoStats>,

    /// Large-repository guidance
    pub large_repo_guidance: LargeRepoGuidance,
}

/// Collect git configuration status and repository statistics.
pub fn generate_diagnosis(facade: &GitFacade) -> Result<DiagnoseReport> {
    let mut git_config = Vec::new();
    for (key, recommended) in RECOMMENDED_SETTINGS {
        let detected = facade.config_get(key)?;
        let matches_recommendation =
            detected.as_deref().is_some_and(|value| value.eq_ignore_ascii_case(recommended));
        git_config.push(GitConfigCheck {
            key: (*key).to_string(),
            recommended: (*recommended).to_string(),
            detected,
            matches_recommendation,
        });
    }

    let repo_stats = gather_repo_stats(facade);
    let large_repo_guidance = build_guidance(repo_stats.as_ref());

    Ok(DiagnoseReport { git_config, repo_stats, large_repo_guidance })
}

fn gather_repo_stats(facade: &GitFacade) -> Option<RepoStats> {
    let count_output = facade.run(&["count-objects", "-v"]).ok()?;
    let mut stats = parse_count_objects(&count_output.stdout);

    if let Ok(output) = facade.run(&["ls-files"]) {
        stats.tracked_files =
            Some(output.stdout.lines().filter(|line| !line.is_empty()).count() as u64);
    }
    if let Ok(output) = facade.run_unchecked(&["rev-list", "--count", "HEAD"]) {
        if output.success() {
            stats.commit_count = output.stdout.trim().parse().ok();
        }
    }

    Some(stats)
}

fn parse_count_objects(stdout: &str) -> RepoStats {
    let mut stats = RepoStats::default();
    for line in stdout.lines() {
        let Some((key, value)) = line.split_once(": ") else { continue };
        match key.trim() {
            "size-pack" => stats.size_pack_kib = value.trim().parse().ok(),
            "size" => stats.size_loose_kib = value.trim().parse().ok(),
            _ => {}
        }
    }
    stats
}

fn build_guidance(stats: Option<&RepoStats>) -> LargeRepoGuidance {
    let Some(stats) = stats else {
        return LargeRepoGuidance::default();
    };

    let mut reasons = Vec::new();
    if stats.tracked_files.is_some_and(|count| count > TRACKED_FILE_THRESHOLD) {
        reasons.push(format!(
            "tracked files exceed {TRACKED_FILE_THRESHOLD} ({})",
            stats.tracked_files.unwrap_or(0)
        ));
    }
    if stats.size_pack_kib.is_some_and(|size| size > SIZE_PACK_THRESHOLD_KIB) {
        reasons.push(format!(
            "pack size exceeds {SIZE_PACK_THRESHOLD_KIB} KiB ({})",
            stats.size_pack_kib.unwrap_or(0)
        ));
    }
    if stats.commit_count.is_some_and(|count| count > COMMIT_COUNT_THRESHOLD) {
        reasons.push(format!(
            "commit count exceeds {COMMIT_COUNT_THRESHOLD} ({})",
            stats.commit_count.unwrap_or(0)
        ));
    }

    let triggered = !reasons.is_empty();
    let suggestions = if triggered {
        vec![
            "Enable commit-graph writes: git config fetch.writeCommitGraph true".to_string(),
            "Consider a partial clone (--filter=blob:none) for fresh checkouts".to_string(),
            "Use sparse-checkout to narrow the working tree".to_string(),
            "Keep fetches pruned so stale refs do not accumulate".to_string(),
        ]
    } else {
        Vec::new()
    };

    LargeRepoGuidance { triggered, reasons, suggestions }
}

/// Serialise the report to JSON.
pub fn report_to_json(report: &DiagnoseReport, pretty: bool) -> serde_json::Result<String> {
    if pretty {
        serde_json::to_string_pretty(report)
    } else {
        serde_json::to_string(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_count_objects() {
        let stdout = "\
count: 12
size: 48
in-pack: 3456
packs: 1
size-pack: 2048
prune-packable: 0
garbage: 0
size-garbage: 0
";
        let stats = parse_count_objects(stdout);
        assert_eq!(stats.size_pack_kib, Some(2048));
        assert_eq!(stats.size_loose_kib, Some(48));
        assert!(stats.tracked_files.is_none());
    }

    #[test]
    fn test_guidance_quiet_for_small_repos() {
        let stats = RepoStats {
            tracked_files: Some(1_200),
            size_pack_kib: Some(4_000),
            size_loose_kib: Some(10),
            commit_count: Some(900),
        };
        let guidance = build_guidance(Some(&stats));
        assert!(!guidance.triggered);
        assert!(guidance.reasons.is_empty());
        assert!(guidance.suggestions.is_empty());
    }

    #[test]
    fn test_guidance_triggers_on_thresholds() {
        let stats = RepoStats {
            tracked_files: Some(150_000),
            size_pack_kib: Some(2_000_000),
            size_loose_kib: Some(10),
            commit_count: Some(60_000),
        };
        let guidance = build_guidance(Some(&stats));
        assert!(guidance.triggered);
        assert_eq!(guidance.reasons.len(), 3);
        assert!(!guidance.suggestions.is_empty());
    }

    #[test]
    fn test_guidance_without_stats() {
        let guidance = build_guidance(None);
        assert!(!guidance.triggered);
    }

    #[test]
    fn test_report_serialization() {
        let report = DiagnoseReport {
            git_config: vec![GitConfigCheck {
                key: "rerere.enabled".to_string(),
                recommended: "true".to_string(),
                detected: None,
                matches_recommendation: false,
            }],
            repo_stats: None,
            large_repo_guidance: LargeRepoGuidance::default(),
        };
        let json = report_to_json(&report, false).unwrap();
        assert!(json.contains("rerere.enabled"));
        assert!(json.contains("\"matches_recommendation\":false"));
    }
}
