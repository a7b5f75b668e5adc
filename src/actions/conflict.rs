//! Conflict resolution hooks: rerere replay, path strategies, merge drivers.

use crate::core::{Config, ConflictDetail, Resolution, Result, StrategyRule};
use crate::git::{scan_conflicts, GitFacade};

/// Replay recorded resolutions (rerere) and stage the paths that resolved.
pub fn auto_trivial_resolve(facade: &GitFacade) -> Result<String> {
    let enabled = facade
        .config_get("rerere.enabled")?
        .map(|value| value.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if !enabled {
        tracing::info!("rerere disabled in git config; skipping auto resolution");
        return Ok("rerere disabled; nothing to replay".to_string());
    }

    facade.run(&["rerere"])?;

    let mut staged = Vec::new();
    let status = facade.run(&["status", "--porcelain"])?;
    for line in status.stdout.lines() {
        if line.len() > 3 && line[..2].contains('U') {
            let path = line[3..].trim().to_string();
            if resolved_on_disk(facade, &path) {
                facade.run(&["add", "--", &path])?;
                staged.push(path);
            }
        }
    }

    tracing::info!(staged = ?staged, "applied recorded resolutions");
    Ok(format!("replayed recorded resolutions, staged {} path(s)", staged.len()))
}

/// Apply configured ours/theirs strategies to matching conflicted paths.
pub fn apply_path_strategy(
    facade: &GitFacade,
    conflicts: &[ConflictDetail],
    rules: &[StrategyRule],
) -> Result<String> {
    let mut resolved = Vec::new();
    for conflict in conflicts {
        let Some(rule) = select_rule(conflict, rules) else { continue };
        let side = match rule.resolution {
            Resolution::Theirs => "--theirs",
            Resolution::Ours => "--ours",
            Resolution::MergeDriver(_) => continue,
        };
        facade.run(&["checkout", side, "--", &conflict.path])?;
        facade.run(&["add", "--", &conflict.path])?;
        tracing::info!(path = %conflict.path, resolution = %rule.resolution, "applied path strategy");
        resolved.push(conflict.path.clone());
    }
    Ok(format!("resolved {} path(s) by rule", resolved.len()))
}

/// Re-merge structured conflicts through their configured merge driver.
///
/// The driver runs via `checkout --merge`, which re-creates the merge using
/// the attributes-configured driver. Paths still conflicted afterwards are
/// left for the next observation to pick up.
pub fn use_merge_driver(
    facade: &GitFacade,
    conflicts: &[ConflictDetail],
    config: &Config,
) -> Result<String> {
    let mut merged = Vec::new();
    for conflict in conflicts {
        let driver_rule = config.rule_for(&conflict.path).filter(|rule| {
            matches!(rule.resolution, Resolution::MergeDriver(_))
        });
        if driver_rule.is_none() {
            continue;
        }

        facade.run(&["checkout", "--merge", "--", &conflict.path])?;
        if resolved_on_disk(facade, &conflict.path) {
            facade.run(&["add", "--", &conflict.path])?;
            merged.push(conflict.path.clone());
        } else {
            tracing::warn!(path = %conflict.path, "merge driver left conflicts in place");
        }
    }
    Ok(format!("merge driver resolved {} path(s)", merged.len()))
}

/// Whether the working copy no longer carries conflict markers.
///
/// Under dry-run nothing was rewritten, so this stays false and no add
/// is journaled.
fn resolved_on_disk(facade: &GitFacade, path: &str) -> bool {
    match std::fs::read_to_string(facade.repo_path().join(path)) {
        Ok(text) => matches!(scan_conflicts(&text), Ok(scan) if scan.hunk_count == 0),
        Err(_) => false,
    }
}

fn select_rule<'a>(
    conflict: &ConflictDetail,
    rules: &'a [StrategyRule],
) -> Option<&'a StrategyRule> {
    rules.iter().find(|rule| {
        rule.matches(&conflict.path)
            && match rule.when.as_deref() {
                Some("whitespace_only") => conflict.is_fully_trivial(),
                _ => true,
            }
    })
}
