//! Repository observation.
//!
//! Composes the status parser, conflict scanner, and stash probe into a
//! single frozen [`RepoState`] snapshot. Referentially transparent for a
//! fixed repository on disk at a moment in time.

use std::path::PathBuf;
use std::time::SystemTime;

use crate::core::{Config, Error, RepoRef, RepoState, Result, TestStatus};

use super::conflict::parse_conflict;
use super::facade::GitFacade;
use super::status::{parse_status, StatusSnapshot};

const STATUS_ARGS: &[&str] = &["status", "--porcelain=v2", "--branch", "--ahead-behind"];

/// Observes git repository state through the facade.
pub struct RepoObserver<'a> {
    facade: &'a GitFacade,
    config: &'a Config,
}

impl<'a> RepoObserver<'a> {
    /// Create an observer bound to a facade and frozen configuration.
    pub fn new(facade: &'a GitFacade, config: &'a Config) -> Self {
        Self { facade, config }
    }

    /// Materialize a snapshot of the repository.
    pub fn observe(&self) -> Result<RepoState> {
        let snapshot = match self.read_status() {
            Ok(snapshot) => snapshot,
            Err(Error::Parse { line, detail }) => {
                // One retry with a fresh invocation; persistent failures surface.
                tracing::warn!(%line, %detail, "status parse failed, retrying once");
                self.read_status()?
            }
            Err(error) => return Err(error),
        };

        let (ongoing_rebase, ongoing_merge) = self.in_flight_markers()?;
        let stash_entries = self.stash_count()?;

        let mut conflicts = Vec::with_capacity(snapshot.unmerged.len());
        for entry in &snapshot.unmerged {
            let mut detail = parse_conflict(self.facade.repo_path(), &entry.path)?;
            if let Some(rule) = self.config.rule_for(&entry.path) {
                detail = detail.with_preferred(rule.resolution.to_string());
            }
            conflicts.push(detail);
        }

        let mut head = RepoRef::new(snapshot.branch.clone());
        head.tracking = snapshot.upstream.clone();
        head.commit = snapshot.oid.clone();

        let working_tree_clean = !snapshot.staged_changes() && !snapshot.worktree_dirty();

        let mut state = RepoState::new(self.facade.repo_path(), head);
        state.diverged_local = snapshot.ahead;
        state.diverged_remote = snapshot.behind;
        state.working_tree_clean = working_tree_clean;
        state.staged_changes = snapshot.staged_changes();
        state.ongoing_rebase = ongoing_rebase;
        state.ongoing_merge = ongoing_merge;
        state.stash_entries = stash_entries;
        state.conflicts = conflicts;
        state.tests_last_result = TestStatus::Unknown;
        state.has_unpushed_commits = snapshot.ahead > 0;
        state.staleness_score = staleness(snapshot.behind, self.fetch_age_days());
        let state = state.recompute_derived();

        tracing::debug!(
            branch = %state.head.name,
            ahead = state.diverged_local,
            behind = state.diverged_remote,
            conflicts = state.conflicts.len(),
            risk = ?state.risk_level,
            "observed repository state"
        );
        Ok(state)
    }

    fn read_status(&self) -> Result<StatusSnapshot> {
        let output = self.facade.run(STATUS_ARGS)?;
        parse_status(&output.stdout)
    }

    /// In-flight rebase/merge from the control directories under the git dir.
    fn in_flight_markers(&self) -> Result<(bool, bool)> {
        let git_dir = self.git_dir()?;
        let rebase =
            git_dir.join("rebase-merge").exists() || git_dir.join("rebase-apply").exists();
        let merge = git_dir.join("MERGE_HEAD").exists();
        Ok((rebase, merge))
    }

    fn git_dir(&self) -> Result<PathBuf> {
        let raw = self.facade.rev_parse("--git-dir")?;
        let path = PathBuf::from(raw);
        if path.is_absolute() {
            Ok(path)
        } else {
            Ok(self.facade.repo_path().join(path))
        }
    }

    fn stash_count(&self) -> Result<u32> {
        let output = self.facade.run(&["stash", "list"])?;
        Ok(output.stdout.lines().filter(|line| !line.is_empty()).count() as u32)
    }

    /// Days since the last fetch, from the FETCH_HEAD mtime; 0 when unknown.
    fn fetch_age_days(&self) -> f64 {
        let Ok(git_dir) = self.git_dir() else { return 0.0 };
        let Ok(metadata) = std::fs::metadata(git_dir.join("FETCH_HEAD")) else { return 0.0 };
        let Ok(modified) = metadata.modified() else { return 0.0 };
        match SystemTime::now().duration_since(modified) {
            Ok(age) => age.as_secs_f64() / 86_400.0,
            Err(_) => 0.0,
        }
    }
}

/// Monotone staleness score from remote divergence and fetch age.
///
/// The age component is quantized to hundredths of a day (about fifteen
/// minutes) so that back-to-back observations of a quiet repository
/// compare equal.
fn staleness(behind: u32, fetch_age_days: f64) -> f64 {
    f64::from(behind) + (fetch_age_days.max(0.0) * 100.0).floor() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staleness_monotone() {
        assert_eq!(staleness(0, 0.0), 0.0);
        assert!(staleness(3, 0.0) > staleness(1, 0.0));
        assert!(staleness(1, 2.5) > staleness(1, 0.5));
        assert_eq!(staleness(2, -1.0), 2.0);
    }

    #[test]
    fn test_staleness_quantized_for_stable_observation() {
        assert_eq!(staleness(1, 0.50001), staleness(1, 0.50002));
        assert_eq!(staleness(0, 0.119), 0.11);
    }
}
