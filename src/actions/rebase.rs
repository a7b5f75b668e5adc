//! Rebase hooks.

use crate::core::{Error, RepoState, Result};
use crate::git::GitFacade;

/// Start a rebase of the current branch onto its tracking ref.
///
/// A rebase that stops on conflicts exits non-zero; the executor treats
/// that as a failed step and replans from the observed conflicted state.
pub fn rebase_onto_upstream(facade: &GitFacade, state: &RepoState) -> Result<String> {
    let upstream = state.head.tracking.as_deref().ok_or_else(|| Error::Policy {
        rule: "rebase requires an upstream tracking ref".to_string(),
    })?;

    tracing::info!(upstream, branch = %state.head.name, "rebasing onto upstream");
    facade.rebase(upstream, &[])?;
    Ok(format!("rebased {} onto {upstream}", state.head.name))
}

/// Continue an in-progress rebase after confirming no conflicts remain.
pub fn rebase_continue(facade: &GitFacade) -> Result<String> {
    let status = facade.run(&["status", "--porcelain"])?;
    let conflicted = extract_conflicted_paths(&status.stdout);
    if !conflicted.is_empty() {
        tracing::warn!(paths = ?conflicted, "cannot continue rebase; conflicts remain");
        return Err(Error::External {
            code: 1,
            stderr: format!("unresolved conflicts in: {}", conflicted.join(", ")),
        });
    }

    facade.rebase_continue()?;
    tracing::info!("rebase continued");
    Ok("rebase continued".to_string())
}

/// Abort an in-progress rebase, restoring the pre-rebase head.
pub fn rebase_abort(facade: &GitFacade) -> Result<String> {
    facade.rebase_abort()?;
    tracing::warn!("rebase aborted");
    Ok("rebase aborted".to_string())
}

/// Paths with an unmerged code in short porcelain output.
fn extract_conflicted_paths(status: &str) -> Vec<String> {
    status
        .lines()
        .filter(|line| line.len() > 3 && line[..2].contains('U'))
        .map(|line| line[3..].trim().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RepoRef;

    #[test]
    fn test_extract_conflicted_paths() {
        let status = "UU src/lib.rs\nM  src/main.rs\nAU assets/logo.png\n?? notes.txt\n";
        let paths = extract_conflicted_paths(status);
        assert_eq!(paths, vec!["src/lib.rs".to_string(), "assets/logo.png".to_string()]);
    }

    #[test]
    fn test_extract_ignores_clean_status() {
        assert!(extract_conflicted_paths("").is_empty());
        assert!(extract_conflicted_paths("M  a.rs\n?? b.rs\n").is_empty());
    }

    #[test]
    fn test_rebase_requires_tracking_ref() {
        let facade = GitFacade::new("/tmp", true);
        let state = RepoState::new("/tmp", RepoRef::new("main"));
        let error = rebase_onto_upstream(&facade, &state).unwrap_err();
        assert!(matches!(error, Error::Policy { .. }));
    }

    #[test]
    fn test_rebase_dry_run_records_command() {
        let facade = GitFacade::new("/tmp", true);
        let state =
            RepoState::new("/tmp", RepoRef::new("main").with_tracking("origin/main"));
        let message = rebase_onto_upstream(&facade, &state).unwrap();
        assert!(message.contains("origin/main"));

        let journal = facade.journal();
        assert_eq!(journal.len(), 1);
        assert_eq!(journal[0].command, "git rebase origin/main");
    }
}
