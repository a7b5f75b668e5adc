//! Synchronisation hooks: fetch and lease push.

use crate::core::{Config, Error, Result};
use crate::git::GitFacade;

/// Fetch all refs from the remote with prune and tags.
pub fn fetch_all(facade: &GitFacade, remote: &str) -> Result<String> {
    tracing::info!(remote, "fetching remote state");
    facade.fetch(remote)?;
    Ok(format!("fetched {remote} with prune and tags"))
}

/// Push the current branch with a lease guard.
///
/// The force-push policy is re-checked here so a stale plan can never push
/// past a safety setting.
pub fn push_with_lease(facade: &GitFacade, config: &Config, remote: &str) -> Result<String> {
    if !config.safety.allow_force_push {
        return Err(Error::Policy {
            rule: "push_with_lease requires safety.allow_force_push = true".to_string(),
        });
    }

    tracing::info!(remote, "pushing with lease");
    facade.push_with_lease(remote)?;
    Ok(format!("pushed to {remote} with lease"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_refuses_without_policy() {
        let facade = GitFacade::new("/tmp", true);
        let config = Config::default();
        let error = push_with_lease(&facade, &config, "origin").unwrap_err();
        assert!(matches!(error, Error::Policy { .. }));
        assert!(facade.journal().is_empty());
    }

    #[test]
    fn test_push_dry_run_with_policy_journals_only() {
        let facade = GitFacade::new("/tmp", true);
        let mut config = Config::default();
        config.safety.allow_force_push = true;

        let message = push_with_lease(&facade, &config, "origin").unwrap();
        assert!(message.contains("origin"));

        let journal = facade.journal();
        assert_eq!(journal.len(), 1);
        assert!(journal[0].suppressed);
        assert_eq!(journal[0].command, "git push --force-with-lease origin");
    }

    #[test]
    fn test_fetch_dry_run_is_suppressed() {
        let facade = GitFacade::new("/tmp", true);
        fetch_all(&facade, "origin").unwrap();
        let journal = facade.journal();
        assert_eq!(journal.len(), 1);
        assert!(journal[0].suppressed);
    }
}
