//! Safety hooks: backup refs and stashing.

use chrono::Utc;

use crate::core::Result;
use crate::git::GitFacade;

const BACKUP_PREFIX: &str = "refs/backup/goap";
const STASH_PREFIX: &str = "goap";

fn timestamp() -> String {
    Utc::now().format("%Y%m%dT%H%M%SZ").to_string()
}

/// Create a backup ref pointing at HEAD and return a summary line.
pub fn create_backup_ref(facade: &GitFacade) -> Result<String> {
    let head = facade.rev_parse("HEAD")?;
    let ref_name = format!("{BACKUP_PREFIX}/{}", timestamp());
    facade.run(&["update-ref", &ref_name, &head])?;

    if !facade.dry_run() {
        let verify = facade.run_unchecked(&["show-ref", "--verify", "--quiet", &ref_name])?;
        if !verify.success() {
            tracing::warn!(%ref_name, "backup ref did not verify after creation");
        }
    }

    tracing::info!(%ref_name, sha = %head, "created backup ref");
    Ok(format!("created backup ref {ref_name} at {head}"))
}

/// Stash a dirty working tree under a timestamped label.
pub fn ensure_clean_or_stash(facade: &GitFacade) -> Result<String> {
    let status = facade.run(&["status", "--porcelain"])?;
    if status.stdout.trim().is_empty() {
        tracing::info!("working tree already clean; no stash required");
        return Ok("working tree already clean".to_string());
    }

    let label = format!("{STASH_PREFIX}/{}", timestamp());
    facade.run(&["stash", "push", "--include-untracked", "-m", &label])?;
    tracing::info!(%label, "stashed dirty working tree");
    Ok(format!("stashed working tree as {label}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_shape() {
        let ts = timestamp();
        assert_eq!(ts.len(), 16);
        assert!(ts.ends_with('Z'));
        assert!(ts.contains('T'));
    }

    #[test]
    fn test_dry_run_journals_backup_commands() {
        let dir = tempfile::tempdir().unwrap();
        std::process::Command::new("git")
            .args(["init", "--quiet"])
            .current_dir(dir.path())
            .status()
            .unwrap();
        std::process::Command::new("git")
            .args(["commit", "--allow-empty", "-m", "seed", "--no-gpg-sign"])
            .current_dir(dir.path())
            .env("GIT_AUTHOR_NAME", "t")
            .env("GIT_AUTHOR_EMAIL", "t@example.com")
            .env("GIT_COMMITTER_NAME", "t")
            .env("GIT_COMMITTER_EMAIL", "t@example.com")
            .status()
            .unwrap();

        let facade = GitFacade::new(dir.path(), true);
        let message = create_backup_ref(&facade).unwrap();
        assert!(message.contains("refs/backup/goap/"));

        let journal = facade.journal();
        let suppressed: Vec<_> = journal.iter().filter(|e| e.suppressed).collect();
        assert_eq!(suppressed.len(), 1);
        assert!(suppressed[0].command.starts_with("git update-ref refs/backup/goap/"));
    }
}
