//! Non-destructive merge preview via `git merge-tree --write-tree`.

use crate::core::Result;

use super::facade::GitFacade;

/// Predicted outcome of a three-way merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergePreview {
    /// Tree id written by merge-tree, when reported
    pub tree_id: Option<String>,

    /// Paths predicted to conflict, deduplicated, in first-seen order
    pub conflicts: Vec<String>,
}

impl MergePreview {
    /// Whether the merge is predicted to apply cleanly.
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty()
    }
}

/// Run a merge preview between two commit-ish revisions.
///
/// Never mutates the working tree or the index; merge-tree exits 1 when the
/// merge would conflict, so the unchecked runner is used.
pub fn preview(facade: &GitFacade, ours: &str, theirs: &str) -> Result<MergePreview> {
    let output = facade.run_unchecked(&["merge-tree", "--write-tree", ours, theirs])?;
    Ok(parse_merge_tree(&output.stdout))
}

/// Parse merge-tree output into a preview.
pub fn parse_merge_tree(stdout: &str) -> MergePreview {
    let mut preview = MergePreview::default();

    for (index, raw_line) in stdout.lines().enumerate() {
        let line = raw_line.trim();
        if index == 0 && is_object_id(line) {
            preview.tree_id = Some(line.to_string());
            continue;
        }
        if line.starts_with("CONFLICT") {
            if let Some((_, path)) = line.rsplit_once(" in ") {
                let path = path.trim().to_string();
                if !preview.conflicts.contains(&path) {
                    preview.conflicts.push(path);
                }
            }
        }
    }

    preview
}

fn is_object_id(line: &str) -> bool {
    line.len() == 40 && line.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_merge_output() {
        let preview = parse_merge_tree("3f786850e387550fdab836ed7e6dc881de23001b\n");
        assert_eq!(
            preview.tree_id.as_deref(),
            Some("3f786850e387550fdab836ed7e6dc881de23001b")
        );
        assert!(preview.is_clean());
    }

    #[test]
    fn test_conflicted_merge_output() {
        let stdout = "\
3f786850e387550fdab836ed7e6dc881de23001b
100644 89ab12cd 1\tsrc/lib.rs
100644 89ab12ce 2\tsrc/lib.rs
100644 89ab12cf 3\tsrc/lib.rs

CONFLICT (content): Merge conflict in src/lib.rs
CONFLICT (content): Merge conflict in Cargo.lock
";
        let preview = parse_merge_tree(stdout);
        assert_eq!(preview.conflicts, vec!["src/lib.rs".to_string(), "Cargo.lock".to_string()]);
        assert!(!preview.is_clean());
    }

    #[test]
    fn test_duplicate_conflict_paths_deduplicated() {
        let stdout = "\
CONFLICT (content): Merge conflict in a.txt
CONFLICT (modify/delete): a.txt deleted in theirs and modified in a.txt
CONFLICT (content): Merge conflict in a.txt
";
        let preview = parse_merge_tree(stdout);
        assert_eq!(preview.conflicts, vec!["a.txt".to_string()]);
        assert!(preview.tree_id.is_none());
    }

    #[test]
    fn test_empty_output() {
        let preview = parse_merge_tree("");
        assert!(preview.is_clean());
        assert!(preview.tree_id.is_none());
    }
}
