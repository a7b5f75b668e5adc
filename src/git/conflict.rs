//! Conflict-marker scanning and classification.
//!
//! Reads the working copy of an unmerged path, counts conflict regions,
//! estimates how many are trivially resolvable, and classifies the conflict
//! by file type.

use std::path::Path;

use crate::core::{ConflictDetail, ConflictType, Error, Result};

/// Filenames treated as lockfiles regardless of extension.
const LOCK_FILENAMES: &[&str] = &[
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "Cargo.lock",
    "Gemfile.lock",
    "poetry.lock",
    "composer.lock",
    "Pipfile.lock",
];

/// How many leading bytes to sniff for the binary heuristic.
const SNIFF_LEN: usize = 8_000;

/// Raw result of scanning one working copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictScan {
    /// Number of complete conflict regions
    pub hunk_count: u32,

    /// Regions whose sides differ only in whitespace or line endings
    pub trivial_hunks: u32,
}

/// Classify a path by filename and extension.
pub fn classify_path(path: &str) -> ConflictType {
    let filename = path.rsplit('/').next().unwrap_or(path);
    if LOCK_FILENAMES.contains(&filename) {
        return ConflictType::Lock;
    }
    let lowered = filename.to_lowercase();
    if lowered.ends_with(".lock") {
        ConflictType::Lock
    } else if lowered.ends_with(".json") {
        ConflictType::Json
    } else if lowered.ends_with(".yaml") || lowered.ends_with(".yml") {
        ConflictType::Yaml
    } else {
        ConflictType::Text
    }
}

/// Whether the content looks binary (null byte in the leading window).
pub fn looks_binary(bytes: &[u8]) -> bool {
    bytes.iter().take(SNIFF_LEN).any(|&b| b == 0)
}

/// Scan text content for conflict regions.
///
/// A region starts at a line beginning `<<<<<<<`, may contain a `|||||||`
/// base section, holds exactly one `=======`, and ends at `>>>>>>>`.
/// Unbalanced markers are a parse error.
pub fn scan_conflicts(text: &str) -> Result<ConflictScan> {
    #[derive(PartialEq)]
    enum Section {
        Outside,
        Ours,
        Base,
        Theirs,
    }

    let mut section = Section::Outside;
    let mut ours: Vec<&str> = Vec::new();
    let mut theirs: Vec<&str> = Vec::new();
    let mut hunk_count = 0u32;
    let mut trivial_hunks = 0u32;

    for line in text.lines() {
        if line.starts_with("<<<<<<<") {
            if section != Section::Outside {
                return Err(Error::parse(line, "nested conflict start marker"));
            }
            section = Section::Ours;
            ours.clear();
            theirs.clear();
        } else if line.starts_with("|||||||") {
            if section != Section::Ours {
                return Err(Error::parse(line, "base marker outside an open region"));
            }
            section = Section::Base;
        } else if line.starts_with("=======") {
            match section {
                Section::Ours | Section::Base => section = Section::Theirs,
                Section::Theirs => {
                    return Err(Error::parse(line, "duplicate separator in region"));
                }
                Section::Outside => {
                    return Err(Error::parse(line, "separator outside an open region"));
                }
            }
        } else if line.starts_with(">>>>>>>") {
            if section != Section::Theirs {
                return Err(Error::parse(line, "end marker before separator"));
            }
            section = Section::Outside;
            hunk_count += 1;
            if whitespace_only_difference(&ours, &theirs) {
                trivial_hunks += 1;
            }
        } else {
            match section {
                Section::Ours => ours.push(line),
                Section::Theirs => theirs.push(line),
                Section::Outside | Section::Base => {}
            }
        }
    }

    if section != Section::Outside {
        return Err(Error::parse("<end of file>", "unterminated conflict region"));
    }

    Ok(ConflictScan { hunk_count, trivial_hunks })
}

fn whitespace_only_difference(ours: &[&str], theirs: &[&str]) -> bool {
    let squash =
        |lines: &[&str]| lines.concat().chars().filter(|c| !c.is_whitespace()).collect::<String>();
    squash(ours) == squash(theirs)
}

/// Build the conflict detail for one unmerged path.
///
/// An unreadable working copy (e.g. a delete/delete conflict) yields a
/// zero-hunk detail rather than an error.
pub fn parse_conflict(repo_root: &Path, path: &str) -> Result<ConflictDetail> {
    let bytes = match std::fs::read(repo_root.join(path)) {
        Ok(bytes) => bytes,
        Err(_) => return Ok(ConflictDetail::new(path).with_kind(classify_path(path))),
    };

    if looks_binary(&bytes) {
        return Ok(ConflictDetail::new(path).with_kind(ConflictType::Binary).with_hunks(1));
    }

    let text = String::from_utf8_lossy(&bytes);
    let scan = scan_conflicts(&text)?;
    let ratio = if scan.hunk_count == 0 {
        0.0
    } else {
        f64::from(scan.trivial_hunks) / f64::from(scan.hunk_count)
    };

    Ok(ConflictDetail::new(path)
        .with_kind(classify_path(path))
        .with_hunks(scan.hunk_count)
        .with_trivial_ratio(ratio))
}
