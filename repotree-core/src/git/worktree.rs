//! Worktree discovery from `git worktree list --porcelain`

use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::debug;

use super::path::normalize_path;
use crate::model::WorktreeRecord;
use crate::{Error, Result};

/// Length of abbreviated commit hashes
const SHORT_HASH_LEN: usize = 7;

/// Separator between fields of the commit log format
const FIELD_SEPARATOR: char = '\u{1f}';

/// Commit information for a worktree's HEAD
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitMetadata {
    /// Abbreviated commit hash
    pub hash: String,
    /// First line of the commit message
    pub message: Option<String>,
}

/// A worktree block being accumulated from porcelain lines
#[derive(Debug)]
struct PendingWorktree {
    path: String,
    branch: Option<String>,
    commit: Option<String>,
    detached: bool,
    head_seen: bool,
}

impl PendingWorktree {
    fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            branch: None,
            commit: None,
            detached: false,
            head_seen: false,
        }
    }

    fn finish(self, root: &Path) -> Option<WorktreeRecord> {
        if self.path.trim().is_empty() {
            debug!("Dropping worktree block without a path");
            return None;
        }

        let path = normalize_path(Path::new(&self.path));
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        // A worktree is either on a branch or detached, never both
        let branch = if self.detached { None } else { self.branch };
        let is_detached = branch.is_none();

        Some(WorktreeRecord {
            name,
            is_main: path == root,
            path,
            branch,
            is_detached,
            commit_hash: self.commit,
            commit_message: None,
        })
    }
}

fn strip_heads(reference: &str) -> String {
    reference
        .strip_prefix("refs/heads/")
        .unwrap_or(reference)
        .to_string()
}

/// Parse porcelain worktree output into worktree records
///
/// Blocks are separated by blank lines and start with `worktree <path>`.
/// Lines that appear before any `worktree` line are ignored, as are
/// attributes this parser does not use (`bare`, `locked`, `prunable`).
/// `is_main` is set on the worktree whose normalized path equals the
/// normalized `repo_root`. Commit messages are not part of the porcelain
/// format; see [`attach_commit_metadata`].
pub fn parse_worktrees(porcelain: &str, repo_root: &Path) -> Vec<WorktreeRecord> {
    let mut blocks = Vec::new();
    let mut current: Option<PendingWorktree> = None;

    for line in porcelain.lines() {
        let line = line.trim_end_matches('\r');

        if line.trim().is_empty() {
            if let Some(pending) = current.take() {
                blocks.push(pending);
            }
            continue;
        }

        if let Some(path) = line.strip_prefix("worktree ") {
            if let Some(pending) = current.take() {
                blocks.push(pending);
            }
            current = Some(PendingWorktree::new(path));
            continue;
        }

        let Some(pending) = current.as_mut() else {
            debug!("Ignoring porcelain line outside a worktree block: {}", line);
            continue;
        };

        if let Some(head) = line.strip_prefix("HEAD ") {
            if !pending.head_seen {
                pending.head_seen = true;
                pending.branch = Some(strip_heads(head));
                pending.commit = Some(head.chars().take(SHORT_HASH_LEN).collect());
            }
        } else if let Some(branch) = line.strip_prefix("branch ") {
            pending.branch = Some(strip_heads(branch));
        } else if line == "detached" {
            pending.detached = true;
        }
    }

    if let Some(pending) = current.take() {
        blocks.push(pending);
    }

    let root = normalize_path(repo_root);
    let mut worktrees: Vec<WorktreeRecord> = Vec::with_capacity(blocks.len());
    for record in blocks.into_iter().filter_map(|b| b.finish(&root)) {
        if worktrees.iter().any(|wt| wt.path == record.path) {
            debug!("Dropping duplicate worktree block for {}", record.path.display());
            continue;
        }
        worktrees.push(record);
    }

    worktrees
}

/// Run `git worktree list --porcelain` in a repository root
pub async fn list_worktree_porcelain(git_path: &str, repo_root: &Path) -> Result<String> {
    let output = Command::new(git_path)
        .arg("worktree")
        .arg("list")
        .arg("--porcelain")
        .current_dir(repo_root)
        .output()
        .await
        .map_err(|e| Error::Git(format!("Failed to run git worktree list: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Git(format!(
            "git worktree list failed: {}",
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Read the HEAD commit of a worktree
pub async fn read_commit_metadata(git_path: &str, worktree: &Path) -> Result<CommitMetadata> {
    let output = Command::new(git_path)
        .arg("log")
        .arg("-1")
        .arg("--format=%h%x1f%s")
        .current_dir(worktree)
        .output()
        .await
        .map_err(|e| Error::Git(format!("Failed to run git log: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Git(format!("git log failed: {}", stderr.trim())));
    }

    parse_commit_line(&String::from_utf8_lossy(&output.stdout))
}

fn parse_commit_line(stdout: &str) -> Result<CommitMetadata> {
    let line = stdout.lines().next().unwrap_or("").trim_end();
    let (hash, message) = match line.split_once(FIELD_SEPARATOR) {
        Some((hash, message)) => (hash, Some(message)),
        None => (line, None),
    };

    if hash.is_empty() {
        return Err(Error::Git("git log returned no commit".to_string()));
    }

    Ok(CommitMetadata {
        hash: hash.to_string(),
        message: message.filter(|m| !m.is_empty()).map(str::to_string),
    })
}

/// Fill commit hash and message for each worktree
///
/// Lookups run one after another. A failed lookup is logged and leaves that
/// worktree's fields as they were.
pub async fn attach_commit_metadata(git_path: &str, worktrees: &mut [WorktreeRecord]) {
    for worktree in worktrees.iter_mut() {
        match read_commit_metadata(git_path, &worktree.path).await {
            Ok(commit) => {
                worktree.commit_hash = Some(commit.hash);
                worktree.commit_message = commit.message;
            }
            Err(e) => {
                debug!("No commit metadata for {}: {}", worktree.path.display(), e);
            }
        }
    }
}

/// Make sure exactly one main worktree exists and it sits at `root`
///
/// Used when `git worktree list` failed or did not report the root.
pub(crate) fn ensure_main_worktree(
    worktrees: &mut Vec<WorktreeRecord>,
    root: &Path,
    current_branch: Option<String>,
) {
    if worktrees.iter().any(|wt| wt.is_main) {
        return;
    }

    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.display().to_string());
    let is_detached = current_branch.is_none();

    worktrees.insert(
        0,
        WorktreeRecord {
            name,
            path: PathBuf::from(root),
            branch: current_branch,
            is_main: true,
            is_detached,
            commit_hash: None,
            commit_message: None,
        },
    );
}
