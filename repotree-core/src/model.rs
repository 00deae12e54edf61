//! Repository, remote and worktree records produced by a scan

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A configured git remote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRecord {
    /// Name of the remote (e.g., "origin")
    pub name: String,
    /// URL used for fetching
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch_url: Option<String>,
    /// URL used for pushing, when it differs from the fetch URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_url: Option<String>,
}

/// A working tree attached to a repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorktreeRecord {
    /// Final path segment of the worktree
    pub name: String,
    /// Absolute, normalized worktree path
    pub path: PathBuf,
    /// Checked-out branch, `None` when detached
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// Whether this is the repository's main worktree
    pub is_main: bool,
    /// Whether HEAD is detached
    pub is_detached: bool,
    /// Abbreviated commit hash of HEAD
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_hash: Option<String>,
    /// First line of the HEAD commit message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_message: Option<String>,
}

/// A discovered repository with its remotes and worktrees
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    /// Absolute, normalized repository root (unique key)
    pub path: PathBuf,
    /// Directory name of the repository root
    pub name: String,
    /// Remotes in the order git reports them
    #[serde(default)]
    pub remotes: Vec<RemoteRecord>,
    /// Branch checked out in the main worktree
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_branch: Option<String>,
    /// Whether `.git` is a link file pointing at a submodule git dir
    #[serde(default)]
    pub is_submodule: bool,
    /// Worktrees, main worktree included
    pub worktrees: Vec<WorktreeRecord>,
    /// When this record was extracted
    pub last_scanned: DateTime<Utc>,
}

impl RepositoryRecord {
    /// Fetch URL of the first remote, if it is set and non-empty
    ///
    /// Only the first remote participates in grouping; a first remote
    /// without a fetch URL makes the repository local even when later
    /// remotes have one.
    pub fn primary_fetch_url(&self) -> Option<&str> {
        self.remotes
            .first()
            .and_then(|r| r.fetch_url.as_deref())
            .filter(|url| !url.trim().is_empty())
    }

    /// The main worktree
    pub fn main_worktree(&self) -> Option<&WorktreeRecord> {
        self.worktrees.iter().find(|wt| wt.is_main)
    }

    /// Worktrees other than the main one
    pub fn secondary_worktrees(&self) -> impl Iterator<Item = &WorktreeRecord> {
        self.worktrees.iter().filter(|wt| !wt.is_main)
    }

    /// Whether any linked worktree exists besides the main one
    pub fn has_secondary_worktrees(&self) -> bool {
        self.secondary_worktrees().next().is_some()
    }

    /// Whether `path` is this repository's root or one of its worktrees
    pub fn contains_path(&self, path: &Path) -> bool {
        self.path == path || self.worktrees.iter().any(|wt| wt.path == path)
    }
}
