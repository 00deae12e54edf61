//! Git operations for repotree
//!
//! This module provides repository discovery, worktree parsing, remote URL
//! classification and per-repository metadata extraction.

mod path;
mod remote;
mod repo;
mod walker;
mod worktree;

pub use path::{lexical_normalize, normalize_path};
pub use remote::{classify, OwnerHierarchy, RemoteLocation, UNKNOWN};
pub use repo::{extract_repository, linked_worktree_main, GitRepo};
pub use walker::{DirectoryWalker, DENIED_DIRECTORIES, MAX_SCAN_DEPTH};
pub use worktree::{
    attach_commit_metadata, list_worktree_porcelain, parse_worktrees, read_commit_metadata,
    CommitMetadata,
};
