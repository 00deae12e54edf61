//! Repository metadata extraction

use std::path::{Path, PathBuf};

use chrono::Utc;
use git2::Repository;
use tracing::debug;

use super::path::normalize_path;
use super::worktree::{
    attach_commit_metadata, ensure_main_worktree, list_worktree_porcelain, parse_worktrees,
};
use crate::model::{RemoteRecord, RepositoryRecord};
use crate::{Error, Result};

/// A git repository wrapper used for read-only metadata queries
pub struct GitRepo {
    /// The underlying git2 repository
    repo: Repository,
    /// Path to the repository root
    root: PathBuf,
}

impl std::fmt::Debug for GitRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitRepo")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl GitRepo {
    /// Open the repository rooted exactly at `path`
    ///
    /// Unlike discovery, this does not search parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let repo = Repository::open(path).map_err(|e| {
            if e.code() == git2::ErrorCode::NotFound {
                Error::Git(format!("Not a git repository: {}", path.display()))
            } else {
                Error::from(e)
            }
        })?;

        Ok(Self {
            repo,
            root: path.to_path_buf(),
        })
    }

    /// Get the repository root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// List all remotes with their fetch and push URLs
    pub fn list_remotes(&self) -> Result<Vec<RemoteRecord>> {
        let remotes = self.repo.remotes()?;

        let mut result = Vec::new();
        for remote_name in remotes.iter().flatten() {
            if let Ok(remote) = self.repo.find_remote(remote_name) {
                result.push(RemoteRecord {
                    name: remote_name.to_string(),
                    fetch_url: remote.url().map(|u| u.to_string()),
                    push_url: remote.pushurl().map(|u| u.to_string()),
                });
            }
        }

        Ok(result)
    }

    /// Get the current branch name
    pub fn current_branch(&self) -> Result<Option<String>> {
        let head = match self.repo.head() {
            Ok(h) => h,
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => {
                return Ok(unborn_branch_name(&self.repo));
            }
            Err(e) => return Err(e.into()),
        };

        if head.is_branch() {
            Ok(head.shorthand().map(|s| s.to_string()))
        } else {
            // Detached HEAD
            Ok(None)
        }
    }
}

/// Branch an unborn HEAD points at (fresh `git init`)
fn unborn_branch_name(repo: &Repository) -> Option<String> {
    let head = repo.find_reference("HEAD").ok()?;
    let target = head.symbolic_target()?;
    target.strip_prefix("refs/heads/").map(|s| s.to_string())
}

/// Whether `root/.git` is a link file to a submodule git directory
///
/// Link files that point into `.git/worktrees/` belong to linked worktrees,
/// not submodules.
fn is_submodule_link(root: &Path) -> bool {
    let dot_git = root.join(".git");
    match std::fs::symlink_metadata(&dot_git) {
        Ok(metadata) if metadata.is_file() => {}
        _ => return false,
    }

    let contents = match std::fs::read_to_string(&dot_git) {
        Ok(c) => c,
        Err(_) => return true,
    };

    let gitdir = contents
        .lines()
        .find_map(|line| line.strip_prefix("gitdir:"))
        .map(str::trim);

    match gitdir {
        Some(dir) => {
            let parent = Path::new(dir).parent().and_then(|p| p.file_name());
            parent.map_or(true, |name| name != "worktrees")
        }
        None => true,
    }
}

/// Root of the main worktree when `root` is a linked worktree
///
/// Returns `None` for ordinary repositories, submodules and worktrees
/// attached to a bare repository.
pub fn linked_worktree_main(root: &Path) -> Option<PathBuf> {
    let repo = Repository::open(root).ok()?;
    if !repo.is_worktree() {
        return None;
    }

    let common = normalize_path(repo.commondir());
    if common.file_name()? != ".git" {
        return None;
    }
    common.parent().map(Path::to_path_buf)
}

/// Metadata read through libgit2, tolerant of every failure
struct LocalMetadata {
    is_submodule: bool,
    remotes: Vec<RemoteRecord>,
    current_branch: Option<String>,
}

fn read_local_metadata(root: &Path) -> LocalMetadata {
    let is_submodule = is_submodule_link(root);

    let repo = match GitRepo::open(root) {
        Ok(repo) => repo,
        Err(e) => {
            debug!("Cannot open {} with libgit2: {}", root.display(), e);
            return LocalMetadata {
                is_submodule,
                remotes: Vec::new(),
                current_branch: None,
            };
        }
    };

    let remotes = repo.list_remotes().unwrap_or_else(|e| {
        debug!("No remotes for {}: {}", root.display(), e);
        Vec::new()
    });
    let current_branch = repo.current_branch().unwrap_or_else(|e| {
        debug!("No current branch for {}: {}", root.display(), e);
        None
    });

    LocalMetadata {
        is_submodule,
        remotes,
        current_branch,
    }
}

/// Extract a repository record for the repository rooted at `root`
///
/// Missing remotes, an unknown branch or failed git commands leave the
/// corresponding fields empty. The extraction only fails when the root
/// itself is not (or stops being) a readable directory.
pub async fn extract_repository(git_path: &str, root: &Path) -> Result<RepositoryRecord> {
    let root = normalize_path(root);
    ensure_directory(&root).await?;

    let blocking_root = root.clone();
    let local = tokio::task::spawn_blocking(move || read_local_metadata(&blocking_root))
        .await
        .map_err(|e| Error::Other(format!("Metadata task failed: {}", e)))?;

    let mut worktrees = match list_worktree_porcelain(git_path, &root).await {
        Ok(porcelain) => parse_worktrees(&porcelain, &root),
        Err(e) => {
            debug!("Falling back to main worktree for {}: {}", root.display(), e);
            Vec::new()
        }
    };
    ensure_main_worktree(&mut worktrees, &root, local.current_branch.clone());
    attach_commit_metadata(git_path, &mut worktrees).await;

    ensure_directory(&root).await?;

    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.display().to_string());

    Ok(RepositoryRecord {
        path: root,
        name,
        remotes: local.remotes,
        current_branch: local.current_branch,
        is_submodule: local.is_submodule,
        worktrees,
        last_scanned: Utc::now(),
    })
}

async fn ensure_directory(root: &Path) -> Result<()> {
    let metadata = tokio::fs::metadata(root).await.map_err(|e| Error::Unreadable {
        root: root.to_path_buf(),
        message: e.to_string(),
    })?;

    if !metadata.is_dir() {
        return Err(Error::Unreadable {
            root: root.to_path_buf(),
            message: "not a directory".to_string(),
        });
    }

    Ok(())
}
