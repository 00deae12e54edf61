//! Bounded directory traversal that locates repository roots

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::path::normalize_path;
use crate::scan::ScanCancel;
use crate::{Error, Result};

/// Deepest directory level visited below a scan root (the root is level 0)
pub const MAX_SCAN_DEPTH: usize = 10;

/// Directory names that are never descended into
pub const DENIED_DIRECTORIES: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    "bower_components",
    "target",
    "vendor",
    "__pycache__",
    ".venv",
    "venv",
    ".gradle",
    ".tox",
];

/// Depth-first repository discovery under a scan root
///
/// Symbolic links are never followed. A directory containing a `.git`
/// directory or `.git` link file is reported as a repository root and its
/// contents are not scanned further.
#[derive(Debug, Clone)]
pub struct DirectoryWalker {
    ignore: GlobSet,
    max_depth: usize,
}

impl DirectoryWalker {
    /// Create a walker that prunes directories matching any of `patterns`
    pub fn new(patterns: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            builder.add(Glob::new(pattern)?);
        }

        Ok(Self {
            ignore: builder.build()?,
            max_depth: MAX_SCAN_DEPTH,
        })
    }

    /// Lower the depth limit (it can never exceed [`MAX_SCAN_DEPTH`])
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth.min(MAX_SCAN_DEPTH);
        self
    }

    /// Whether the ignore patterns prune `path`
    ///
    /// The path is tested both bare and with a trailing separator so that a
    /// pattern like `**/node_modules/**` prunes the `node_modules` directory
    /// itself.
    pub fn is_ignored(&self, path: &Path) -> bool {
        if self.ignore.is_empty() {
            return false;
        }

        if self.ignore.is_match(path) {
            return true;
        }

        let mut with_separator = path.as_os_str().to_os_string();
        with_separator.push(std::path::MAIN_SEPARATOR_STR);
        self.ignore.is_match(Path::new(&with_separator))
    }

    /// Collect repository roots below `root`
    ///
    /// Roots already present in `seen` are skipped and new ones are added to
    /// it, so one set shared across several scan roots reports every
    /// physical repository once. Unreadable subdirectories are logged and
    /// skipped; an unreadable `root` is an error.
    pub fn walk(
        &self,
        root: &Path,
        seen: &mut HashSet<PathBuf>,
        cancel: &ScanCancel,
    ) -> Result<Vec<PathBuf>> {
        let root = normalize_path(root);

        let metadata = std::fs::metadata(&root).map_err(|e| Error::Unreadable {
            root: root.clone(),
            message: e.to_string(),
        })?;
        if !metadata.is_dir() {
            return Err(Error::Unreadable {
                root,
                message: "not a directory".to_string(),
            });
        }

        let mut found = Vec::new();
        let mut entries = WalkDir::new(&root)
            .follow_links(false)
            .max_depth(self.max_depth)
            .into_iter();

        loop {
            let entry = match entries.next() {
                None => break,
                Some(Ok(entry)) => entry,
                Some(Err(e)) => {
                    if e.depth() == 0 {
                        return Err(Error::Unreadable {
                            root,
                            message: e.to_string(),
                        });
                    }
                    warn!("Skipping unreadable path under {}: {}", root.display(), e);
                    continue;
                }
            };

            // Symlinked directories report a symlink file type and fall out here
            if !entry.file_type().is_dir() {
                continue;
            }

            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let path = entry.path();

            if entry.depth() > 0 {
                let denied = entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| DENIED_DIRECTORIES.contains(&name));
                if denied || self.is_ignored(path) {
                    debug!("Pruned {}", path.display());
                    entries.skip_current_dir();
                    continue;
                }
            }

            if has_git_entry(path) {
                entries.skip_current_dir();
                if seen.insert(path.to_path_buf()) {
                    debug!("Found git repository at: {}", path.display());
                    found.push(path.to_path_buf());
                } else {
                    debug!("Already discovered {}", path.display());
                }
            }
        }

        Ok(found)
    }
}

/// Whether `dir/.git` exists as a directory or a regular (link) file
fn has_git_entry(dir: &Path) -> bool {
    match std::fs::symlink_metadata(dir.join(".git")) {
        Ok(metadata) => metadata.is_dir() || metadata.is_file(),
        Err(_) => false,
    }
}
