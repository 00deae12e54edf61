//! Path normalization shared by discovery, parsing and tracking

use std::path::{Component, Path, PathBuf};

/// Normalize a path into the form used as a repository or worktree key
///
/// Existing paths are canonicalized. Paths that cannot be canonicalized are
/// made absolute against the current directory and normalized lexically:
/// `.` components are dropped, `..` pops a component, and trailing
/// separators disappear.
pub fn normalize_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = std::fs::canonicalize(path) {
        return canonical;
    }

    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };

    lexical_normalize(&absolute)
}

/// Normalize a path without touching the filesystem
///
/// `.` components are dropped, `..` pops a component, and trailing
/// separators disappear. Symlinks are not resolved and relative paths stay
/// relative.
pub fn lexical_normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }

    normalized
}
