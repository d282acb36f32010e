//! Path resolution helpers for CLI commands

use std::env;
use std::path::{Path, PathBuf};

/// Resolve the data root.
///
/// Falls back to the current working directory, or "." if that cannot be
/// determined.
pub fn resolve_root_path(root: Option<PathBuf>) -> PathBuf {
    root.unwrap_or_else(|| env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

/// Resolve a user-supplied file path against the data root
pub fn resolve_in_root(path: &Path, root: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
