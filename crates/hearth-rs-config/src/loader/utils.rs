//! Path handling for layer discovery.

use std::fs;
use std::path::{Path, PathBuf};

/// Canonical form of `path`, or `path` itself when it cannot be resolved yet.
pub(super) fn resolved(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Nearest ancestor of `cwd` holding one of `markers`.
pub(super) fn project_root<'a>(cwd: &'a Path, markers: &[String]) -> Option<&'a Path> {
    cwd.ancestors()
        .find(|dir| markers.iter().any(|marker| dir.join(marker).exists()))
}
