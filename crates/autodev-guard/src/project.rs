//! Project root discovery

use crate::error::ConfigError;
use std::fs;
use std::path::{Path, PathBuf};

/// Entries whose presence marks a directory as a project root
pub const PROJECT_MARKERS: &[&str] = &[".git", ".claude"];

/// Find the nearest ancestor of `start` (inclusive) holding a project marker
///
/// The returned path is canonical.
///
/// # Errors
/// - `ConfigError::RootResolution` if `start` cannot be canonicalized
/// - `ConfigError::NoProjectMarker` if no ancestor carries a marker
pub fn find_project_root(start: &Path) -> Result<PathBuf, ConfigError> {
    let start =
        fs::canonicalize(start).map_err(|source| ConfigError::root_resolution(start, source))?;

    start
        .ancestors()
        .find(|dir| is_project_root(dir))
        .map(Path::to_path_buf)
        .ok_or_else(|| ConfigError::NoProjectMarker(start.clone()))
}

/// Check if `dir` directly contains a project marker
#[must_use]
pub fn is_project_root(dir: &Path) -> bool {
    PROJECT_MARKERS.iter().any(|marker| dir.join(marker).exists())
}
