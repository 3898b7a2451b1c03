//! Error types for path validation
//!
//! [`PathViolation`] is what callers see when an untrusted path is refused.
//! It never carries more than a truncated, sanitized copy of the input and
//! never the resolved location outside the whitelist.

use autodev_audit::sanitize::{sanitize, truncate};
use std::fmt;
use std::path::PathBuf;

/// Maximum characters of the offending input echoed in errors and audit events
pub const MAX_REPORTED_PATH_LEN: usize = 128;

/// Which check rejected a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViolationKind {
    /// Literal `..` in the input
    Traversal,
    /// Symlink at the leaf, or a parent symlink leaving the whitelist
    Symlink,
    /// Input longer than the configured maximum
    TooLong,
    /// OS-level resolution failed or the target is missing
    ResolutionFailed,
    /// Resolved path is outside every root, or in a system directory
    OutsideWhitelist,
}

impl ViolationKind {
    /// Machine-readable tag
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::Traversal => "traversal",
            ViolationKind::Symlink => "symlink",
            ViolationKind::TooLong => "too_long",
            ViolationKind::ResolutionFailed => "resolution_failed",
            ViolationKind::OutsideWhitelist => "outside_whitelist",
        }
    }

    /// What the caller should do differently
    #[must_use]
    pub fn remediation(&self) -> &'static str {
        match self {
            ViolationKind::Traversal => "pass a path without '..' segments",
            ViolationKind::Symlink => "write to the real file, not through a symbolic link",
            ViolationKind::TooLong => "shorten the path below the length limit",
            ViolationKind::ResolutionFailed => {
                "make sure the target (or its parent) exists and is accessible"
            }
            ViolationKind::OutsideWhitelist => {
                "use a location under the project root or a configured session directory"
            }
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathViolation {
    kind: ViolationKind,
    reason: &'static str,
    path: String,
    purpose: String,
}

impl PathViolation {
    pub(crate) fn new(
        kind: ViolationKind,
        reason: &'static str,
        raw_path: &str,
        purpose: &str,
    ) -> Self {
        Self {
            kind,
            reason,
            path: report_path(raw_path),
            purpose: sanitize(purpose),
        }
    }

    /// Violation kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ViolationKind {
        self.kind
    }

    /// Short reason tag (`traversal`, `symlink_parent`, `system_directory`, ...)
    #[inline]
    #[must_use]
    pub fn reason(&self) -> &'static str {
        self.reason
    }

    /// Truncated, sanitized copy of the offending input
    #[inline]
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Operation the path was requested for
    #[inline]
    #[must_use]
    pub fn purpose(&self) -> &str {
        &self.purpose
    }

    /// Advice for the caller
    #[inline]
    #[must_use]
    pub fn remediation(&self) -> &'static str {
        self.kind.remediation()
    }
}

impl fmt::Display for PathViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "path rejected ({}: {}) for {}: '{}'; {}",
            self.kind,
            self.reason,
            self.purpose,
            self.path,
            self.remediation()
        )
    }
}

impl std::error::Error for PathViolation {}

/// Sanitized, bounded rendition of untrusted input
#[must_use]
pub fn report_path(raw_path: &str) -> String {
    truncate(&sanitize(raw_path), MAX_REPORTED_PATH_LEN)
}

/// Guard configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A configured root could not be resolved
    #[error("cannot resolve whitelist root {path}: {source}")]
    RootResolution {
        /// Configured path
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A configured root exists but is not a directory
    #[error("whitelist root is not a directory: {0}")]
    RootNotDirectory(PathBuf),

    /// A project subdirectory entry is absolute or contains `..`
    #[error("project subdirectory must be relative and free of '..': {0}")]
    InvalidSubdir(PathBuf),

    /// No project marker found above the start directory
    #[error("no project marker (.git or .claude) found above {0}")]
    NoProjectMarker(PathBuf),

    /// Maximum path length is zero
    #[error("max_path_len must be greater than zero")]
    InvalidMaxPathLen,
}

impl ConfigError {
    /// Create root resolution error
    pub fn root_resolution(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::RootResolution {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for validation
pub type GuardResult<T> = Result<T, PathViolation>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn violation_display_names_check_and_hint() {
        let v = PathViolation::new(
            ViolationKind::Traversal,
            "traversal",
            "../../etc/passwd",
            "session save",
        );
        let msg = v.to_string();
        assert!(msg.contains("traversal"));
        assert!(msg.contains("session save"));
        assert!(msg.contains("../../etc/passwd"));
        assert!(msg.contains("without '..'"));
    }

    #[test]
    fn violation_truncates_long_input() {
        let raw = "a/".repeat(500);
        let v = PathViolation::new(ViolationKind::TooLong, "too_long", &raw, "read");
        assert!(v.path().chars().count() <= MAX_REPORTED_PATH_LEN + "[truncated]".len());
        assert!(v.path().ends_with("[truncated]"));
    }

    #[test]
    fn violation_sanitizes_control_characters() {
        let v = PathViolation::new(
            ViolationKind::OutsideWhitelist,
            "outside_whitelist",
            "x\ny",
            "write",
        );
        assert!(!v.path().contains('\n'));
    }

    #[test]
    fn kind_tags_are_stable() {
        assert_eq!(ViolationKind::OutsideWhitelist.as_str(), "outside_whitelist");
        assert_eq!(ViolationKind::ResolutionFailed.to_string(), "resolution_failed");
    }
}
