//! System directories that are refused even when a root would admit them

use once_cell::sync::Lazy;
use std::path::{Path, PathBuf};

#[cfg(unix)]
const SYSTEM_DIRS: &[&str] = &[
    "/etc",
    "/usr",
    "/bin",
    "/sbin",
    "/boot",
    "/dev",
    "/proc",
    "/sys",
    "/lib",
    "/lib64",
    "/var/log",
    "/System",
    "/private/etc",
    "/private/var/log",
];

#[cfg(windows)]
const SYSTEM_DIRS: &[&str] = &[
    r"C:\Windows",
    r"C:\Program Files",
    r"C:\Program Files (x86)",
    r"C:\ProgramData",
];

#[cfg(not(any(unix, windows)))]
const SYSTEM_DIRS: &[&str] = &[];

static DENYLIST: Lazy<Vec<PathBuf>> =
    Lazy::new(|| SYSTEM_DIRS.iter().map(PathBuf::from).collect());

/// Check if `path` is a system directory or lies below one
#[must_use]
pub fn is_system_path(path: &Path) -> bool {
    DENYLIST.iter().any(|dir| path.starts_with(dir))
}

/// Denied system directories for this platform
#[must_use]
pub fn system_dirs() -> &'static [PathBuf] {
    &DENYLIST
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn etc_and_below_are_denied() {
        assert!(is_system_path(Path::new("/etc")));
        assert!(is_system_path(Path::new("/etc/passwd")));
        assert!(is_system_path(Path::new("/usr/share/doc")));
    }

    #[test]
    fn prefix_match_is_per_component() {
        assert!(!is_system_path(Path::new("/etcetera/file")));
        assert!(!is_system_path(Path::new("/var/lib/app")));
        assert!(!is_system_path(Path::new("/home/dev/project")));
    }
}
