//! Guard configuration
//!
//! Two named profiles select the whitelist: `production` admits the project
//! root and its session/config subdirectories, `test` additionally admits the
//! system temporary directory. The mode is always chosen explicitly by the
//! caller; nothing here reads it from the environment.

use crate::error::ConfigError;
use crate::project::find_project_root;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Default maximum input length in bytes (POSIX `PATH_MAX`)
pub const DEFAULT_MAX_PATH_LEN: usize = 4096;

/// Subdirectories of the project root whitelisted by default
pub const DEFAULT_PRODUCTION_SUBDIRS: &[&str] = &["docs/sessions", ".claude", "logs"];

/// Whitelist profile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuardMode {
    /// Project root and explicit subdirectories only
    #[default]
    Production,
    /// Production roots plus the system temp directory
    Test,
}

impl GuardMode {
    /// Wire name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            GuardMode::Production => "production",
            GuardMode::Test => "test",
        }
    }
}

impl fmt::Display for GuardMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directory under which paths are admitted
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WhitelistRoot {
    root_path: PathBuf,
    mode: GuardMode,
}

impl WhitelistRoot {
    pub(crate) fn new(root_path: PathBuf, mode: GuardMode) -> Self {
        Self { root_path, mode }
    }

    /// Canonical root path
    #[inline]
    #[must_use]
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// Profile that contributed this root
    #[inline]
    #[must_use]
    pub fn mode(&self) -> GuardMode {
        self.mode
    }

    /// Check if `path` is this root or below it
    #[inline]
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.root_path)
    }
}

/// Path guard configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Project root (always whitelisted)
    pub project_root: PathBuf,
    /// Whitelist profile
    pub mode: GuardMode,
    /// Project-relative subdirectories whitelisted as their own roots
    pub production_subdirs: Vec<PathBuf>,
    /// Additional absolute roots admitted in every mode
    pub extra_roots: Vec<PathBuf>,
    /// Additional roots admitted only in test mode
    pub test_roots: Vec<PathBuf>,
    /// Record an audit event for accepted paths too
    pub audit_success: bool,
    /// Maximum input length in bytes
    pub max_path_len: usize,
    /// Base for relative inputs (defaults to the project root)
    pub base_dir: Option<PathBuf>,
}

impl GuardConfig {
    /// Production profile rooted at `project_root`
    #[must_use]
    pub fn production(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            ..Self::default()
        }
    }

    /// Test profile rooted at `project_root`
    #[must_use]
    pub fn test(project_root: impl Into<PathBuf>) -> Self {
        Self::production(project_root).with_mode(GuardMode::Test)
    }

    /// Production profile rooted at the nearest project above `start`
    ///
    /// # Errors
    /// `ConfigError::NoProjectMarker` if no ancestor holds `.git` or `.claude`
    pub fn discover(start: &Path) -> Result<Self, ConfigError> {
        Ok(Self::production(find_project_root(start)?))
    }

    /// With mode
    #[inline]
    #[must_use]
    pub fn with_mode(mut self, mode: GuardMode) -> Self {
        self.mode = mode;
        self
    }

    /// With an extra root admitted in every mode
    #[must_use]
    pub fn with_extra_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.extra_roots.push(root.into());
        self
    }

    /// With an extra root admitted only in test mode
    #[must_use]
    pub fn with_test_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.test_roots.push(root.into());
        self
    }

    /// With success auditing
    #[inline]
    #[must_use]
    pub fn with_audit_success(mut self, enabled: bool) -> Self {
        self.audit_success = enabled;
        self
    }

    /// With maximum input length
    #[inline]
    #[must_use]
    pub fn with_max_path_len(mut self, max: usize) -> Self {
        self.max_path_len = max;
        self
    }

    /// With base directory for relative inputs
    #[must_use]
    pub fn with_base_dir(mut self, base: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base.into());
        self
    }

    /// Resolve every configured root to canonical form
    ///
    /// Test-only roots are included only when the mode is `test`. Missing
    /// project subdirectories are kept at their lexical location below the
    /// canonical project root, since they may be created later.
    ///
    /// # Errors
    /// - `ConfigError::RootResolution` if the project root or an extra root
    ///   cannot be canonicalized
    /// - `ConfigError::RootNotDirectory` if a root is not a directory
    /// - `ConfigError::InvalidSubdir` for absolute or `..` subdirectories
    pub fn resolve_roots(&self) -> Result<Vec<WhitelistRoot>, ConfigError> {
        if self.max_path_len == 0 {
            return Err(ConfigError::InvalidMaxPathLen);
        }

        let project = canonical_dir(&self.project_root)?;
        let mut roots = vec![WhitelistRoot::new(project.clone(), GuardMode::Production)];

        for sub in &self.production_subdirs {
            if sub.is_absolute()
                || sub
                    .components()
                    .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
            {
                return Err(ConfigError::InvalidSubdir(sub.clone()));
            }
            let lexical = project.join(sub);
            let path = if lexical.exists() {
                canonical_dir(&lexical)?
            } else {
                lexical
            };
            roots.push(WhitelistRoot::new(path, GuardMode::Production));
        }

        for extra in &self.extra_roots {
            roots.push(WhitelistRoot::new(canonical_dir(extra)?, GuardMode::Production));
        }

        if self.mode == GuardMode::Test {
            roots.push(WhitelistRoot::new(
                canonical_dir(&std::env::temp_dir())?,
                GuardMode::Test,
            ));
            for extra in &self.test_roots {
                roots.push(WhitelistRoot::new(canonical_dir(extra)?, GuardMode::Test));
            }
        }

        roots.dedup();
        Ok(roots)
    }

    /// Resolve the base directory for relative inputs
    ///
    /// # Errors
    /// `ConfigError::RootResolution` if the directory cannot be canonicalized
    pub fn resolve_base_dir(&self) -> Result<PathBuf, ConfigError> {
        canonical_dir(self.base_dir.as_deref().unwrap_or(&self.project_root))
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            mode: GuardMode::Production,
            production_subdirs: DEFAULT_PRODUCTION_SUBDIRS.iter().map(PathBuf::from).collect(),
            extra_roots: Vec::new(),
            test_roots: Vec::new(),
            audit_success: false,
            max_path_len: DEFAULT_MAX_PATH_LEN,
            base_dir: None,
        }
    }
}

fn canonical_dir(path: &Path) -> Result<PathBuf, ConfigError> {
    let canonical =
        fs::canonicalize(path).map_err(|source| ConfigError::root_resolution(path, source))?;
    if !canonical.is_dir() {
        return Err(ConfigError::RootNotDirectory(canonical));
    }
    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn production_profile_excludes_temp_dir() {
        let dir = TempDir::new().unwrap();
        let roots = GuardConfig::production(dir.path()).resolve_roots().unwrap();
        assert!(roots.iter().all(|r| r.mode() == GuardMode::Production));
        assert_eq!(roots[0].root_path(), fs::canonicalize(dir.path()).unwrap());
    }

    #[test]
    fn test_profile_adds_temp_dir() {
        let dir = TempDir::new().unwrap();
        let roots = GuardConfig::test(dir.path()).resolve_roots().unwrap();
        let temp = fs::canonicalize(std::env::temp_dir()).unwrap();
        assert!(roots
            .iter()
            .any(|r| r.mode() == GuardMode::Test && r.root_path() == temp));
    }

    #[test]
    fn test_roots_ignored_in_production() {
        let dir = TempDir::new().unwrap();
        let other = TempDir::new().unwrap();
        let roots = GuardConfig::production(dir.path())
            .with_test_root(other.path())
            .resolve_roots()
            .unwrap();
        let other = fs::canonicalize(other.path()).unwrap();
        assert!(roots.iter().all(|r| r.root_path() != other));
    }

    #[test]
    fn missing_subdirs_stay_lexical() {
        let dir = TempDir::new().unwrap();
        let roots = GuardConfig::production(dir.path()).resolve_roots().unwrap();
        let project = fs::canonicalize(dir.path()).unwrap();
        assert!(roots
            .iter()
            .any(|r| r.root_path() == project.join("docs/sessions")));
    }

    #[test]
    fn rejects_escaping_subdir() {
        let dir = TempDir::new().unwrap();
        let mut config = GuardConfig::production(dir.path());
        config.production_subdirs = vec![PathBuf::from("../elsewhere")];
        assert!(matches!(
            config.resolve_roots(),
            Err(ConfigError::InvalidSubdir(_))
        ));
    }

    #[test]
    fn rejects_missing_project_root() {
        let dir = TempDir::new().unwrap();
        let config = GuardConfig::production(dir.path().join("missing"));
        assert!(matches!(
            config.resolve_roots(),
            Err(ConfigError::RootResolution { .. })
        ));
    }

    #[test]
    fn rejects_file_as_root() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("f");
        fs::write(&file, b"x").unwrap();
        assert!(matches!(
            GuardConfig::production(&file).resolve_roots(),
            Err(ConfigError::RootNotDirectory(_))
        ));
    }

    #[test]
    fn rejects_zero_length_limit() {
        let dir = TempDir::new().unwrap();
        let config = GuardConfig::production(dir.path()).with_max_path_len(0);
        assert!(matches!(
            config.resolve_roots(),
            Err(ConfigError::InvalidMaxPathLen)
        ));
    }

    #[test]
    fn mode_names() {
        assert_eq!(GuardMode::default(), GuardMode::Production);
        assert_eq!(GuardMode::Test.to_string(), "test");
    }
}
