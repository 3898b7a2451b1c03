//! TOML settings
//!
//! ```toml
//! [guard]
//! project_root = "."
//! mode = "production"
//! extra_roots = ["/srv/shared"]
//! audit_success = false
//!
//! [audit]
//! path = "logs/security_audit.log"
//! max_bytes = 10485760
//! max_backups = 5
//! ```
//!
//! Relative `project_root`, `extra_roots`, `test_roots` and `base_dir`
//! values resolve against the settings file's directory. Relative audit
//! paths resolve against the project root.

use crate::error::{CoreError, CoreResult};
use autodev_audit::AuditConfig;
use autodev_guard::GuardConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Process-wide settings, read once at startup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Path guard configuration
    pub guard: GuardConfig,
    /// Audit log configuration
    pub audit: AuditConfig,
}

impl Settings {
    /// Settings for the project containing `start`
    ///
    /// # Errors
    /// `CoreError::Config` if no project marker is found
    pub fn discover(start: &Path) -> CoreResult<Self> {
        Ok(Self {
            guard: GuardConfig::discover(start)?,
            audit: AuditConfig::default(),
        })
    }

    /// Parse settings from TOML text
    ///
    /// # Errors
    /// `CoreError::ParseSettings` on malformed input or unknown enum values
    pub fn from_toml_str(raw: &str) -> CoreResult<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Load settings from a TOML file
    ///
    /// Relative `project_root`, `extra_roots`, `test_roots` and `base_dir`
    /// entries are taken relative to the directory holding the file.
    ///
    /// # Errors
    /// `CoreError::ReadSettings` or `CoreError::ParseSettings`
    pub fn load(path: &Path) -> CoreResult<Self> {
        let raw = fs::read_to_string(path).map_err(|source| CoreError::ReadSettings {
            path: path.to_path_buf(),
            source,
        })?;
        let mut settings = Self::from_toml_str(&raw)?;

        if let Some(dir) = path.parent() {
            let guard = &mut settings.guard;
            anchor(dir, &mut guard.project_root);
            guard
                .extra_roots
                .iter_mut()
                .chain(guard.test_roots.iter_mut())
                .chain(guard.base_dir.iter_mut())
                .for_each(|entry| anchor(dir, entry));
        }
        tracing::debug!(path = %path.display(), "settings loaded");
        Ok(settings)
    }

    /// Render as TOML
    ///
    /// # Errors
    /// `toml::ser::Error` if a value has no TOML representation
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

fn anchor(dir: &Path, entry: &mut PathBuf) {
    if entry.is_relative() {
        *entry = dir.join(&*entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autodev_guard::GuardMode;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_document_yields_defaults() {
        let settings = Settings::from_toml_str("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.guard.mode, GuardMode::Production);
    }

    #[test]
    fn partial_tables_keep_other_defaults() {
        let settings = Settings::from_toml_str(
            r#"
            [guard]
            project_root = "/srv/project"
            mode = "test"

            [audit]
            max_backups = 2
            "#,
        )
        .unwrap();

        assert_eq!(settings.guard.project_root, PathBuf::from("/srv/project"));
        assert_eq!(settings.guard.mode, GuardMode::Test);
        assert_eq!(settings.guard.max_path_len, 4096);
        assert_eq!(settings.audit.max_backups, 2);
        assert_eq!(settings.audit.max_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let err = Settings::from_toml_str("[guard]\nmode = \"permissive\"\n").unwrap_err();
        assert!(matches!(err, CoreError::ParseSettings(_)));
    }

    #[test]
    fn load_anchors_relative_paths_to_settings_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("autodev.toml");
        fs::write(
            &path,
            r#"
            [guard]
            project_root = ".."
            extra_roots = ["shared", "/srv/shared"]
            test_roots = ["fixtures"]
            base_dir = "work"
            "#,
        )
        .unwrap();

        let guard = Settings::load(&path).unwrap().guard;
        assert_eq!(guard.project_root, dir.path().join(".."));
        assert_eq!(
            guard.extra_roots,
            vec![dir.path().join("shared"), PathBuf::from("/srv/shared")]
        );
        assert_eq!(guard.test_roots, vec![dir.path().join("fixtures")]);
        assert_eq!(guard.base_dir, Some(dir.path().join("work")));
    }

    #[test]
    fn toml_round_trip() {
        let settings = Settings {
            guard: GuardConfig::test("/srv/project").with_audit_success(true),
            audit: AuditConfig::new("/var/lib/autodev/audit.log").with_max_bytes(1024),
        };
        let raw = settings.to_toml_string().unwrap();
        assert_eq!(Settings::from_toml_str(&raw).unwrap(), settings);
    }
}
