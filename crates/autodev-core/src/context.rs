//! Process-wide wiring
//!
//! A [`GuardContext`] is built once at startup and passed to whatever needs
//! to touch session files. It owns the audit sink and the guard; stores and
//! trackers opened through it share both.

use crate::error::{CoreError, CoreResult};
use crate::settings::Settings;
use autodev_audit::{AuditConfig, AuditSink, FileAuditLog};
use autodev_guard::{ConfigError, PathGuard};
use autodev_session::{AtomicSessionStore, PipelineRecord, PipelineTracker};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Project-relative directory for pipeline session files
pub const SESSIONS_DIR: &str = "docs/sessions";

/// Audit sink, guard and project root shared by all stores
#[derive(Debug, Clone)]
pub struct GuardContext {
    project_root: PathBuf,
    audit: Arc<dyn AuditSink>,
    guard: Arc<PathGuard>,
}

impl GuardContext {
    /// Build from settings, auditing to a rotating file
    ///
    /// The audit log is opened leniently; an unwritable log never blocks
    /// startup.
    ///
    /// # Errors
    /// `CoreError::Config` if the project root or a whitelist root is invalid
    pub fn init(settings: &Settings) -> CoreResult<Self> {
        let project_root = canonical_project_root(settings)?;
        let audit_config = audit_config_under(&project_root, &settings.audit);
        let audit_path = audit_config.path.clone();
        let audit: Arc<dyn AuditSink> = Arc::new(FileAuditLog::lenient(audit_config));

        let context = Self::build(settings, project_root, audit)?;
        tracing::info!(
            project_root = %context.project_root.display(),
            mode = %context.guard.mode(),
            audit_log = %audit_path.display(),
            "guard context initialized"
        );
        Ok(context)
    }

    /// Build from settings with a caller-supplied audit sink
    ///
    /// # Errors
    /// `CoreError::Config` if the project root or a whitelist root is invalid
    pub fn with_audit(settings: &Settings, audit: Arc<dyn AuditSink>) -> CoreResult<Self> {
        let project_root = canonical_project_root(settings)?;
        Self::build(settings, project_root, audit)
    }

    fn build(
        settings: &Settings,
        project_root: PathBuf,
        audit: Arc<dyn AuditSink>,
    ) -> CoreResult<Self> {
        let guard = PathGuard::new(&settings.guard, Arc::clone(&audit))?;
        Ok(Self {
            project_root,
            audit,
            guard: Arc::new(guard),
        })
    }

    /// Canonical project root
    #[inline]
    #[must_use]
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Shared guard
    #[inline]
    #[must_use]
    pub fn guard(&self) -> &Arc<PathGuard> {
        &self.guard
    }

    /// Shared audit sink
    #[inline]
    #[must_use]
    pub fn audit(&self) -> &Arc<dyn AuditSink> {
        &self.audit
    }

    /// Open a session store at `raw_path`
    ///
    /// # Errors
    /// `CoreError::Session` wrapping the path violation
    pub fn open_store(&self, raw_path: &str) -> CoreResult<AtomicSessionStore> {
        Ok(AtomicSessionStore::open(Arc::clone(&self.guard), raw_path)?)
    }

    /// Start a pipeline session in a new file under `docs/sessions`
    ///
    /// The file is named `<timestamp>-<session id>-pipeline.json`.
    ///
    /// # Errors
    /// `CoreError::Session` or `CoreError::Tracker`
    pub fn pipeline_tracker(&self) -> CoreResult<PipelineTracker> {
        let record = PipelineRecord::new();
        let name = format!(
            "{}-{}-pipeline.json",
            record.started.format("%Y%m%d-%H%M%S"),
            record.session_id
        );
        let path = self.project_root.join(SESSIONS_DIR).join(name);
        let store = self.open_store(&path.to_string_lossy())?;
        Ok(PipelineTracker::create_with(store, record)?)
    }

    /// Reopen the pipeline session at `raw_path`
    ///
    /// # Errors
    /// `CoreError::Session` or `CoreError::Tracker`
    pub fn resume_pipeline(&self, raw_path: &str) -> CoreResult<PipelineTracker> {
        Ok(PipelineTracker::resume(self.open_store(raw_path)?)?)
    }
}

fn canonical_project_root(settings: &Settings) -> CoreResult<PathBuf> {
    let root = &settings.guard.project_root;
    fs::canonicalize(root)
        .map_err(|source| CoreError::from(ConfigError::root_resolution(root, source)))
}

fn audit_config_under(project_root: &Path, config: &AuditConfig) -> AuditConfig {
    let mut config = config.clone();
    if config.path.is_relative() {
        config.path = project_root.join(&config.path);
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_audit_path_lands_under_project() {
        let config = audit_config_under(Path::new("/proj"), &AuditConfig::default());
        assert_eq!(config.path, PathBuf::from("/proj/logs/security_audit.log"));
    }

    #[test]
    fn absolute_audit_path_is_kept() {
        let config = audit_config_under(Path::new("/proj"), &AuditConfig::new("/var/audit.log"));
        assert_eq!(config.path, PathBuf::from("/var/audit.log"));
    }
}
