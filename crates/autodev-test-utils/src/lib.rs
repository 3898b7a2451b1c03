//! Testing utilities for the autodev workspace
//!
//! Sandbox project trees, pre-wired guards and tracing setup.

#![allow(missing_docs)]
#![allow(clippy::missing_panics_doc)]

use autodev_audit::MemoryAuditLog;
use autodev_guard::{GuardConfig, PathGuard};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Install a test subscriber honoring `RUST_LOG`, once per binary
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Throwaway project tree: `.git` marker plus `docs/sessions` and `logs`
#[derive(Debug)]
pub struct SandboxProject {
    dir: TempDir,
    root: PathBuf,
}

impl SandboxProject {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        for sub in [".git", "docs/sessions", "logs"] {
            fs::create_dir_all(dir.path().join(sub)).unwrap();
        }
        let root = fs::canonicalize(dir.path()).unwrap();
        Self { dir, root }
    }

    /// Canonical project root
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.root.join("docs/sessions")
    }

    /// Absolute path under the root, as a string suitable for `validate`
    pub fn path_str(&self, rel: &str) -> String {
        self.root.join(rel).to_string_lossy().into_owned()
    }

    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, contents).unwrap();
        path
    }

    pub fn production_config(&self) -> GuardConfig {
        GuardConfig::production(&self.root)
    }

    pub fn test_config(&self) -> GuardConfig {
        GuardConfig::test(&self.root)
    }

    /// Keep the underlying temp dir alive for as long as the sandbox is
    pub fn temp_dir(&self) -> &TempDir {
        &self.dir
    }
}

impl Default for SandboxProject {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard over `config` with an inspectable in-memory audit sink
pub fn guard_with(config: &GuardConfig) -> (Arc<PathGuard>, MemoryAuditLog) {
    init_tracing();
    let audit = MemoryAuditLog::new();
    let guard = PathGuard::new(config, Arc::new(audit.clone())).unwrap();
    (Arc::new(guard), audit)
}

/// Production-mode guard over a fresh sandbox
pub fn production_guard() -> (SandboxProject, Arc<PathGuard>, MemoryAuditLog) {
    let project = SandboxProject::new();
    let (guard, audit) = guard_with(&project.production_config());
    (project, guard, audit)
}

/// Test-mode guard over a fresh sandbox
pub fn test_guard() -> (SandboxProject, Arc<PathGuard>, MemoryAuditLog) {
    let project = SandboxProject::new();
    let (guard, audit) = guard_with(&project.test_config());
    (project, guard, audit)
}
