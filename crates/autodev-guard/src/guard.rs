//! Whitelist path validation
//!
//! [`PathGuard::validate`] runs the checks below in order and stops at the
//! first failure:
//!
//! 1. input length, emptiness and NUL bytes
//! 2. literal `..`
//! 3. symlink at the leaf
//! 4. canonical resolution (optionally tolerating a missing tail)
//! 5. symlinks in any parent component
//! 6. containment in the most specific active root
//! 7. hard denial of system directories
//!
//! Every rejection is written to the audit sink before it is returned.

use crate::config::{GuardConfig, GuardMode, WhitelistRoot};
use crate::denylist::is_system_path;
use crate::error::{report_path, ConfigError, GuardResult, PathViolation, ViolationKind};
use autodev_audit::{AuditContext, AuditSink, AuditStatus};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Audit event type for validation decisions
pub const PATH_VALIDATION_EVENT: &str = "path_validation";

/// Audit event type for guard construction
pub const GUARD_INIT_EVENT: &str = "guard_init";

/// Path that passed every check
///
/// Only [`PathGuard`] can build one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValidatedPath {
    original: String,
    resolved: PathBuf,
    allowed_root: PathBuf,
}

impl ValidatedPath {
    fn new(original: &str, resolved: PathBuf, allowed_root: PathBuf) -> Self {
        Self {
            original: original.to_string(),
            resolved,
            allowed_root,
        }
    }

    /// Input as given by the caller
    #[inline]
    #[must_use]
    pub fn original(&self) -> &str {
        &self.original
    }

    /// Canonical absolute path
    #[inline]
    #[must_use]
    pub fn resolved(&self) -> &Path {
        &self.resolved
    }

    /// Root that admitted the path
    #[inline]
    #[must_use]
    pub fn allowed_root(&self) -> &Path {
        &self.allowed_root
    }

    /// Path relative to its root (empty when it is the root itself)
    #[must_use]
    pub fn relative(&self) -> &Path {
        self.resolved
            .strip_prefix(&self.allowed_root)
            .unwrap_or(Path::new(""))
    }

    /// Consume into the resolved path
    #[inline]
    #[must_use]
    pub fn into_path_buf(self) -> PathBuf {
        self.resolved
    }
}

impl AsRef<Path> for ValidatedPath {
    fn as_ref(&self) -> &Path {
        &self.resolved
    }
}

/// Per-call options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidateOptions<'a> {
    /// Operation the path is needed for, recorded in errors and audit events
    pub purpose: &'a str,
    /// Accept a path whose leaf (or trailing components) does not exist yet
    pub allow_missing: bool,
}

impl<'a> ValidateOptions<'a> {
    /// Options for an existing target
    #[inline]
    #[must_use]
    pub fn new(purpose: &'a str) -> Self {
        Self {
            purpose,
            allow_missing: false,
        }
    }

    /// Options for a target that may be created later
    #[inline]
    #[must_use]
    pub fn for_write(purpose: &'a str) -> Self {
        Self::new(purpose).with_allow_missing(true)
    }

    /// With missing-target tolerance
    #[inline]
    #[must_use]
    pub fn with_allow_missing(mut self, allow: bool) -> Self {
        self.allow_missing = allow;
        self
    }
}

#[derive(Debug, Clone, Copy)]
struct Rejection {
    kind: ViolationKind,
    reason: &'static str,
}

impl Rejection {
    const fn new(kind: ViolationKind, reason: &'static str) -> Self {
        Self { kind, reason }
    }
}

/// Validates untrusted paths against a fixed set of roots
#[derive(Debug, Clone)]
pub struct PathGuard {
    mode: GuardMode,
    roots: Vec<WhitelistRoot>,
    base_dir: PathBuf,
    max_path_len: usize,
    audit_success: bool,
    audit: Arc<dyn AuditSink>,
}

impl PathGuard {
    /// Build a guard, resolving every root once
    ///
    /// # Errors
    /// Returns `ConfigError` if a root or the base directory cannot be
    /// resolved, or the configuration is inconsistent.
    pub fn new(config: &GuardConfig, audit: Arc<dyn AuditSink>) -> Result<Self, ConfigError> {
        let roots = config.resolve_roots()?;
        let base_dir = config.resolve_base_dir()?;

        let guard = Self {
            mode: config.mode,
            roots,
            base_dir,
            max_path_len: config.max_path_len,
            audit_success: config.audit_success,
            audit,
        };

        tracing::info!(
            mode = %guard.mode,
            roots = guard.roots.len(),
            base_dir = %guard.base_dir.display(),
            "path guard initialized"
        );
        let context = AuditContext::new()
            .with("mode", guard.mode.as_str())
            .with("roots", guard.roots.len())
            .with("base_dir", guard.base_dir.as_path());
        if let Err(error) = guard
            .audit
            .record(GUARD_INIT_EVENT, AuditStatus::Success, context)
        {
            tracing::warn!(%error, "failed to record guard initialization");
        }

        Ok(guard)
    }

    /// Validate an existing path
    ///
    /// # Errors
    /// `PathViolation` describing the first failed check
    pub fn validate(&self, raw_path: &str, purpose: &str) -> GuardResult<ValidatedPath> {
        self.validate_with(raw_path, &ValidateOptions::new(purpose))
    }

    /// Validate with explicit options
    ///
    /// # Errors
    /// `PathViolation` describing the first failed check
    pub fn validate_with(
        &self,
        raw_path: &str,
        options: &ValidateOptions<'_>,
    ) -> GuardResult<ValidatedPath> {
        match self.check(raw_path, options.allow_missing) {
            Ok(validated) => {
                tracing::debug!(
                    purpose = options.purpose,
                    resolved = %validated.resolved.display(),
                    root = %validated.allowed_root.display(),
                    "path accepted"
                );
                if self.audit_success {
                    self.record(
                        AuditStatus::Success,
                        AuditContext::new()
                            .with("operation", options.purpose)
                            .with("path", report_path(raw_path)),
                    );
                }
                Ok(validated)
            }
            Err(rejection) => Err(self.reject(raw_path, options.purpose, rejection)),
        }
    }

    /// Validate a `Path`; non-UTF-8 input is rejected as invalid
    ///
    /// # Errors
    /// `PathViolation` describing the first failed check
    pub fn validate_path(
        &self,
        path: &Path,
        options: &ValidateOptions<'_>,
    ) -> GuardResult<ValidatedPath> {
        match path.to_str() {
            Some(raw) => self.validate_with(raw, options),
            None => Err(self.reject(
                &path.to_string_lossy(),
                options.purpose,
                Rejection::new(ViolationKind::ResolutionFailed, "invalid_input"),
            )),
        }
    }

    /// Check an existing path, auditing a rejection like [`validate`]
    ///
    /// [`validate`]: PathGuard::validate
    #[must_use]
    pub fn is_allowed(&self, raw_path: &str, purpose: &str) -> bool {
        self.validate(raw_path, purpose).is_ok()
    }

    /// Whitelist profile in force
    #[inline]
    #[must_use]
    pub fn mode(&self) -> GuardMode {
        self.mode
    }

    /// Resolved roots
    #[inline]
    #[must_use]
    pub fn roots(&self) -> &[WhitelistRoot] {
        &self.roots
    }

    /// Base for relative inputs
    #[inline]
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Audit sink receiving validation events
    #[inline]
    #[must_use]
    pub fn audit(&self) -> &Arc<dyn AuditSink> {
        &self.audit
    }

    fn check(&self, raw: &str, allow_missing: bool) -> Result<ValidatedPath, Rejection> {
        if raw.len() > self.max_path_len {
            return Err(Rejection::new(ViolationKind::TooLong, "too_long"));
        }
        if raw.is_empty() || raw.contains('\0') {
            return Err(Rejection::new(
                ViolationKind::ResolutionFailed,
                "invalid_input",
            ));
        }
        if raw.contains("..") {
            return Err(Rejection::new(ViolationKind::Traversal, "traversal"));
        }

        let input = Path::new(raw);
        // Component form drops trailing separators so a `link/` leaf is not followed.
        let joined: PathBuf = if input.is_absolute() {
            input.components().collect()
        } else {
            self.base_dir.join(input).components().collect()
        };

        if fs::symlink_metadata(&joined).is_ok_and(|meta| meta.file_type().is_symlink()) {
            return Err(Rejection::new(ViolationKind::Symlink, "symlink_leaf"));
        }

        let resolved = match resolve(&joined, allow_missing) {
            Ok(path) => path,
            Err(rejection) => {
                // An escaping parent link outranks the resolution failure it causes.
                self.check_parent_symlinks(&joined, None)?;
                return Err(rejection);
            }
        };

        let root = self.match_root(&resolved);
        self.check_parent_symlinks(&joined, root)?;

        let Some(root) = root else {
            return Err(Rejection::new(
                ViolationKind::OutsideWhitelist,
                "outside_whitelist",
            ));
        };
        if is_system_path(&resolved) {
            return Err(Rejection::new(
                ViolationKind::OutsideWhitelist,
                "system_directory",
            ));
        }

        Ok(ValidatedPath::new(
            raw,
            resolved,
            root.root_path().to_path_buf(),
        ))
    }

    fn active_roots(&self) -> impl Iterator<Item = &WhitelistRoot> {
        self.roots
            .iter()
            .filter(|root| root.mode() == GuardMode::Production || self.mode == GuardMode::Test)
    }

    fn match_root(&self, resolved: &Path) -> Option<&WhitelistRoot> {
        self.active_roots()
            .filter(|root| root.contains(resolved))
            .max_by_key(|root| root.root_path().components().count())
    }

    /// Every existing proper prefix of `joined` that is a symlink must point
    /// inside an active root.
    ///
    /// A link sitting above every root (a system alias such as
    /// `/tmp -> /private/tmp`) may instead point at an ancestor of the
    /// admitting root. Links at or below a root never get that allowance.
    fn check_parent_symlinks(
        &self,
        joined: &Path,
        root: Option<&WhitelistRoot>,
    ) -> Result<(), Rejection> {
        let escape = Rejection::new(ViolationKind::Symlink, "symlink_parent");
        let mut prefix = PathBuf::new();

        for component in joined.components() {
            prefix.push(component);
            if prefix.as_path() == joined {
                break;
            }

            let Ok(meta) = fs::symlink_metadata(&prefix) else {
                break;
            };
            if !meta.file_type().is_symlink() {
                continue;
            }

            let target = fs::canonicalize(&prefix).map_err(|_| escape)?;
            if self.active_roots().any(|r| r.contains(&target)) {
                continue;
            }
            let location = prefix
                .parent()
                .map(fs::canonicalize)
                .transpose()
                .map_err(|_| escape)?;
            let under_root = location
                .is_some_and(|dir| self.active_roots().any(|r| r.contains(&dir)));
            let alias_of_ancestor = root.is_some_and(|r| r.root_path().starts_with(&target));
            if under_root || !alias_of_ancestor {
                return Err(escape);
            }
        }
        Ok(())
    }

    fn reject(&self, raw_path: &str, purpose: &str, rejection: Rejection) -> PathViolation {
        let violation = PathViolation::new(rejection.kind, rejection.reason, raw_path, purpose);
        self.record(
            AuditStatus::Failure,
            AuditContext::new()
                .with("operation", purpose)
                .with("path", violation.path())
                .with("reason", rejection.reason)
                .with("kind", rejection.kind.as_str()),
        );
        tracing::warn!(
            purpose = %violation.purpose(),
            kind = %rejection.kind,
            reason = rejection.reason,
            path = %violation.path(),
            "path rejected"
        );
        violation
    }

    fn record(&self, status: AuditStatus, context: AuditContext) {
        if let Err(error) = self.audit.record(PATH_VALIDATION_EVENT, status, context) {
            tracing::warn!(%error, "failed to record path validation");
        }
    }
}

fn resolve(joined: &Path, allow_missing: bool) -> Result<PathBuf, Rejection> {
    match fs::canonicalize(joined) {
        Ok(path) => Ok(path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            if allow_missing {
                resolve_missing(joined)
            } else {
                Err(Rejection::new(
                    ViolationKind::ResolutionFailed,
                    "missing_target",
                ))
            }
        }
        Err(_) => Err(Rejection::new(
            ViolationKind::ResolutionFailed,
            "resolution_error",
        )),
    }
}

/// Canonicalize the nearest existing ancestor and re-append the missing tail
fn resolve_missing(joined: &Path) -> Result<PathBuf, Rejection> {
    let failed = Rejection::new(ViolationKind::ResolutionFailed, "resolution_error");

    for ancestor in joined.ancestors().skip(1) {
        match fs::canonicalize(ancestor) {
            Ok(base) => {
                let tail = joined.strip_prefix(ancestor).map_err(|_| failed)?;
                let mut resolved = base;
                for component in tail.components() {
                    match component {
                        Component::Normal(part) => resolved.push(part),
                        Component::CurDir => {}
                        _ => return Err(failed),
                    }
                }
                return Ok(resolved);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(_) => return Err(failed),
        }
    }
    Err(failed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use autodev_audit::MemoryAuditLog;
    use tempfile::TempDir;

    fn guard_for(dir: &TempDir) -> (PathGuard, MemoryAuditLog) {
        let audit = MemoryAuditLog::new();
        let guard = PathGuard::new(
            &GuardConfig::production(dir.path()),
            Arc::new(audit.clone()),
        )
        .unwrap();
        (guard, audit)
    }

    #[test]
    fn init_is_audited_with_mode() {
        let dir = TempDir::new().unwrap();
        let (_guard, audit) = guard_for(&dir);
        let events = audit.matching(GUARD_INIT_EVENT, AuditStatus::Success);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].context().get_str("mode"), Some("production"));
    }

    #[test]
    fn relative_input_resolves_against_base_dir() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("notes.md"), b"x").unwrap();
        let (guard, _) = guard_for(&dir);

        let validated = guard.validate("notes.md", "read").unwrap();
        assert_eq!(validated.relative(), Path::new("notes.md"));
        assert_eq!(validated.original(), "notes.md");
    }

    #[test]
    fn missing_tail_is_appended_to_canonical_ancestor() {
        let dir = TempDir::new().unwrap();
        let (guard, _) = guard_for(&dir);

        let validated = guard
            .validate_with("docs/sessions/new.json", &ValidateOptions::for_write("save"))
            .unwrap();
        let root = fs::canonicalize(dir.path()).unwrap();
        assert_eq!(validated.resolved(), root.join("docs/sessions/new.json"));
    }

    #[test]
    fn most_specific_root_wins() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("docs/sessions")).unwrap();
        let (guard, _) = guard_for(&dir);

        let validated = guard
            .validate_with("docs/sessions/a.json", &ValidateOptions::for_write("save"))
            .unwrap();
        assert!(validated.allowed_root().ends_with("docs/sessions"));
        assert_eq!(validated.relative(), Path::new("a.json"));
    }

    #[test]
    fn empty_and_nul_inputs_are_invalid() {
        let dir = TempDir::new().unwrap();
        let (guard, _) = guard_for(&dir);

        for raw in ["", "a\0b"] {
            let err = guard.validate(raw, "read").unwrap_err();
            assert_eq!(err.kind(), ViolationKind::ResolutionFailed);
            assert_eq!(err.reason(), "invalid_input");
        }
    }

    #[test]
    fn success_is_not_audited_by_default() {
        let dir = TempDir::new().unwrap();
        let (guard, audit) = guard_for(&dir);
        fs::write(dir.path().join("f"), b"x").unwrap();

        assert!(guard.is_allowed("f", "read"));
        assert!(audit
            .matching(PATH_VALIDATION_EVENT, AuditStatus::Success)
            .is_empty());
    }

    #[test]
    fn success_audit_can_be_enabled() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("f"), b"x").unwrap();
        let audit = MemoryAuditLog::new();
        let guard = PathGuard::new(
            &GuardConfig::production(dir.path()).with_audit_success(true),
            Arc::new(audit.clone()),
        )
        .unwrap();

        guard.validate("f", "read").unwrap();
        let events = audit.matching(PATH_VALIDATION_EVENT, AuditStatus::Success);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].context().get_str("operation"), Some("read"));
    }

    #[test]
    fn validated_path_for_root_has_empty_relative() {
        let dir = TempDir::new().unwrap();
        let (guard, _) = guard_for(&dir);
        let root = fs::canonicalize(dir.path()).unwrap();

        let validated = guard.validate(root.to_str().unwrap(), "list").unwrap();
        assert_eq!(validated.relative(), Path::new(""));
        assert_eq!(validated.into_path_buf(), root);
    }
}
