//! Rotating NDJSON audit file
//!
//! One JSON object per line. When the active file would grow past
//! `max_bytes` it is shifted to `<name>.1`, older backups move up by one and
//! anything beyond `max_backups` is deleted.

use crate::error::{AuditError, AuditResult};
use crate::event::AuditEvent;
use crate::sink::AuditSink;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Default rotation threshold (10 MiB)
pub const DEFAULT_MAX_BYTES: u64 = 10 * 1024 * 1024;

/// Default number of retained backups
pub const DEFAULT_MAX_BACKUPS: usize = 5;

/// Default log file name
pub const DEFAULT_LOG_FILE: &str = "security_audit.log";

/// File audit log configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Active log file
    pub path: PathBuf,
    /// Rotation threshold in bytes
    pub max_bytes: u64,
    /// Backups kept after rotation
    pub max_backups: usize,
}

impl AuditConfig {
    /// Configuration writing to `path` with default rotation
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Default location under a project root: `<root>/logs/security_audit.log`
    #[must_use]
    pub fn under_root(root: &Path) -> Self {
        Self::new(root.join("logs").join(DEFAULT_LOG_FILE))
    }

    /// With rotation threshold
    #[inline]
    #[must_use]
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// With backup count
    #[inline]
    #[must_use]
    pub fn with_max_backups(mut self, max_backups: usize) -> Self {
        self.max_backups = max_backups;
        self
    }

    /// Path of the n-th backup (`n >= 1`)
    #[must_use]
    pub fn backup_path(&self, n: usize) -> PathBuf {
        let mut name: OsString = self.path.as_os_str().to_owned();
        name.push(format!(".{n}"));
        PathBuf::from(name)
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("logs").join(DEFAULT_LOG_FILE),
            max_bytes: DEFAULT_MAX_BYTES,
            max_backups: DEFAULT_MAX_BACKUPS,
        }
    }
}

#[derive(Debug, Default)]
struct ActiveFile {
    file: Option<File>,
    size: u64,
}

impl ActiveFile {
    fn open(config: &AuditConfig) -> io::Result<Self> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.path)?;
        let size = file.metadata()?.len();
        Ok(Self {
            file: Some(file),
            size,
        })
    }

    fn write_line(&mut self, config: &AuditConfig, line: &[u8]) -> io::Result<()> {
        if self.file.is_none() {
            *self = Self::open(config)?;
        }

        let incoming = line.len() as u64;
        if let Some(file) = &self.file {
            // Another process may share the file; trust the filesystem size.
            if let Ok(meta) = file.metadata() {
                self.size = meta.len();
            }
        }
        if self.size > 0 && self.size.saturating_add(incoming) > config.max_bytes {
            match self.rotate(config) {
                Ok(()) => {
                    tracing::info!(path = %config.path.display(), "rotated audit log");
                    *self = Self::open(config)?;
                }
                Err(error) => {
                    tracing::warn!(
                        path = %config.path.display(),
                        %error,
                        "audit log rotation failed; continuing in current file"
                    );
                    if self.file.is_none() {
                        *self = Self::open(config)?;
                    }
                }
            }
        }

        let Some(file) = self.file.as_mut() else {
            return Err(io::Error::other("audit log not open"));
        };
        file.write_all(line)?;
        file.flush()?;
        self.size = self.size.saturating_add(incoming);
        Ok(())
    }

    fn rotate(&mut self, config: &AuditConfig) -> io::Result<()> {
        self.file = None;

        if config.max_backups == 0 {
            return remove_if_exists(&config.path);
        }

        remove_if_exists(&config.backup_path(config.max_backups))?;
        for n in (1..config.max_backups).rev() {
            rename_if_exists(&config.backup_path(n), &config.backup_path(n + 1))?;
        }
        rename_if_exists(&config.path, &config.backup_path(1))
    }
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

fn rename_if_exists(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Rotating NDJSON file sink
///
/// A single lock covers format, write and flush of one line, so lines from
/// concurrent callers never interleave.
#[derive(Debug)]
pub struct FileAuditLog {
    config: AuditConfig,
    active: Mutex<ActiveFile>,
    dropped: AtomicU64,
}

impl FileAuditLog {
    /// Open the log, failing if the file cannot be created
    ///
    /// # Errors
    /// `AuditError::Io` if the directory or file cannot be created
    pub fn open(config: AuditConfig) -> AuditResult<Self> {
        let active = ActiveFile::open(&config)
            .map_err(|e| AuditError::io("opening audit log", &config.path, e))?;
        Ok(Self {
            config,
            active: Mutex::new(active),
            dropped: AtomicU64::new(0),
        })
    }

    /// Open the log lazily
    ///
    /// If the file cannot be opened now, every append retries; events that
    /// still cannot be written are counted in [`dropped_events`].
    ///
    /// [`dropped_events`]: FileAuditLog::dropped_events
    #[must_use]
    pub fn lenient(config: AuditConfig) -> Self {
        let active = ActiveFile::open(&config).unwrap_or_else(|error| {
            tracing::warn!(
                path = %config.path.display(),
                %error,
                "audit log unavailable; will retry on next event"
            );
            ActiveFile::default()
        });
        Self {
            config,
            active: Mutex::new(active),
            dropped: AtomicU64::new(0),
        }
    }

    /// Active log file path
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Events lost to write failures since open
    #[inline]
    #[must_use]
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn drop_event(&self, event: &AuditEvent, error: &dyn std::fmt::Display) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(
            path = %self.config.path.display(),
            event_type = event.event_type(),
            %error,
            "failed to write audit event"
        );
    }
}

impl AuditSink for FileAuditLog {
    fn append(&self, event: &AuditEvent) {
        let mut active = self.active.lock();

        let mut line = match event.to_json_line() {
            Ok(line) => line,
            Err(error) => {
                drop(active);
                self.drop_event(event, &error);
                return;
            }
        };
        line.push('\n');

        if let Err(error) = active.write_line(&self.config, line.as_bytes()) {
            drop(active);
            self.drop_event(event, &error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{AuditContext, AuditStatus};
    use tempfile::TempDir;

    fn event(n: usize) -> AuditEvent {
        AuditEvent::new(
            "path_validation",
            AuditStatus::Failure,
            AuditContext::new().with("n", n).with("pad", "x".repeat(64)),
        )
        .unwrap()
    }

    #[test]
    fn backup_paths_use_numeric_suffix() {
        let config = AuditConfig::new("/var/app/logs/audit.log");
        assert_eq!(config.backup_path(3), PathBuf::from("/var/app/logs/audit.log.3"));
    }

    #[test]
    fn under_root_uses_logs_directory() {
        let config = AuditConfig::under_root(Path::new("/proj"));
        assert_eq!(config.path, PathBuf::from("/proj/logs/security_audit.log"));
        assert_eq!(config.max_bytes, DEFAULT_MAX_BYTES);
        assert_eq!(config.max_backups, DEFAULT_MAX_BACKUPS);
    }

    #[test]
    fn open_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let config = AuditConfig::new(dir.path().join("nested/logs/audit.log"));
        let log = FileAuditLog::open(config).unwrap();
        assert!(log.path().exists());
    }

    #[test]
    fn rotation_keeps_bounded_backups() {
        let dir = TempDir::new().unwrap();
        let config = AuditConfig::new(dir.path().join("audit.log"))
            .with_max_bytes(256)
            .with_max_backups(2);
        let log = FileAuditLog::open(config.clone()).unwrap();

        for n in 0..20 {
            log.append(&event(n));
        }

        assert!(config.path.exists());
        assert!(config.backup_path(1).exists());
        assert!(config.backup_path(2).exists());
        assert!(!config.backup_path(3).exists());
        assert_eq!(log.dropped_events(), 0);

        let active = fs::read_to_string(&config.path).unwrap();
        assert!(active.len() as u64 <= 256 || active.lines().count() == 1);
    }

    #[test]
    fn zero_backups_truncates_in_place() {
        let dir = TempDir::new().unwrap();
        let config = AuditConfig::new(dir.path().join("audit.log"))
            .with_max_bytes(200)
            .with_max_backups(0);
        let log = FileAuditLog::open(config.clone()).unwrap();

        for n in 0..10 {
            log.append(&event(n));
        }

        assert!(!config.backup_path(1).exists());
        let content = fs::read_to_string(&config.path).unwrap();
        assert_eq!(content.lines().count(), 1);
    }

    #[test]
    fn lenient_open_counts_dropped_events() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, b"file").unwrap();

        let log = FileAuditLog::lenient(AuditConfig::new(blocker.join("audit.log")));
        log.append(&event(1));
        log.append(&event(2));
        assert_eq!(log.dropped_events(), 2);
    }

    #[test]
    fn strict_open_reports_io_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, b"file").unwrap();

        let err = FileAuditLog::open(AuditConfig::new(blocker.join("audit.log"))).unwrap_err();
        assert!(matches!(err, AuditError::Io { .. }));
    }
}
