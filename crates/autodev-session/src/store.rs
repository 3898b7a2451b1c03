//! Atomic JSON session store
//!
//! Every save writes a complete document to an exclusive temp file in the
//! target's directory, fsyncs it and renames it over the target. Readers
//! therefore see either the previous document or the new one, never a
//! mixture. Concurrent writers are last-writer-wins.

use crate::error::{SessionError, SessionResult};
use crate::writer::{DirectWriter, SnapshotWriter};
use autodev_guard::{PathGuard, ValidateOptions, ValidatedPath};
use serde::de::DeserializeOwned;
use serde::ser::Error as _;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::{NamedTempFile, PersistError};

/// JSON object persisted by the store
pub type SessionDocument = Map<String, Value>;

/// Purpose recorded when the store is opened
pub const OPEN_PURPOSE: &str = "session open";
/// Purpose recorded on every save
pub const SAVE_PURPOSE: &str = "session save";
/// Purpose recorded on every load
pub const LOAD_PURPOSE: &str = "session load";

/// Session file guarded by a [`PathGuard`]
#[derive(Debug, Clone)]
pub struct AtomicSessionStore {
    guard: Arc<PathGuard>,
    raw_path: String,
    target: ValidatedPath,
    writer: Arc<dyn SnapshotWriter>,
}

impl AtomicSessionStore {
    /// Open a store for `raw_path`; the file need not exist yet
    ///
    /// # Errors
    /// `SessionError::Violation` if the path is rejected
    pub fn open(guard: Arc<PathGuard>, raw_path: &str) -> SessionResult<Self> {
        let target = guard.validate_with(raw_path, &ValidateOptions::for_write(OPEN_PURPOSE))?;
        Ok(Self {
            guard,
            raw_path: raw_path.to_string(),
            target,
            writer: Arc::new(DirectWriter),
        })
    }

    /// With a custom snapshot writer
    #[must_use]
    pub fn with_writer(mut self, writer: Arc<dyn SnapshotWriter>) -> Self {
        self.writer = writer;
        self
    }

    /// Resolved target as of open
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        self.target.resolved()
    }

    /// Guard used for re-validation
    #[inline]
    #[must_use]
    pub fn guard(&self) -> &Arc<PathGuard> {
        &self.guard
    }

    /// Load the document, or `None` if the file does not exist
    ///
    /// # Errors
    /// - `SessionError::Violation` if the path no longer validates
    /// - `SessionError::Corrupt` if the file is not a JSON object
    /// - `SessionError::Persistence` on read failure
    pub fn load(&self) -> SessionResult<Option<SessionDocument>> {
        self.load_as()
    }

    /// Load and deserialize into `T`
    ///
    /// # Errors
    /// Same as [`load`](AtomicSessionStore::load); a shape mismatch is `Corrupt`.
    pub fn load_as<T: DeserializeOwned>(&self) -> SessionResult<Option<T>> {
        let target = self.revalidate(LOAD_PURPOSE)?;
        let path = target.resolved();

        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SessionError::persistence("reading session", path, e)),
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| SessionError::corrupt(path, e))
    }

    /// Atomically replace the file with `document`
    ///
    /// # Errors
    /// - `SessionError::Violation` if the path no longer validates
    /// - `SessionError::Serialize` if the document cannot be encoded
    /// - `SessionError::Persistence` on any filesystem failure; the previous
    ///   file is left untouched
    pub fn save(&self, document: &SessionDocument) -> SessionResult<()> {
        let target = self.revalidate(SAVE_PURPOSE)?;
        let path = target.resolved();
        let dir = path.parent().ok_or_else(|| {
            SessionError::persistence(
                "locating parent directory",
                path,
                io::Error::from(io::ErrorKind::InvalidInput),
            )
        })?;

        let mut bytes = serde_json::to_vec_pretty(document).map_err(SessionError::Serialize)?;
        bytes.push(b'\n');

        fs::create_dir_all(dir)
            .map_err(|e| SessionError::persistence("creating session directory", dir, e))?;

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut temp = tempfile::Builder::new()
            .prefix(&format!(".{file_name}."))
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(|e| SessionError::persistence("creating temp file", dir, e))?;

        if let Err(e) = self.write_temp(temp.as_file_mut(), &bytes) {
            discard(temp, path);
            return Err(SessionError::persistence("writing temp file", path, e));
        }

        if let Err(PersistError { error, file }) = temp.persist(path) {
            discard(file, path);
            return Err(SessionError::persistence("renaming temp file", path, error));
        }

        sync_dir(dir);
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "session saved");
        Ok(())
    }

    /// Serialize `value` (which must encode as a JSON object) and save it
    ///
    /// # Errors
    /// `SessionError::Serialize` for non-object values; otherwise as
    /// [`save`](AtomicSessionStore::save)
    pub fn save_as<T: Serialize>(&self, value: &T) -> SessionResult<()> {
        match serde_json::to_value(value).map_err(SessionError::Serialize)? {
            Value::Object(document) => self.save(&document),
            _ => Err(SessionError::Serialize(serde_json::Error::custom(
                "session document must be a JSON object",
            ))),
        }
    }

    /// Read, modify and write back in one call
    ///
    /// This is not a transaction: a concurrent writer between the read and
    /// the write is overwritten.
    ///
    /// # Errors
    /// As [`load`](AtomicSessionStore::load) and [`save`](AtomicSessionStore::save)
    pub fn update<F>(&self, f: F) -> SessionResult<SessionDocument>
    where
        F: FnOnce(&mut SessionDocument),
    {
        let mut document = self.load()?.unwrap_or_default();
        f(&mut document);
        self.save(&document)?;
        Ok(document)
    }

    fn revalidate(&self, purpose: &str) -> SessionResult<ValidatedPath> {
        Ok(self
            .guard
            .validate_with(&self.raw_path, &ValidateOptions::for_write(purpose))?)
    }

    fn write_temp(&self, file: &mut File, bytes: &[u8]) -> io::Result<()> {
        self.writer.write_snapshot(file, bytes)?;
        file.sync_all()
    }
}

fn discard(temp: NamedTempFile, target: &Path) {
    let temp_path: PathBuf = temp.path().to_path_buf();
    if let Err(error) = temp.close() {
        tracing::warn!(
            temp = %temp_path.display(),
            target = %target.display(),
            %error,
            "failed to remove temp session file"
        );
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Err(error) = File::open(dir).and_then(|d| d.sync_all()) {
        tracing::debug!(dir = %dir.display(), %error, "directory fsync failed");
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}
