//! Snapshot byte writers
//!
//! The store hands the open temp file to a [`SnapshotWriter`]; the default
//! writes everything in one call. Tests substitute writers that fail
//! part-way to exercise the rollback path.

use std::fmt;
use std::fs::File;
use std::io::{self, Write};

/// Writes a serialized document into the temp file
pub trait SnapshotWriter: Send + Sync + fmt::Debug {
    /// Write `bytes` to `file`; the caller fsyncs afterwards
    ///
    /// # Errors
    /// Any I/O error aborts the save and discards the temp file.
    fn write_snapshot(&self, file: &mut File, bytes: &[u8]) -> io::Result<()>;
}

/// Plain `write_all`
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectWriter;

impl SnapshotWriter for DirectWriter {
    fn write_snapshot(&self, file: &mut File, bytes: &[u8]) -> io::Result<()> {
        file.write_all(bytes)
    }
}
