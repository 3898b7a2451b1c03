//! Error types for the audit log
//!
//! Only caller mistakes surface here. I/O failures while appending an event
//! are swallowed by the sinks and never reach the caller.

use std::path::PathBuf;

/// Audit log errors
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// Event was built with an empty or blank event type
    #[error("invalid audit event: {0}")]
    InvalidEvent(String),

    /// Context value was an array or object
    #[error("context key '{key}' holds a non-primitive value ({found})")]
    NonPrimitiveContext {
        /// Offending context key
        key: String,
        /// JSON type that was found
        found: &'static str,
    },

    /// Context source was not a JSON object
    #[error("audit context must be a JSON object, got {0}")]
    ContextNotObject(&'static str),

    /// Log file could not be opened or prepared
    #[error("io error while {operation} at {path}: {source}")]
    Io {
        /// What was being attempted
        operation: &'static str,
        /// Log file path
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AuditError {
    /// Create IO error for path
    #[must_use]
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for audit operations
pub type AuditResult<T> = Result<T, AuditError>;
