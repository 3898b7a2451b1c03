//! Error types for session persistence

use autodev_guard::PathViolation;
use std::path::PathBuf;

/// Session store errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The target path failed validation
    #[error(transparent)]
    Violation(#[from] PathViolation),

    /// The file exists but is not a valid JSON object
    #[error("corrupt session file {path}: {source}")]
    Corrupt {
        /// Session file
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Filesystem failure while reading or writing
    #[error("{operation} failed for {path}: {source}")]
    Persistence {
        /// What was being attempted
        operation: &'static str,
        /// Session file
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document could not be serialized as a JSON object
    #[error("cannot serialize session document: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl SessionError {
    /// Create persistence error
    pub fn persistence(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::Persistence {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Create corruption error
    pub fn corrupt(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Corrupt {
            path: path.into(),
            source,
        }
    }

    /// Check if the error came from path validation
    #[must_use]
    pub fn is_violation(&self) -> bool {
        matches!(self, Self::Violation(_))
    }
}

/// Result type alias for session operations
pub type SessionResult<T> = Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persistence_message_names_operation_and_path() {
        let err = SessionError::persistence(
            "renaming temp file",
            "/proj/docs/sessions/a.json",
            std::io::Error::other("disk full"),
        );
        let msg = err.to_string();
        assert!(msg.contains("renaming temp file"));
        assert!(msg.contains("a.json"));
        assert!(msg.contains("disk full"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn corrupt_carries_parse_error() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = SessionError::corrupt("/x.json", source);
        assert!(matches!(err, SessionError::Corrupt { .. }));
        assert!(!err.is_violation());
    }
}
