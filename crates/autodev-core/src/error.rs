//! Error types for the wiring layer

use autodev_guard::ConfigError;
use autodev_session::{SessionError, TrackerError};
use std::path::PathBuf;

/// Core error type
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Guard configuration is invalid
    #[error("guard configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Settings file could not be read
    #[error("cannot read settings {path}: {source}")]
    ReadSettings {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Settings file is not valid TOML for [`Settings`](crate::Settings)
    #[error("invalid settings: {0}")]
    ParseSettings(#[from] toml::de::Error),

    /// Session store failure
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Pipeline tracker failure
    #[error(transparent)]
    Tracker(#[from] TrackerError),
}

impl CoreError {
    /// Check if the error is a rejected path
    #[must_use]
    pub fn is_violation(&self) -> bool {
        match self {
            CoreError::Session(e) => e.is_violation(),
            CoreError::Tracker(TrackerError::Session(e)) => e.is_violation(),
            _ => false,
        }
    }
}

/// Result type alias for core operations
pub type CoreResult<T> = Result<T, CoreError>;
