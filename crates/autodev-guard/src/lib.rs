//! Whitelist path validation for agent file writes
//!
//! A [`PathGuard`] holds a fixed set of canonical roots and admits a path only
//! if it resolves inside one of them without traversal, symlink escapes or
//! system directories along the way. Every rejection is recorded through an
//! [`AuditSink`](autodev_audit::AuditSink).
//!
//! # Example
//!
//! ```rust,no_run
//! use autodev_audit::NullAuditLog;
//! use autodev_guard::{GuardConfig, PathGuard, ValidateOptions};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let config = GuardConfig::discover(Path::new("."))?;
//! let guard = PathGuard::new(&config, Arc::new(NullAuditLog::new()))?;
//!
//! let target = guard.validate_with(
//!     "docs/sessions/pipeline.json",
//!     &ValidateOptions::for_write("session save"),
//! )?;
//! println!("writing {}", target.resolved().display());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod denylist;
pub mod error;
pub mod guard;
pub mod project;

pub use config::{GuardConfig, GuardMode, WhitelistRoot, DEFAULT_MAX_PATH_LEN};
pub use error::{ConfigError, GuardResult, PathViolation, ViolationKind};
pub use guard::{PathGuard, ValidateOptions, ValidatedPath, PATH_VALIDATION_EVENT};
pub use project::find_project_root;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
