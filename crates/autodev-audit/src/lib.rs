//! Security audit log for the autodev guard
//!
//! Records every security-relevant decision (path validation outcomes, guard
//! initialization) as newline-delimited JSON.
//!
//! # Guarantees
//!
//! - Keys and string values are stripped of control characters before they
//!   are serialized, so a hostile path cannot forge extra log lines
//! - One process-wide lock per sink serializes whole lines
//! - Write failures never propagate; auditing must not block the operation
//!   being audited
//!
//! # Example
//!
//! ```rust,no_run
//! use autodev_audit::{AuditConfig, AuditContext, AuditSink, AuditStatus, FileAuditLog};
//!
//! let log = FileAuditLog::lenient(AuditConfig::new("logs/security_audit.log"));
//! log.record(
//!     "path_validation",
//!     AuditStatus::Failure,
//!     AuditContext::new()
//!         .with("operation", "session save")
//!         .with("reason", "traversal"),
//! )?;
//! # Ok::<(), autodev_audit::AuditError>(())
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod event;
pub mod file;
pub mod sanitize;
pub mod sink;

pub use error::{AuditError, AuditResult};
pub use event::{AuditContext, AuditEvent, AuditStatus, ContextValue};
pub use file::{AuditConfig, FileAuditLog, DEFAULT_MAX_BACKUPS, DEFAULT_MAX_BYTES};
pub use sink::{AuditSink, MemoryAuditLog, NullAuditLog};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
