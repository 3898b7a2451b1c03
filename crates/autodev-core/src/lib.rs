//! Autodev core wiring
//!
//! Loads [`Settings`] once and builds a [`GuardContext`] holding the audit
//! sink, the path guard and access to session stores.
//!
//! # Example
//!
//! ```rust,no_run
//! use autodev_core::{GuardContext, Settings};
//! use std::path::Path;
//!
//! let settings = Settings::load(Path::new(".claude/autodev.toml"))?;
//! let context = GuardContext::init(&settings)?;
//!
//! let mut tracker = context.pipeline_tracker()?;
//! tracker.start_agent("researcher")?;
//! # Ok::<(), autodev_core::CoreError>(())
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod context;
pub mod error;
pub mod settings;

pub use context::{GuardContext, SESSIONS_DIR};
pub use error::{CoreError, CoreResult};
pub use settings::Settings;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for guarded session access
    pub use crate::{CoreError, GuardContext, Settings};
    pub use autodev_audit::{AuditContext, AuditSink, AuditStatus};
    pub use autodev_guard::{GuardConfig, GuardMode, PathViolation, ValidateOptions};
    pub use autodev_session::{AtomicSessionStore, PipelineTracker, SessionDocument};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
