//! Atomic session persistence
//!
//! [`AtomicSessionStore`] keeps one JSON object per file and replaces it with
//! temp-file-plus-rename, re-validating the target through a
//! [`PathGuard`](autodev_guard::PathGuard) before every access.
//! [`PipelineTracker`] layers a typed agent-pipeline record on top.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod store;
pub mod tracker;
pub mod writer;

pub use error::{SessionError, SessionResult};
pub use store::{AtomicSessionStore, SessionDocument};
pub use tracker::{
    AgentEntry, AgentStatus, PipelineRecord, PipelineStatus, PipelineTracker, TrackerError,
    DEFAULT_PIPELINE_AGENTS,
};
pub use writer::{DirectWriter, SnapshotWriter};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
