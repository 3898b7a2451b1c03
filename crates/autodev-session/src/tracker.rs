//! Agent pipeline tracker
//!
//! A typed session record listing which agents of a development pipeline
//! have started, finished or failed. Every mutation is persisted
//! immediately through [`AtomicSessionStore`].

use crate::error::SessionError;
use crate::store::AtomicSessionStore;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Longest accepted agent name
pub const MAX_AGENT_NAME_LEN: usize = 64;

/// Agents of the standard development pipeline, in execution order
pub const DEFAULT_PIPELINE_AGENTS: &[&str] = &[
    "researcher",
    "planner",
    "test-master",
    "implementer",
    "reviewer",
    "security-auditor",
    "doc-master",
];

/// Tracker errors
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// Underlying store failure
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Agent name is empty, too long or has disallowed characters
    #[error("invalid agent name '{0}': use 1-64 ASCII letters, digits, '-' or '_'")]
    InvalidAgentName(String),

    /// Completion or failure reported for an agent that never started
    #[error("agent '{0}' was never started")]
    AgentNotStarted(String),

    /// Resume target does not exist
    #[error("no pipeline session at {0}")]
    NotFound(PathBuf),

    /// Create target already holds a session
    #[error("pipeline session already exists at {0}")]
    AlreadyExists(PathBuf),
}

/// Agent lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    /// Running
    Started,
    /// Finished successfully
    Completed,
    /// Finished with an error
    Failed,
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AgentStatus::Started => "started",
            AgentStatus::Completed => "completed",
            AgentStatus::Failed => "failed",
        })
    }
}

/// One agent's entry in the pipeline record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentEntry {
    /// Current state
    pub status: AgentStatus,
    /// When the agent started
    pub started_at: DateTime<Utc>,
    /// When the agent finished
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Wall time between start and finish
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    /// Completion summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Tools the agent reported using
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools_used: Vec<String>,
    /// Failure description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AgentEntry {
    fn started(at: DateTime<Utc>) -> Self {
        Self {
            status: AgentStatus::Started,
            started_at: at,
            completed_at: None,
            duration_seconds: None,
            message: None,
            tools_used: Vec::new(),
            error: None,
        }
    }

    fn finish(&mut self, status: AgentStatus, at: DateTime<Utc>) {
        self.status = status;
        self.completed_at = Some(at);
        self.duration_seconds = (at - self.started_at)
            .to_std()
            .ok()
            .map(|d| d.as_secs_f64());
    }
}

/// Persisted pipeline session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRecord {
    /// Unique session id (ULID)
    pub session_id: String,
    /// Session creation time
    pub started: DateTime<Utc>,
    /// Linked GitHub issue number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_issue: Option<u64>,
    /// Agents in start order
    #[serde(default)]
    pub agents: IndexMap<String, AgentEntry>,
}

impl PipelineRecord {
    /// Fresh record with a new session id
    #[must_use]
    pub fn new() -> Self {
        Self {
            session_id: ulid::Ulid::new().to_string(),
            started: Utc::now(),
            github_issue: None,
            agents: IndexMap::new(),
        }
    }
}

impl Default for PipelineRecord {
    fn default() -> Self {
        Self::new()
    }
}

/// Progress summary against an expected agent list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineStatus {
    /// Agents currently running
    pub running: usize,
    /// Agents finished successfully
    pub completed: usize,
    /// Agents finished with an error
    pub failed: usize,
    /// Expected agents with no completed entry, in expected order
    pub pending: Vec<String>,
}

impl PipelineStatus {
    /// Check if every expected agent completed
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Pipeline session bound to a store
#[derive(Debug)]
pub struct PipelineTracker {
    store: AtomicSessionStore,
    record: PipelineRecord,
}

impl PipelineTracker {
    /// Start a new session, writing it immediately
    ///
    /// # Errors
    /// - `TrackerError::AlreadyExists` if the store already holds a document
    /// - `TrackerError::Session` if the store cannot be read or the initial save fails
    pub fn create(store: AtomicSessionStore) -> Result<Self, TrackerError> {
        Self::create_with(store, PipelineRecord::new())
    }

    /// Start a new session from a prepared record
    ///
    /// # Errors
    /// Same as [`PipelineTracker::create`]
    pub fn create_with(
        store: AtomicSessionStore,
        record: PipelineRecord,
    ) -> Result<Self, TrackerError> {
        if store.load()?.is_some() {
            return Err(TrackerError::AlreadyExists(store.path().to_path_buf()));
        }
        store.save_as(&record)?;
        tracing::info!(
            session_id = %record.session_id,
            path = %store.path().display(),
            "pipeline session created"
        );
        Ok(Self { store, record })
    }

    /// Reopen an existing session
    ///
    /// # Errors
    /// - `TrackerError::NotFound` if the file does not exist
    /// - `TrackerError::Session` if it cannot be read or parsed
    pub fn resume(store: AtomicSessionStore) -> Result<Self, TrackerError> {
        let record = store
            .load_as::<PipelineRecord>()?
            .ok_or_else(|| TrackerError::NotFound(store.path().to_path_buf()))?;
        Ok(Self { store, record })
    }

    /// Current record
    #[inline]
    #[must_use]
    pub fn record(&self) -> &PipelineRecord {
        &self.record
    }

    /// Backing store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &AtomicSessionStore {
        &self.store
    }

    /// Mark `agent` as started; restarting resets its entry
    ///
    /// # Errors
    /// `InvalidAgentName` or a store failure
    pub fn start_agent(&mut self, agent: &str) -> Result<(), TrackerError> {
        check_agent_name(agent)?;
        self.record
            .agents
            .insert(agent.to_string(), AgentEntry::started(Utc::now()));
        self.persist()?;
        tracing::debug!(agent, "agent started");
        Ok(())
    }

    /// Mark `agent` as completed
    ///
    /// # Errors
    /// `InvalidAgentName`, `AgentNotStarted` or a store failure
    pub fn complete_agent(
        &mut self,
        agent: &str,
        message: impl Into<String>,
        tools_used: &[&str],
    ) -> Result<(), TrackerError> {
        let entry = self.entry_mut(agent)?;
        entry.finish(AgentStatus::Completed, Utc::now());
        entry.message = Some(message.into());
        entry.tools_used = tools_used.iter().map(ToString::to_string).collect();
        self.persist()?;
        tracing::debug!(agent, "agent completed");
        Ok(())
    }

    /// Mark `agent` as failed
    ///
    /// # Errors
    /// `InvalidAgentName`, `AgentNotStarted` or a store failure
    pub fn fail_agent(&mut self, agent: &str, error: impl Into<String>) -> Result<(), TrackerError> {
        let entry = self.entry_mut(agent)?;
        entry.finish(AgentStatus::Failed, Utc::now());
        entry.error = Some(error.into());
        self.persist()?;
        tracing::warn!(agent, "agent failed");
        Ok(())
    }

    /// Link the session to a GitHub issue
    ///
    /// # Errors
    /// Store failure
    pub fn set_github_issue(&mut self, issue: u64) -> Result<(), TrackerError> {
        self.record.github_issue = Some(issue);
        self.persist()
    }

    /// Summarize progress against `expected` agents
    #[must_use]
    pub fn status(&self, expected: &[&str]) -> PipelineStatus {
        let count = |status: AgentStatus| {
            self.record
                .agents
                .values()
                .filter(|e| e.status == status)
                .count()
        };
        let pending = expected
            .iter()
            .filter(|name| {
                self.record
                    .agents
                    .get(**name)
                    .map_or(true, |e| e.status != AgentStatus::Completed)
            })
            .map(ToString::to_string)
            .collect();

        PipelineStatus {
            running: count(AgentStatus::Started),
            completed: count(AgentStatus::Completed),
            failed: count(AgentStatus::Failed),
            pending,
        }
    }

    fn entry_mut(&mut self, agent: &str) -> Result<&mut AgentEntry, TrackerError> {
        check_agent_name(agent)?;
        self.record
            .agents
            .get_mut(agent)
            .ok_or_else(|| TrackerError::AgentNotStarted(agent.to_string()))
    }

    fn persist(&self) -> Result<(), TrackerError> {
        Ok(self.store.save_as(&self.record)?)
    }
}

fn check_agent_name(agent: &str) -> Result<(), TrackerError> {
    let valid = !agent.is_empty()
        && agent.len() <= MAX_AGENT_NAME_LEN
        && agent
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(TrackerError::InvalidAgentName(agent.to_string()))
    }
}
