//! Audit sink trait and in-process backends

use crate::error::AuditResult;
use crate::event::{AuditContext, AuditEvent, AuditStatus};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Destination for audit events
///
/// Implementations must never propagate I/O failures out of [`append`]:
/// auditing is secondary to the operation being audited.
///
/// [`append`]: AuditSink::append
pub trait AuditSink: Send + Sync + fmt::Debug {
    /// Append a fully built event, swallowing any write failure
    fn append(&self, event: &AuditEvent);

    /// Build and append an event
    ///
    /// # Errors
    /// `AuditError::InvalidEvent` if `event_type` is blank. Write failures are
    /// not reported.
    fn record(
        &self,
        event_type: &str,
        status: AuditStatus,
        context: AuditContext,
    ) -> AuditResult<()> {
        let event = AuditEvent::new(event_type, status, context)?;
        self.append(&event);
        Ok(())
    }
}

impl<T: AuditSink + ?Sized> AuditSink for Arc<T> {
    fn append(&self, event: &AuditEvent) {
        (**self).append(event);
    }
}

/// In-memory audit sink
///
/// Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryAuditLog {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl MemoryAuditLog {
    /// Create an empty in-memory log
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }

    /// Events with the given type and status
    #[must_use]
    pub fn matching(&self, event_type: &str, status: AuditStatus) -> Vec<AuditEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.event_type() == event_type && e.status() == status)
            .cloned()
            .collect()
    }

    /// Number of recorded events
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Check if no events were recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Drop all recorded events
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl AuditSink for MemoryAuditLog {
    fn append(&self, event: &AuditEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Audit sink that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAuditLog;

impl NullAuditLog {
    /// Create a null sink
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl AuditSink for NullAuditLog {
    fn append(&self, _event: &AuditEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuditError;

    #[test]
    fn memory_log_stores_events_in_order() {
        let log = MemoryAuditLog::new();
        log.record("a", AuditStatus::Success, AuditContext::new()).unwrap();
        log.record("b", AuditStatus::Failure, AuditContext::new()).unwrap();

        let types: Vec<_> = log.events().iter().map(|e| e.event_type().to_string()).collect();
        assert_eq!(types, vec!["a", "b"]);
        assert_eq!(log.matching("b", AuditStatus::Failure).len(), 1);
    }

    #[test]
    fn memory_log_clones_share_buffer() {
        let log = MemoryAuditLog::new();
        let handle = log.clone();
        handle.record("x", AuditStatus::Success, AuditContext::new()).unwrap();
        assert_eq!(log.len(), 1);

        log.clear();
        assert!(handle.is_empty());
    }

    #[test]
    fn record_rejects_blank_event_type() {
        let log = MemoryAuditLog::new();
        let err = log.record("", AuditStatus::Success, AuditContext::new()).unwrap_err();
        assert!(matches!(err, AuditError::InvalidEvent(_)));
        assert!(log.is_empty());
    }

    #[test]
    fn null_log_accepts_and_drops() {
        let log = NullAuditLog::new();
        assert!(log.record("x", AuditStatus::Success, AuditContext::new()).is_ok());
    }

    #[test]
    fn arc_dyn_sink_forwards() {
        let memory = MemoryAuditLog::new();
        let sink: Arc<dyn AuditSink> = Arc::new(memory.clone());
        sink.record("y", AuditStatus::Failure, AuditContext::new()).unwrap();
        assert_eq!(memory.len(), 1);
    }
}
