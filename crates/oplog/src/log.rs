//! Operation-log append interface
//!
//! The write mechanics of the durable log (batching, fsync, replication
//! transport) live outside this layer. The catalog only needs an append
//! point that assigns monotonic timestamps; `MemoryOpLog` is the in-process
//! implementation used by embedded deployments and tests.

use crate::records::{OpLogRecord, TimestampedRecord};
use coral_core::types::LogTimestamp;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// Append point of the durable operation log.
///
/// `emit` assigns the next timestamp. Replay paths never emit; they carry
/// the timestamp recorded upstream instead.
pub trait OperationLog: Send + Sync {
    /// Append a record, returning the timestamp assigned to it.
    fn emit(&self, record: OpLogRecord) -> LogTimestamp;
}

/// In-process operation log.
pub struct MemoryOpLog {
    next: AtomicU64,
    entries: Mutex<Vec<TimestampedRecord>>,
}

impl MemoryOpLog {
    /// Create an empty log. Timestamps start at 1; 0 is never assigned.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        MemoryOpLog {
            next: AtomicU64::new(1),
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of every record emitted so far, in timestamp order.
    pub fn entries(&self) -> Vec<TimestampedRecord> {
        self.entries.lock().clone()
    }

    /// Number of records emitted so far.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether no records have been emitted.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl OperationLog for MemoryOpLog {
    fn emit(&self, record: OpLogRecord) -> LogTimestamp {
        let ts = LogTimestamp(self.next.fetch_add(1, Ordering::SeqCst));
        trace!(target: "coral::oplog", ts = %ts, "Appended log record");
        self.entries.lock().push(TimestampedRecord { ts, record });
        ts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coral_core::types::{CollectionId, Namespace};

    #[test]
    fn test_emit_assigns_monotonic_timestamps() {
        let log = MemoryOpLog::new();
        let a = log.emit(OpLogRecord::drop_collection(
            Namespace::new("sales", "orders"),
            CollectionId::new(),
        ));
        let b = log.emit(OpLogRecord::drop_collection(
            Namespace::new("sales", "returns"),
            CollectionId::new(),
        ));
        assert!(a < b);
        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].ts, a);
        assert_eq!(entries[1].ts, b);
    }
}
