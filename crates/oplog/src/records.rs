//! Typed operation-log records
//!
//! Each catalog mutation that replicates emits exactly one record. Replay
//! consumes these records and must be able to re-apply them idempotently,
//! so rename records carry the acting collection id and, for drop-and-rename,
//! the dropped collection's id and record count.

use chrono::{DateTime, Utc};
use coral_core::types::{CollectionId, LogTimestamp, Namespace};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A record in the durable operation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OpLogRecord {
    /// A collection was created.
    CreateCollection {
        /// Namespace the collection was created at.
        ns: Namespace,
        /// Id assigned to the collection.
        id: CollectionId,
        /// Creation options, uninterpreted by the log.
        options: JsonValue,
        /// Wall-clock time of the mutation.
        wall: DateTime<Utc>,
    },

    /// Indexes were installed on a collection.
    CreateIndexes {
        /// Namespace of the collection.
        ns: Namespace,
        /// Id of the collection.
        id: CollectionId,
        /// Index specifications, uninterpreted by the log.
        specs: Vec<JsonValue>,
        /// Wall-clock time of the mutation.
        wall: DateTime<Utc>,
    },

    /// A collection was renamed, optionally dropping a previous occupant of
    /// the target namespace in the same unit of work.
    RenameCollection {
        /// Namespace the collection moved from.
        source: Namespace,
        /// Namespace the collection moved to.
        target: Namespace,
        /// Id of the moved collection (preserved by the rename).
        id: CollectionId,
        /// Id of the previous occupant of `target`, if one was dropped.
        dropped_id: Option<CollectionId>,
        /// Record count of the dropped occupant at drop time.
        dropped_records: Option<u64>,
        /// Whether the collection's temporary marking was preserved.
        stay_temp: bool,
        /// Wall-clock time of the mutation.
        wall: DateTime<Utc>,
    },

    /// A collection was dropped.
    DropCollection {
        /// Namespace the collection was dropped from.
        ns: Namespace,
        /// Id of the dropped collection.
        id: CollectionId,
        /// Wall-clock time of the mutation.
        wall: DateTime<Utc>,
    },
}

impl OpLogRecord {
    /// Build a rename record.
    pub fn rename(
        source: Namespace,
        target: Namespace,
        id: CollectionId,
        dropped_id: Option<CollectionId>,
        dropped_records: Option<u64>,
        stay_temp: bool,
    ) -> Self {
        OpLogRecord::RenameCollection {
            source,
            target,
            id,
            dropped_id,
            dropped_records,
            stay_temp,
            wall: Utc::now(),
        }
    }

    /// Build a create record.
    pub fn create(ns: Namespace, id: CollectionId, options: JsonValue) -> Self {
        OpLogRecord::CreateCollection {
            ns,
            id,
            options,
            wall: Utc::now(),
        }
    }

    /// Build a create-indexes record.
    pub fn create_indexes(ns: Namespace, id: CollectionId, specs: Vec<JsonValue>) -> Self {
        OpLogRecord::CreateIndexes {
            ns,
            id,
            specs,
            wall: Utc::now(),
        }
    }

    /// Build a drop record.
    pub fn drop_collection(ns: Namespace, id: CollectionId) -> Self {
        OpLogRecord::DropCollection {
            ns,
            id,
            wall: Utc::now(),
        }
    }
}

/// A record together with the timestamp the log assigned it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimestampedRecord {
    /// Assigned log position.
    pub ts: LogTimestamp,
    /// The record.
    pub record: OpLogRecord,
}
