//! Operation-log types for the Coral catalog layer
//!
//! This crate defines:
//! - OpLogRecord: typed records for replicated catalog mutations
//! - OperationLog: the append seam, with MemoryOpLog as in-process impl
//! - ReplicationPolicy: the replication coordinator seam

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod log;
pub mod records;
pub mod replication;

pub use log::{MemoryOpLog, OperationLog};
pub use records::{OpLogRecord, TimestampedRecord};
pub use replication::{ReplicaSetMember, ReplicationMode, ReplicationPolicy, Standalone};
