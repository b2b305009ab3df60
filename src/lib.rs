//! CoralDB - embedded document-database catalog layer
//!
//! CoralDB's catalog layer moves collections between namespaces while
//! preserving data, indexes, identity, and replication consistency:
//! within-database renames are a single atomic unit of work, cross-database
//! moves migrate through a staging collection, and the replay entry points
//! re-apply recorded operations idempotently.
//!
//! # Quick Start
//!
//! ```ignore
//! use coraldb::{CatalogService, OperationContext, RenameOptions};
//! use coraldb::Namespace;
//!
//! let service = CatalogService::standalone();
//! let ctx = OperationContext::new();
//!
//! service.rename_collection(
//!     &ctx,
//!     &Namespace::new("sales", "orders"),
//!     &Namespace::new("sales", "archived_orders"),
//!     RenameOptions::default(),
//! )?;
//! ```
//!
//! # Architecture
//!
//! All operations go through [`CatalogService`], which wires the catalog
//! together with the lock manager, operation log, replication policy,
//! sharding oracle, and background-operation registry. The lower layers
//! (catalog, concurrency, oplog) are re-exported for embedders that
//! assemble their own service.

pub use coral_engine::{
    BackgroundOpGuard, BackgroundRegistry, CatalogService, DropTargetSpec, MigrationConfig,
    RenameFromLogCommand, RenameOptions, ShardingOracle, UnshardedOracle,
};

pub use coral_catalog::{Catalog, CollectionMeta, CursorToken, RecordCursor, ViewDefinition};
pub use coral_concurrency::{
    FaultPolicy, LockManager, LockMode, OperationContext, ResourceId, RetryConfig,
};
pub use coral_core::{
    CollectionId, CollectionOptions, DatabaseName, Error, IndexDescriptor, Limits, LogTimestamp,
    Namespace, Record, RecordId, Result,
};
pub use coral_oplog::{
    MemoryOpLog, OpLogRecord, OperationLog, ReplicaSetMember, ReplicationMode, ReplicationPolicy,
    Standalone,
};
