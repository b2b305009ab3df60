//! Catalog service
//!
//! `CatalogService` wires the catalog together with its collaborators: the
//! lock manager, the operation log, the replication policy, the sharding
//! oracle, and the background-operation registry. All rename entry points
//! are methods on it; the per-concern implementations live in the sibling
//! modules.

use crate::background::BackgroundRegistry;
use crate::config::MigrationConfig;
use crate::sharding::{ShardingOracle, UnshardedOracle};
use coral_catalog::Catalog;
use coral_concurrency::{LockManager, OperationContext};
use coral_core::types::Namespace;
use coral_oplog::{MemoryOpLog, OperationLog, ReplicationPolicy, Standalone};
use std::sync::Arc;

/// The catalog layer's service object: catalog plus collaborators.
pub struct CatalogService {
    pub(crate) catalog: Arc<Catalog>,
    pub(crate) locks: Arc<LockManager>,
    pub(crate) oplog: Arc<dyn OperationLog>,
    pub(crate) replication: Arc<dyn ReplicationPolicy>,
    pub(crate) sharding: Arc<dyn ShardingOracle>,
    pub(crate) background: Arc<BackgroundRegistry>,
    pub(crate) config: MigrationConfig,
}

impl CatalogService {
    /// Assemble a service from explicit collaborators.
    pub fn new(
        catalog: Arc<Catalog>,
        locks: Arc<LockManager>,
        oplog: Arc<dyn OperationLog>,
        replication: Arc<dyn ReplicationPolicy>,
        sharding: Arc<dyn ShardingOracle>,
        background: Arc<BackgroundRegistry>,
        config: MigrationConfig,
    ) -> Self {
        CatalogService {
            catalog,
            locks,
            oplog,
            replication,
            sharding,
            background,
            config,
        }
    }

    /// A fresh standalone deployment: empty catalog, in-memory log, no
    /// replication, no sharding.
    pub fn standalone() -> Self {
        Self::new(
            Arc::new(Catalog::new()),
            Arc::new(LockManager::new()),
            Arc::new(MemoryOpLog::new()),
            Arc::new(Standalone),
            Arc::new(UnshardedOracle),
            Arc::new(BackgroundRegistry::new()),
            MigrationConfig::default(),
        )
    }

    /// The underlying catalog.
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// The lock manager.
    pub fn locks(&self) -> &Arc<LockManager> {
        &self.locks
    }

    /// The background-operation registry.
    pub fn background(&self) -> &Arc<BackgroundRegistry> {
        &self.background
    }

    /// The replication policy.
    pub fn replication(&self) -> &Arc<dyn ReplicationPolicy> {
        &self.replication
    }

    /// Whether a mutation of `ns` under `ctx` must emit an operation-log
    /// record: the context carries replicated writes and the policy declares
    /// the namespace replicated. Replay and rollback contexts never emit.
    pub(crate) fn should_emit(&self, ctx: &OperationContext, ns: &Namespace) -> bool {
        ctx.writes_replicated() && self.replication.is_replicated(ns)
    }
}
