//! Sharding oracle seam
//!
//! Sharding metadata is computed elsewhere; the rename machinery only asks
//! whether an endpoint is currently sharded (renames of sharded collections
//! belong to a higher-level coordinator) and whether the caller's view of a
//! database's routing version is stale.

use coral_core::error::Result;
use coral_core::types::{DatabaseName, Namespace};

/// Answers the rename machinery's sharding questions.
pub trait ShardingOracle: Send + Sync {
    /// Whether `ns` is currently a sharded collection.
    fn is_sharded(&self, ns: &Namespace) -> bool;

    /// Fail if the caller's routing information for `db` is stale.
    fn check_database_version(&self, db: &DatabaseName) -> Result<()>;
}

/// Oracle of an unsharded deployment: nothing is sharded, versions never go
/// stale.
pub struct UnshardedOracle;

impl ShardingOracle for UnshardedOracle {
    fn is_sharded(&self, _ns: &Namespace) -> bool {
        false
    }

    fn check_database_version(&self, _db: &DatabaseName) -> Result<()> {
        Ok(())
    }
}
