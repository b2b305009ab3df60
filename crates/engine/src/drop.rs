//! Replay-safe collection drop
//!
//! Used by the replay adapter's downgrade path, the migration's source drop
//! and temp-collection cleanup. A namespace that no longer resolves is a
//! success, because these callers re-apply recorded operations and the drop
//! may already have happened.

use crate::lock_order::acquire_if_needed;
use crate::service::CatalogService;
use coral_catalog::DropStamp;
use coral_concurrency::{write_conflict_retry, LockMode, OperationContext, ResourceId};
use coral_core::error::Result;
use coral_core::types::{LogTimestamp, Namespace};
use coral_oplog::OpLogRecord;

impl CatalogService {
    /// Drop the collection at `ns` if it exists. A supplied timestamp parks
    /// the collection drop-pending; otherwise a replicated live drop stamps
    /// itself from its own log emission, and an unreplicated one removes the
    /// collection outright.
    pub(crate) fn drop_for_replay(
        &self,
        ctx: &OperationContext,
        ns: &Namespace,
        ts: Option<LogTimestamp>,
    ) -> Result<()> {
        let _db_lock = acquire_if_needed(
            &self.locks,
            ctx,
            ResourceId::database(&ns.db),
            LockMode::IntentExclusive,
        )?;
        let _coll_lock = acquire_if_needed(
            &self.locks,
            ctx,
            ResourceId::collection(ns),
            LockMode::Exclusive,
        )?;

        write_conflict_retry(ctx, "drop_collection", ns, || {
            let mut txn = self.catalog.begin();
            let Some(id) = self.catalog.lookup_by_namespace(ns) else {
                // Already gone; re-applying a drop is a no-op.
                return Ok(());
            };
            let should_emit = self.should_emit(ctx, ns);
            let stamp = match ts {
                Some(t) => DropStamp::Supplied(t),
                None if should_emit => DropStamp::FromCommit,
                None => DropStamp::Immediate,
            };
            txn.drop(ns.clone(), stamp);
            if should_emit {
                txn.emit(OpLogRecord::drop_collection(ns.clone(), id));
            }
            txn.commit(&*self.oplog).map(|_| ())
        })
    }
}
