//! Cross-database migration engine
//!
//! There is no atomic cross-database rename primitive, so the engine builds
//! a staging copy in the target database and only mutates the destination
//! namespace in the final within-database rename:
//!
//! 1. acquire locks; validate
//! 2. create the target database if absent
//! 3. generate an unused staging name (requires the target database
//!    exclusively locked)
//! 4. create the staging collection with the source's options and a fresh id
//! 5. arm cleanup that drops the staging collection on any failure
//! 6. install every non-identity index while the staging collection is
//!    still empty, in one unit of work
//! 7. narrow locking: release the target-database exclusive lock, take an
//!    intent lock on the staging collection only
//! 8. stream records in storage order, one bounded batch per unit of work,
//!    repositioning the cursor on conflict and checking for interruption
//!    per batch
//! 9. release the copy-phase locks
//! 10. rename the staging collection onto the target within the database
//! 11. disarm cleanup; drop the source
//!
//! Failure before step 10 leaves source and target untouched. Failure at or
//! after step 10 leaves the destination migrated with only the source drop
//! possibly pending.

use crate::lock_order::acquire_if_needed;
use crate::rename::RenameOptions;
use crate::service::CatalogService;
use crate::validate::ValidationMode;
use coral_catalog::RecordCursor;
use coral_concurrency::{write_conflict_retry, LockMode, OperationContext, ResourceId};
use coral_core::error::{Error, Result};
use coral_core::types::{CollectionId, Namespace};
use coral_oplog::OpLogRecord;
use tracing::{debug, info, warn};

/// Drops the staging collection on failure. Armed from the moment the
/// staging collection exists until the migration has fully succeeded.
/// Cleanup failures are logged and swallowed; the primary failure already
/// determines the reported error.
struct TempCollectionDropper<'a> {
    service: &'a CatalogService,
    ctx: &'a OperationContext,
    tmp_ns: Namespace,
    armed: bool,
}

impl<'a> TempCollectionDropper<'a> {
    fn armed(service: &'a CatalogService, ctx: &'a OperationContext, tmp_ns: Namespace) -> Self {
        TempCollectionDropper {
            service,
            ctx,
            tmp_ns,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for TempCollectionDropper<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        // Cleanup must run even when the migration was cancelled, and must
        // not trip the operation's own fault policy.
        let cleanup_ctx = self.ctx.fork_uninterruptible();
        if let Err(err) = self
            .service
            .drop_for_replay(&cleanup_ctx, &self.tmp_ns, None)
        {
            warn!(
                target: "coral::rename",
                tmp = %self.tmp_ns,
                error = %err,
                "Unable to drop temporary collection while cleaning up a failed migration"
            );
        }
    }
}

impl CatalogService {
    /// Migrate `source` into `target.db` under the name `target.coll`.
    pub(crate) fn rename_between_dbs(
        &self,
        ctx: &OperationContext,
        source: &Namespace,
        target: &Namespace,
        options: RenameOptions,
    ) -> Result<()> {
        debug_assert_ne!(source.db, target.db);

        // Step 1: source intent + shared locks (the copy only reads it),
        // then the target database exclusively. Skip whatever the caller
        // already holds in sufficient mode.
        let mut source_db_lock = None;
        let mut source_coll_lock = None;
        if !ctx.is_locked_for(&ResourceId::collection(source), LockMode::Shared) {
            source_db_lock = acquire_if_needed(
                &self.locks,
                ctx,
                ResourceId::database(&source.db),
                LockMode::IntentExclusive,
            )?;
            source_coll_lock = acquire_if_needed(
                &self.locks,
                ctx,
                ResourceId::collection(source),
                LockMode::Shared,
            )?;
        }
        let mut target_db_lock = acquire_if_needed(
            &self.locks,
            ctx,
            ResourceId::database(&target.db),
            LockMode::Exclusive,
        )?;

        self.sharding.check_database_version(&source.db)?;
        self.sharding.check_database_version(&target.db)?;
        self.validate_rename(ctx, source, target, options, ValidationMode::default())?;

        let source_meta = self
            .catalog
            .collection_meta(source)
            .ok_or_else(|| Error::NamespaceNotFound(source.ns()))?;

        // Step 2: the target database comes into being implicitly.
        self.catalog.ensure_database(&target.db);

        // Step 3: the generated name stays unused only while the target
        // database is exclusively locked.
        if !ctx.is_locked_for(&ResourceId::database(&target.db), LockMode::Exclusive) {
            return Err(Error::Internal(
                "generating a unique collection name requires the database exclusively locked"
                    .to_string(),
            ));
        }
        let tmp_ns = self.catalog.generate_unique_namespace(&target.db)?;
        info!(
            target: "coral::rename",
            tmp = %tmp_ns,
            source = %source,
            "Creating temporary collection with the contents of the source collection"
        );

        // Step 4: staging collection with the source's options. A fresh id:
        // id spaces are scoped per database, a move never preserves them.
        let tmp_id = CollectionId::new();
        write_conflict_retry(ctx, "rename_collection", &tmp_ns, || {
            let mut txn = self.catalog.begin();
            txn.create(tmp_ns.clone(), tmp_id, source_meta.options.clone());
            if self.should_emit(ctx, &tmp_ns) {
                txn.emit(OpLogRecord::create(
                    tmp_ns.clone(),
                    tmp_id,
                    serde_json::to_value(&source_meta.options)
                        .unwrap_or(serde_json::Value::Null),
                ));
            }
            txn.commit(&*self.oplog).map(|_| ())
        })?;

        // Step 5
        let mut dropper = TempCollectionDropper::armed(self, ctx, tmp_ns.clone());
        ctx.faults().check_fail_point("migrate::temp_created")?;

        // Step 6: all secondary indexes in one unit of work while the
        // staging collection is empty, so it is never visible with a
        // partial index set.
        let indexes = source_meta.secondary_indexes();
        if !indexes.is_empty() {
            write_conflict_retry(ctx, "rename_collection", &tmp_ns, || {
                let mut txn = self.catalog.begin();
                txn.create_indexes(tmp_id, indexes.clone());
                if self.should_emit(ctx, &tmp_ns) {
                    let specs = indexes
                        .iter()
                        .map(|ix| serde_json::to_value(ix).unwrap_or(serde_json::Value::Null))
                        .collect();
                    txn.emit(OpLogRecord::create_indexes(tmp_ns.clone(), tmp_id, specs));
                }
                txn.commit(&*self.oplog).map(|_| ())
            })?;
        }
        ctx.faults().check_fail_point("migrate::indexes_installed")?;

        // Step 7: narrow the blocking radius for the long copy. Unrelated
        // target-database activity resumes; only the staging collection
        // stays guarded.
        drop(target_db_lock.take());
        let tmp_lock = self.locks.acquire(
            ctx,
            ResourceId::collection(&tmp_ns),
            LockMode::IntentExclusive,
        )?;
        if self.catalog.lookup_by_namespace(&tmp_ns) != Some(tmp_id) {
            return Err(Error::NamespaceNotFound(format!(
                "temporary collection {tmp_ns} was removed while renaming across databases"
            )));
        }

        // Step 8
        self.copy_records(ctx, source_meta.id, tmp_id, &tmp_ns)?;
        ctx.faults().check_fail_point("migrate::copy_done")?;

        // Step 9
        drop(tmp_lock);
        drop(source_coll_lock);
        drop(source_db_lock);

        // Step 10: the only point the destination namespace is mutated,
        // atomically with dropping any prior occupant.
        self.rename_within_db(ctx, &tmp_ns, target, options)?;
        ctx.faults().check_fail_point("migrate::target_renamed")?;

        // Step 11
        dropper.disarm();
        self.drop_for_replay(ctx, source, None)?;
        info!(
            target: "coral::rename",
            source = %source,
            target = %target,
            "Cross-database rename complete"
        );
        Ok(())
    }

    /// Stream the source's records into the staging collection in storage
    /// order, one bounded batch per unit of work. On a conflict the cursor
    /// is repositioned to the first record of the failed batch; the scan is
    /// never restarted. Interruption is checked per batch.
    fn copy_records(
        &self,
        ctx: &OperationContext,
        source_id: CollectionId,
        tmp_id: CollectionId,
        tmp_ns: &Namespace,
    ) -> Result<()> {
        let batch_size = self.config.max_batch_size.max(1);
        let catalog = self.catalog.as_ref();

        let mut cursor = Some(RecordCursor::new(catalog, source_id));
        let mut record = cursor.as_mut().expect("cursor just created").next();
        let mut copied: u64 = 0;

        while record.is_some() {
            ctx.check_for_interrupt()?;
            let batch_start = record.as_ref().map(|(rid, _)| *rid).unwrap();

            write_conflict_retry(ctx, "migrate_collection", tmp_ns, || {
                let cur = cursor.as_mut().expect("cursor parked only across commit");
                // A previous attempt advanced past the batch; reposition to
                // its first record and re-read.
                if record.as_ref().map(|(rid, _)| *rid) != Some(batch_start) {
                    cur.seek(batch_start);
                    record = cur.next();
                }

                let mut txn = self.catalog.begin();
                let mut batch = Vec::with_capacity(batch_size);
                while let Some((_, data)) = record.take() {
                    batch.push(data);
                    record = cur.next();
                    if batch.len() >= batch_size {
                        break;
                    }
                }
                let staged = batch.len() as u64;
                txn.insert_records(tmp_id, batch);

                ctx.faults().maybe_copy_conflict()?;

                // The cursor may not live across a commit; park it and
                // resume from the token afterwards.
                let token = cursor.take().expect("cursor parked only across commit").pause();
                let committed = txn.commit(&*self.oplog);
                cursor = Some(RecordCursor::resume(catalog, token));
                committed?;
                copied += staged;
                Ok(())
            })?;
        }

        debug!(
            target: "coral::rename",
            records = copied,
            tmp = %tmp_ns,
            "Bulk copy complete"
        );
        Ok(())
    }
}
