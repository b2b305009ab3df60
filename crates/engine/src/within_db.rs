//! Within-database rename engine
//!
//! Both namespaces share a database, so the catalog's atomic rename-in-place
//! does all the work; the interesting part is composing it with an optional
//! drop of the target in one unit of work, and with the idempotency rules of
//! replay.

use crate::lock_order::{acquire_if_needed, lock_collection_pair};
use crate::rename::RenameOptions;
use crate::service::CatalogService;
use crate::validate::ValidationMode;
use coral_catalog::{CollectionMeta, DropStamp};
use coral_concurrency::{write_conflict_retry, LockMode, OperationContext, ResourceId};
use coral_core::error::{Error, Result};
use coral_core::types::{CollectionId, LogTimestamp, Namespace};
use coral_oplog::OpLogRecord;
use tracing::info;

impl CatalogService {
    /// Rename `source` to `target` within one database.
    pub(crate) fn rename_within_db(
        &self,
        ctx: &OperationContext,
        source: &Namespace,
        target: &Namespace,
        options: RenameOptions,
    ) -> Result<()> {
        debug_assert_eq!(source.db, target.db);

        // A self-rename can never succeed, and locking one collection twice
        // exclusively would deadlock on itself.
        if source == target {
            return Err(Error::NamespaceExists(
                "target namespace exists".to_string(),
            ));
        }

        let _db_lock = acquire_if_needed(
            &self.locks,
            ctx,
            ResourceId::database(&source.db),
            LockMode::IntentExclusive,
        )?;
        self.sharding.check_database_version(&source.db)?;
        let _coll_locks = lock_collection_pair(&self.locks, ctx, source, target)?;

        self.validate_rename(ctx, source, target, options, ValidationMode::default())?;

        let source_id = self
            .catalog
            .lookup_by_namespace(source)
            .ok_or_else(|| Error::NamespaceNotFound(source.ns()))?;

        match self.catalog.lookup_by_namespace(target) {
            None => self.rename_directly(ctx, source, target, source_id, options),
            Some(_) => {
                self.rename_and_drop_target(ctx, source, target, target, source_id, options, None)
            }
        }
    }

    /// The no-existing-target case: one unit of work renaming in place and
    /// emitting one log record.
    pub(crate) fn rename_directly(
        &self,
        ctx: &OperationContext,
        source: &Namespace,
        target: &Namespace,
        source_id: CollectionId,
        options: RenameOptions,
    ) -> Result<()> {
        write_conflict_retry(ctx, "rename_collection", target, || {
            let mut txn = self.catalog.begin();
            txn.rename(source.clone(), target.clone(), options.stay_temp);
            if self.should_emit(ctx, target) {
                txn.emit(OpLogRecord::rename(
                    source.clone(),
                    target.clone(),
                    source_id,
                    None,
                    None,
                    options.stay_temp,
                ));
            }
            txn.commit(&*self.oplog).map(|_| ())
        })
    }

    /// The existing-target case: capture the occupant's record count,
    /// re-assert it is quiet, then drop it and rename the source in one unit
    /// of work. `drop_ns` is where the occupant currently lives; replay may
    /// have resolved it to a name other than `target`.
    ///
    /// Exactly one of {`replay_ts`, a commit-time emission} stamps the drop;
    /// both present is a fatal invariant violation.
    pub(crate) fn rename_and_drop_target(
        &self,
        ctx: &OperationContext,
        source: &Namespace,
        target: &Namespace,
        drop_ns: &Namespace,
        source_id: CollectionId,
        options: RenameOptions,
        replay_ts: Option<LogTimestamp>,
    ) -> Result<()> {
        if !options.drop_target {
            return Err(Error::Internal(
                "existing rename target without drop_target".to_string(),
            ));
        }

        write_conflict_retry(ctx, "rename_collection", target, || {
            let mut txn = self.catalog.begin();
            let dropped = self
                .catalog
                .collection_meta(drop_ns)
                .ok_or_else(|| Error::NamespaceNotFound(drop_ns.ns()))?;
            self.background.assert_none_in_progress(dropped.id)?;

            let should_emit = self.should_emit(ctx, target);
            if replay_ts.is_some() && should_emit {
                return Err(Error::Internal(format!(
                    "rename of {source} to {target} carries a replay timestamp \
                     while writes are replicated"
                )));
            }
            let stamp = match replay_ts {
                Some(ts) => DropStamp::Supplied(ts),
                None if should_emit => DropStamp::FromCommit,
                None => DropStamp::Immediate,
            };

            let records = dropped.record_count;
            txn.drop(drop_ns.clone(), stamp);
            txn.rename(source.clone(), target.clone(), options.stay_temp);
            if should_emit {
                txn.emit(OpLogRecord::rename(
                    source.clone(),
                    target.clone(),
                    source_id,
                    Some(dropped.id),
                    Some(records),
                    options.stay_temp,
                ));
            }
            txn.commit(&*self.oplog).map(|_| ())
        })
    }

    /// Replay variant: resolve idempotency before mutating anything.
    ///
    /// Cases, re-evaluated inside the retry loop:
    /// - the target already holds the source's id: the rename was applied
    ///   upstream; at most the recorded drop target remains to be dropped;
    /// - the target is occupied by a collection the drop hint does not name:
    ///   relocate the occupant to a generated temporary name first;
    /// - a surviving drop hint re-resolves to the occupant's current
    ///   namespace, wherever the name drifted to.
    pub(crate) fn rename_within_db_for_replay(
        &self,
        ctx: &OperationContext,
        source: &Namespace,
        target: &Namespace,
        drop_hint: Option<CollectionId>,
        replay_ts: Option<LogTimestamp>,
        options: RenameOptions,
    ) -> Result<()> {
        debug_assert_eq!(source.db, target.db);

        let _db_lock = acquire_if_needed(
            &self.locks,
            ctx,
            ResourceId::database(&source.db),
            LockMode::Exclusive,
        )?;
        self.sharding.check_database_version(&source.db)?;

        self.validate_rename(
            ctx,
            source,
            target,
            options,
            ValidationMode {
                target_exists_allowed: true,
            },
        )?;

        let source_id = self
            .catalog
            .lookup_by_namespace(source)
            .ok_or_else(|| Error::NamespaceNotFound(source.ns()))?;

        write_conflict_retry(ctx, "rename_collection", target, || {
            let mut occupant = self.catalog.collection_meta(target);

            if let Some(existing) = occupant.clone() {
                if existing.id == source_id {
                    // The rename itself was already applied. Apply the
                    // recorded drop if its target still exists.
                    let Some(hint) = drop_hint else { return Ok(()) };
                    if hint == existing.id {
                        return Ok(());
                    }
                    let Some(hint_ns) = self.catalog.namespace_of_id(hint) else {
                        return Ok(());
                    };
                    if hint_ns.is_drop_pending() {
                        return Ok(());
                    }
                    let mut txn = self.catalog.begin();
                    let stamp = match replay_ts {
                        Some(ts) => DropStamp::Supplied(ts),
                        None => DropStamp::Immediate,
                    };
                    txn.drop(hint_ns, stamp);
                    return txn.commit(&*self.oplog).map(|_| ());
                }

                if drop_hint != Some(existing.id) {
                    // The occupant is not the collection this record drops;
                    // move it out of the way rather than destroy it.
                    self.relocate_occupant_to_tmp(ctx, target, &existing)?;
                    occupant = None;
                }
            }

            if occupant.is_none() {
                if let Some(hint) = drop_hint {
                    // Identify the collection to drop by id; its name may
                    // have drifted since the record was written.
                    if let Some(hint_ns) = self.catalog.namespace_of_id(hint) {
                        if !hint_ns.is_drop_pending() {
                            if hint_ns.db != target.db {
                                return Err(Error::Internal(format!(
                                    "recorded drop target {hint_ns} is outside database {}",
                                    target.db
                                )));
                            }
                            occupant = self.catalog.collection_meta(&hint_ns);
                        }
                    }
                }
            }

            match occupant {
                None => self.rename_directly(ctx, source, target, source_id, options),
                Some(existing) if existing.id == source_id => Ok(()),
                Some(existing) => {
                    let drop_ns = existing.namespace.clone();
                    self.rename_and_drop_target(
                        ctx, source, target, &drop_ns, source_id, options, replay_ts,
                    )
                }
            }
        })
    }

    /// Move the collection occupying `target` to a generated temporary name
    /// so a replayed rename can land. Preserves the occupant's temporary
    /// marking.
    fn relocate_occupant_to_tmp(
        &self,
        ctx: &OperationContext,
        target: &Namespace,
        occupant: &CollectionMeta,
    ) -> Result<()> {
        if !ctx.is_locked_for(&ResourceId::database(&target.db), LockMode::Exclusive) {
            return Err(Error::Internal(
                "generating a unique collection name requires the database exclusively locked"
                    .to_string(),
            ));
        }
        let tmp_ns = self.catalog.generate_unique_namespace(&target.db)?;
        write_conflict_retry(ctx, "rename_collection", target, || {
            let mut txn = self.catalog.begin();
            txn.rename(target.clone(), tmp_ns.clone(), true);
            txn.commit(&*self.oplog).map(|_| ())
        })?;
        info!(
            target: "coral::rename",
            occupied = %target,
            occupant = %occupant.id,
            relocated_to = %tmp_ns,
            "Relocated existing target out of the way of a replayed rename"
        );
        Ok(())
    }
}
