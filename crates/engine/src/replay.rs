//! Log-replay adapter
//!
//! Wraps the rename engines for operations sourced from the durable
//! operation log or initial data synchronization. Every entry point here is
//! safe to apply more than once: the acting collection is resolved by id
//! first (names may have drifted since the record was written), a rename
//! whose source no longer exists locally downgrades into a pure drop of the
//! recorded target, and a drop target that resolves to nothing is treated as
//! already applied.

use crate::rename::RenameOptions;
use crate::service::CatalogService;
use crate::validate::user_allowed_write;
use coral_concurrency::OperationContext;
use coral_core::error::{Error, Result};
use coral_core::types::{CollectionId, DatabaseName, LogTimestamp, Namespace};
use coral_oplog::ReplicationMode;
use tracing::info;

/// The recorded drop-target field: absent, a bare flag, or the id of the
/// collection the upstream node dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropTargetSpec {
    /// No drop target was recorded.
    False,
    /// A drop was recorded without naming the dropped collection.
    True,
    /// The upstream node recorded the id of the collection it dropped.
    ById(CollectionId),
}

impl DropTargetSpec {
    /// Whether any drop target was recorded.
    pub fn is_set(&self) -> bool {
        !matches!(self, DropTargetSpec::False)
    }

    /// The recorded id, if the record named one.
    pub fn hint(&self) -> Option<CollectionId> {
        match self {
            DropTargetSpec::ById(id) => Some(*id),
            _ => None,
        }
    }
}

/// A rename operation as recorded in the operation log.
#[derive(Debug, Clone)]
pub struct RenameFromLogCommand {
    /// Recorded source namespace.
    pub source: Namespace,
    /// Recorded target namespace.
    pub target: Namespace,
    /// Recorded drop-target field.
    pub drop_target: DropTargetSpec,
    /// Whether the temporary marking was preserved.
    pub stay_temp: bool,
}

impl CatalogService {
    /// Re-apply a recorded rename.
    ///
    /// `source_id_hint` resolves the acting collection by id when present;
    /// `log_timestamp` is the timestamp the upstream drop carried, and is
    /// only legal while this context does not replicate writes.
    pub fn rename_from_log(
        &self,
        ctx: &OperationContext,
        db: &DatabaseName,
        source_id_hint: Option<CollectionId>,
        cmd: &RenameFromLogCommand,
        log_timestamp: Option<LogTimestamp>,
    ) -> Result<()> {
        if cmd.source.db != *db {
            return Err(Error::Internal(format!(
                "replayed rename of {} applied against database {db}",
                cmd.source
            )));
        }
        if log_timestamp.is_some() && ctx.writes_replicated() {
            return Err(Error::IllegalOperation(
                "a recorded rename timestamp cannot be applied while writes are replicated"
                    .to_string(),
            ));
        }

        // Id-first resolution: the source may have been renamed since the
        // record was written.
        let mut source = cmd.source.clone();
        if let Some(hint) = source_id_hint {
            if let Some(ns) = self.catalog.namespace_of_id(hint) {
                source = ns;
            }
        }
        let target = cmd.target.clone();

        user_allowed_write(&target)?;
        if self.replication.mode() == ReplicationMode::None && target.is_oplog() {
            return Err(Error::IllegalOperation(
                "cannot rename a collection to the replication log".to_string(),
            ));
        }

        let options = RenameOptions {
            drop_target: cmd.drop_target.is_set(),
            stay_temp: cmd.stay_temp,
        };
        let drop_hint = cmd.drop_target.hint();

        let source_gone =
            source.is_drop_pending() || self.catalog.lookup_by_namespace(&source).is_none();
        if source_gone {
            // The source was already renamed or dropped downstream of this
            // record; all that may remain is the recorded drop target.
            let drop_ns = match drop_hint {
                Some(hint) => self.catalog.namespace_of_id(hint),
                None if options.drop_target => Some(target.clone()),
                None => None,
            };
            return match drop_ns {
                Some(ns) => {
                    info!(
                        target: "coral::rename",
                        source = %source,
                        dropping = %ns,
                        "Downgrading replayed rename of a missing source to a drop"
                    );
                    self.drop_for_replay(ctx, &ns, log_timestamp)
                }
                // The recorded drop target no longer resolves: the whole
                // record was already applied.
                None if drop_hint.is_some() => Ok(()),
                None => Err(Error::NamespaceNotFound(format!(
                    "cannot replay a rename whose source collection does not exist \
                     or is pending deletion: {source}"
                ))),
            };
        }

        info!(
            target: "coral::rename",
            source = %source,
            target = %target,
            drop_target = options.drop_target,
            "Replaying rename"
        );

        if source.db == target.db {
            self.rename_within_db_for_replay(
                ctx,
                &source,
                &target,
                drop_hint,
                log_timestamp,
                options,
            )
        } else {
            self.rename_between_dbs(ctx, &source, &target, options)
        }
    }

    /// Rollback entry point: resolve the source purely by id and rename it
    /// back over `target`. Rollback never crosses databases.
    pub fn rename_for_rollback(
        &self,
        ctx: &OperationContext,
        target: &Namespace,
        source_id: CollectionId,
    ) -> Result<()> {
        let source = self.catalog.namespace_of_id(source_id).ok_or_else(|| {
            Error::NamespaceNotFound(format!(
                "no collection with id {source_id} to roll back to {target}"
            ))
        })?;
        if source.db != target.db {
            return Err(Error::Internal(format!(
                "rollback rename of {source} to {target} crosses databases"
            )));
        }
        info!(
            target: "coral::rename",
            source = %source,
            id = %source_id,
            rollback_target = %target,
            "Renaming collection for rollback"
        );
        self.rename_within_db(ctx, &source, target, RenameOptions::default())
    }
}
