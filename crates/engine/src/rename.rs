//! Top-level rename dispatch
//!
//! `rename_collection` routes a validated request to the within-database
//! engine or the cross-database migration engine. `validate_and_run_rename`
//! is the outer command entry performing the checks that precede routing,
//! and `rename_if_unchanged` guards a copy-then-verify flow where the
//! caller captured the target's options and indexes earlier and must fail
//! if they drifted.

use crate::lock_order::acquire_if_needed;
use crate::service::CatalogService;
use coral_concurrency::{LockMode, OperationContext, ResourceId};
use coral_core::collection::{CollectionOptions, IndexDescriptor};
use coral_core::error::{Error, Result};
use coral_core::limits::Limits;
use coral_core::types::Namespace;
use coral_oplog::ReplicationMode;
use tracing::info;

/// Caller-facing rename options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenameOptions {
    /// Drop an existing collection at the target namespace in the same unit
    /// of work as the rename.
    pub drop_target: bool,
    /// Preserve the source's temporary marking across the rename.
    pub stay_temp: bool,
}

impl CatalogService {
    /// Rename `source` to `target`, routing by database equality.
    pub fn rename_collection(
        &self,
        ctx: &OperationContext,
        source: &Namespace,
        target: &Namespace,
        options: RenameOptions,
    ) -> Result<()> {
        if source.is_drop_pending() {
            return Err(Error::NamespaceNotFound(format!(
                "cannot rename a collection that is pending deletion: {source}"
            )));
        }
        if source.is_system_dot_views() || target.is_system_dot_views() {
            return Err(Error::IllegalOperation(
                "renaming the view-definition collection is not allowed".to_string(),
            ));
        }

        info!(
            target: "coral::rename",
            source = %source,
            new_target = %target,
            drop_target = options.drop_target,
            "Renaming collection"
        );

        if source.db == target.db {
            self.rename_within_db(ctx, source, target, options)
        } else {
            self.rename_between_dbs(ctx, source, target, options)
        }
    }

    /// Outer command entry: full request validation, then rename.
    pub fn validate_and_run_rename(
        &self,
        ctx: &OperationContext,
        source: &Namespace,
        target: &Namespace,
        drop_target: bool,
        stay_temp: bool,
    ) -> Result<()> {
        let limits = Limits::default();
        source.validate(&limits)?;
        target.validate(&limits)?;

        if self.replication.mode() != ReplicationMode::None {
            if source.is_oplog() {
                return Err(Error::IllegalOperation(
                    "cannot rename the live replication log while replicating".to_string(),
                ));
            }
            if target.is_oplog() {
                return Err(Error::IllegalOperation(
                    "cannot rename to the live replication log while replicating".to_string(),
                ));
            }
        }
        if source.is_oplog() != target.is_oplog() {
            return Err(Error::IllegalOperation(
                "if either endpoint of a rename is a replication-log name, both must be"
                    .to_string(),
            ));
        }

        crate::validate::user_allowed_write(source)?;
        crate::validate::user_allowed_write(target)?;

        if source.is_server_configuration() {
            return Err(Error::IllegalOperation(
                "renaming the server configuration collection is not allowed".to_string(),
            ));
        }

        self.rename_collection(
            ctx,
            source,
            target,
            RenameOptions {
                drop_target,
                stay_temp,
            },
        )
    }

    /// Rename only if the target still has the options and index set the
    /// caller captured earlier. Used by copy-then-rename flows that must not
    /// clobber a target concurrently redefined underneath them.
    ///
    /// # Errors
    /// `CommandFailed` when options or indexes drifted.
    pub fn rename_if_unchanged(
        &self,
        ctx: &OperationContext,
        source: &Namespace,
        target: &Namespace,
        drop_target: bool,
        stay_temp: bool,
        expected_options: &CollectionOptions,
        expected_indexes: &[IndexDescriptor],
    ) -> Result<()> {
        // Hold the target database exclusively across verify and rename so
        // nothing can drift in between.
        let _db_lock = acquire_if_needed(
            &self.locks,
            ctx,
            ResourceId::database(&target.db),
            LockMode::Exclusive,
        )?;

        let (current_options, current_indexes) = match self.catalog.collection_meta(target) {
            Some(meta) => (meta.options, meta.indexes),
            // A dropped-and-not-recreated target compares as empty.
            None => (CollectionOptions::default(), Vec::new()),
        };

        if &current_options != expected_options {
            return Err(Error::CommandFailed(format!(
                "collection options of target collection {target} changed during processing"
            )));
        }

        let mut current = current_indexes;
        let mut expected = expected_indexes.to_vec();
        current.sort_by(|a, b| a.name.cmp(&b.name));
        expected.sort_by(|a, b| a.name.cmp(&b.name));
        if current != expected {
            return Err(Error::CommandFailed(format!(
                "indexes of target collection {target} changed during processing"
            )));
        }

        self.validate_and_run_rename(ctx, source, target, drop_target, stay_temp)
    }
}
