//! Precondition validation
//!
//! Every rename passes through `validate_rename` before any unit of work
//! opens. The checks run in a fixed order so callers see stable error
//! precedence; `ValidationMode` distinguishes the direct path from the
//! replay paths, which tolerate an occupied target (idempotent
//! re-application) and, one level up, a missing source (downgrade to drop).

use crate::rename::RenameOptions;
use crate::service::CatalogService;
use coral_concurrency::OperationContext;
use coral_core::error::{Error, Result};
use coral_core::limits::Limits;
use coral_core::types::Namespace;
use coral_oplog::ReplicationMode;

/// Which relaxations of the standard checks apply.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ValidationMode {
    /// Replay may land on a target that already exists; the engine resolves
    /// the situation idempotently instead of failing.
    pub target_exists_allowed: bool,
}

/// Whether the write-permission policy allows user-level writes to `ns`.
///
/// System collections are reserved, with a short allow-list the upper layers
/// manage through dedicated commands.
pub(crate) fn user_allowed_write(ns: &Namespace) -> Result<()> {
    if ns.is_system() && !matches!(ns.coll.as_str(), "system.users" | "system.js") {
        return Err(Error::IllegalOperation(format!(
            "cannot write to reserved namespace: {ns}"
        )));
    }
    Ok(())
}

impl CatalogService {
    /// Check that renaming `source` to `target` is legal before any
    /// mutation. See the module docs for ordering.
    pub(crate) fn validate_rename(
        &self,
        ctx: &OperationContext,
        source: &Namespace,
        target: &Namespace,
        options: RenameOptions,
        mode: ValidationMode,
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

        user_allowed_write(source)?;
        user_allowed_write(target)?;
        if source.is_server_configuration() {
            return Err(Error::IllegalOperation(
                "renaming the server configuration collection is not allowed".to_string(),
            ));
        }

        if !self.catalog.database_exists(&source.db) {
            return Err(Error::NamespaceNotFound(format!(
                "database {} does not exist",
                source.db
            )));
        }

        let source_meta = match self.catalog.collection_meta(source) {
            Some(meta) => meta,
            None => {
                if self.catalog.lookup_view(source).is_some() {
                    return Err(Error::IllegalOperation(format!(
                        "cannot rename view: {source}"
                    )));
                }
                return Err(Error::NamespaceNotFound(format!(
                    "source collection {source} does not exist"
                )));
            }
        };

        match self.catalog.collection_meta(target) {
            Some(_) => {
                if !ctx.faults().bypass_sharding_check && self.sharding.is_sharded(target) {
                    return Err(Error::IllegalOperation(
                        "cannot rename to a sharded collection".to_string(),
                    ));
                }
                if !mode.target_exists_allowed && !options.drop_target {
                    return Err(Error::NamespaceExists(
                        "target namespace exists".to_string(),
                    ));
                }
            }
            None => {
                if self.catalog.lookup_view(target).is_some() {
                    return Err(Error::NamespaceExists(format!(
                        "a view already exists with that name: {target}"
                    )));
                }
            }
        }

        if !ctx.faults().bypass_sharding_check && self.sharding.is_sharded(source) {
            return Err(Error::IllegalOperation(
                "source namespace cannot be sharded".to_string(),
            ));
        }

        if self.replication.is_replicated(source) != self.replication.is_replicated(target) {
            return Err(Error::IllegalOperation(
                "cannot rename between replicated and unreplicated namespaces".to_string(),
            ));
        }

        if ctx.writes_replicated() && !self.replication.can_accept_writes_for(&source.db) {
            return Err(Error::NotPrimary(format!(
                "not primary while renaming collection {source} to {target}"
            )));
        }

        self.background.assert_none_in_progress(source_meta.id)?;

        Ok(())
    }
}
