//! Unit of work over the catalog
//!
//! A `UnitOfWork` stages catalog mutations and operation-log emissions, then
//! commits them all-or-nothing under the catalog write lock. Commit order is
//! validate, emit, apply: log records are appended only after validation has
//! passed, and application cannot fail once validation has, so a conflicting
//! commit never half-emits and a committed one is never missing its record.
//!
//! Conflict detection is first-committer-wins: a staged operation touching a
//! collection another commit modified after this unit of work began fails
//! with the transient `Error::WriteConflict`, to be retried by the caller's
//! retry combinator.

use crate::catalog::{Catalog, CatalogInner};
use crate::collection::Collection;
use coral_core::collection::{CollectionOptions, IndexDescriptor, Record};
use coral_core::error::{Error, Result};
use coral_core::types::{CollectionId, LogTimestamp, Namespace};
use coral_oplog::{OpLogRecord, OperationLog};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// How a staged drop retires the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropStamp {
    /// Remove the collection outright (unreplicated drops, temp cleanup).
    Immediate,
    /// Park the collection under a drop-pending namespace stamped with the
    /// timestamp this commit's log emission is assigned.
    FromCommit,
    /// Park the collection under a drop-pending namespace stamped with a
    /// timestamp recorded upstream (replay).
    Supplied(LogTimestamp),
}

#[derive(Debug)]
enum StagedOp {
    Create {
        ns: Namespace,
        id: CollectionId,
        options: CollectionOptions,
    },
    CreateIndexes {
        id: CollectionId,
        indexes: Vec<IndexDescriptor>,
    },
    InsertRecords {
        id: CollectionId,
        records: Vec<Record>,
    },
    Rename {
        from: Namespace,
        to: Namespace,
        stay_temp: bool,
    },
    Drop {
        ns: Namespace,
        stamp: DropStamp,
    },
}

/// Result of a committed unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitInfo {
    /// Catalog version assigned to the commit.
    pub version: u64,
    /// Timestamp of the first log record emitted, if any were staged.
    pub timestamp: Option<LogTimestamp>,
}

/// Staged, all-or-nothing catalog mutation batch.
pub struct UnitOfWork<'a> {
    catalog: &'a Catalog,
    snapshot_version: u64,
    ops: Vec<StagedOp>,
    emissions: Vec<OpLogRecord>,
}

impl<'a> UnitOfWork<'a> {
    pub(crate) fn new(catalog: &'a Catalog, snapshot_version: u64) -> Self {
        UnitOfWork {
            catalog,
            snapshot_version,
            ops: Vec::new(),
            emissions: Vec::new(),
        }
    }

    /// Stage creation of a collection at `ns` with the given id and options.
    pub fn create(&mut self, ns: Namespace, id: CollectionId, options: CollectionOptions) {
        self.ops.push(StagedOp::Create { ns, id, options });
    }

    /// Stage installation of index descriptors on a collection.
    pub fn create_indexes(&mut self, id: CollectionId, indexes: Vec<IndexDescriptor>) {
        self.ops.push(StagedOp::CreateIndexes { id, indexes });
    }

    /// Stage appending records to a collection in storage order.
    pub fn insert_records(&mut self, id: CollectionId, records: Vec<Record>) {
        self.ops.push(StagedOp::InsertRecords { id, records });
    }

    /// Stage an in-place rename. The collection keeps its id; its temporary
    /// marking is cleared unless `stay_temp` is set.
    pub fn rename(&mut self, from: Namespace, to: Namespace, stay_temp: bool) {
        self.ops.push(StagedOp::Rename {
            from,
            to,
            stay_temp,
        });
    }

    /// Stage a drop of the collection occupying `ns`.
    pub fn drop(&mut self, ns: Namespace, stamp: DropStamp) {
        self.ops.push(StagedOp::Drop { ns, stamp });
    }

    /// Stage an operation-log emission, appended on successful commit.
    pub fn emit(&mut self, record: OpLogRecord) {
        self.emissions.push(record);
    }

    /// Commit everything staged, all-or-nothing.
    ///
    /// # Errors
    /// - `WriteConflict` when a touched collection was modified after this
    ///   unit of work began (transient, retry);
    /// - `NamespaceNotFound` / `NamespaceExists` when an operand is missing
    ///   or its target occupied;
    /// - `IllegalOperation` for duplicate index names;
    /// - `Internal` when a `DropStamp::FromCommit` is staged without any
    ///   emission to mint its timestamp from.
    pub fn commit(self, log: &dyn OperationLog) -> Result<CommitInfo> {
        let mut inner = self.catalog.inner.write();
        self.validate(&inner)?;

        let mut timestamp = None;
        for record in self.emissions {
            let ts = log.emit(record);
            timestamp.get_or_insert(ts);
        }

        inner.version += 1;
        let version = inner.version;
        for op in self.ops {
            Self::apply(&mut inner, op, version, timestamp);
        }
        debug!(target: "coral::catalog", version, "Committed unit of work");
        Ok(CommitInfo { version, timestamp })
    }

    /// Validate staged operations against current state, simulating the
    /// occupancy changes earlier staged operations make.
    fn validate(&self, inner: &CatalogInner) -> Result<()> {
        // Namespace occupancy overlay: Some(id) = occupied by staged op,
        // None = vacated by staged op. Absent = defer to committed state.
        let mut overlay: HashMap<Namespace, Option<CollectionId>> = HashMap::new();
        let mut created: HashSet<CollectionId> = HashSet::new();

        let occupant = |inner: &CatalogInner,
                        overlay: &HashMap<Namespace, Option<CollectionId>>,
                        ns: &Namespace| match overlay.get(ns) {
            Some(slot) => *slot,
            None => inner.occupant(ns),
        };

        let check_unchanged = |inner: &CatalogInner, id: CollectionId| -> Result<()> {
            match inner.collections.get(&id) {
                Some(coll) if coll.last_modified > self.snapshot_version => {
                    Err(Error::WriteConflict)
                }
                _ => Ok(()),
            }
        };

        for op in &self.ops {
            match op {
                StagedOp::Create { ns, id, .. } => {
                    if let Some(existing) = occupant(inner, &overlay, ns) {
                        // An occupant that appeared after our snapshot is a
                        // race to retry, not a terminal name clash.
                        check_unchanged(inner, existing)?;
                        return Err(Error::NamespaceExists(ns.ns()));
                    }
                    if inner.views.contains_key(ns) {
                        return Err(Error::NamespaceExists(ns.ns()));
                    }
                    overlay.insert(ns.clone(), Some(*id));
                    created.insert(*id);
                }
                StagedOp::CreateIndexes { id, indexes } => {
                    let existing = match inner.collections.get(id) {
                        Some(coll) => {
                            check_unchanged(inner, *id)?;
                            coll.indexes.iter().map(|ix| ix.name.clone()).collect()
                        }
                        None if created.contains(id) => {
                            vec![coral_core::IDENTITY_INDEX.to_string()]
                        }
                        None => return Err(Error::NamespaceNotFound(id.to_string())),
                    };
                    for ix in indexes {
                        if existing.contains(&ix.name) {
                            return Err(Error::IllegalOperation(format!(
                                "index already exists: {}",
                                ix.name
                            )));
                        }
                    }
                }
                StagedOp::InsertRecords { id, .. } => {
                    if inner.collections.contains_key(id) {
                        check_unchanged(inner, *id)?;
                    } else if !created.contains(id) {
                        return Err(Error::NamespaceNotFound(id.to_string()));
                    }
                }
                StagedOp::Rename {
                    from,
                    to,
                    ..
                } => {
                    let id = occupant(inner, &overlay, from)
                        .ok_or_else(|| Error::NamespaceNotFound(from.ns()))?;
                    check_unchanged(inner, id)?;
                    if let Some(existing) = occupant(inner, &overlay, to) {
                        check_unchanged(inner, existing)?;
                        return Err(Error::NamespaceExists(to.ns()));
                    }
                    if inner.views.contains_key(to) {
                        return Err(Error::NamespaceExists(to.ns()));
                    }
                    overlay.insert(from.clone(), None);
                    overlay.insert(to.clone(), Some(id));
                }
                StagedOp::Drop { ns, stamp } => {
                    let id = occupant(inner, &overlay, ns)
                        .ok_or_else(|| Error::NamespaceNotFound(ns.ns()))?;
                    check_unchanged(inner, id)?;
                    if *stamp == DropStamp::FromCommit && self.emissions.is_empty() {
                        return Err(Error::Internal(
                            "drop stamped from commit requires a staged log emission"
                                .to_string(),
                        ));
                    }
                    overlay.insert(ns.clone(), None);
                }
            }
        }
        Ok(())
    }

    /// Apply one validated operation. Must not fail; validation has already
    /// established every precondition.
    fn apply(
        inner: &mut CatalogInner,
        op: StagedOp,
        version: u64,
        commit_ts: Option<LogTimestamp>,
    ) {
        match op {
            StagedOp::Create { ns, id, options } => {
                inner.databases.insert(ns.db.clone());
                let mut coll = Collection::new(id, ns.clone(), options);
                coll.last_modified = version;
                inner.by_namespace.insert(ns, id);
                inner.collections.insert(id, coll);
            }
            StagedOp::CreateIndexes { id, indexes } => {
                if let Some(coll) = inner.collections.get_mut(&id) {
                    coll.indexes.extend(indexes);
                    coll.last_modified = version;
                }
            }
            StagedOp::InsertRecords { id, records } => {
                if let Some(coll) = inner.collections.get_mut(&id) {
                    for record in records {
                        coll.append_record(record);
                    }
                    coll.last_modified = version;
                }
            }
            StagedOp::Rename {
                from,
                to,
                stay_temp,
            } => {
                if let Some(id) = inner.by_namespace.remove(&from) {
                    inner.by_namespace.insert(to.clone(), id);
                    if let Some(coll) = inner.collections.get_mut(&id) {
                        coll.namespace = to;
                        if !stay_temp {
                            coll.options.temporary = false;
                        }
                        coll.last_modified = version;
                    }
                }
            }
            StagedOp::Drop { ns, stamp } => {
                let parked_at = match stamp {
                    DropStamp::Immediate => None,
                    // Validation guarantees an emission exists for FromCommit.
                    DropStamp::FromCommit => Some(ns.drop_pending(
                        commit_ts.expect("FromCommit drop validated against emissions"),
                    )),
                    DropStamp::Supplied(ts) => Some(ns.drop_pending(ts)),
                };
                if let Some(id) = inner.by_namespace.remove(&ns) {
                    match parked_at {
                        None => {
                            inner.collections.remove(&id);
                        }
                        Some(parked) => {
                            inner.by_namespace.insert(parked.clone(), id);
                            if let Some(coll) = inner.collections.get_mut(&id) {
                                coll.namespace = parked;
                                coll.last_modified = version;
                            }
                        }
                    }
                }
            }
        }
    }
}
