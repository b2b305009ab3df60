//! In-catalog collection state
//!
//! A `Collection` owns its metadata and records. Records live in a
//! `BTreeMap` keyed by `RecordId`, which *is* the physical storage order
//! cursors stream in.

use coral_core::collection::{CollectionOptions, IndexDescriptor, Record};
use coral_core::types::{CollectionId, Namespace, RecordId};
use std::collections::BTreeMap;

/// A collection as the catalog holds it.
#[derive(Debug, Clone)]
pub struct Collection {
    /// Stable id; fresh per storage location.
    pub id: CollectionId,
    /// Current owning namespace.
    pub namespace: Namespace,
    /// Creation options.
    pub options: CollectionOptions,
    /// Index descriptors, identity index first.
    pub indexes: Vec<IndexDescriptor>,
    /// Records in storage order.
    pub(crate) records: BTreeMap<RecordId, Record>,
    /// Next record position to assign.
    pub(crate) next_record_id: u64,
    /// Catalog version of the last commit that touched this collection.
    pub(crate) last_modified: u64,
}

impl Collection {
    /// A fresh, empty collection carrying only the identity index.
    pub(crate) fn new(id: CollectionId, namespace: Namespace, options: CollectionOptions) -> Self {
        Collection {
            id,
            namespace,
            options,
            indexes: vec![IndexDescriptor::identity()],
            records: BTreeMap::new(),
            next_record_id: 0,
            last_modified: 0,
        }
    }

    /// Number of records stored.
    pub fn record_count(&self) -> u64 {
        self.records.len() as u64
    }

    pub(crate) fn append_record(&mut self, record: Record) -> RecordId {
        let id = RecordId(self.next_record_id);
        self.next_record_id += 1;
        self.records.insert(id, record);
        id
    }
}

/// Point-in-time copy of a collection's metadata.
///
/// Engines read these outside the catalog lock; `last_modified` lets a
/// unit of work detect that the collection changed under it.
#[derive(Debug, Clone)]
pub struct CollectionMeta {
    /// Stable id.
    pub id: CollectionId,
    /// Owning namespace at snapshot time.
    pub namespace: Namespace,
    /// Creation options.
    pub options: CollectionOptions,
    /// Index descriptors, identity index included.
    pub indexes: Vec<IndexDescriptor>,
    /// Record count at snapshot time.
    pub record_count: u64,
    /// Catalog version of the last commit that touched the collection.
    pub last_modified: u64,
}

impl CollectionMeta {
    pub(crate) fn of(coll: &Collection) -> Self {
        CollectionMeta {
            id: coll.id,
            namespace: coll.namespace.clone(),
            options: coll.options.clone(),
            indexes: coll.indexes.clone(),
            record_count: coll.record_count(),
            last_modified: coll.last_modified,
        }
    }

    /// Non-identity index descriptors, the copyable set of a migration.
    pub fn secondary_indexes(&self) -> Vec<IndexDescriptor> {
        self.indexes
            .iter()
            .filter(|ix| !ix.is_identity())
            .cloned()
            .collect()
    }
}

/// A view definition, stored per namespace in the catalog.
///
/// Views occupy namespaces for existence checks but are not collections;
/// renaming one is refused.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewDefinition {
    /// Namespace of the collection the view reads from.
    pub view_on: String,
    /// Aggregation pipeline, uninterpreted here.
    pub pipeline: serde_json::Value,
}
