//! Collection metadata types shared across the catalog layer
//!
//! - CollectionOptions: the option set a collection was created with
//! - IndexDescriptor: one index definition on a collection
//! - Record: an opaque stored record
//!
//! Record *contents* are opaque to this layer; encoding and index
//! maintenance belong to the storage and index subsystems.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Name of the identity index present on every collection.
pub const IDENTITY_INDEX: &str = "_id_";

/// The option set a collection was created with.
///
/// Treated as an opaque configuration blob by the rename machinery: options
/// are copied verbatim to the staging collection of a cross-database move.
/// Only `temporary` is interpreted, because a rename decides whether the
/// marking survives (`stay_temp`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionOptions {
    /// Temporary collections are dropped on server restart. A rename clears
    /// this marking unless asked to preserve it.
    pub temporary: bool,

    /// Remaining options, uninterpreted here.
    #[serde(default)]
    pub raw: JsonValue,
}

impl CollectionOptions {
    /// Options for a plain, non-temporary collection.
    pub fn plain() -> Self {
        Self::default()
    }

    /// Options for a temporary collection.
    pub fn temp() -> Self {
        CollectionOptions {
            temporary: true,
            raw: JsonValue::Null,
        }
    }
}

/// One index definition on a collection.
///
/// The key specification is an opaque blob; the rename machinery only copies
/// descriptors, it never builds index structures itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    /// Index name, unique within the collection.
    pub name: String,
    /// Key specification, uninterpreted here.
    pub key_spec: JsonValue,
    /// Whether the index enforces uniqueness.
    pub unique: bool,
}

impl IndexDescriptor {
    /// Create a descriptor.
    pub fn new(name: impl Into<String>, key_spec: JsonValue) -> Self {
        IndexDescriptor {
            name: name.into(),
            key_spec,
            unique: false,
        }
    }

    /// The identity index every collection carries.
    pub fn identity() -> Self {
        IndexDescriptor {
            name: IDENTITY_INDEX.to_string(),
            key_spec: serde_json::json!({ "_id": 1 }),
            unique: true,
        }
    }

    /// Whether this is the identity index. Identity descriptors are never
    /// copied across a migration; the target's own identity index stands.
    pub fn is_identity(&self) -> bool {
        self.name == IDENTITY_INDEX
    }
}

/// An opaque stored record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Encoded record payload.
    pub data: Vec<u8>,
}

impl Record {
    /// Wrap an encoded payload.
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Record { data: data.into() }
    }
}
