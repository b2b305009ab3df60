//! Core types for the Coral catalog layer
//!
//! This module defines the foundational types:
//! - DatabaseName: validated name of a logical database
//! - Namespace: (database, collection-name) address of a collection
//! - CollectionId: stable unique identifier for a collection
//! - RecordId: position of a record in a collection's storage order
//! - LogTimestamp: position of a record in the durable operation log

use crate::error::{Error, Result};
use crate::limits::Limits;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Collection-name prefix reserved for collections parked by a timestamped
/// (two-phase) drop.
pub const DROP_PENDING_PREFIX: &str = "system.drop.";

/// Collection name backing view definitions within a database.
pub const SYSTEM_VIEWS: &str = "system.views";

/// Name of a logical database.
///
/// Databases are created implicitly when the first collection in them is
/// created. The name participates in the total ordering used by the lock
/// protocol, so `Ord` is derived.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DatabaseName(String);

impl DatabaseName {
    /// Create a database name. Validity is checked separately via
    /// [`DatabaseName::validate`]; construction never fails so that names
    /// read back from a log can always be represented.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The raw name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check the name against the given limits.
    ///
    /// # Errors
    /// Returns `InvalidNamespace` if the name is empty, too long, or contains
    /// a character databases may not use.
    pub fn validate(&self, limits: &Limits) -> Result<()> {
        if self.0.is_empty() {
            return Err(Error::InvalidNamespace("empty database name".to_string()));
        }
        if self.0.len() > limits.max_database_name_bytes {
            return Err(Error::InvalidNamespace(format!(
                "database name exceeds {} bytes: {}",
                limits.max_database_name_bytes, self.0
            )));
        }
        if self.0.chars().any(|c| "/\\. \"$*<>:|?\0".contains(c)) {
            return Err(Error::InvalidNamespace(format!(
                "database name contains an invalid character: {}",
                self.0
            )));
        }
        Ok(())
    }
}

impl fmt::Display for DatabaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DatabaseName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// (database, collection-name) address of a collection.
///
/// Displayed as `database.collection`. The derived `Ord` (database first,
/// then collection name) is the total order the lock protocol sequences
/// resources by.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Namespace {
    /// The logical database.
    pub db: DatabaseName,
    /// The collection name within the database.
    pub coll: String,
}

impl Namespace {
    /// Create a namespace from parts. Construction never fails; call
    /// [`Namespace::validate`] before trusting user input.
    pub fn new(db: impl Into<DatabaseName>, coll: impl Into<String>) -> Self {
        Self {
            db: db.into(),
            coll: coll.into(),
        }
    }

    /// Parse `database.collection`. The collection part may itself contain
    /// dots; only the first dot splits.
    ///
    /// # Errors
    /// Returns `InvalidNamespace` if there is no dot separator.
    pub fn parse(ns: &str) -> Result<Self> {
        match ns.split_once('.') {
            Some((db, coll)) => Ok(Self::new(db, coll)),
            None => Err(Error::InvalidNamespace(format!(
                "expected <database>.<collection>: {ns}"
            ))),
        }
    }

    /// The full `database.collection` string.
    pub fn ns(&self) -> String {
        format!("{}.{}", self.db, self.coll)
    }

    /// Check the namespace against the given limits.
    pub fn validate(&self, limits: &Limits) -> Result<()> {
        self.db.validate(limits)?;
        if self.coll.is_empty() {
            return Err(Error::InvalidNamespace(format!(
                "empty collection name in namespace: {}",
                self
            )));
        }
        if self.db.as_str().len() + 1 + self.coll.len() > limits.max_namespace_bytes {
            return Err(Error::InvalidNamespace(format!(
                "namespace exceeds {} bytes: {}",
                limits.max_namespace_bytes, self
            )));
        }
        if self.coll.contains('\0') || self.coll.contains('$') {
            return Err(Error::InvalidNamespace(format!(
                "collection name contains an invalid character: {}",
                self
            )));
        }
        if self.coll.starts_with('.') {
            return Err(Error::InvalidNamespace(format!(
                "collection name may not start with '.': {}",
                self
            )));
        }
        Ok(())
    }

    /// Convenience wrapper over [`Namespace::validate`] with default limits.
    pub fn is_valid(&self) -> bool {
        self.validate(&Limits::default()).is_ok()
    }

    /// Whether this is the reserved view-definition collection of its
    /// database (`<db>.system.views`).
    pub fn is_system_dot_views(&self) -> bool {
        self.coll == SYSTEM_VIEWS
    }

    /// Whether this is a system collection (name starts with `system.`).
    pub fn is_system(&self) -> bool {
        self.coll.starts_with("system.")
    }

    /// Whether this namespace addresses the live replication log.
    pub fn is_oplog(&self) -> bool {
        self.db.as_str() == "local" && self.coll.starts_with("oplog.")
    }

    /// Whether this namespace is parked pending a two-phase drop.
    pub fn is_drop_pending(&self) -> bool {
        self.coll.starts_with(DROP_PENDING_PREFIX)
    }

    /// Whether this is the server configuration collection
    /// (`admin.system.version`), which may never be renamed.
    pub fn is_server_configuration(&self) -> bool {
        self.db.as_str() == "admin" && self.coll == "system.version"
    }

    /// The drop-pending namespace this collection is parked under when a
    /// timestamped drop retires it.
    pub fn drop_pending(&self, ts: LogTimestamp) -> Namespace {
        Namespace::new(
            self.db.clone(),
            format!("{}{}.{}", DROP_PENDING_PREFIX, ts, self.coll),
        )
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.db, self.coll)
    }
}

/// Stable unique identifier for a collection.
///
/// The id survives renames within one database. Cross-database moves assign
/// a fresh id because id spaces are scoped per storage location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectionId(Uuid);

impl CollectionId {
    /// Generate a fresh random id.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse from a standard UUID string representation.
    pub fn from_string(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of a record in a collection's physical storage order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of a record in the durable operation log.
///
/// Timestamps are totally ordered and assigned monotonically by the log.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct LogTimestamp(pub u64);

impl fmt::Display for LogTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_namespace_parse_and_display() {
        let ns = Namespace::parse("sales.orders").unwrap();
        assert_eq!(ns.db.as_str(), "sales");
        assert_eq!(ns.coll, "orders");
        assert_eq!(ns.to_string(), "sales.orders");
    }

    #[test]
    fn test_namespace_parse_keeps_dots_in_collection() {
        let ns = Namespace::parse("sales.archive.2024").unwrap();
        assert_eq!(ns.coll, "archive.2024");
    }

    #[test]
    fn test_namespace_parse_rejects_missing_separator() {
        assert!(matches!(
            Namespace::parse("nodot"),
            Err(Error::InvalidNamespace(_))
        ));
    }

    #[test]
    fn test_namespace_validation() {
        assert!(Namespace::new("sales", "orders").is_valid());
        assert!(!Namespace::new("", "orders").is_valid());
        assert!(!Namespace::new("sales", "").is_valid());
        assert!(!Namespace::new("sa les", "orders").is_valid());
        assert!(!Namespace::new("sales", "or$ders").is_valid());
        assert!(!Namespace::new("sales", ".orders").is_valid());
        let long = "x".repeat(300);
        assert!(!Namespace::new("sales", long).is_valid());
    }

    #[test]
    fn test_namespace_classifiers() {
        assert!(Namespace::new("sales", "system.views").is_system_dot_views());
        assert!(Namespace::new("local", "oplog.rs").is_oplog());
        assert!(!Namespace::new("sales", "oplog.rs").is_oplog());
        assert!(Namespace::new("admin", "system.version").is_server_configuration());
        let parked = Namespace::new("sales", "orders").drop_pending(LogTimestamp(7));
        assert!(parked.is_drop_pending());
        assert_eq!(parked.coll, "system.drop.7.orders");
    }

    #[test]
    fn test_namespace_ordering_is_database_first() {
        let a = Namespace::new("alpha", "zzz");
        let b = Namespace::new("beta", "aaa");
        assert!(a < b);
        let c = Namespace::new("alpha", "aaa");
        assert!(c < a);
    }

    #[test]
    fn test_collection_id_roundtrip() {
        let id = CollectionId::new();
        assert_eq!(CollectionId::from_string(&id.to_string()), Some(id));
    }

    proptest! {
        #[test]
        fn prop_valid_namespaces_roundtrip_through_parse(
            db in "[a-z][a-z0-9_]{0,20}",
            coll in "[a-z][a-z0-9_.]{0,40}",
        ) {
            let ns = Namespace::new(db.as_str(), coll.as_str());
            prop_assume!(ns.is_valid());
            let parsed = Namespace::parse(&ns.ns()).unwrap();
            prop_assert_eq!(parsed, ns);
        }
    }
}
