//! Authoritative collection catalog for Coral
//!
//! This crate holds the id↔namespace registry, per-collection metadata and
//! records, view definitions, the unit-of-work commit path, and record
//! cursors. Mutations are staged on a [`UnitOfWork`] and committed
//! all-or-nothing with first-committer-wins conflict detection; the
//! transient conflict error is consumed by the retry combinator one layer
//! up.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod catalog;
pub mod collection;
pub mod cursor;
pub mod txn;

pub use catalog::Catalog;
pub use collection::{Collection, CollectionMeta, ViewDefinition};
pub use cursor::{CursorToken, RecordCursor};
pub use txn::{CommitInfo, DropStamp, UnitOfWork};
