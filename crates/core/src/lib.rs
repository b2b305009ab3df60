//! Core types for the Coral catalog layer
//!
//! This crate defines the foundational types used throughout the system:
//! - Namespace / DatabaseName: addresses of collections and databases
//! - CollectionId: stable unique identifier for a collection
//! - RecordId / Record: storage-order positions and opaque payloads
//! - LogTimestamp: position in the durable operation log
//! - CollectionOptions / IndexDescriptor: catalog metadata blobs
//! - Error: error type hierarchy
//! - Limits: namespace validation bounds

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collection;
pub mod error;
pub mod limits;
pub mod types;

pub use collection::{CollectionOptions, IndexDescriptor, Record, IDENTITY_INDEX};
pub use error::{Error, Result};
pub use limits::Limits;
pub use types::{
    CollectionId, DatabaseName, LogTimestamp, Namespace, RecordId, DROP_PENDING_PREFIX,
    SYSTEM_VIEWS,
};
