//! Concurrency primitives for the Coral catalog layer
//!
//! This crate provides:
//! - LockManager: multi-granularity IS/IX/S/X locks over catalog resources
//! - OperationContext: explicit per-operation context (interruption, held
//!   locks, policies)
//! - FaultPolicy: explicit test-fault injection
//! - write_conflict_retry: the combinator consuming transient conflicts

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod faults;
pub mod lock;
pub mod retry;

pub use context::OperationContext;
pub use faults::FaultPolicy;
pub use lock::{LockGuard, LockManager, LockMode, ResourceId};
pub use retry::{write_conflict_retry, RetryConfig};
