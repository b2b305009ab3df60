//! Error types for the Coral catalog layer
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use thiserror::Error;

/// Result type alias for catalog operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for catalog operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    /// This node cannot accept writes for the addressed database
    #[error("not primary: {0}")]
    NotPrimary(String),

    /// The addressed namespace does not resolve to a collection
    #[error("namespace not found: {0}")]
    NamespaceNotFound(String),

    /// The target namespace is already occupied
    #[error("namespace exists: {0}")]
    NamespaceExists(String),

    /// A namespace failed syntactic validation
    #[error("invalid namespace: {0}")]
    InvalidNamespace(String),

    /// The operation is not permitted in the current configuration
    /// (sharded endpoint, log-boundary mismatch, view collision,
    /// replication-eligibility mismatch, reserved-namespace rename, ...)
    #[error("illegal operation: {0}")]
    IllegalOperation(String),

    /// A copy-then-verify postcondition did not hold
    #[error("command failed: {0}")]
    CommandFailed(String),

    /// Optimistic-concurrency conflict. Transient: retried internally by the
    /// engines, never surfaced to callers.
    #[error("write conflict")]
    WriteConflict,

    /// The operation was cooperatively cancelled
    #[error("operation interrupted")]
    Interrupted,

    /// Invariant violation; programmer error, terminates the operation path
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error is transient and the failed step should be retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::WriteConflict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_namespace_not_found() {
        let err = Error::NamespaceNotFound("sales.orders".to_string());
        let msg = err.to_string();
        assert!(msg.contains("namespace not found"));
        assert!(msg.contains("sales.orders"));
    }

    #[test]
    fn test_error_display_illegal_operation() {
        let err = Error::IllegalOperation("source namespace cannot be sharded".to_string());
        assert!(err.to_string().contains("cannot be sharded"));
    }

    #[test]
    fn test_only_write_conflict_is_transient() {
        assert!(Error::WriteConflict.is_transient());
        assert!(!Error::Interrupted.is_transient());
        assert!(!Error::NamespaceExists("a.b".to_string()).is_transient());
        assert!(!Error::Internal("boom".to_string()).is_transient());
    }
}
