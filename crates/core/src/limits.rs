//! Size limits for namespaces and catalog metadata
//!
//! Violations result in `InvalidNamespace` errors at validation time.
//!
//! ## Contract
//!
//! The default limits are FROZEN; renaming can never make a previously valid
//! namespace invalid. Custom limits are only for tests.

/// Size limits enforced by namespace validation
#[derive(Debug, Clone)]
pub struct Limits {
    /// Maximum `database.collection` length in bytes (default: 255)
    pub max_namespace_bytes: usize,

    /// Maximum database-name length in bytes (default: 64)
    pub max_database_name_bytes: usize,

    /// Maximum number of index descriptors per collection (default: 64)
    pub max_indexes_per_collection: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_namespace_bytes: 255,
            max_database_name_bytes: 64,
            max_indexes_per_collection: 64,
        }
    }
}

impl Limits {
    /// Create limits with small values for testing
    pub fn with_small_limits() -> Self {
        Limits {
            max_namespace_bytes: 32,
            max_database_name_bytes: 10,
            max_indexes_per_collection: 4,
        }
    }
}
