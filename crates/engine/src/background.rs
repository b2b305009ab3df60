//! Background-operation registry
//!
//! Index builds and other background work register themselves per collection
//! id. Operations that would invalidate such work (drops, renames with a
//! drop-target) assert the collection is quiet first and fail the caller's
//! operation otherwise.

use coral_core::error::{Error, Result};
use coral_core::types::CollectionId;
use dashmap::DashMap;
use std::sync::Arc;

/// Tracks in-flight background operations per collection.
pub struct BackgroundRegistry {
    in_progress: Arc<DashMap<CollectionId, u32>>,
}

impl BackgroundRegistry {
    /// Create an empty registry.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        BackgroundRegistry {
            in_progress: Arc::new(DashMap::new()),
        }
    }

    /// Register a background operation on `id`. The registration lasts until
    /// the guard drops.
    pub fn register(&self, id: CollectionId) -> BackgroundOpGuard {
        *self.in_progress.entry(id).or_insert(0) += 1;
        BackgroundOpGuard {
            in_progress: Arc::clone(&self.in_progress),
            id,
        }
    }

    /// Number of background operations in flight on `id`.
    pub fn count(&self, id: CollectionId) -> u32 {
        self.in_progress.get(&id).map(|c| *c).unwrap_or(0)
    }

    /// Fail if any background operation is in flight on `id`.
    ///
    /// # Errors
    /// `IllegalOperation` naming the collection.
    pub fn assert_none_in_progress(&self, id: CollectionId) -> Result<()> {
        if self.count(id) > 0 {
            return Err(Error::IllegalOperation(format!(
                "a background operation is in progress for collection {id}"
            )));
        }
        Ok(())
    }
}

/// Guard over one registered background operation.
pub struct BackgroundOpGuard {
    in_progress: Arc<DashMap<CollectionId, u32>>,
    id: CollectionId,
}

impl Drop for BackgroundOpGuard {
    fn drop(&mut self) {
        if let Some(mut count) = self.in_progress.get_mut(&self.id) {
            *count = count.saturating_sub(1);
        }
    }
}
