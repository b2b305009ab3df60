//! Multi-granularity lock manager
//!
//! Resources are databases and collections; modes are the standard
//! IS/IX/S/X set. `ResourceId`'s derived `Ord` is the total order the
//! engine's lock protocol sequences acquisitions by.
//!
//! Fairness and wait-queue policy are deliberately minimal: waiters poll a
//! condvar and there is no queueing between them. Deadlock freedom is the
//! responsibility of the acquisition protocol one layer up, not of this
//! manager.

use crate::context::OperationContext;
use coral_core::error::{Error, Result};
use coral_core::types::{DatabaseName, Namespace};
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// How long a waiter sleeps between compatibility re-checks. Kept short so
/// interruption is noticed promptly.
const WAIT_SLICE: Duration = Duration::from_millis(10);

/// A lockable resource: a database or a single collection.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceId {
    /// A whole logical database.
    Database(DatabaseName),
    /// One collection.
    Collection(Namespace),
}

impl ResourceId {
    /// Resource for a database.
    pub fn database(db: &DatabaseName) -> Self {
        ResourceId::Database(db.clone())
    }

    /// Resource for a collection.
    pub fn collection(ns: &Namespace) -> Self {
        ResourceId::Collection(ns.clone())
    }
}

/// Lock modes, weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    /// Intent to take shared locks below this resource.
    IntentShared,
    /// Intent to take exclusive locks below this resource.
    IntentExclusive,
    /// Shared access.
    Shared,
    /// Exclusive access.
    Exclusive,
}

impl LockMode {
    fn index(self) -> usize {
        match self {
            LockMode::IntentShared => 0,
            LockMode::IntentExclusive => 1,
            LockMode::Shared => 2,
            LockMode::Exclusive => 3,
        }
    }

    /// Standard multi-granularity compatibility matrix.
    pub fn compatible_with(self, other: LockMode) -> bool {
        use LockMode::*;
        match (self, other) {
            (IntentShared, Exclusive) | (Exclusive, IntentShared) => false,
            (IntentShared, _) | (_, IntentShared) => true,
            (IntentExclusive, IntentExclusive) => true,
            (IntentExclusive, _) | (_, IntentExclusive) => false,
            (Shared, Shared) => true,
            _ => false,
        }
    }

    /// Whether holding `self` already grants everything `weaker` would.
    pub fn covers(self, weaker: LockMode) -> bool {
        use LockMode::*;
        match self {
            Exclusive => true,
            Shared => matches!(weaker, Shared | IntentShared),
            IntentExclusive => matches!(weaker, IntentExclusive | IntentShared),
            IntentShared => matches!(weaker, IntentShared),
        }
    }
}

#[derive(Default)]
struct ModeCounts {
    granted: [u32; 4],
}

impl ModeCounts {
    fn admits(&self, mode: LockMode) -> bool {
        use LockMode::*;
        [IntentShared, IntentExclusive, Shared, Exclusive]
            .into_iter()
            .all(|held| self.granted[held.index()] == 0 || mode.compatible_with(held))
    }
}

struct LockCell {
    state: Mutex<ModeCounts>,
    available: Condvar,
}

/// Grants and tracks locks over catalog resources.
pub struct LockManager {
    table: DashMap<ResourceId, Arc<LockCell>>,
}

impl LockManager {
    /// Create an empty lock manager.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        LockManager {
            table: DashMap::new(),
        }
    }

    /// Acquire `resource` in `mode`, blocking until compatible with every
    /// currently granted mode. The acquisition is registered on `ctx` so the
    /// protocol can skip locks already held in sufficient mode.
    ///
    /// # Errors
    /// `Interrupted` if the context is cancelled while waiting.
    pub fn acquire(
        &self,
        ctx: &OperationContext,
        resource: ResourceId,
        mode: LockMode,
    ) -> Result<LockGuard> {
        let cell = self
            .table
            .entry(resource.clone())
            .or_insert_with(|| {
                Arc::new(LockCell {
                    state: Mutex::new(ModeCounts::default()),
                    available: Condvar::new(),
                })
            })
            .clone();

        let mut counts = cell.state.lock();
        while !counts.admits(mode) {
            if ctx.is_interrupted() {
                return Err(Error::Interrupted);
            }
            cell.available.wait_for(&mut counts, WAIT_SLICE);
        }
        counts.granted[mode.index()] += 1;
        drop(counts);

        trace!(target: "coral::lock", resource = ?resource, mode = ?mode, "Lock granted");
        ctx.note_acquired(&resource, mode);
        Ok(LockGuard {
            cell,
            resource,
            mode,
            held: ctx.held_registry(),
        })
    }
}

/// Guard over one granted lock; released on drop.
pub struct LockGuard {
    cell: Arc<LockCell>,
    resource: ResourceId,
    mode: LockMode,
    held: Arc<Mutex<Vec<(ResourceId, LockMode)>>>,
}

impl LockGuard {
    /// The locked resource.
    pub fn resource(&self) -> &ResourceId {
        &self.resource
    }

    /// The granted mode.
    pub fn mode(&self) -> LockMode {
        self.mode
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let mut held = self.held.lock();
        if let Some(at) = held
            .iter()
            .position(|(res, mode)| res == &self.resource && *mode == self.mode)
        {
            held.swap_remove(at);
        }
        drop(held);

        let mut counts = self.cell.state.lock();
        counts.granted[self.mode.index()] -= 1;
        drop(counts);
        self.cell.available.notify_all();
    }
}
