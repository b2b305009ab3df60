//! Explicit fault policy for tests
//!
//! Fault injection is a value threaded through the `OperationContext`, never
//! a process-global switch. Three kinds of faults exist: bypassing the
//! sharding validation (to exercise paths a sharding coordinator would
//! normally own), injecting a bounded number of optimistic-concurrency
//! conflicts into the migration copy loop, and named fail points that abort
//! an operation at a chosen step boundary.

use coral_core::error::{Error, Result};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Test-fault configuration for one operation.
#[derive(Debug, Clone, Default)]
pub struct FaultPolicy {
    /// Skip the sharding-oracle endpoint checks.
    pub bypass_sharding_check: bool,
    copy_conflicts: Arc<AtomicU32>,
    fail_points: HashSet<String>,
}

impl FaultPolicy {
    /// No faults; the production policy.
    pub fn none() -> Self {
        FaultPolicy::default()
    }

    /// Bypass the sharding-oracle endpoint checks.
    pub fn with_bypass_sharding_check(mut self) -> Self {
        self.bypass_sharding_check = true;
        self
    }

    /// Inject `n` write conflicts into the migration copy loop.
    pub fn with_copy_conflicts(self, n: u32) -> Self {
        self.copy_conflicts.store(n, Ordering::SeqCst);
        self
    }

    /// Arm a named fail point; the operation aborts when it reaches it.
    pub fn with_fail_point(mut self, name: impl Into<String>) -> Self {
        self.fail_points.insert(name.into());
        self
    }

    /// Consume one injected copy conflict, if any remain.
    ///
    /// # Errors
    /// `WriteConflict` while injected conflicts remain.
    pub fn maybe_copy_conflict(&self) -> Result<()> {
        let remaining = self.copy_conflicts.load(Ordering::SeqCst);
        if remaining > 0
            && self
                .copy_conflicts
                .compare_exchange(remaining, remaining - 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
        {
            return Err(Error::WriteConflict);
        }
        Ok(())
    }

    /// Abort if the named fail point is armed.
    ///
    /// # Errors
    /// `Internal` naming the fail point, standing in for a crash at that
    /// boundary.
    pub fn check_fail_point(&self, name: &str) -> Result<()> {
        if self.fail_points.contains(name) {
            Err(Error::Internal(format!("fail point hit: {name}")))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_conflicts_are_counted() {
        let faults = FaultPolicy::none().with_copy_conflicts(2);
        assert_eq!(faults.maybe_copy_conflict(), Err(Error::WriteConflict));
        assert_eq!(faults.maybe_copy_conflict(), Err(Error::WriteConflict));
        assert!(faults.maybe_copy_conflict().is_ok());
    }

    #[test]
    fn test_fail_points_are_named() {
        let faults = FaultPolicy::none().with_fail_point("copy_done");
        assert!(faults.check_fail_point("other").is_ok());
        assert!(matches!(
            faults.check_fail_point("copy_done"),
            Err(Error::Internal(_))
        ));
    }
}
