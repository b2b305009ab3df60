//! Operation context
//!
//! Every engine call threads an explicit `OperationContext` carrying the
//! cooperative-interruption flag, the writes-replicated flag, the fault
//! policy, the retry configuration, and the registry of locks the operation
//! currently holds. There is no implicit thread-local state.

use crate::faults::FaultPolicy;
use crate::lock::{LockMode, ResourceId};
use crate::retry::RetryConfig;
use coral_core::error::{Error, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Explicit per-operation context.
pub struct OperationContext {
    interrupt: Arc<AtomicBool>,
    writes_replicated: bool,
    faults: FaultPolicy,
    retry: RetryConfig,
    held: Arc<Mutex<Vec<(ResourceId, LockMode)>>>,
}

impl Default for OperationContext {
    fn default() -> Self {
        Self::new()
    }
}

impl OperationContext {
    /// Context for an unreplicated operation with default policies.
    pub fn new() -> Self {
        OperationContext {
            interrupt: Arc::new(AtomicBool::new(false)),
            writes_replicated: false,
            faults: FaultPolicy::none(),
            retry: RetryConfig::default(),
            held: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Set whether this operation's writes are replicated (live user writes
    /// on a replicated node). Replay and rollback contexts leave this off.
    pub fn with_writes_replicated(mut self, replicated: bool) -> Self {
        self.writes_replicated = replicated;
        self
    }

    /// Attach a fault policy.
    pub fn with_faults(mut self, faults: FaultPolicy) -> Self {
        self.faults = faults;
        self
    }

    /// Override the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Whether this operation's writes are replicated.
    pub fn writes_replicated(&self) -> bool {
        self.writes_replicated
    }

    /// The fault policy in effect.
    pub fn faults(&self) -> &FaultPolicy {
        &self.faults
    }

    /// The retry configuration in effect.
    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Handle another thread can use to cancel this operation.
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt)
    }

    /// Request cooperative cancellation.
    pub fn interrupt(&self) {
        self.interrupt.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_interrupted(&self) -> bool {
        self.interrupt.load(Ordering::SeqCst)
    }

    /// Fail with `Interrupted` if cancellation has been requested.
    pub fn check_for_interrupt(&self) -> Result<()> {
        if self.is_interrupted() {
            Err(Error::Interrupted)
        } else {
            Ok(())
        }
    }

    /// A context sharing this one's lock ownership but immune to its
    /// cancellation and fault policy. Cleanup paths run under this so an
    /// interrupted operation can still remove what it staged, without
    /// re-tripping injected faults or self-deadlocking on locks the
    /// operation already holds.
    pub fn fork_uninterruptible(&self) -> OperationContext {
        OperationContext {
            interrupt: Arc::new(AtomicBool::new(false)),
            writes_replicated: self.writes_replicated,
            faults: FaultPolicy::none(),
            retry: self.retry.clone(),
            held: Arc::clone(&self.held),
        }
    }

    /// Whether a lock on `resource` is already held in a mode covering
    /// `mode`. The lock protocol uses this to avoid re-acquiring (and
    /// self-deadlocking on) resources the operation already owns.
    pub fn is_locked_for(&self, resource: &ResourceId, mode: LockMode) -> bool {
        self.held
            .lock()
            .iter()
            .any(|(res, held)| res == resource && held.covers(mode))
    }

    pub(crate) fn note_acquired(&self, resource: &ResourceId, mode: LockMode) {
        self.held.lock().push((resource.clone(), mode));
    }

    pub(crate) fn held_registry(&self) -> Arc<Mutex<Vec<(ResourceId, LockMode)>>> {
        Arc::clone(&self.held)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupt_is_observable() {
        let ctx = OperationContext::new();
        assert!(ctx.check_for_interrupt().is_ok());
        ctx.interrupt();
        assert_eq!(ctx.check_for_interrupt(), Err(Error::Interrupted));
    }

    #[test]
    fn test_interrupt_handle_crosses_threads() {
        let ctx = OperationContext::new();
        let handle = ctx.interrupt_handle();
        std::thread::spawn(move || handle.store(true, Ordering::SeqCst))
            .join()
            .unwrap();
        assert!(ctx.is_interrupted());
    }
}
