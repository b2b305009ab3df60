//! Deadlock-free lock acquisition helpers
//!
//! Collection locks for a same-database rename are taken in ascending
//! `ResourceId` order, with one fixed exception: the namespace backing view
//! definitions is always locked last, because concurrent view operations
//! lock it last too. Locks already held by the context in sufficient mode
//! are never re-acquired.

use coral_concurrency::{LockGuard, LockManager, LockMode, OperationContext, ResourceId};
use coral_core::error::Result;
use coral_core::types::Namespace;
use std::sync::Arc;

/// Acquire `resource` in `mode` unless the context already holds it in a
/// covering mode. Returns `None` when the existing hold suffices.
pub(crate) fn acquire_if_needed(
    locks: &Arc<LockManager>,
    ctx: &OperationContext,
    resource: ResourceId,
    mode: LockMode,
) -> Result<Option<LockGuard>> {
    if ctx.is_locked_for(&resource, mode) {
        return Ok(None);
    }
    locks.acquire(ctx, resource, mode).map(Some)
}

/// Whether the source collection is locked before the target: ascending
/// resource order, except that a `system.views` endpoint is always last.
pub(crate) fn source_locks_first(source: &Namespace, target: &Namespace) -> bool {
    !source.is_system_dot_views()
        && (target.is_system_dot_views()
            || ResourceId::collection(source) < ResourceId::collection(target))
}

/// Exclusively lock both collections of a same-database rename in the
/// protocol order. Returns the guards as (source, target).
pub(crate) fn lock_collection_pair(
    locks: &Arc<LockManager>,
    ctx: &OperationContext,
    source: &Namespace,
    target: &Namespace,
) -> Result<(LockGuard, LockGuard)> {
    let source_res = ResourceId::collection(source);
    let target_res = ResourceId::collection(target);
    if source_locks_first(source, target) {
        let source_guard = locks.acquire(ctx, source_res, LockMode::Exclusive)?;
        let target_guard = locks.acquire(ctx, target_res, LockMode::Exclusive)?;
        Ok((source_guard, target_guard))
    } else {
        let target_guard = locks.acquire(ctx, target_res, LockMode::Exclusive)?;
        let source_guard = locks.acquire(ctx, source_res, LockMode::Exclusive)?;
        Ok((source_guard, target_guard))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_is_symmetric_over_swapped_pairs() {
        let a = Namespace::new("sales", "aardvark");
        let b = Namespace::new("sales", "zebra");
        // Whichever direction the rename runs, "aardvark" is locked first.
        assert!(source_locks_first(&a, &b));
        assert!(!source_locks_first(&b, &a));
    }

    #[test]
    fn test_system_views_is_locked_last_regardless_of_order() {
        let views = Namespace::new("sales", "system.views");
        let coll = Namespace::new("sales", "zebra");
        // "system.views" < "zebra" in resource order, but views still go last.
        assert!(source_locks_first(&coll, &views));
        assert!(!source_locks_first(&views, &coll));
    }

    #[test]
    fn test_databases_order_before_names() {
        let a = Namespace::new("alpha", "zzz");
        let b = Namespace::new("beta", "aaa");
        assert!(source_locks_first(&a, &b));
    }

    #[test]
    fn test_held_lock_is_not_reacquired() {
        let locks = Arc::new(LockManager::new());
        let ctx = OperationContext::new();
        let db = coral_core::types::DatabaseName::new("sales");
        let _held = locks
            .acquire(&ctx, ResourceId::database(&db), LockMode::Exclusive)
            .unwrap();
        // Exclusive covers IntentExclusive; a second acquisition would
        // self-deadlock, so none must happen.
        let again = acquire_if_needed(
            &locks,
            &ctx,
            ResourceId::database(&db),
            LockMode::IntentExclusive,
        )
        .unwrap();
        assert!(again.is_none());
    }
}
