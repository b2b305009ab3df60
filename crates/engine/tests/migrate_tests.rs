//! Cross-database migration integration tests
//!
//! Validates the staging-copy design end to end: data and index
//! preservation, fresh identity, temp-collection hygiene, conflict-retry
//! repositioning, cooperative cancellation, and the two reachable outcomes
//! when the migration fails at any step boundary.

use coral_catalog::{Catalog, RecordCursor};
use coral_concurrency::{FaultPolicy, LockManager, OperationContext, RetryConfig};
use coral_core::collection::{CollectionOptions, IndexDescriptor, Record};
use coral_core::error::Error;
use coral_core::types::{CollectionId, DatabaseName, Namespace};
use coral_engine::{
    BackgroundRegistry, CatalogService, MigrationConfig, RenameOptions, UnshardedOracle,
};
use coral_oplog::{MemoryOpLog, Standalone};
use serde_json::json;
use std::sync::Arc;

fn standalone_service_with(config: MigrationConfig) -> CatalogService {
    CatalogService::new(
        Arc::new(Catalog::new()),
        Arc::new(LockManager::new()),
        Arc::new(MemoryOpLog::new()),
        Arc::new(Standalone),
        Arc::new(UnshardedOracle),
        Arc::new(BackgroundRegistry::new()),
        config,
    )
}

fn seed_orders(service: &CatalogService, ns: &Namespace, records: usize) -> CollectionId {
    let id = CollectionId::new();
    let mut txn = service.catalog().begin();
    txn.create(ns.clone(), id, CollectionOptions::plain());
    txn.create_indexes(
        id,
        vec![
            IndexDescriptor::new("by_date", json!({"date": 1})),
            IndexDescriptor::new("by_customer", json!({"customer": 1})),
            IndexDescriptor::new("by_total", json!({"total": -1})),
        ],
    );
    txn.insert_records(
        id,
        (0..records)
            .map(|i| Record::new(format!("order{i}").into_bytes()))
            .collect(),
    );
    txn.commit(&MemoryOpLog::new()).unwrap();
    id
}

fn record_payloads(service: &CatalogService, id: CollectionId) -> Vec<Vec<u8>> {
    let mut cursor = RecordCursor::new(service.catalog(), id);
    let mut payloads = Vec::new();
    while let Some((_, record)) = cursor.next() {
        payloads.push(record.data);
    }
    payloads
}

#[test]
fn test_migration_preserves_records_and_secondary_indexes() {
    let service = standalone_service_with(MigrationConfig::default());
    let ctx = OperationContext::new();
    let source = Namespace::new("sales", "orders");
    let target = Namespace::new("reporting", "orders");
    let source_id = seed_orders(&service, &source, 10_000);
    let source_payloads = record_payloads(&service, source_id);

    service
        .rename_collection(&ctx, &source, &target, RenameOptions::default())
        .unwrap();

    // Source gone, target present under a fresh id.
    assert_eq!(service.catalog().lookup_by_namespace(&source), None);
    let target_meta = service.catalog().collection_meta(&target).unwrap();
    assert_ne!(target_meta.id, source_id);
    assert_eq!(target_meta.record_count, 10_000);

    // All three secondary indexes came along; the identity index is the
    // target's own.
    let mut names: Vec<_> = target_meta
        .secondary_indexes()
        .into_iter()
        .map(|ix| ix.name)
        .collect();
    names.sort();
    assert_eq!(names, vec!["by_customer", "by_date", "by_total"]);

    // Byte-for-byte data preservation, in storage order.
    assert_eq!(record_payloads(&service, target_meta.id), source_payloads);

    // No residual temp collection in the target database.
    assert_eq!(
        service.catalog().collections_in(&DatabaseName::new("reporting")),
        vec![target.clone()]
    );
    // The target database was created implicitly.
    assert!(service.catalog().database_exists(&DatabaseName::new("reporting")));
}

#[test]
fn test_migration_onto_existing_target_requires_drop_target() {
    let service = standalone_service_with(MigrationConfig::default());
    let ctx = OperationContext::new();
    let source = Namespace::new("sales", "orders");
    let target = Namespace::new("reporting", "orders");
    seed_orders(&service, &source, 10);
    let occupant_id = seed_orders(&service, &target, 3);

    let err = service
        .rename_collection(&ctx, &source, &target, RenameOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::NamespaceExists(_)));
    assert_eq!(service.catalog().lookup_by_namespace(&target), Some(occupant_id));
    // The failed attempt left no staging debris behind.
    assert_eq!(
        service.catalog().collections_in(&DatabaseName::new("reporting")),
        vec![target.clone()]
    );

    service
        .rename_collection(
            &ctx,
            &source,
            &target,
            RenameOptions {
                drop_target: true,
                stay_temp: false,
            },
        )
        .unwrap();
    let target_meta = service.catalog().collection_meta(&target).unwrap();
    assert_eq!(target_meta.record_count, 10);
    assert_eq!(service.catalog().namespace_of_id(occupant_id), None);
}

#[test]
fn test_injected_copy_conflicts_never_lose_or_duplicate_records() {
    let service = standalone_service_with(MigrationConfig::new().with_max_batch_size(4));
    let ctx = OperationContext::new()
        .with_faults(FaultPolicy::none().with_copy_conflicts(3))
        .with_retry(RetryConfig::new().with_base_delay_ms(0));
    let source = Namespace::new("sales", "orders");
    let target = Namespace::new("reporting", "orders");
    let source_id = seed_orders(&service, &source, 26);
    let source_payloads = record_payloads(&service, source_id);

    service
        .rename_collection(&ctx, &source, &target, RenameOptions::default())
        .unwrap();

    let target_meta = service.catalog().collection_meta(&target).unwrap();
    assert_eq!(record_payloads(&service, target_meta.id), source_payloads);
}

#[test]
fn test_exhausted_copy_retries_clean_up_and_leave_source_intact() {
    let service = standalone_service_with(MigrationConfig::new().with_max_batch_size(2));
    let ctx = OperationContext::new()
        .with_faults(FaultPolicy::none().with_copy_conflicts(1000))
        .with_retry(
            RetryConfig::new()
                .with_max_attempts(3)
                .with_base_delay_ms(0),
        );
    let source = Namespace::new("sales", "orders");
    let target = Namespace::new("reporting", "orders");
    seed_orders(&service, &source, 20);

    let err = service
        .rename_collection(&ctx, &source, &target, RenameOptions::default())
        .unwrap_err();
    assert_eq!(err, Error::WriteConflict);

    // Source untouched, destination never mutated, no staging debris.
    assert_eq!(
        service.catalog().collection_meta(&source).unwrap().record_count,
        20
    );
    assert_eq!(service.catalog().lookup_by_namespace(&target), None);
    assert!(service
        .catalog()
        .collections_in(&DatabaseName::new("reporting"))
        .is_empty());
}

/// The two states a failed migration may leave behind.
#[derive(Debug, PartialEq)]
enum Outcome {
    SourceIntactTargetUntouched,
    TargetMigratedSourceDropPending,
}

fn classify_outcome(
    service: &CatalogService,
    source: &Namespace,
    target: &Namespace,
    records: u64,
) -> Outcome {
    let reporting: Vec<_> = service
        .catalog()
        .collections_in(&target.db)
        .into_iter()
        .filter(|ns| !ns.is_drop_pending())
        .collect();
    let source_meta = service.catalog().collection_meta(source);
    let target_meta = service.catalog().collection_meta(target);

    match (source_meta, target_meta) {
        (Some(s), None) => {
            assert_eq!(s.record_count, records, "source must be fully intact");
            assert!(reporting.is_empty(), "no staging debris may remain");
            Outcome::SourceIntactTargetUntouched
        }
        (source_state, Some(t)) => {
            assert_eq!(t.record_count, records, "target must be fully migrated");
            assert_eq!(t.secondary_indexes().len(), 3);
            assert_eq!(reporting, vec![target.clone()]);
            if let Some(s) = source_state {
                assert_eq!(s.record_count, records, "pending source must be intact");
            }
            Outcome::TargetMigratedSourceDropPending
        }
        (None, None) => panic!("no reachable failure state loses both endpoints"),
    }
}

#[test]
fn test_failure_at_every_step_boundary_yields_one_of_two_states() {
    let cases = [
        ("migrate::temp_created", Outcome::SourceIntactTargetUntouched),
        (
            "migrate::indexes_installed",
            Outcome::SourceIntactTargetUntouched,
        ),
        ("migrate::copy_done", Outcome::SourceIntactTargetUntouched),
        (
            "migrate::target_renamed",
            Outcome::TargetMigratedSourceDropPending,
        ),
    ];

    for (fail_point, expected) in cases {
        let service = standalone_service_with(MigrationConfig::new().with_max_batch_size(8));
        let source = Namespace::new("sales", "orders");
        let target = Namespace::new("reporting", "orders");
        seed_orders(&service, &source, 40);

        let faulty =
            OperationContext::new().with_faults(FaultPolicy::none().with_fail_point(fail_point));
        let err = service
            .rename_collection(&faulty, &source, &target, RenameOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::Internal(_)), "{fail_point}: {err}");

        let outcome = classify_outcome(&service, &source, &target, 40);
        assert_eq!(outcome, expected, "at {fail_point}");

        // Recovery: retrying the rename (dropping whatever half-state holds
        // the target) converges to the fully migrated state.
        let retry_ctx = OperationContext::new();
        service
            .rename_collection(
                &retry_ctx,
                &source,
                &target,
                RenameOptions {
                    drop_target: true,
                    stay_temp: false,
                },
            )
            .unwrap();
        assert_eq!(service.catalog().lookup_by_namespace(&source), None);
        assert_eq!(
            service.catalog().collection_meta(&target).unwrap().record_count,
            40
        );
    }
}

#[test]
fn test_cancellation_mid_copy_cleans_up_and_never_touches_target() {
    let service = Arc::new(standalone_service_with(
        MigrationConfig::new().with_max_batch_size(1),
    ));
    let source = Namespace::new("sales", "orders");
    let target = Namespace::new("reporting", "orders");
    seed_orders(&service, &source, 400);

    // One injected conflict per batch keeps each batch slow enough (backoff
    // sleep) that the interrupt below lands mid-copy.
    let ctx = OperationContext::new().with_faults(FaultPolicy::none().with_copy_conflicts(200));
    let interrupt = ctx.interrupt_handle();

    let worker = {
        let service = Arc::clone(&service);
        let source = source.clone();
        let target = target.clone();
        std::thread::spawn(move || {
            service.rename_collection(&ctx, &source, &target, RenameOptions::default())
        })
    };

    std::thread::sleep(std::time::Duration::from_millis(30));
    interrupt.store(true, std::sync::atomic::Ordering::SeqCst);
    let result = worker.join().unwrap();

    assert_eq!(result, Err(Error::Interrupted));
    assert_eq!(
        service.catalog().collection_meta(&source).unwrap().record_count,
        400
    );
    assert_eq!(service.catalog().lookup_by_namespace(&target), None);
    assert!(service
        .catalog()
        .collections_in(&DatabaseName::new("reporting"))
        .is_empty());
}

#[test]
fn test_pre_cancelled_context_changes_nothing() {
    let service = standalone_service_with(MigrationConfig::default());
    let ctx = OperationContext::new();
    ctx.interrupt();
    let source = Namespace::new("sales", "orders");
    let target = Namespace::new("reporting", "orders");
    seed_orders(&service, &source, 5);

    let err = service
        .rename_collection(&ctx, &source, &target, RenameOptions::default())
        .unwrap_err();
    assert_eq!(err, Error::Interrupted);
    assert_eq!(
        service.catalog().collection_meta(&source).unwrap().record_count,
        5
    );
    assert!(service
        .catalog()
        .collections_in(&DatabaseName::new("reporting"))
        .is_empty());
}
