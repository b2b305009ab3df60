//! Log-replay adapter integration tests
//!
//! Every replayed operation must be safe to apply more than once, resolve
//! collections by id before name, and downgrade renames of vanished sources
//! into drops of the recorded target.

use coral_catalog::Catalog;
use coral_concurrency::{LockManager, OperationContext};
use coral_core::collection::{CollectionOptions, Record};
use coral_core::error::Error;
use coral_core::types::{CollectionId, DatabaseName, LogTimestamp, Namespace};
use coral_engine::{
    BackgroundRegistry, CatalogService, DropTargetSpec, MigrationConfig, RenameFromLogCommand,
    UnshardedOracle,
};
use coral_oplog::{MemoryOpLog, Standalone};
use std::sync::Arc;

fn standalone_service() -> CatalogService {
    CatalogService::new(
        Arc::new(Catalog::new()),
        Arc::new(LockManager::new()),
        Arc::new(MemoryOpLog::new()),
        Arc::new(Standalone),
        Arc::new(UnshardedOracle),
        Arc::new(BackgroundRegistry::new()),
        MigrationConfig::default(),
    )
}

fn create_collection(service: &CatalogService, ns: &Namespace, records: usize) -> CollectionId {
    let id = CollectionId::new();
    let mut txn = service.catalog().begin();
    txn.create(ns.clone(), id, CollectionOptions::plain());
    txn.insert_records(
        id,
        (0..records)
            .map(|i| Record::new(format!("doc{i}").into_bytes()))
            .collect(),
    );
    txn.commit(&MemoryOpLog::new()).unwrap();
    id
}

/// Snapshot of the catalog state a test can compare across applications.
fn catalog_fingerprint(service: &CatalogService, dbs: &[&str]) -> Vec<(Namespace, CollectionId, u64)> {
    let mut out = Vec::new();
    for db in dbs {
        for ns in service.catalog().collections_in(&DatabaseName::new(*db)) {
            let meta = service.catalog().collection_meta(&ns).unwrap();
            out.push((ns, meta.id, meta.record_count));
        }
    }
    out
}

#[test]
fn test_replayed_drop_and_rename_is_idempotent() {
    let service = standalone_service();
    let ctx = OperationContext::new();
    let db = DatabaseName::new("sales");
    let source = Namespace::new("sales", "orders_new");
    let target = Namespace::new("sales", "orders");
    let source_id = create_collection(&service, &source, 6);
    let target_id = create_collection(&service, &target, 2);

    let cmd = RenameFromLogCommand {
        source: source.clone(),
        target: target.clone(),
        drop_target: DropTargetSpec::ById(target_id),
        stay_temp: false,
    };
    let ts = Some(LogTimestamp(100));

    service
        .rename_from_log(&ctx, &db, Some(source_id), &cmd, ts)
        .unwrap();
    let after_first = catalog_fingerprint(&service, &["sales"]);
    assert_eq!(service.catalog().lookup_by_namespace(&target), Some(source_id));
    assert_eq!(service.catalog().lookup_by_namespace(&source), None);
    // The dropped occupant is parked under the recorded timestamp.
    let parked = service.catalog().namespace_of_id(target_id).unwrap();
    assert!(parked.is_drop_pending());

    // Second application converges to the identical state.
    service
        .rename_from_log(&ctx, &db, Some(source_id), &cmd, ts)
        .unwrap();
    let after_second = catalog_fingerprint(&service, &["sales"]);
    assert_eq!(after_first, after_second);
}

#[test]
fn test_replay_resolves_source_by_id_despite_name_drift() {
    let service = standalone_service();
    let ctx = OperationContext::new();
    let db = DatabaseName::new("sales");
    // The record says "orders_old", but the collection has since moved.
    let drifted = Namespace::new("sales", "orders_drifted");
    let target = Namespace::new("sales", "orders");
    let id = create_collection(&service, &drifted, 4);

    let cmd = RenameFromLogCommand {
        source: Namespace::new("sales", "orders_old"),
        target: target.clone(),
        drop_target: DropTargetSpec::False,
        stay_temp: false,
    };
    service
        .rename_from_log(&ctx, &db, Some(id), &cmd, None)
        .unwrap();

    assert_eq!(service.catalog().lookup_by_namespace(&target), Some(id));
    assert_eq!(service.catalog().lookup_by_namespace(&drifted), None);
}

#[test]
fn test_replay_relocates_unrelated_occupant_before_landing() {
    let service = standalone_service();
    let ctx = OperationContext::new();
    let db = DatabaseName::new("sales");
    let source = Namespace::new("sales", "orders_new");
    let target = Namespace::new("sales", "orders");
    let source_id = create_collection(&service, &source, 3);
    // An unrelated collection occupies the target; the record names no drop.
    let occupant_id = create_collection(&service, &target, 9);

    let cmd = RenameFromLogCommand {
        source: source.clone(),
        target: target.clone(),
        drop_target: DropTargetSpec::False,
        stay_temp: false,
    };
    service
        .rename_from_log(&ctx, &db, Some(source_id), &cmd, None)
        .unwrap();

    // The rename landed and the occupant survived under a generated name.
    assert_eq!(service.catalog().lookup_by_namespace(&target), Some(source_id));
    let relocated = service.catalog().namespace_of_id(occupant_id).unwrap();
    assert!(relocated.coll.starts_with("tmp"));
    assert!(relocated.coll.ends_with(".rename"));
    assert_eq!(
        service.catalog().collection_meta(&relocated).unwrap().record_count,
        9
    );
}

#[test]
fn test_replay_drops_hinted_collection_wherever_its_name_drifted() {
    let service = standalone_service();
    let ctx = OperationContext::new();
    let db = DatabaseName::new("sales");
    let source = Namespace::new("sales", "orders_new");
    let target = Namespace::new("sales", "orders");
    let source_id = create_collection(&service, &source, 3);
    // The collection the record drops has moved away from the target name.
    let hinted_home = Namespace::new("sales", "orders_moved");
    let hinted_id = create_collection(&service, &hinted_home, 5);

    let cmd = RenameFromLogCommand {
        source: source.clone(),
        target: target.clone(),
        drop_target: DropTargetSpec::ById(hinted_id),
        stay_temp: false,
    };
    service
        .rename_from_log(&ctx, &db, Some(source_id), &cmd, None)
        .unwrap();

    assert_eq!(service.catalog().lookup_by_namespace(&target), Some(source_id));
    // The hinted collection was dropped, wherever it lived.
    assert_eq!(service.catalog().namespace_of_id(hinted_id), None);
    assert_eq!(service.catalog().lookup_by_namespace(&hinted_home), None);
}

#[test]
fn test_replay_downgrades_missing_source_to_drop_of_hint() {
    let service = standalone_service();
    let ctx = OperationContext::new();
    let db = DatabaseName::new("sales");
    service.catalog().ensure_database(&db);
    let target = Namespace::new("sales", "orders");
    let stale_target_id = create_collection(&service, &target, 2);

    let cmd = RenameFromLogCommand {
        source: Namespace::new("sales", "already_gone"),
        target: target.clone(),
        drop_target: DropTargetSpec::ById(stale_target_id),
        stay_temp: false,
    };
    service
        .rename_from_log(&ctx, &db, None, &cmd, Some(LogTimestamp(70)))
        .unwrap();

    // The rename was applied upstream already; only the drop remained.
    assert_eq!(service.catalog().lookup_by_namespace(&target), None);
    let parked = service.catalog().namespace_of_id(stale_target_id).unwrap();
    assert!(parked.is_drop_pending());
}

#[test]
fn test_replay_with_unresolvable_hint_is_already_applied() {
    let service = standalone_service();
    let ctx = OperationContext::new();
    let db = DatabaseName::new("sales");
    service.catalog().ensure_database(&db);

    let cmd = RenameFromLogCommand {
        source: Namespace::new("sales", "already_gone"),
        target: Namespace::new("sales", "orders"),
        drop_target: DropTargetSpec::ById(CollectionId::new()),
        stay_temp: false,
    };
    let before = catalog_fingerprint(&service, &["sales"]);
    service.rename_from_log(&ctx, &db, None, &cmd, None).unwrap();
    assert_eq!(catalog_fingerprint(&service, &["sales"]), before);
}

#[test]
fn test_replay_with_no_drop_information_fails() {
    let service = standalone_service();
    let ctx = OperationContext::new();
    let db = DatabaseName::new("sales");
    service.catalog().ensure_database(&db);

    let cmd = RenameFromLogCommand {
        source: Namespace::new("sales", "already_gone"),
        target: Namespace::new("sales", "orders"),
        drop_target: DropTargetSpec::False,
        stay_temp: false,
    };
    let err = service.rename_from_log(&ctx, &db, None, &cmd, None).unwrap_err();
    assert!(matches!(err, Error::NamespaceNotFound(_)));
}

#[test]
fn test_replay_downgrade_falls_back_to_recorded_target() {
    let service = standalone_service();
    let ctx = OperationContext::new();
    let db = DatabaseName::new("sales");
    let target = Namespace::new("sales", "orders");
    let target_id = create_collection(&service, &target, 2);

    // dropTarget recorded as a bare flag: the recorded target is dropped.
    let cmd = RenameFromLogCommand {
        source: Namespace::new("sales", "already_gone"),
        target: target.clone(),
        drop_target: DropTargetSpec::True,
        stay_temp: false,
    };
    service.rename_from_log(&ctx, &db, None, &cmd, None).unwrap();
    assert_eq!(service.catalog().lookup_by_namespace(&target), None);
    assert_eq!(service.catalog().namespace_of_id(target_id), None);
}

#[test]
fn test_replay_timestamp_conflicts_with_replicated_writes() {
    let service = standalone_service();
    let ctx = OperationContext::new().with_writes_replicated(true);
    let db = DatabaseName::new("sales");
    let source = Namespace::new("sales", "orders");
    create_collection(&service, &source, 1);

    let cmd = RenameFromLogCommand {
        source: source.clone(),
        target: Namespace::new("sales", "archived"),
        drop_target: DropTargetSpec::False,
        stay_temp: false,
    };
    let err = service
        .rename_from_log(&ctx, &db, None, &cmd, Some(LogTimestamp(9)))
        .unwrap_err();
    assert!(matches!(err, Error::IllegalOperation(_)));
}

#[test]
fn test_replay_routes_cross_database_renames_through_migration() {
    let service = standalone_service();
    let ctx = OperationContext::new();
    let db = DatabaseName::new("sales");
    let source = Namespace::new("sales", "orders");
    let target = Namespace::new("reporting", "orders");
    let source_id = create_collection(&service, &source, 12);

    let cmd = RenameFromLogCommand {
        source: source.clone(),
        target: target.clone(),
        drop_target: DropTargetSpec::False,
        stay_temp: false,
    };
    service.rename_from_log(&ctx, &db, None, &cmd, None).unwrap();

    let target_meta = service.catalog().collection_meta(&target).unwrap();
    assert_eq!(target_meta.record_count, 12);
    // Cross-database moves assign a fresh id.
    assert_ne!(target_meta.id, source_id);
    assert_eq!(service.catalog().lookup_by_namespace(&source), None);
}

#[test]
fn test_replay_of_applied_rename_with_equal_hint_is_a_no_op() {
    let service = standalone_service();
    let ctx = OperationContext::new();
    let db = DatabaseName::new("sales");
    let target = Namespace::new("sales", "orders");
    let id = create_collection(&service, &target, 3);

    // The source name no longer exists and the target already holds the
    // acting collection: everything was applied upstream.
    let cmd = RenameFromLogCommand {
        source: Namespace::new("sales", "orders_old"),
        target: target.clone(),
        drop_target: DropTargetSpec::False,
        stay_temp: false,
    };
    let before = catalog_fingerprint(&service, &["sales"]);
    service
        .rename_from_log(&ctx, &db, Some(id), &cmd, None)
        .unwrap();
    assert_eq!(catalog_fingerprint(&service, &["sales"]), before);
}
