//! SnapshotStore interface tests.
//!
//! These tests verify the contract of the SnapshotStore trait.
//! Each storage implementation should run these tests.

use serde_json::json;

use eventvault::storage::{SnapshotRecord, SnapshotStore};
use eventvault::{AggregateId, EventId};

use super::unique_stream;

fn make_snapshot(aggregate_id: &AggregateId, version: u64) -> SnapshotRecord {
    SnapshotRecord {
        aggregate_id: aggregate_id.clone(),
        last_event_id: EventId::generate(),
        state: json!({ "version": version, "title": format!("v{version}") }),
    }
}

pub async fn test_get_missing<S: SnapshotStore + ?Sized>(store: &S) {
    let snapshot = store.get(&unique_stream("snap_missing")).await.unwrap();
    assert!(snapshot.is_none(), "should have no snapshot");
}

pub async fn test_put_and_get<S: SnapshotStore + ?Sized>(store: &S) {
    let id = unique_stream("snap_put");
    let snapshot = make_snapshot(&id, 1);

    store.put(snapshot.clone()).await.expect("put should succeed");

    let loaded = store.get(&id).await.unwrap();
    assert_eq!(loaded, Some(snapshot));
}

pub async fn test_put_replaces_existing<S: SnapshotStore + ?Sized>(store: &S) {
    let id = unique_stream("snap_replace");
    store.put(make_snapshot(&id, 1)).await.unwrap();
    let newer = make_snapshot(&id, 2);

    store.put(newer.clone()).await.expect("upsert should succeed");

    let loaded = store.get(&id).await.unwrap().unwrap();
    assert_eq!(loaded.last_event_id, newer.last_event_id);
    assert_eq!(loaded.state["version"], 2);
}

pub async fn test_delete<S: SnapshotStore + ?Sized>(store: &S) {
    let id = unique_stream("snap_delete");
    store.put(make_snapshot(&id, 1)).await.unwrap();

    store.delete(&id).await.expect("delete should succeed");

    assert!(store.get(&id).await.unwrap().is_none());
    store
        .delete(&id)
        .await
        .expect("deleting a missing snapshot should succeed");
}

pub async fn test_snapshots_are_per_aggregate<S: SnapshotStore + ?Sized>(store: &S) {
    let a = unique_stream("snap_a");
    let b = unique_stream("snap_b");
    store.put(make_snapshot(&a, 1)).await.unwrap();
    store.put(make_snapshot(&b, 7)).await.unwrap();

    assert_eq!(store.get(&a).await.unwrap().unwrap().state["version"], 1);
    assert_eq!(store.get(&b).await.unwrap().unwrap().state["version"], 7);
}

/// Run all SnapshotStore tests against a store implementation.
#[macro_export]
macro_rules! run_snapshot_store_tests {
    ($store:expr) => {
        use $crate::storage::snapshot_store_tests::*;

        test_get_missing($store).await;
        println!("  test_get_missing: PASSED");

        test_put_and_get($store).await;
        println!("  test_put_and_get: PASSED");

        test_put_replaces_existing($store).await;
        println!("  test_put_replaces_existing: PASSED");

        test_delete($store).await;
        println!("  test_delete: PASSED");

        test_snapshots_are_per_aggregate($store).await;
        println!("  test_snapshots_are_per_aggregate: PASSED");
    };
}
