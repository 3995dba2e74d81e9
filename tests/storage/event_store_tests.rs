//! EventStore interface tests.
//!
//! These tests verify the contract of the EventStore trait.
//! Each storage implementation should run these tests.

use eventvault::storage::{EventStore, StorageError};
use eventvault::EventId;

use super::{make_event, make_events, unique_stream};

// =============================================================================
// EventStore::insert_events tests
// =============================================================================

pub async fn test_insert_and_load_stream<S: EventStore + ?Sized>(store: &S) {
    let id = unique_stream("insert");

    store
        .insert_events(make_events(&id, 1, 3))
        .await
        .expect("insert should succeed");

    let events = store.load_stream(&id, 1).await.expect("load should succeed");
    let numbers: Vec<u64> = events.iter().map(|e| e.event_number).collect();
    assert_eq!(numbers, vec![1, 2, 3], "should load events in order");
}

pub async fn test_insert_empty_batch<S: EventStore + ?Sized>(store: &S) {
    let id = unique_stream("empty");

    store
        .insert_events(vec![])
        .await
        .expect("empty insert should succeed");

    assert!(!store.stream_exists(&id).await.unwrap());
}

pub async fn test_preserves_event_fields<S: EventStore + ?Sized>(store: &S) {
    let id = unique_stream("fields");
    let event = make_event(&id, 1);

    store.insert_events(vec![event.clone()]).await.unwrap();

    let loaded = store.load_stream(&id, 1).await.unwrap();
    assert_eq!(loaded, vec![event], "all fields should round-trip");
}

pub async fn test_duplicate_event_number_rejected<S: EventStore + ?Sized>(store: &S) {
    let id = unique_stream("dup_number");
    store.insert_events(make_events(&id, 1, 2)).await.unwrap();

    let result = store.insert_events(vec![make_event(&id, 2)]).await;

    assert!(
        matches!(result, Err(ref e) if e.is_duplicate_key()),
        "duplicate (aggregate_id, event_number) should be DuplicateKey, got {:?}",
        result
    );
}

pub async fn test_failed_batch_is_rolled_back<S: EventStore + ?Sized>(store: &S) {
    let id = unique_stream("rollback");
    store.insert_events(make_events(&id, 1, 2)).await.unwrap();

    // Event 3 is new, event 2 collides.
    let result = store
        .insert_events(vec![make_event(&id, 3), make_event(&id, 2)])
        .await;

    assert!(result.is_err());
    let events = store.load_stream(&id, 1).await.unwrap();
    assert_eq!(events.len(), 2, "no event of a failed batch should persist");
}

pub async fn test_duplicate_position_rejected<S: EventStore + ?Sized>(store: &S) {
    let first = make_event(&unique_stream("pos_a"), 1);
    let mut second = make_event(&unique_stream("pos_b"), 1);
    second.position = first.position;
    store.insert_events(vec![first]).await.unwrap();

    let result = store.insert_events(vec![second]).await;

    assert!(
        matches!(result, Err(StorageError::DuplicateKey(_))),
        "duplicate position should be DuplicateKey, got {:?}",
        result
    );
}

pub async fn test_same_number_in_different_streams<S: EventStore + ?Sized>(store: &S) {
    let a = unique_stream("multi_a");
    let b = unique_stream("multi_b");

    store.insert_events(make_events(&a, 1, 2)).await.unwrap();
    store.insert_events(make_events(&b, 1, 2)).await.unwrap();

    assert_eq!(store.load_stream(&a, 1).await.unwrap().len(), 2);
    assert_eq!(store.load_stream(&b, 1).await.unwrap().len(), 2);
}

// =============================================================================
// Read tests
// =============================================================================

pub async fn test_latest_event<S: EventStore + ?Sized>(store: &S) {
    let id = unique_stream("latest");
    store.insert_events(make_events(&id, 1, 2)).await.unwrap();
    store.insert_events(make_events(&id, 3, 1)).await.unwrap();

    let latest = store.latest_event(&id).await.unwrap().expect("has events");

    assert_eq!(latest.event_number, 3);
}

pub async fn test_latest_event_empty_stream<S: EventStore + ?Sized>(store: &S) {
    let latest = store.latest_event(&unique_stream("none")).await.unwrap();
    assert!(latest.is_none());
}

pub async fn test_load_stream_from<S: EventStore + ?Sized>(store: &S) {
    let id = unique_stream("from");
    store.insert_events(make_events(&id, 1, 5)).await.unwrap();

    let tail = store.load_stream(&id, 4).await.unwrap();

    let numbers: Vec<u64> = tail.iter().map(|e| e.event_number).collect();
    assert_eq!(numbers, vec![4, 5]);
    assert!(store.load_stream(&id, 6).await.unwrap().is_empty());
}

pub async fn test_get_event<S: EventStore + ?Sized>(store: &S) {
    let id = unique_stream("by_id");
    let event = make_event(&id, 1);
    store.insert_events(vec![event.clone()]).await.unwrap();

    let found = store.get_event(&event.id).await.unwrap();
    let missing = store.get_event(&EventId::generate()).await.unwrap();

    assert_eq!(found.map(|e| e.event_number), Some(1));
    assert!(missing.is_none());
}

pub async fn test_stream_exists<S: EventStore + ?Sized>(store: &S) {
    let id = unique_stream("exists");
    assert!(!store.stream_exists(&id).await.unwrap());

    store.insert_events(vec![make_event(&id, 1)]).await.unwrap();

    assert!(store.stream_exists(&id).await.unwrap());
}

pub async fn test_load_all_from<S: EventStore + ?Sized>(store: &S) {
    let a = unique_stream("feed_a");
    let b = unique_stream("feed_b");
    let first = make_event(&a, 1);
    let second = make_event(&b, 1);
    let third = make_event(&a, 2);
    let from = first.position;
    // Insert out of position order.
    store.insert_events(vec![third.clone()]).await.unwrap();
    store
        .insert_events(vec![first.clone(), second.clone()])
        .await
        .unwrap();

    let feed = store.load_all_from(from, 3).await.unwrap();
    let limited = store.load_all_from(from, 2).await.unwrap();

    let ids: Vec<_> = feed.iter().map(|e| e.id.clone()).collect();
    assert_eq!(ids, vec![first.id, second.id, third.id]);
    assert_eq!(limited.len(), 2);
}

pub async fn test_ping<S: EventStore + ?Sized>(store: &S) {
    store.ping().await.expect("ping should succeed");
}

/// Run all EventStore tests against a store implementation.
#[macro_export]
macro_rules! run_event_store_tests {
    ($store:expr) => {
        use $crate::storage::event_store_tests::*;

        test_insert_and_load_stream($store).await;
        println!("  test_insert_and_load_stream: PASSED");

        test_insert_empty_batch($store).await;
        println!("  test_insert_empty_batch: PASSED");

        test_preserves_event_fields($store).await;
        println!("  test_preserves_event_fields: PASSED");

        test_duplicate_event_number_rejected($store).await;
        println!("  test_duplicate_event_number_rejected: PASSED");

        test_failed_batch_is_rolled_back($store).await;
        println!("  test_failed_batch_is_rolled_back: PASSED");

        test_duplicate_position_rejected($store).await;
        println!("  test_duplicate_position_rejected: PASSED");

        test_same_number_in_different_streams($store).await;
        println!("  test_same_number_in_different_streams: PASSED");

        test_latest_event($store).await;
        println!("  test_latest_event: PASSED");

        test_latest_event_empty_stream($store).await;
        println!("  test_latest_event_empty_stream: PASSED");

        test_load_stream_from($store).await;
        println!("  test_load_stream_from: PASSED");

        test_get_event($store).await;
        println!("  test_get_event: PASSED");

        test_stream_exists($store).await;
        println!("  test_stream_exists: PASSED");

        test_load_all_from($store).await;
        println!("  test_load_all_from: PASSED");

        test_ping($store).await;
        println!("  test_ping: PASSED");
    };
}
