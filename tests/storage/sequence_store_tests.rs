//! SequenceStore interface tests.
//!
//! These tests verify the contract of the SequenceStore trait.
//! Each storage implementation should run these tests.

use std::collections::HashSet;

use eventvault::storage::{SequenceStore, StorageError};

fn counter(prefix: &str) -> String {
    format!("{}_{}", prefix, uuid::Uuid::new_v4().simple())
}

pub async fn test_seed_starts_at_zero<S: SequenceStore + ?Sized>(store: &S) {
    let name = counter("seed");

    store.seed(&name).await.expect("seed should succeed");

    assert_eq!(store.current(&name).await.unwrap(), Some(0));
}

pub async fn test_seed_twice_is_duplicate<S: SequenceStore + ?Sized>(store: &S) {
    let name = counter("reseed");
    store.seed(&name).await.unwrap();
    store.next(&name).await.unwrap();

    let result = store.seed(&name).await;

    assert!(
        matches!(result, Err(StorageError::DuplicateKey(_))),
        "second seed should be DuplicateKey, got {:?}",
        result
    );
    assert_eq!(
        store.current(&name).await.unwrap(),
        Some(1),
        "duplicate seed must not reset the counter"
    );
}

pub async fn test_next_increments<S: SequenceStore + ?Sized>(store: &S) {
    let name = counter("next");
    store.seed(&name).await.unwrap();

    assert_eq!(store.next(&name).await.unwrap(), 1);
    assert_eq!(store.next(&name).await.unwrap(), 2);
    assert_eq!(store.next(&name).await.unwrap(), 3);
}

pub async fn test_next_unseeded<S: SequenceStore + ?Sized>(store: &S) {
    let result = store.next(&counter("unseeded")).await;

    assert!(
        matches!(result, Err(StorageError::CounterMissing(_))),
        "unseeded counter should be CounterMissing, got {:?}",
        result
    );
}

pub async fn test_current_unseeded<S: SequenceStore + ?Sized>(store: &S) {
    assert_eq!(store.current(&counter("absent")).await.unwrap(), None);
}

pub async fn test_concurrent_next_is_unique<S: SequenceStore + ?Sized>(store: &S) {
    let name = counter("concurrent");
    store.seed(&name).await.unwrap();

    let results = futures::future::join_all((0..20).map(|_| store.next(&name))).await;

    let values: HashSet<u64> = results.into_iter().map(|r| r.unwrap()).collect();
    assert_eq!(values, (1..=20).collect::<HashSet<u64>>());
}

/// Run all SequenceStore tests against a store implementation.
#[macro_export]
macro_rules! run_sequence_store_tests {
    ($store:expr) => {
        use $crate::storage::sequence_store_tests::*;

        test_seed_starts_at_zero($store).await;
        println!("  test_seed_starts_at_zero: PASSED");

        test_seed_twice_is_duplicate($store).await;
        println!("  test_seed_twice_is_duplicate: PASSED");

        test_next_increments($store).await;
        println!("  test_next_increments: PASSED");

        test_next_unseeded($store).await;
        println!("  test_next_unseeded: PASSED");

        test_current_unseeded($store).await;
        println!("  test_current_unseeded: PASSED");

        test_concurrent_next_is_unique($store).await;
        println!("  test_concurrent_next_is_unique: PASSED");
    };
}
