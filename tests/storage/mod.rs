//! Shared storage integration tests.
//!
//! Tests the EventStore, SnapshotStore and SequenceStore interfaces against
//! all implementations. Each implementation module imports these test
//! functions and runs them.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde_json::json;

use eventvault::storage::EventRecord;
use eventvault::{AggregateId, EventId};

pub mod event_store_tests;
pub mod sequence_store_tests;
pub mod snapshot_store_tests;

static NEXT_POSITION: AtomicU64 = AtomicU64::new(1);

/// A global position no other test in this binary has used.
pub fn next_position() -> u64 {
    NEXT_POSITION.fetch_add(1, Ordering::SeqCst)
}

/// A namespace unique to this test run, so reruns against a shared server
/// never see earlier data.
pub fn unique_namespace(prefix: &str) -> String {
    format!("{}_{}", prefix, uuid::Uuid::new_v4().simple())
}

/// A stream id unique to this test run.
pub fn unique_stream(prefix: &str) -> AggregateId {
    AggregateId::new(format!("{}-{}", prefix, uuid::Uuid::new_v4()))
}

/// Create a test event at `event_number` with a fresh position.
pub fn make_event(aggregate_id: &AggregateId, event_number: u64) -> EventRecord {
    EventRecord {
        id: EventId::generate(),
        aggregate_id: aggregate_id.clone(),
        event_number,
        name: "test.happened".to_string(),
        data: json!({ "n": event_number, "tags": ["a", "b"] }),
        timestamp: Utc::now(),
        position: next_position(),
    }
}

/// Create events `start..start + count`.
pub fn make_events(aggregate_id: &AggregateId, start: u64, count: u64) -> Vec<EventRecord> {
    (start..start + count)
        .map(|n| make_event(aggregate_id, n))
        .collect()
}
