//! EventStore trait definition.

use async_trait::async_trait;

use super::{EventRecord, Result};
use crate::identifiers::{AggregateId, EventId};

/// Interface for the events collection.
///
/// Events are append-only. The backend enforces three constraints and
/// reports violations as [`StorageError::DuplicateKey`](super::StorageError):
/// - `(aggregate_id, event_number)` is unique
/// - `position` is unique
/// - `id` is unique
///
/// Implementations:
/// - `SqliteEventStore`: SQLite storage
/// - `PostgresEventStore`: PostgreSQL storage
/// - `MemoryEventStore`: in-process storage
#[async_trait]
pub trait EventStore: Send + Sync {
    /// The event with the highest `event_number` in a stream.
    async fn latest_event(&self, aggregate_id: &AggregateId) -> Result<Option<EventRecord>>;

    /// Insert a batch of fully-stamped events.
    ///
    /// The batch is atomic: either every event is stored or none is.
    async fn insert_events(&self, events: Vec<EventRecord>) -> Result<()>;

    /// Look up a single event by id.
    async fn get_event(&self, id: &EventId) -> Result<Option<EventRecord>>;

    /// Events of a stream with `event_number >= from`, ascending.
    async fn load_stream(&self, aggregate_id: &AggregateId, from: u64) -> Result<Vec<EventRecord>>;

    /// Whether any event references `aggregate_id`.
    async fn stream_exists(&self, aggregate_id: &AggregateId) -> Result<bool>;

    /// Events across all streams with `position >= from`, ascending by
    /// position, at most `limit` of them.
    async fn load_all_from(&self, from: u64, limit: usize) -> Result<Vec<EventRecord>>;

    /// Round-trip to the backend to check the connection is alive.
    async fn ping(&self) -> Result<()>;

    /// Release the underlying connection.
    async fn close(&self);
}
