//! Storage layer.
//!
//! Three logical collections per namespace: events, snapshots and sequence
//! counters. Each has its own trait so backends can be mixed and mocked
//! independently; [`Store`] bundles one implementation of each together with
//! the connection lifecycle.

use chrono::{DateTime, Utc};

use crate::identifiers::{AggregateId, EventId};

pub mod event_store;
mod handle;
pub mod memory;
pub mod sequence_store;
pub mod snapshot_store;

#[cfg(any(feature = "sqlite", feature = "postgres"))]
pub mod schema;
#[cfg(any(feature = "sqlite", feature = "postgres"))]
pub mod sql;

pub use event_store::EventStore;
pub use handle::{ConnectionState, Store};
pub use memory::{MemoryEventStore, MemorySequenceStore, MemorySnapshotStore};
pub use sequence_store::{SequenceStore, EVENTS_COUNTER};
pub use snapshot_store::SnapshotStore;

#[cfg(feature = "postgres")]
pub use sql::postgres::{PostgresEventStore, PostgresSequenceStore, PostgresSnapshotStore};
#[cfg(feature = "sqlite")]
pub use sql::sqlite::{SqliteEventStore, SqliteSequenceStore, SqliteSnapshotStore};

/// Storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Connection to {address} failed: {message}")]
    Connection { address: String, message: String },

    #[cfg(any(feature = "sqlite", feature = "postgres"))]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Invalid namespace '{0}': only ASCII letters, digits and '_' are allowed")]
    InvalidNamespace(String),

    #[error("Sequence counter not found: {0}")]
    CounterMissing(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Storage backend not enabled: {0}")]
    UnsupportedBackend(String),

    #[error("Store is closed")]
    Closed,
}

impl StorageError {
    /// True when the error is a unique-index violation.
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, StorageError::DuplicateKey(_))
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// A persisted event.
///
/// `event_number` is 1-based and gap-free within a stream; `position` is the
/// global sequence value stamped at insert time.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub id: EventId,
    pub aggregate_id: AggregateId,
    pub event_number: u64,
    pub name: String,
    pub data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    pub position: u64,
}

/// Cached materialized state of a stream.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotRecord {
    pub aggregate_id: AggregateId,
    /// Id of the newest event folded into `state`.
    pub last_event_id: EventId,
    pub state: serde_json::Value,
}

/// Validate a namespace before it is interpolated into collection names.
pub fn validate_namespace(namespace: &str) -> Result<()> {
    let valid = !namespace.is_empty()
        && namespace
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidNamespace(namespace.to_string()))
    }
}
