//! Repository error types.

use crate::aggregate::DecodeError;
use crate::identifiers::{AggregateId, EventId};
use crate::storage::StorageError;

/// Errors surfaced to callers of [`Repository`](super::Repository).
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// The stream moved past the caller's watermark, or a concurrent writer
    /// claimed the same event numbers first. Reload and retry.
    #[error("Concurrency conflict on {aggregate_id}: expected last event {expected:?}")]
    ConcurrencyConflict {
        aggregate_id: AggregateId,
        expected: Option<EventId>,
    },

    #[error("Aggregate not found: {0}")]
    NotFound(AggregateId),

    #[error("No unused aggregate id after {attempts} attempts")]
    IdGenerationExhausted { attempts: u32 },

    #[error("Unknown event type: {0}")]
    UnknownEvent(String),

    #[error("Failed to decode event {name}: {source}")]
    EventDecode {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl RepositoryError {
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, RepositoryError::ConcurrencyConflict { .. })
    }
}

impl From<DecodeError> for RepositoryError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::Unknown(name) => RepositoryError::UnknownEvent(name),
            DecodeError::Payload { name, source } => RepositoryError::EventDecode { name, source },
        }
    }
}

/// Why a background snapshot was not written. Logged, never returned from
/// `save`.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotBuildError {
    #[error("Failed to rehydrate: {0}")]
    Rehydrate(#[from] RepositoryError),

    #[error("Failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to store snapshot: {0}")]
    Storage(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, RepositoryError>;
