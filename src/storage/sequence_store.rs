//! SequenceStore trait definition.

use async_trait::async_trait;

use super::Result;

/// Name of the counter that stamps event positions.
pub const EVENTS_COUNTER: &str = "events";

/// Interface for named, atomically incremented counters.
#[async_trait]
pub trait SequenceStore: Send + Sync {
    /// Create counter `name` at zero.
    ///
    /// Fails with `StorageError::DuplicateKey` when the counter already
    /// exists; callers that seed at startup treat that as success.
    async fn seed(&self, name: &str) -> Result<()>;

    /// Atomically increment counter `name` and return the new value.
    ///
    /// Must be a single atomic operation in the backend. Fails with
    /// `StorageError::CounterMissing` if the counter was never seeded.
    async fn next(&self, name: &str) -> Result<u64>;

    /// Current value of counter `name` without incrementing it.
    async fn current(&self, name: &str) -> Result<Option<u64>>;

    /// Release the underlying connection. Later calls fail.
    async fn close(&self);
}
