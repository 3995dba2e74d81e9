//! SnapshotStore trait definition.

use async_trait::async_trait;

use super::{Result, SnapshotRecord};
use crate::identifiers::AggregateId;

/// Interface for snapshot persistence.
///
/// Snapshots are an optional optimization to avoid replaying an entire
/// stream. At most one snapshot exists per aggregate; `put` upserts it.
/// A missing or stale snapshot never changes rehydrated state.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Retrieve the snapshot for an aggregate, if one exists.
    async fn get(&self, aggregate_id: &AggregateId) -> Result<Option<SnapshotRecord>>;

    /// Insert or replace the snapshot for `snapshot.aggregate_id`.
    async fn put(&self, snapshot: SnapshotRecord) -> Result<()>;

    /// Delete the snapshot for an aggregate.
    async fn delete(&self, aggregate_id: &AggregateId) -> Result<()>;

    /// Release the underlying connection. Later calls fail.
    async fn close(&self);
}
