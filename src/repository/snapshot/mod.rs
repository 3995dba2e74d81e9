//! Snapshot manager.
//!
//! Builds and upserts aggregate state snapshots. Snapshots are an
//! optimization to avoid replaying entire event history; losing one, or
//! failing to write one, never changes rehydrated state.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{AggregateRehydrator, RepositoryError, SnapshotBuildError};
use crate::aggregate::Aggregate;
use crate::identifiers::AggregateId;
use crate::storage::{SnapshotRecord, SnapshotStore};

pub struct SnapshotManager<A: Aggregate> {
    rehydrator: AggregateRehydrator<A>,
    store: Arc<dyn SnapshotStore>,
}

impl<A: Aggregate> Clone for SnapshotManager<A> {
    fn clone(&self) -> Self {
        Self {
            rehydrator: self.rehydrator.clone(),
            store: self.store.clone(),
        }
    }
}

impl<A: Aggregate> SnapshotManager<A> {
    pub fn new(rehydrator: AggregateRehydrator<A>, store: Arc<dyn SnapshotStore>) -> Self {
        Self { rehydrator, store }
    }

    /// Rehydrate `aggregate_id` and upsert its state as the snapshot.
    ///
    /// Returns `false` without writing anything when the stream is empty.
    pub async fn build_snapshot(
        &self,
        aggregate_id: &AggregateId,
    ) -> Result<bool, SnapshotBuildError> {
        let aggregate = match self.rehydrator.load(aggregate_id).await {
            Ok(aggregate) => aggregate,
            Err(RepositoryError::NotFound(_)) => return Ok(false),
            Err(e) => return Err(e.into()),
        };

        // A rehydrated aggregate always carries the id of its newest event.
        let Some(last_event_id) = aggregate.last_persisted_event_id().cloned() else {
            return Ok(false);
        };

        let state = serde_json::to_value(aggregate.persisted_state())?;
        self.store
            .put(SnapshotRecord {
                aggregate_id: aggregate_id.clone(),
                last_event_id,
                state,
            })
            .await?;

        Ok(true)
    }

    /// Build a snapshot in the background.
    ///
    /// Failures are logged and dropped; the returned handle may be ignored.
    pub fn trigger(&self, aggregate_id: AggregateId) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            match manager.build_snapshot(&aggregate_id).await {
                Ok(true) => debug!(aggregate_id = %aggregate_id, "Snapshot stored"),
                Ok(false) => debug!(aggregate_id = %aggregate_id, "Snapshot skipped, empty stream"),
                Err(e) => warn!(
                    aggregate_id = %aggregate_id,
                    error = %e,
                    "Failed to build snapshot"
                ),
            }
        })
    }
}
