//! Stream appender: the save pipeline.

use std::sync::Arc;

use tracing::{debug, warn};

use super::{GlobalSequencer, RepositoryError, Result, SnapshotManager};
use crate::aggregate::{Aggregate, AggregateRoot, DomainEvent};
use crate::storage::{EventRecord, EventStore, StorageError};

/// Appends an aggregate's pending events to its stream.
///
/// The check-then-insert is optimistic: no lock is held between reading the
/// stream head and inserting. The `(aggregate_id, event_number)` unique
/// index settles races; the losing batch is rolled back whole.
pub struct StreamAppender<A: Aggregate> {
    events: Arc<dyn EventStore>,
    sequencer: GlobalSequencer,
    snapshots: Option<SnapshotManager<A>>,
    snapshot_interval: u64,
}

impl<A: Aggregate> StreamAppender<A> {
    /// `snapshots` is `None` when snapshot writes are disabled.
    pub fn new(
        events: Arc<dyn EventStore>,
        sequencer: GlobalSequencer,
        snapshots: Option<SnapshotManager<A>>,
        snapshot_interval: u64,
    ) -> Self {
        Self {
            events,
            sequencer,
            snapshots,
            snapshot_interval,
        }
    }

    pub async fn append(&self, aggregate: AggregateRoot<A>) -> Result<AggregateRoot<A>> {
        let aggregate_id = aggregate.id().clone();
        let expected = aggregate.last_persisted_event_id();

        let latest = self.events.latest_event(&aggregate_id).await?;
        if let Some(latest) = &latest {
            if Some(&latest.id) != expected {
                warn!(
                    aggregate_id = %aggregate_id,
                    expected = ?expected.map(|id| id.as_str()),
                    actual = %latest.id,
                    "Stale aggregate: stream has moved on"
                );
                return Err(RepositoryError::ConcurrencyConflict {
                    aggregate_id,
                    expected: expected.cloned(),
                });
            }
        }

        if !aggregate.has_pending_events() {
            return Ok(aggregate);
        }

        let base = latest.map(|e| e.event_number).unwrap_or(0);
        let mut records = Vec::with_capacity(aggregate.pending_events().len());
        for (offset, pending) in aggregate.pending_events().iter().enumerate() {
            records.push(EventRecord {
                id: pending.id.clone(),
                aggregate_id: aggregate_id.clone(),
                event_number: base + offset as u64 + 1,
                name: pending.event.name().to_string(),
                data: pending.event.data().map_err(StorageError::from)?,
                timestamp: pending.timestamp,
                position: self.sequencer.next().await?,
            });
        }

        let numbers: Vec<u64> = records.iter().map(|r| r.event_number).collect();
        let first_position = records.first().map(|r| r.position);

        match self.events.insert_events(records).await {
            Ok(()) => {}
            Err(e) if e.is_duplicate_key() => {
                warn!(
                    aggregate_id = %aggregate_id,
                    error = %e,
                    "Lost append race on unique index"
                );
                return Err(RepositoryError::ConcurrencyConflict {
                    aggregate_id,
                    expected: aggregate.last_persisted_event_id().cloned(),
                });
            }
            Err(e) => return Err(e.into()),
        }

        debug!(
            aggregate_id = %aggregate_id,
            first_event_number = base + 1,
            count = numbers.len(),
            first_position,
            "Appended events"
        );

        if let Some(snapshots) = &self.snapshots {
            if self.crosses_interval(&numbers) {
                snapshots.trigger(aggregate_id);
            }
        }

        Ok(aggregate.mark_persisted())
    }

    fn crosses_interval(&self, numbers: &[u64]) -> bool {
        self.snapshot_interval > 0 && numbers.iter().any(|n| n % self.snapshot_interval == 0)
    }
}
