//! Aggregate rehydration: latest snapshot plus the events after it.

use std::sync::Arc;

use tracing::{debug, warn};

use super::{RepositoryError, Result};
use crate::aggregate::{Aggregate, AggregateRoot, EventRegistry};
use crate::identifiers::{AggregateId, EventId};
use crate::storage::{EventStore, SnapshotRecord, SnapshotStore};

/// Rebuilds aggregates from storage.
///
/// With a snapshot, only events numbered after the snapshot's boundary
/// event are folded; the boundary event itself is already part of the
/// snapshot state. A snapshot that cannot be used (boundary event missing,
/// state no longer deserializes) is ignored in favour of a full replay.
pub struct AggregateRehydrator<A: Aggregate> {
    events: Arc<dyn EventStore>,
    snapshots: Arc<dyn SnapshotStore>,
    registry: Arc<EventRegistry<A::Event>>,
    /// When false, snapshots are not loaded; all events are replayed from the beginning.
    snapshot_read_enabled: bool,
}

impl<A: Aggregate> Clone for AggregateRehydrator<A> {
    fn clone(&self) -> Self {
        Self {
            events: self.events.clone(),
            snapshots: self.snapshots.clone(),
            registry: self.registry.clone(),
            snapshot_read_enabled: self.snapshot_read_enabled,
        }
    }
}

/// Where a replay starts.
struct Seed<A> {
    state: A,
    last_event_id: Option<EventId>,
    from_event_number: u64,
}

impl<A: Aggregate> Seed<A> {
    fn empty() -> Self {
        Self {
            state: A::default(),
            last_event_id: None,
            from_event_number: 1,
        }
    }
}

impl<A: Aggregate> AggregateRehydrator<A> {
    pub fn new(
        events: Arc<dyn EventStore>,
        snapshots: Arc<dyn SnapshotStore>,
        registry: Arc<EventRegistry<A::Event>>,
        snapshot_read_enabled: bool,
    ) -> Self {
        Self {
            events,
            snapshots,
            registry,
            snapshot_read_enabled,
        }
    }

    /// Load an aggregate.
    ///
    /// Fails with `NotFound` when the stream has no events.
    pub async fn load(&self, aggregate_id: &AggregateId) -> Result<AggregateRoot<A>> {
        let snapshot = if self.snapshot_read_enabled {
            self.snapshots.get(aggregate_id).await?
        } else {
            None
        };

        let seed = match snapshot {
            Some(snapshot) => self.seed_from_snapshot(aggregate_id, snapshot).await?,
            None => Seed::empty(),
        };

        let Seed {
            mut state,
            mut last_event_id,
            from_event_number,
        } = seed;

        let tail = self
            .events
            .load_stream(aggregate_id, from_event_number)
            .await?;
        debug!(
            aggregate_id = %aggregate_id,
            from_event_number,
            tail_len = tail.len(),
            "Replaying events"
        );

        for record in tail {
            let event = self.registry.decode(&record.name, record.data)?;
            state.apply(&event);
            last_event_id = Some(record.id);
        }

        match last_event_id {
            Some(last_event_id) => Ok(AggregateRoot::rehydrated(
                aggregate_id.clone(),
                state,
                last_event_id,
            )),
            None => Err(RepositoryError::NotFound(aggregate_id.clone())),
        }
    }

    async fn seed_from_snapshot(
        &self,
        aggregate_id: &AggregateId,
        snapshot: SnapshotRecord,
    ) -> Result<Seed<A>> {
        let boundary = self.events.get_event(&snapshot.last_event_id).await?;
        let boundary = match boundary {
            Some(event) if event.aggregate_id == *aggregate_id => event,
            _ => {
                warn!(
                    aggregate_id = %aggregate_id,
                    last_event_id = %snapshot.last_event_id,
                    "Snapshot boundary event not found, replaying full stream"
                );
                return Ok(Seed::empty());
            }
        };

        match serde_json::from_value::<A>(snapshot.state) {
            Ok(state) => Ok(Seed {
                state,
                last_event_id: Some(boundary.id),
                from_event_number: boundary.event_number + 1,
            }),
            Err(e) => {
                warn!(
                    aggregate_id = %aggregate_id,
                    error = %e,
                    "Snapshot state does not deserialize, replaying full stream"
                );
                Ok(Seed::empty())
            }
        }
    }
}
