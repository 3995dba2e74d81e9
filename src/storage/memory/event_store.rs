//! In-memory EventStore implementation.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::identifiers::{AggregateId, EventId};
use crate::storage::{EventRecord, EventStore, Result, StorageError};

#[derive(Default)]
struct Inner {
    /// Events in insertion order.
    events: Vec<EventRecord>,
    /// Per-stream index: event_number -> offset into `events`.
    streams: HashMap<AggregateId, BTreeMap<u64, usize>>,
    ids: HashMap<EventId, usize>,
    positions: HashSet<u64>,
    closed: bool,
}

/// Event store that keeps events in memory.
#[derive(Default)]
pub struct MemoryEventStore {
    inner: RwLock<Inner>,
    fail_on_insert: RwLock<bool>,
    fail_on_read: RwLock<bool>,
    disconnected: RwLock<bool>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_insert(&self, fail: bool) {
        *self.fail_on_insert.write().await = fail;
    }

    pub async fn set_fail_on_read(&self, fail: bool) {
        *self.fail_on_read.write().await = fail;
    }

    /// Make `ping` fail, as if the backend went away.
    pub async fn set_disconnected(&self, disconnected: bool) {
        *self.disconnected.write().await = disconnected;
    }

    /// Number of stored events across all streams.
    pub async fn len(&self) -> usize {
        self.inner.read().await.events.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn check_read(&self) -> Result<()> {
        if self.inner.read().await.closed {
            return Err(StorageError::Closed);
        }
        if *self.fail_on_read.read().await {
            return Err(StorageError::Connection {
                address: "memory".to_string(),
                message: "injected read failure".to_string(),
            });
        }
        Ok(())
    }
}

/// Reject a batch that would violate any unique constraint.
fn check_constraints(inner: &Inner, events: &[EventRecord]) -> Result<()> {
    let mut batch_keys = HashSet::new();
    let mut batch_positions = HashSet::new();
    let mut batch_ids = HashSet::new();

    for event in events {
        let number_taken = inner
            .streams
            .get(&event.aggregate_id)
            .is_some_and(|stream| stream.contains_key(&event.event_number));
        if number_taken || !batch_keys.insert((&event.aggregate_id, event.event_number)) {
            return Err(StorageError::DuplicateKey(format!(
                "aggregate_id={}, event_number={}",
                event.aggregate_id, event.event_number
            )));
        }
        if inner.positions.contains(&event.position) || !batch_positions.insert(event.position) {
            return Err(StorageError::DuplicateKey(format!("position={}", event.position)));
        }
        if inner.ids.contains_key(&event.id) || !batch_ids.insert(&event.id) {
            return Err(StorageError::DuplicateKey(format!("id={}", event.id)));
        }
    }

    Ok(())
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn latest_event(&self, aggregate_id: &AggregateId) -> Result<Option<EventRecord>> {
        self.check_read().await?;
        let inner = self.inner.read().await;
        Ok(inner
            .streams
            .get(aggregate_id)
            .and_then(|stream| stream.values().next_back())
            .map(|&offset| inner.events[offset].clone()))
    }

    async fn insert_events(&self, events: Vec<EventRecord>) -> Result<()> {
        if *self.fail_on_insert.read().await {
            return Err(StorageError::Connection {
                address: "memory".to_string(),
                message: "injected insert failure".to_string(),
            });
        }

        let mut inner = self.inner.write().await;
        if inner.closed {
            return Err(StorageError::Closed);
        }
        check_constraints(&inner, &events)?;

        for event in events {
            let offset = inner.events.len();
            inner
                .streams
                .entry(event.aggregate_id.clone())
                .or_default()
                .insert(event.event_number, offset);
            inner.ids.insert(event.id.clone(), offset);
            inner.positions.insert(event.position);
            inner.events.push(event);
        }

        Ok(())
    }

    async fn get_event(&self, id: &EventId) -> Result<Option<EventRecord>> {
        self.check_read().await?;
        let inner = self.inner.read().await;
        Ok(inner.ids.get(id).map(|&offset| inner.events[offset].clone()))
    }

    async fn load_stream(&self, aggregate_id: &AggregateId, from: u64) -> Result<Vec<EventRecord>> {
        self.check_read().await?;
        let inner = self.inner.read().await;
        Ok(inner
            .streams
            .get(aggregate_id)
            .map(|stream| {
                stream
                    .range(from..)
                    .map(|(_, &offset)| inner.events[offset].clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn stream_exists(&self, aggregate_id: &AggregateId) -> Result<bool> {
        self.check_read().await?;
        Ok(self.inner.read().await.streams.contains_key(aggregate_id))
    }

    async fn load_all_from(&self, from: u64, limit: usize) -> Result<Vec<EventRecord>> {
        self.check_read().await?;
        let inner = self.inner.read().await;
        let mut events: Vec<EventRecord> = inner
            .events
            .iter()
            .filter(|e| e.position >= from)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.position);
        events.truncate(limit);
        Ok(events)
    }

    async fn ping(&self) -> Result<()> {
        if self.inner.read().await.closed {
            return Err(StorageError::Closed);
        }
        if *self.disconnected.read().await {
            return Err(StorageError::Connection {
                address: "memory".to_string(),
                message: "disconnected".to_string(),
            });
        }
        Ok(())
    }

    async fn close(&self) {
        self.inner.write().await.closed = true;
    }
}
