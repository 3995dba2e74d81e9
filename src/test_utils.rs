//! Test utilities: sample aggregates and in-memory store wiring.
//!
//! Two aggregates are provided. `Idea` is a small realistic domain object.
//! `Tally` has a fold that is not idempotent, so applying any event twice
//! shows up in its state.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::aggregate::{Aggregate, DomainEvent, EventRegistry};
use crate::config::{StorageConfig, StorageType};
use crate::identifiers::AggregateId;
use crate::storage::{
    MemoryEventStore, MemorySequenceStore, MemorySnapshotStore, SnapshotRecord, Store,
};

// ============================================================================
// Idea
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Idea {
    pub title: String,
    pub description: String,
    pub published_by: Option<String>,
    pub revisions: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdeaCreated {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdeaRenamed {
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdeaPublished {
    pub by: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IdeaEvent {
    Created(IdeaCreated),
    Renamed(IdeaRenamed),
    Published(IdeaPublished),
}

impl IdeaEvent {
    pub fn created(title: &str, description: &str) -> Self {
        IdeaEvent::Created(IdeaCreated {
            title: title.to_string(),
            description: description.to_string(),
        })
    }

    pub fn renamed(title: &str) -> Self {
        IdeaEvent::Renamed(IdeaRenamed {
            title: title.to_string(),
        })
    }

    pub fn published(by: &str) -> Self {
        IdeaEvent::Published(IdeaPublished { by: by.to_string() })
    }
}

impl DomainEvent for IdeaEvent {
    fn name(&self) -> &'static str {
        match self {
            IdeaEvent::Created(_) => "idea.created",
            IdeaEvent::Renamed(_) => "idea.renamed",
            IdeaEvent::Published(_) => "idea.published",
        }
    }

    fn data(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            IdeaEvent::Created(p) => serde_json::to_value(p),
            IdeaEvent::Renamed(p) => serde_json::to_value(p),
            IdeaEvent::Published(p) => serde_json::to_value(p),
        }
    }
}

impl Aggregate for Idea {
    type Event = IdeaEvent;

    fn apply(&mut self, event: &IdeaEvent) {
        match event {
            IdeaEvent::Created(p) => {
                self.title = p.title.clone();
                self.description = p.description.clone();
            }
            IdeaEvent::Renamed(p) => self.title = p.title.clone(),
            IdeaEvent::Published(p) => self.published_by = Some(p.by.clone()),
        }
        self.revisions += 1;
    }
}

pub fn idea_registry() -> EventRegistry<IdeaEvent> {
    let mut registry = EventRegistry::new();
    registry
        .register_payload("idea.created", IdeaEvent::Created)
        .register_payload("idea.renamed", IdeaEvent::Renamed)
        .register_payload("idea.published", IdeaEvent::Published);
    registry
}

// ============================================================================
// Tally
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tally {
    pub total: i64,
    /// Number of events folded in; a double-applied event makes this
    /// exceed the stream length.
    pub applied: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Added {
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TallyEvent {
    Added(Added),
}

impl TallyEvent {
    pub fn added(amount: i64) -> Self {
        TallyEvent::Added(Added { amount })
    }
}

impl DomainEvent for TallyEvent {
    fn name(&self) -> &'static str {
        match self {
            TallyEvent::Added(_) => "tally.added",
        }
    }

    fn data(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            TallyEvent::Added(p) => serde_json::to_value(p),
        }
    }
}

impl Aggregate for Tally {
    type Event = TallyEvent;

    fn apply(&mut self, event: &TallyEvent) {
        match event {
            TallyEvent::Added(p) => self.total += p.amount,
        }
        self.applied += 1;
    }
}

pub fn tally_registry() -> EventRegistry<TallyEvent> {
    let mut registry = EventRegistry::new();
    registry.register_payload("tally.added", TallyEvent::Added);
    registry
}

// ============================================================================
// Store wiring
// ============================================================================

/// Concrete in-memory backends, kept alongside the store so tests can flip
/// their failure toggles.
pub struct MemoryBackends {
    pub events: Arc<MemoryEventStore>,
    pub snapshots: Arc<MemorySnapshotStore>,
    pub sequences: Arc<MemorySequenceStore>,
}

/// An initialized in-memory store without a health monitor.
pub async fn memory_store() -> (Store, MemoryBackends) {
    let backends = MemoryBackends {
        events: Arc::new(MemoryEventStore::new()),
        snapshots: Arc::new(MemorySnapshotStore::new()),
        sequences: Arc::new(MemorySequenceStore::new()),
    };
    let store = Store::with_backends(
        &StorageConfig::memory("test"),
        backends.events.clone(),
        backends.snapshots.clone(),
        backends.sequences.clone(),
    )
    .await
    .expect("memory store initializes");
    (store, backends)
}

/// SQLite storage config for a database file at `path`.
pub fn sqlite_config(path: &Path, namespace: &str) -> StorageConfig {
    StorageConfig {
        storage_type: StorageType::Sqlite,
        address: format!("sqlite://{}", path.display()),
        namespace: namespace.to_string(),
        health_check_interval_secs: 0,
        ..StorageConfig::default()
    }
}

/// Poll until a snapshot for `aggregate_id` satisfies `ready`, or `timeout`
/// elapses.
pub async fn wait_for_snapshot<F>(
    store: &Store,
    aggregate_id: &AggregateId,
    timeout: Duration,
    ready: F,
) -> Option<SnapshotRecord>
where
    F: Fn(&SnapshotRecord) -> bool,
{
    let poll = async {
        loop {
            if let Ok(Some(snapshot)) = store.snapshots().get(aggregate_id).await {
                if ready(&snapshot) {
                    return snapshot;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };
    tokio::time::timeout(timeout, poll).await.ok()
}
