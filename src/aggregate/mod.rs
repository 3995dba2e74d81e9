//! Aggregates: the in-memory side of an event stream.
//!
//! An [`Aggregate`] is plain state plus one fold function over its event
//! enum. [`AggregateRoot`] wraps that state with the bookkeeping the
//! repository needs: the events recorded since the last save and the id of
//! the newest persisted event, which is the watermark for the optimistic
//! concurrency check.

mod registry;

pub use registry::{DecodeError, EventRegistry};

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::identifiers::{AggregateId, EventId};

/// A domain event: a tagged union whose variants are the event kinds of one
/// aggregate type.
pub trait DomainEvent: fmt::Debug + Clone + Send + Sync + 'static {
    /// The name this variant is persisted under.
    ///
    /// Must match the name it is registered with in the [`EventRegistry`].
    fn name(&self) -> &'static str;

    /// The variant's payload as stored in the event's `data` field.
    fn data(&self) -> Result<serde_json::Value, serde_json::Error>;
}

/// Aggregate state folded from events.
///
/// `Default` is the zero state a stream starts from. The serde bounds are
/// used to persist and restore snapshots.
pub trait Aggregate:
    fmt::Debug + Default + Clone + Serialize + DeserializeOwned + Send + Sync + 'static
{
    type Event: DomainEvent;

    /// Fold one event into the state.
    ///
    /// Must be deterministic: replaying the same events from the same state
    /// always yields the same result.
    fn apply(&mut self, event: &Self::Event);
}

/// An event recorded on an aggregate but not yet persisted.
#[derive(Debug, Clone)]
pub struct PendingEvent<E> {
    pub id: EventId,
    pub event: E,
    pub timestamp: DateTime<Utc>,
}

/// An aggregate instance owned by a single command handler.
#[derive(Debug, Clone)]
pub struct AggregateRoot<A: Aggregate> {
    id: AggregateId,
    state: A,
    persisted_state: A,
    pending: Vec<PendingEvent<A::Event>>,
    last_persisted_event_id: Option<EventId>,
}

impl<A: Aggregate> AggregateRoot<A> {
    /// A brand-new aggregate with no history.
    pub fn new(id: AggregateId) -> Self {
        Self {
            id,
            state: A::default(),
            persisted_state: A::default(),
            pending: Vec::new(),
            last_persisted_event_id: None,
        }
    }

    /// An aggregate restored from storage.
    pub(crate) fn rehydrated(id: AggregateId, state: A, last_event_id: EventId) -> Self {
        Self {
            id,
            persisted_state: state.clone(),
            state,
            pending: Vec::new(),
            last_persisted_event_id: Some(last_event_id),
        }
    }

    pub fn id(&self) -> &AggregateId {
        &self.id
    }

    /// State including pending events.
    pub fn state(&self) -> &A {
        &self.state
    }

    /// State as of the last persisted event.
    pub fn persisted_state(&self) -> &A {
        &self.persisted_state
    }

    pub fn pending_events(&self) -> &[PendingEvent<A::Event>] {
        &self.pending
    }

    pub fn has_pending_events(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn last_persisted_event_id(&self) -> Option<&EventId> {
        self.last_persisted_event_id.as_ref()
    }

    /// Apply `event` to the current state and queue it for the next save.
    pub fn record(&mut self, event: A::Event) -> &EventId {
        self.state.apply(&event);
        self.pending.push(PendingEvent {
            id: EventId::generate(),
            event,
            timestamp: Utc::now(),
        });
        // Just pushed.
        &self.pending[self.pending.len() - 1].id
    }

    /// Pending events are now durable: promote the current state and move
    /// the watermark to the newest of them.
    pub(crate) fn mark_persisted(mut self) -> Self {
        if let Some(last) = self.pending.last() {
            self.last_persisted_event_id = Some(last.id.clone());
        }
        self.pending.clear();
        self.persisted_state = self.state.clone();
        self
    }
}
