//! eventvault - event-sourced aggregate store.
//!
//! An append-only, per-aggregate event log with optimistic concurrency
//! control, interval-triggered background snapshots, and deterministic
//! rehydration. Command handlers interact with it through
//! [`repository::Repository`]: `save`, `find_by_id` and `generate_unique_id`.

pub mod aggregate;
pub mod config;
pub mod identifiers;
pub mod repository;
pub mod storage;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use aggregate::{Aggregate, AggregateRoot, DomainEvent, EventRegistry};
pub use identifiers::{AggregateId, EventId, IdStrategy};
pub use repository::{Repository, RepositoryError};
pub use storage::{Store, StorageError};
