//! In-memory storage implementations.
//!
//! Enforce the same unique constraints as the SQL backends so the repository
//! pipeline behaves identically on top of them. Failure toggles let tests
//! inject backend errors.

mod event_store;
mod sequence_store;
mod snapshot_store;

pub use event_store::MemoryEventStore;
pub use sequence_store::MemorySequenceStore;
pub use snapshot_store::MemorySnapshotStore;
