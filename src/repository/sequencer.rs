//! Global sequencer: stamps each persisted event with a position.

use std::sync::Arc;

use crate::storage::{Result, SequenceStore, EVENTS_COUNTER};

/// Allocates global positions from a named counter.
///
/// Positions are unique and increasing across all streams but carry no
/// causal meaning and may have gaps (an allocated position whose insert
/// fails is never reused).
#[derive(Clone)]
pub struct GlobalSequencer {
    sequences: Arc<dyn SequenceStore>,
}

impl GlobalSequencer {
    pub fn new(sequences: Arc<dyn SequenceStore>) -> Self {
        Self { sequences }
    }

    /// Next value of the events counter.
    pub async fn next(&self) -> Result<u64> {
        self.next_sequence(EVENTS_COUNTER).await
    }

    /// Atomically increment counter `name` and return the new value.
    pub async fn next_sequence(&self, name: &str) -> Result<u64> {
        self.sequences.next(name).await
    }
}
