//! Unique aggregate id generation.

use std::sync::Arc;

use tracing::debug;

use super::{RepositoryError, Result};
use crate::identifiers::{AggregateId, IdStrategy};
use crate::storage::EventStore;

type CandidateSource = Arc<dyn Fn() -> AggregateId + Send + Sync>;

/// Produces aggregate ids no existing stream uses.
///
/// Each candidate is checked against the events collection; a taken id is
/// discarded and a new one drawn, up to `max_attempts` candidates.
#[derive(Clone)]
pub struct IdGenerator {
    events: Arc<dyn EventStore>,
    source: CandidateSource,
    max_attempts: u32,
}

impl IdGenerator {
    pub fn new(events: Arc<dyn EventStore>, strategy: IdStrategy, max_attempts: u32) -> Self {
        Self::with_source(events, move || strategy.generate(), max_attempts)
    }

    /// Draw candidates from `source` instead of an [`IdStrategy`].
    pub fn with_source<F>(events: Arc<dyn EventStore>, source: F, max_attempts: u32) -> Self
    where
        F: Fn() -> AggregateId + Send + Sync + 'static,
    {
        Self {
            events,
            source: Arc::new(source),
            max_attempts,
        }
    }

    pub async fn generate(&self) -> Result<AggregateId> {
        for attempt in 1..=self.max_attempts {
            let candidate = (self.source)();
            if !self.events.stream_exists(&candidate).await? {
                return Ok(candidate);
            }
            debug!(candidate = %candidate, attempt, "Aggregate id already in use, retrying");
        }

        Err(RepositoryError::IdGenerationExhausted {
            attempts: self.max_attempts,
        })
    }
}
