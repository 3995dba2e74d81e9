//! Aggregate repository.
//!
//! Combines the event, snapshot and sequence stores to provide the three
//! operations command handlers use: `save`, `find_by_id` and
//! `generate_unique_id`.

mod appender;
mod error;
mod id_generator;
mod rehydrator;
mod sequencer;
mod snapshot;

use std::sync::Arc;

pub use appender::StreamAppender;
pub use error::{RepositoryError, Result, SnapshotBuildError};
pub use id_generator::IdGenerator;
pub use rehydrator::AggregateRehydrator;
pub use sequencer::GlobalSequencer;
pub use snapshot::SnapshotManager;

use crate::aggregate::{Aggregate, AggregateRoot, EventRegistry};
use crate::config::{Config, IdConfig, SnapshotConfig};
use crate::identifiers::AggregateId;
use crate::storage::Store;

/// Behaviour knobs for a [`Repository`].
#[derive(Debug, Clone, Default)]
pub struct RepositoryOptions {
    pub snapshots: SnapshotConfig,
    pub ids: IdConfig,
}

impl From<&Config> for RepositoryOptions {
    fn from(config: &Config) -> Self {
        Self {
            snapshots: config.snapshots.clone(),
            ids: config.ids.clone(),
        }
    }
}

/// Repository for one aggregate type.
pub struct Repository<A: Aggregate> {
    appender: StreamAppender<A>,
    rehydrator: AggregateRehydrator<A>,
    snapshots: SnapshotManager<A>,
    ids: IdGenerator,
}

impl<A: Aggregate> Repository<A> {
    pub fn new(store: &Store, registry: EventRegistry<A::Event>, options: RepositoryOptions) -> Self {
        let registry = Arc::new(registry);
        let rehydrator = AggregateRehydrator::new(
            store.events().clone(),
            store.snapshots().clone(),
            registry,
            options.snapshots.read,
        );
        let snapshots = SnapshotManager::new(rehydrator.clone(), store.snapshots().clone());
        let appender = StreamAppender::new(
            store.events().clone(),
            GlobalSequencer::new(store.sequences().clone()),
            options.snapshots.write.then(|| snapshots.clone()),
            options.snapshots.interval,
        );
        let ids = IdGenerator::new(
            store.events().clone(),
            options.ids.strategy,
            options.ids.max_attempts,
        );

        Self {
            appender,
            rehydrator,
            snapshots,
            ids,
        }
    }

    /// Persist the aggregate's pending events.
    ///
    /// Returns the aggregate with no pending events and its watermark on
    /// the newest appended event. Fails with `ConcurrencyConflict` when the
    /// stream changed since the aggregate was loaded.
    #[tracing::instrument(
        name = "repository.save",
        skip_all,
        fields(aggregate_id = %aggregate.id(), pending = aggregate.pending_events().len())
    )]
    pub async fn save(&self, aggregate: AggregateRoot<A>) -> Result<AggregateRoot<A>> {
        self.appender.append(aggregate).await
    }

    /// Rehydrate an aggregate from its snapshot and events.
    #[tracing::instrument(name = "repository.find_by_id", skip_all, fields(%aggregate_id))]
    pub async fn find_by_id(&self, aggregate_id: &AggregateId) -> Result<AggregateRoot<A>> {
        self.rehydrator.load(aggregate_id).await
    }

    /// An aggregate id not used by any existing stream.
    #[tracing::instrument(name = "repository.generate_unique_id", skip_all)]
    pub async fn generate_unique_id(&self) -> Result<AggregateId> {
        self.ids.generate().await
    }

    /// Build and store a snapshot now, regardless of the interval.
    pub async fn build_snapshot(
        &self,
        aggregate_id: &AggregateId,
    ) -> std::result::Result<bool, SnapshotBuildError> {
        self.snapshots.build_snapshot(aggregate_id).await
    }
}
