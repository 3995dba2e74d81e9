//! Store handle: connection lifecycle for the three storage collections.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use backon::Retryable;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{
    validate_namespace, EventStore, MemoryEventStore, MemorySequenceStore, MemorySnapshotStore,
    Result, SequenceStore, SnapshotStore, StorageError, EVENTS_COUNTER,
};
use crate::config::{StorageConfig, StorageType};
use crate::utils::retry::connection_backoff;

/// Liveness of the underlying connection, published on the disconnect
/// channel returned by [`Store::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    /// A health check failed. The store does not reconnect.
    Disconnected,
    /// `close` was called.
    Closed,
}

type Backends = (
    Arc<dyn EventStore>,
    Arc<dyn SnapshotStore>,
    Arc<dyn SequenceStore>,
);

/// Handle to an initialized store.
///
/// Cheap to clone; every clone shares one connection pool and one
/// disconnect channel.
#[derive(Clone)]
pub struct Store {
    inner: Arc<Inner>,
}

struct Inner {
    namespace: String,
    events: Arc<dyn EventStore>,
    snapshots: Arc<dyn SnapshotStore>,
    sequences: Arc<dyn SequenceStore>,
    state: Arc<watch::Sender<ConnectionState>>,
    monitor: Mutex<Option<JoinHandle<()>>>,
}

impl Store {
    /// Connect to the configured backend and prepare it for use.
    ///
    /// Retries the connection with exponential backoff, creates the
    /// namespaced tables and indexes, and seeds the events counter.
    pub async fn initialize(config: &StorageConfig) -> Result<Self> {
        validate_namespace(&config.namespace)?;

        let (events, snapshots, sequences) = match config.storage_type {
            StorageType::Memory => (
                Arc::new(MemoryEventStore::new()) as Arc<dyn EventStore>,
                Arc::new(MemorySnapshotStore::new()) as Arc<dyn SnapshotStore>,
                Arc::new(MemorySequenceStore::new()) as Arc<dyn SequenceStore>,
            ),
            StorageType::Sqlite => open_sqlite(config).await?,
            StorageType::Postgres => open_postgres(config).await?,
        };

        Self::with_backends(config, events, snapshots, sequences).await
    }

    /// Assemble a store from already-connected backends.
    ///
    /// Seeds the events counter (an existing counter is kept) and starts
    /// the health monitor when `health_check_interval_secs` is non-zero.
    pub async fn with_backends(
        config: &StorageConfig,
        events: Arc<dyn EventStore>,
        snapshots: Arc<dyn SnapshotStore>,
        sequences: Arc<dyn SequenceStore>,
    ) -> Result<Self> {
        validate_namespace(&config.namespace)?;

        match sequences.seed(EVENTS_COUNTER).await {
            Ok(()) => info!(namespace = %config.namespace, "Seeded events counter"),
            Err(e) if e.is_duplicate_key() => {
                debug!(namespace = %config.namespace, "Events counter already seeded")
            }
            Err(e) => return Err(e),
        }

        let (state, _) = watch::channel(ConnectionState::Connected);
        let state = Arc::new(state);

        let monitor = match config.health_check_interval_secs {
            0 => None,
            secs => Some(spawn_health_monitor(
                events.clone(),
                state.clone(),
                Duration::from_secs(secs),
            )),
        };

        info!(
            storage_type = ?config.storage_type,
            namespace = %config.namespace,
            "Store initialized"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                namespace: config.namespace.clone(),
                events,
                snapshots,
                sequences,
                state,
                monitor: Mutex::new(monitor),
            }),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.inner.namespace
    }

    pub fn events(&self) -> &Arc<dyn EventStore> {
        &self.inner.events
    }

    pub fn snapshots(&self) -> &Arc<dyn SnapshotStore> {
        &self.inner.snapshots
    }

    pub fn sequences(&self) -> &Arc<dyn SequenceStore> {
        &self.inner.sequences
    }

    /// Subscribe to connection state changes.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Stop the health monitor and release the connection.
    ///
    /// Subsequent operations on all three collections fail; subscribers
    /// observe `Closed`.
    pub async fn close(&self) {
        if let Some(monitor) = self.inner.monitor.lock().await.take() {
            monitor.abort();
        }
        self.inner.state.send_replace(ConnectionState::Closed);
        self.inner.events.close().await;
        self.inner.snapshots.close().await;
        self.inner.sequences.close().await;
        info!(namespace = %self.inner.namespace, "Store closed");
    }
}

fn spawn_health_monitor(
    events: Arc<dyn EventStore>,
    state: Arc<watch::Sender<ConnectionState>>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = events.ping().await {
                if *state.borrow() == ConnectionState::Closed {
                    return;
                }
                error!(error = %e, "Storage connection lost");
                state.send_replace(ConnectionState::Disconnected);
                return;
            }
        }
    })
}

/// Run `connect` under the configured startup backoff.
#[cfg_attr(not(any(feature = "sqlite", feature = "postgres")), allow(dead_code))]
async fn connect_with_retry<P, E, F, Fut>(config: &StorageConfig, connect: F) -> Result<P>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<P, E>>,
{
    let pool = connect
        .retry(connection_backoff(&config.connect_retry))
        .notify(|err: &E, dur: Duration| {
            warn!(
                address = %config.address,
                error = %err,
                "Storage connection failed, retrying in {:?}",
                dur
            );
        })
        .await
        .map_err(|e| StorageError::Connection {
            address: config.address.clone(),
            message: e.to_string(),
        })?;

    info!(address = %config.address, "Connected to storage");
    Ok(pool)
}

#[cfg(feature = "sqlite")]
async fn open_sqlite(config: &StorageConfig) -> Result<Backends> {
    use super::sql::sqlite;
    use super::{SqliteEventStore, SqliteSequenceStore, SqliteSnapshotStore};

    let pool = connect_with_retry(config, || {
        sqlite::connect(&config.address, config.max_connections)
    })
    .await?;

    let events = SqliteEventStore::new(pool.clone(), &config.namespace)?;
    events.init().await?;
    let snapshots = SqliteSnapshotStore::new(pool.clone(), &config.namespace)?;
    snapshots.init().await?;
    let sequences = SqliteSequenceStore::new(pool, &config.namespace)?;
    sequences.init().await?;

    Ok((Arc::new(events), Arc::new(snapshots), Arc::new(sequences)))
}

#[cfg(not(feature = "sqlite"))]
async fn open_sqlite(_config: &StorageConfig) -> Result<Backends> {
    Err(StorageError::UnsupportedBackend("sqlite".to_string()))
}

#[cfg(feature = "postgres")]
async fn open_postgres(config: &StorageConfig) -> Result<Backends> {
    use super::sql::postgres;
    use super::{PostgresEventStore, PostgresSequenceStore, PostgresSnapshotStore};

    let pool = connect_with_retry(config, || {
        postgres::connect(&config.address, config.max_connections)
    })
    .await?;

    let events = PostgresEventStore::new(pool.clone(), &config.namespace)?;
    events.init().await?;
    let snapshots = PostgresSnapshotStore::new(pool.clone(), &config.namespace)?;
    snapshots.init().await?;
    let sequences = PostgresSequenceStore::new(pool, &config.namespace)?;
    sequences.init().await?;

    Ok((Arc::new(events), Arc::new(snapshots), Arc::new(sequences)))
}

#[cfg(not(feature = "postgres"))]
async fn open_postgres(_config: &StorageConfig) -> Result<Backends> {
    Err(StorageError::UnsupportedBackend("postgres".to_string()))
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;

    struct BrokenSequences;

    #[async_trait]
    impl SequenceStore for BrokenSequences {
        async fn seed(&self, _name: &str) -> Result<()> {
            Err(StorageError::Closed)
        }

        async fn next(&self, _name: &str) -> Result<u64> {
            Err(StorageError::Closed)
        }

        async fn current(&self, _name: &str) -> Result<Option<u64>> {
            Err(StorageError::Closed)
        }

        async fn close(&self) {}
    }

    #[tokio::test]
    async fn test_initialize_memory_seeds_counter() {
        let store = Store::initialize(&StorageConfig::memory("ideas"))
            .await
            .unwrap();

        assert_eq!(store.namespace(), "ideas");
        assert_eq!(
            store.sequences().current(EVENTS_COUNTER).await.unwrap(),
            Some(0)
        );
        assert_eq!(store.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_reinitialize_keeps_existing_counter() {
        let config = StorageConfig::memory("ideas");
        let events: Arc<dyn EventStore> = Arc::new(MemoryEventStore::new());
        let snapshots: Arc<dyn SnapshotStore> = Arc::new(MemorySnapshotStore::new());
        let sequences: Arc<dyn SequenceStore> = Arc::new(MemorySequenceStore::new());

        let first = Store::with_backends(&config, events.clone(), snapshots.clone(), sequences.clone())
            .await
            .unwrap();
        first.sequences().next(EVENTS_COUNTER).await.unwrap();

        let second = Store::with_backends(&config, events, snapshots, sequences)
            .await
            .unwrap();

        assert_eq!(
            second.sequences().current(EVENTS_COUNTER).await.unwrap(),
            Some(1)
        );
    }

    #[tokio::test]
    async fn test_seed_failure_is_fatal() {
        let result = Store::with_backends(
            &StorageConfig::memory("ideas"),
            Arc::new(MemoryEventStore::new()),
            Arc::new(MemorySnapshotStore::new()),
            Arc::new(BrokenSequences),
        )
        .await;

        assert!(matches!(result, Err(StorageError::Closed)));
    }

    #[tokio::test]
    async fn test_initialize_rejects_invalid_namespace() {
        let result = Store::initialize(&StorageConfig::memory("bad name")).await;
        assert!(matches!(result, Err(StorageError::InvalidNamespace(_))));
    }

    #[tokio::test]
    async fn test_close_notifies_subscribers() {
        let store = Store::initialize(&StorageConfig::memory("ideas"))
            .await
            .unwrap();
        let mut rx = store.subscribe();

        store.close().await;

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), ConnectionState::Closed);
        assert!(matches!(
            store.events().ping().await,
            Err(StorageError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_close_rejects_every_collection() {
        let store = Store::initialize(&StorageConfig::memory("ideas"))
            .await
            .unwrap();

        store.close().await;

        assert!(matches!(
            store.snapshots().get(&"a".into()).await,
            Err(StorageError::Closed)
        ));
        assert!(matches!(
            store.sequences().next(EVENTS_COUNTER).await,
            Err(StorageError::Closed)
        ));
        assert!(matches!(
            store.sequences().current(EVENTS_COUNTER).await,
            Err(StorageError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_failed_health_check_publishes_disconnect() {
        let mut config = StorageConfig::memory("ideas");
        config.health_check_interval_secs = 1;
        let events = Arc::new(MemoryEventStore::new());
        let store = Store::with_backends(
            &config,
            events.clone(),
            Arc::new(MemorySnapshotStore::new()),
            Arc::new(MemorySequenceStore::new()),
        )
        .await
        .unwrap();
        let mut rx = store.subscribe();

        events.set_disconnected(true).await;

        tokio::time::timeout(Duration::from_secs(5), rx.changed())
            .await
            .expect("disconnect not observed")
            .unwrap();
        assert_eq!(store.state(), ConnectionState::Disconnected);
    }

    #[cfg(not(feature = "postgres"))]
    #[tokio::test]
    async fn test_disabled_backend_is_unsupported() {
        let config = StorageConfig {
            storage_type: StorageType::Postgres,
            ..StorageConfig::memory("ideas")
        };

        let result = Store::initialize(&config).await;

        assert!(matches!(result, Err(StorageError::UnsupportedBackend(_))));
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn test_unreachable_database_is_connection_error() {
        let config = StorageConfig {
            storage_type: StorageType::Sqlite,
            address: "sqlite:///nonexistent/dir/eventvault.db".to_string(),
            connect_retry: crate::config::ConnectRetryConfig {
                min_delay_ms: 1,
                max_delay_ms: 1,
                max_attempts: 1,
            },
            ..StorageConfig::memory("ideas")
        };

        let result = Store::initialize(&config).await;

        assert!(matches!(result, Err(StorageError::Connection { .. })));
    }
}
