//! In-memory SnapshotStore implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::identifiers::AggregateId;
use crate::storage::{Result, SnapshotRecord, SnapshotStore, StorageError};

/// Snapshot store that keeps one snapshot per aggregate in memory.
#[derive(Default)]
pub struct MemorySnapshotStore {
    snapshots: RwLock<HashMap<AggregateId, SnapshotRecord>>,
    fail_on_put: RwLock<bool>,
    closed: RwLock<bool>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_put(&self, fail: bool) {
        *self.fail_on_put.write().await = fail;
    }

    pub async fn stored_count(&self) -> usize {
        self.snapshots.read().await.len()
    }

    async fn check_open(&self) -> Result<()> {
        if *self.closed.read().await {
            return Err(StorageError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn get(&self, aggregate_id: &AggregateId) -> Result<Option<SnapshotRecord>> {
        self.check_open().await?;
        Ok(self.snapshots.read().await.get(aggregate_id).cloned())
    }

    async fn put(&self, snapshot: SnapshotRecord) -> Result<()> {
        self.check_open().await?;
        if *self.fail_on_put.read().await {
            return Err(StorageError::Connection {
                address: "memory".to_string(),
                message: "injected snapshot failure".to_string(),
            });
        }
        self.snapshots
            .write()
            .await
            .insert(snapshot.aggregate_id.clone(), snapshot);
        Ok(())
    }

    async fn delete(&self, aggregate_id: &AggregateId) -> Result<()> {
        self.check_open().await?;
        self.snapshots.write().await.remove(aggregate_id);
        Ok(())
    }

    async fn close(&self) {
        *self.closed.write().await = true;
    }
}
