//! In-memory SequenceStore implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{Mutex, MutexGuard};

use crate::storage::{Result, SequenceStore, StorageError};

#[derive(Default)]
struct Counters {
    values: HashMap<String, u64>,
    closed: bool,
}

/// Named counters held behind a single mutex; each increment happens under
/// the lock, so it is atomic with respect to every other caller.
#[derive(Default)]
pub struct MemorySequenceStore {
    counters: Mutex<Counters>,
}

impl MemorySequenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn open(&self) -> Result<MutexGuard<'_, Counters>> {
        let counters = self.counters.lock().await;
        if counters.closed {
            return Err(StorageError::Closed);
        }
        Ok(counters)
    }
}

#[async_trait]
impl SequenceStore for MemorySequenceStore {
    async fn seed(&self, name: &str) -> Result<()> {
        let mut counters = self.open().await?;
        if counters.values.contains_key(name) {
            return Err(StorageError::DuplicateKey(format!("counter={name}")));
        }
        counters.values.insert(name.to_string(), 0);
        Ok(())
    }

    async fn next(&self, name: &str) -> Result<u64> {
        let mut counters = self.open().await?;
        let seq = counters
            .values
            .get_mut(name)
            .ok_or_else(|| StorageError::CounterMissing(name.to_string()))?;
        *seq += 1;
        Ok(*seq)
    }

    async fn current(&self, name: &str) -> Result<Option<u64>> {
        Ok(self.open().await?.values.get(name).copied())
    }

    async fn close(&self) {
        self.counters.lock().await.closed = true;
    }
}
