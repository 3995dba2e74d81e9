//! Storage, snapshot and id configuration types.

use serde::Deserialize;

use crate::identifiers::IdStrategy;

/// Storage type discriminator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    #[default]
    Sqlite,
    Postgres,
    Memory,
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage type discriminator.
    #[serde(rename = "type")]
    pub storage_type: StorageType,
    /// Connection address (sqlx URL for SQL backends, ignored for memory).
    pub address: String,
    /// Prefix for the events, snapshots and counters collections.
    pub namespace: String,
    /// Connection pool size.
    pub max_connections: u32,
    /// Backoff for the initial connection.
    pub connect_retry: ConnectRetryConfig,
    /// Seconds between liveness pings. 0 disables the disconnect monitor.
    pub health_check_interval_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_type: StorageType::Sqlite,
            address: "sqlite://eventvault.db".to_string(),
            namespace: "eventvault".to_string(),
            max_connections: 5,
            connect_retry: ConnectRetryConfig::default(),
            health_check_interval_secs: 10,
        }
    }
}

impl StorageConfig {
    /// In-memory storage under `namespace`, without a health monitor.
    pub fn memory(namespace: &str) -> Self {
        Self {
            storage_type: StorageType::Memory,
            address: "memory".to_string(),
            namespace: namespace.to_string(),
            health_check_interval_secs: 0,
            ..Self::default()
        }
    }
}

/// Exponential backoff applied to the startup connection only.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConnectRetryConfig {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_attempts: usize,
}

impl Default for ConnectRetryConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 100,
            max_delay_ms: 5000,
            max_attempts: 30,
        }
    }
}

/// Snapshot configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Build a snapshot when an appended event number is a multiple of this.
    /// 0 disables automatic snapshots.
    /// Default: 5
    pub interval: u64,
    /// Enable reading snapshots when loading aggregate state.
    /// When false, always replays all events from the beginning.
    /// Default: true
    pub read: bool,
    /// Enable writing snapshots after appends.
    /// When false, no snapshots are stored (pure event sourcing).
    /// Default: true
    pub write: bool,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            interval: 5,
            read: true,
            write: true,
        }
    }
}

/// Aggregate id generation configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IdConfig {
    pub strategy: IdStrategy,
    /// Candidates tried before giving up with `IdGenerationExhausted`.
    pub max_attempts: u32,
}

impl Default for IdConfig {
    fn default() -> Self {
        Self {
            strategy: IdStrategy::Uuid,
            max_attempts: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_config_default() {
        let storage = StorageConfig::default();
        assert_eq!(storage.storage_type, StorageType::Sqlite);
        assert_eq!(storage.address, "sqlite://eventvault.db");
        assert_eq!(storage.connect_retry.max_attempts, 30);
        assert_eq!(storage.health_check_interval_secs, 10);
    }

    #[test]
    fn test_memory_config_disables_monitor() {
        let storage = StorageConfig::memory("ideas");
        assert_eq!(storage.storage_type, StorageType::Memory);
        assert_eq!(storage.namespace, "ideas");
        assert_eq!(storage.health_check_interval_secs, 0);
    }

    #[test]
    fn test_snapshot_config_default() {
        let config = SnapshotConfig::default();
        assert_eq!(config.interval, 5);
        assert!(config.read);
        assert!(config.write);
    }
}
