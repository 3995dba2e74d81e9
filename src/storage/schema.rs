//! Database schema definitions using sea-query.
//!
//! Column identifiers are static; table names are derived from the store
//! namespace at initialization, so they are carried as [`Alias`]es in
//! [`Tables`].

use sea_query::{Alias, Iden};

use super::{validate_namespace, Result};

/// Events table columns.
#[derive(Iden)]
pub enum Events {
    #[iden = "id"]
    Id,
    #[iden = "aggregate_id"]
    AggregateId,
    #[iden = "event_number"]
    EventNumber,
    #[iden = "name"]
    Name,
    #[iden = "data"]
    Data,
    #[iden = "timestamp"]
    Timestamp,
    #[iden = "position"]
    Position,
}

/// Snapshots table columns.
#[derive(Iden)]
pub enum Snapshots {
    #[iden = "aggregate_id"]
    AggregateId,
    #[iden = "last_event_id"]
    LastEventId,
    #[iden = "state"]
    State,
    #[iden = "updated_at"]
    UpdatedAt,
}

/// Counters table columns.
#[derive(Iden)]
pub enum Counters {
    #[iden = "name"]
    Name,
    #[iden = "seq"]
    Seq,
}

/// Namespaced table names.
#[derive(Debug, Clone)]
pub struct Tables {
    pub namespace: String,
    pub events: Alias,
    pub snapshots: Alias,
    pub counters: Alias,
}

impl Tables {
    pub fn new(namespace: &str) -> Result<Self> {
        validate_namespace(namespace)?;
        Ok(Self {
            namespace: namespace.to_string(),
            events: Alias::new(format!("{namespace}_events")),
            snapshots: Alias::new(format!("{namespace}_snapshots")),
            counters: Alias::new(format!("{namespace}_counters")),
        })
    }

    fn index_prefix(&self) -> String {
        format!("store_{}", self.namespace)
    }

    /// DDL for the events table and its three indexes.
    pub fn events_ddl(&self, integer: &str) -> Vec<String> {
        let ns = &self.namespace;
        let prefix = self.index_prefix();
        vec![
            format!(
                r#"CREATE TABLE IF NOT EXISTS "{ns}_events" (
    "id" TEXT NOT NULL PRIMARY KEY,
    "aggregate_id" TEXT NOT NULL,
    "event_number" {integer} NOT NULL,
    "name" TEXT NOT NULL,
    "data" TEXT NOT NULL,
    "timestamp" TEXT NOT NULL,
    "position" {integer} NOT NULL
)"#
            ),
            format!(
                r#"CREATE UNIQUE INDEX IF NOT EXISTS "{prefix}_aggregate_id_event_number" ON "{ns}_events" ("aggregate_id", "event_number")"#
            ),
            format!(
                r#"CREATE UNIQUE INDEX IF NOT EXISTS "{prefix}_position" ON "{ns}_events" ("position")"#
            ),
            format!(
                r#"CREATE INDEX IF NOT EXISTS "{prefix}_aggregate_id" ON "{ns}_events" ("aggregate_id")"#
            ),
        ]
    }

    /// DDL for the snapshots table and its unique aggregate index.
    pub fn snapshots_ddl(&self) -> Vec<String> {
        let ns = &self.namespace;
        let prefix = self.index_prefix();
        vec![
            format!(
                r#"CREATE TABLE IF NOT EXISTS "{ns}_snapshots" (
    "aggregate_id" TEXT NOT NULL,
    "last_event_id" TEXT NOT NULL,
    "state" TEXT NOT NULL,
    "updated_at" TEXT NOT NULL
)"#
            ),
            format!(
                r#"CREATE UNIQUE INDEX IF NOT EXISTS "{prefix}_snapshots_aggregate_id" ON "{ns}_snapshots" ("aggregate_id")"#
            ),
        ]
    }

    /// DDL for the counters table.
    pub fn counters_ddl(&self, integer: &str) -> Vec<String> {
        let ns = &self.namespace;
        vec![format!(
            r#"CREATE TABLE IF NOT EXISTS "{ns}_counters" (
    "name" TEXT NOT NULL PRIMARY KEY,
    "seq" {integer} NOT NULL
)"#
        )]
    }
}
