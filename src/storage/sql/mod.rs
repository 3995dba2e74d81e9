//! Unified SQL storage implementations.
//!
//! This module provides shared implementations for SQL-based storage backends
//! (PostgreSQL, SQLite). The implementations are parameterized by database type
//! using the `SqlDatabase` trait; per-backend trait impls are generated by
//! macros in each store module.

mod event_store;
mod query;
mod sequence_store;
mod snapshot_store;

use chrono::{DateTime, Utc};

pub use event_store::SqlEventStore;
pub use query::SqlDatabase;
pub use sequence_store::SqlSequenceStore;
pub use snapshot_store::SqlSnapshotStore;

use super::{EventRecord, Result, SnapshotRecord, StorageError};
use crate::identifiers::{AggregateId, EventId};

/// Map a sqlx error, turning unique-index violations into `DuplicateKey`.
pub(crate) fn classify(err: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            return StorageError::DuplicateKey(db_err.message().to_string());
        }
    }
    StorageError::Database(err)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::InvalidTimestamp(format!("{raw}: {e}")))
}

/// Decode an events row.
pub(crate) fn decode_event_row<R>(row: &R) -> Result<EventRecord>
where
    R: sqlx::Row,
    &'static str: sqlx::ColumnIndex<R>,
    for<'r> String: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
    for<'r> i64: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
{
    let id: String = row.try_get("id")?;
    let aggregate_id: String = row.try_get("aggregate_id")?;
    let event_number: i64 = row.try_get("event_number")?;
    let name: String = row.try_get("name")?;
    let data: String = row.try_get("data")?;
    let timestamp: String = row.try_get("timestamp")?;
    let position: i64 = row.try_get("position")?;

    Ok(EventRecord {
        id: EventId::new(id),
        aggregate_id: AggregateId::new(aggregate_id),
        event_number: event_number as u64,
        name,
        data: serde_json::from_str(&data)?,
        timestamp: parse_timestamp(&timestamp)?,
        position: position as u64,
    })
}

/// Decode a snapshots row.
pub(crate) fn decode_snapshot_row<R>(row: &R) -> Result<SnapshotRecord>
where
    R: sqlx::Row,
    &'static str: sqlx::ColumnIndex<R>,
    for<'r> String: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
{
    let aggregate_id: String = row.try_get("aggregate_id")?;
    let last_event_id: String = row.try_get("last_event_id")?;
    let state: String = row.try_get("state")?;

    Ok(SnapshotRecord {
        aggregate_id: AggregateId::new(aggregate_id),
        last_event_id: EventId::new(last_event_id),
        state: serde_json::from_str(&state)?,
    })
}

#[cfg(feature = "postgres")]
pub mod postgres {
    //! PostgreSQL database backend.

    use sea_query::PostgresQueryBuilder;
    use sqlx::postgres::PgPoolOptions;
    use sqlx::PgPool;

    /// PostgreSQL database marker type.
    pub struct Postgres;

    impl super::SqlDatabase for Postgres {
        type Pool = PgPool;

        const INTEGER: &'static str = "BIGINT";

        fn build_select(stmt: sea_query::SelectStatement) -> String {
            stmt.to_string(PostgresQueryBuilder)
        }

        fn build_insert(stmt: sea_query::InsertStatement) -> String {
            stmt.to_string(PostgresQueryBuilder)
        }

        fn build_update(stmt: sea_query::UpdateStatement) -> String {
            stmt.to_string(PostgresQueryBuilder)
        }

        fn build_delete(stmt: sea_query::DeleteStatement) -> String {
            stmt.to_string(PostgresQueryBuilder)
        }
    }

    /// Open a PostgreSQL pool.
    pub async fn connect(address: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(address)
            .await
    }

    /// PostgreSQL event store.
    pub type PostgresEventStore = super::SqlEventStore<Postgres>;

    /// PostgreSQL snapshot store.
    pub type PostgresSnapshotStore = super::SqlSnapshotStore<Postgres>;

    /// PostgreSQL sequence store.
    pub type PostgresSequenceStore = super::SqlSequenceStore<Postgres>;
}

#[cfg(feature = "sqlite")]
pub mod sqlite {
    //! SQLite database backend.

    use std::str::FromStr;

    use sea_query::SqliteQueryBuilder;
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use sqlx::SqlitePool;

    /// SQLite database marker type.
    pub struct Sqlite;

    impl super::SqlDatabase for Sqlite {
        type Pool = SqlitePool;

        const INTEGER: &'static str = "INTEGER";

        fn build_select(stmt: sea_query::SelectStatement) -> String {
            stmt.to_string(SqliteQueryBuilder)
        }

        fn build_insert(stmt: sea_query::InsertStatement) -> String {
            stmt.to_string(SqliteQueryBuilder)
        }

        fn build_update(stmt: sea_query::UpdateStatement) -> String {
            stmt.to_string(SqliteQueryBuilder)
        }

        fn build_delete(stmt: sea_query::DeleteStatement) -> String {
            stmt.to_string(SqliteQueryBuilder)
        }
    }

    /// Open a SQLite pool, creating the database file if missing.
    ///
    /// An in-memory database exists per connection, so the pool is pinned
    /// to a single connection for `:memory:` addresses.
    pub async fn connect(address: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(address)?.create_if_missing(true);
        let max_connections = if address.contains(":memory:") {
            1
        } else {
            max_connections
        };
        SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
    }

    /// SQLite event store.
    pub type SqliteEventStore = super::SqlEventStore<Sqlite>;

    /// SQLite snapshot store.
    pub type SqliteSnapshotStore = super::SqlSnapshotStore<Sqlite>;

    /// SQLite sequence store.
    pub type SqliteSequenceStore = super::SqlSequenceStore<Sqlite>;
}
