//! Unified SQL SnapshotStore implementation.
//!
//! Uses a macro to generate implementations for each SQL backend,
//! eliminating code duplication while maintaining type safety.

use std::marker::PhantomData;

use sea_query::{DeleteStatement, Expr, InsertStatement, OnConflict, Query, SelectStatement};

use super::SqlDatabase;
use crate::identifiers::AggregateId;
use crate::storage::schema::{Snapshots, Tables};
use crate::storage::{Result, SnapshotRecord};

/// SQL-based implementation of SnapshotStore.
///
/// Holds at most one row per aggregate; `put` is an upsert keyed on
/// `aggregate_id`.
pub struct SqlSnapshotStore<DB: SqlDatabase> {
    pool: DB::Pool,
    tables: Tables,
    _marker: PhantomData<DB>,
}

impl<DB: SqlDatabase> SqlSnapshotStore<DB> {
    /// Create a new SQL snapshot store with the given pool.
    pub fn new(pool: DB::Pool, namespace: &str) -> Result<Self> {
        Ok(Self {
            pool,
            tables: Tables::new(namespace)?,
            _marker: PhantomData,
        })
    }

    fn get_statement(&self, aggregate_id: &AggregateId) -> SelectStatement {
        Query::select()
            .columns([
                Snapshots::AggregateId,
                Snapshots::LastEventId,
                Snapshots::State,
            ])
            .from(self.tables.snapshots.clone())
            .and_where(Expr::col(Snapshots::AggregateId).eq(aggregate_id.as_str()))
            .to_owned()
    }

    fn upsert_statement(&self, snapshot: &SnapshotRecord) -> Result<InsertStatement> {
        let state = serde_json::to_string(&snapshot.state)?;
        let updated_at = chrono::Utc::now().to_rfc3339();

        Ok(Query::insert()
            .into_table(self.tables.snapshots.clone())
            .columns([
                Snapshots::AggregateId,
                Snapshots::LastEventId,
                Snapshots::State,
                Snapshots::UpdatedAt,
            ])
            .values_panic([
                snapshot.aggregate_id.as_str().into(),
                snapshot.last_event_id.as_str().into(),
                state.into(),
                updated_at.into(),
            ])
            .on_conflict(
                OnConflict::column(Snapshots::AggregateId)
                    .update_columns([
                        Snapshots::LastEventId,
                        Snapshots::State,
                        Snapshots::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .to_owned())
    }

    fn delete_statement(&self, aggregate_id: &AggregateId) -> DeleteStatement {
        Query::delete()
            .from_table(self.tables.snapshots.clone())
            .and_where(Expr::col(Snapshots::AggregateId).eq(aggregate_id.as_str()))
            .to_owned()
    }
}

/// Macro to implement SnapshotStore for a specific SQL backend.
macro_rules! impl_snapshot_store {
    ($db_type:ty, $feature:literal) => {
        #[cfg(feature = $feature)]
        impl SqlSnapshotStore<$db_type> {
            /// Create the snapshots table and its unique index.
            pub async fn init(&self) -> Result<()> {
                for ddl in self.tables.snapshots_ddl() {
                    sqlx::query(&ddl).execute(&self.pool).await?;
                }
                Ok(())
            }
        }

        #[cfg(feature = $feature)]
        #[async_trait::async_trait]
        impl crate::storage::SnapshotStore for SqlSnapshotStore<$db_type> {
            async fn get(&self, aggregate_id: &AggregateId) -> Result<Option<SnapshotRecord>> {
                let sql = <$db_type>::build_select(self.get_statement(aggregate_id));
                let row = sqlx::query(&sql).fetch_optional(&self.pool).await?;
                row.as_ref().map(super::decode_snapshot_row).transpose()
            }

            async fn put(&self, snapshot: SnapshotRecord) -> Result<()> {
                let sql = <$db_type>::build_insert(self.upsert_statement(&snapshot)?);
                sqlx::query(&sql)
                    .execute(&self.pool)
                    .await
                    .map_err(super::classify)?;
                Ok(())
            }

            async fn delete(&self, aggregate_id: &AggregateId) -> Result<()> {
                let sql = <$db_type>::build_delete(self.delete_statement(aggregate_id));
                sqlx::query(&sql).execute(&self.pool).await?;
                Ok(())
            }

            async fn close(&self) {
                self.pool.close().await;
            }
        }
    };
}

// Generate implementations for each SQL backend
impl_snapshot_store!(super::postgres::Postgres, "postgres");
impl_snapshot_store!(super::sqlite::Sqlite, "sqlite");
