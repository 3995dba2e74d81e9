//! Unified SQL EventStore implementation.
//!
//! Uses a macro to generate implementations for each SQL backend,
//! eliminating code duplication while maintaining type safety.

use std::marker::PhantomData;

use sea_query::{Expr, InsertStatement, Order, Query, SelectStatement};

use super::SqlDatabase;
use crate::identifiers::{AggregateId, EventId};
use crate::storage::schema::{Events, Tables};
use crate::storage::{EventRecord, Result};

/// SQL-based implementation of EventStore.
///
/// This generic implementation works with any SQL database that implements
/// the `SqlDatabase` trait (PostgreSQL, SQLite).
pub struct SqlEventStore<DB: SqlDatabase> {
    pool: DB::Pool,
    tables: Tables,
    _marker: PhantomData<DB>,
}

impl<DB: SqlDatabase> SqlEventStore<DB> {
    /// Create a new SQL event store over the given pool and namespace.
    ///
    /// Call `init` before use to create the table and its indexes.
    pub fn new(pool: DB::Pool, namespace: &str) -> Result<Self> {
        Ok(Self {
            pool,
            tables: Tables::new(namespace)?,
            _marker: PhantomData,
        })
    }

    fn select_events(&self) -> SelectStatement {
        Query::select()
            .columns([
                Events::Id,
                Events::AggregateId,
                Events::EventNumber,
                Events::Name,
                Events::Data,
                Events::Timestamp,
                Events::Position,
            ])
            .from(self.tables.events.clone())
            .to_owned()
    }

    fn insert_statement(&self, event: &EventRecord) -> Result<InsertStatement> {
        let data = serde_json::to_string(&event.data)?;
        Ok(Query::insert()
            .into_table(self.tables.events.clone())
            .columns([
                Events::Id,
                Events::AggregateId,
                Events::EventNumber,
                Events::Name,
                Events::Data,
                Events::Timestamp,
                Events::Position,
            ])
            .values_panic([
                event.id.as_str().into(),
                event.aggregate_id.as_str().into(),
                (event.event_number as i64).into(),
                event.name.as_str().into(),
                data.into(),
                event.timestamp.to_rfc3339().into(),
                (event.position as i64).into(),
            ])
            .to_owned())
    }

    fn latest_statement(&self, aggregate_id: &AggregateId) -> SelectStatement {
        self.select_events()
            .and_where(Expr::col(Events::AggregateId).eq(aggregate_id.as_str()))
            .order_by(Events::EventNumber, Order::Desc)
            .limit(1)
            .to_owned()
    }

    fn by_id_statement(&self, id: &EventId) -> SelectStatement {
        self.select_events()
            .and_where(Expr::col(Events::Id).eq(id.as_str()))
            .to_owned()
    }

    fn stream_statement(&self, aggregate_id: &AggregateId, from: u64) -> SelectStatement {
        self.select_events()
            .and_where(Expr::col(Events::AggregateId).eq(aggregate_id.as_str()))
            .and_where(Expr::col(Events::EventNumber).gte(from as i64))
            .order_by(Events::EventNumber, Order::Asc)
            .to_owned()
    }

    fn exists_statement(&self, aggregate_id: &AggregateId) -> SelectStatement {
        Query::select()
            .column(Events::Id)
            .from(self.tables.events.clone())
            .and_where(Expr::col(Events::AggregateId).eq(aggregate_id.as_str()))
            .limit(1)
            .to_owned()
    }

    fn all_statement(&self, from: u64, limit: usize) -> SelectStatement {
        self.select_events()
            .and_where(Expr::col(Events::Position).gte(from as i64))
            .order_by(Events::Position, Order::Asc)
            .limit(limit as u64)
            .to_owned()
    }
}

/// Macro to implement EventStore for a specific SQL backend.
macro_rules! impl_event_store {
    ($db_type:ty, $feature:literal) => {
        #[cfg(feature = $feature)]
        impl SqlEventStore<$db_type> {
            /// Create the events table and its indexes.
            pub async fn init(&self) -> Result<()> {
                for ddl in self.tables.events_ddl(<$db_type as SqlDatabase>::INTEGER) {
                    sqlx::query(&ddl).execute(&self.pool).await?;
                }
                Ok(())
            }
        }

        #[cfg(feature = $feature)]
        #[async_trait::async_trait]
        impl crate::storage::EventStore for SqlEventStore<$db_type> {
            async fn latest_event(&self, aggregate_id: &AggregateId) -> Result<Option<EventRecord>> {
                let sql = <$db_type>::build_select(self.latest_statement(aggregate_id));
                let row = sqlx::query(&sql).fetch_optional(&self.pool).await?;
                row.as_ref().map(super::decode_event_row).transpose()
            }

            async fn insert_events(&self, events: Vec<EventRecord>) -> Result<()> {
                if events.is_empty() {
                    return Ok(());
                }

                // Dropping the transaction on error rolls the whole batch back.
                let mut tx = self.pool.begin().await.map_err(super::classify)?;
                for event in &events {
                    let sql = <$db_type>::build_insert(self.insert_statement(event)?);
                    sqlx::query(&sql)
                        .execute(&mut *tx)
                        .await
                        .map_err(super::classify)?;
                }
                tx.commit().await.map_err(super::classify)?;

                Ok(())
            }

            async fn get_event(&self, id: &EventId) -> Result<Option<EventRecord>> {
                let sql = <$db_type>::build_select(self.by_id_statement(id));
                let row = sqlx::query(&sql).fetch_optional(&self.pool).await?;
                row.as_ref().map(super::decode_event_row).transpose()
            }

            async fn load_stream(
                &self,
                aggregate_id: &AggregateId,
                from: u64,
            ) -> Result<Vec<EventRecord>> {
                let sql = <$db_type>::build_select(self.stream_statement(aggregate_id, from));
                let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
                rows.iter().map(super::decode_event_row).collect()
            }

            async fn stream_exists(&self, aggregate_id: &AggregateId) -> Result<bool> {
                let sql = <$db_type>::build_select(self.exists_statement(aggregate_id));
                let row = sqlx::query(&sql).fetch_optional(&self.pool).await?;
                Ok(row.is_some())
            }

            async fn load_all_from(&self, from: u64, limit: usize) -> Result<Vec<EventRecord>> {
                let sql = <$db_type>::build_select(self.all_statement(from, limit));
                let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
                rows.iter().map(super::decode_event_row).collect()
            }

            async fn ping(&self) -> Result<()> {
                sqlx::query("SELECT 1").execute(&self.pool).await?;
                Ok(())
            }

            async fn close(&self) {
                self.pool.close().await;
            }
        }
    };
}

// Generate implementations for each SQL backend
impl_event_store!(super::postgres::Postgres, "postgres");
impl_event_store!(super::sqlite::Sqlite, "sqlite");
