//! Unified SQL SequenceStore implementation.

use std::marker::PhantomData;

use sea_query::{Expr, InsertStatement, Query, SelectStatement, UpdateStatement};

use super::SqlDatabase;
use crate::storage::schema::{Counters, Tables};
use crate::storage::Result;

/// SQL-based implementation of SequenceStore.
///
/// `next` is a single `UPDATE ... RETURNING`, so concurrent callers never
/// observe the same value.
pub struct SqlSequenceStore<DB: SqlDatabase> {
    pool: DB::Pool,
    tables: Tables,
    _marker: PhantomData<DB>,
}

impl<DB: SqlDatabase> SqlSequenceStore<DB> {
    pub fn new(pool: DB::Pool, namespace: &str) -> Result<Self> {
        Ok(Self {
            pool,
            tables: Tables::new(namespace)?,
            _marker: PhantomData,
        })
    }

    fn seed_statement(&self, name: &str) -> InsertStatement {
        Query::insert()
            .into_table(self.tables.counters.clone())
            .columns([Counters::Name, Counters::Seq])
            .values_panic([name.into(), 0i64.into()])
            .to_owned()
    }

    fn increment_statement(&self, name: &str) -> UpdateStatement {
        Query::update()
            .table(self.tables.counters.clone())
            .value(Counters::Seq, Expr::col(Counters::Seq).add(1))
            .and_where(Expr::col(Counters::Name).eq(name))
            .returning_col(Counters::Seq)
            .to_owned()
    }

    fn current_statement(&self, name: &str) -> SelectStatement {
        Query::select()
            .column(Counters::Seq)
            .from(self.tables.counters.clone())
            .and_where(Expr::col(Counters::Name).eq(name))
            .to_owned()
    }
}

/// Macro to implement SequenceStore for a specific SQL backend.
macro_rules! impl_sequence_store {
    ($db_type:ty, $feature:literal) => {
        #[cfg(feature = $feature)]
        impl SqlSequenceStore<$db_type> {
            /// Create the counters table.
            pub async fn init(&self) -> Result<()> {
                for ddl in self.tables.counters_ddl(<$db_type as SqlDatabase>::INTEGER) {
                    sqlx::query(&ddl).execute(&self.pool).await?;
                }
                Ok(())
            }
        }

        #[cfg(feature = $feature)]
        #[async_trait::async_trait]
        impl crate::storage::SequenceStore for SqlSequenceStore<$db_type> {
            async fn seed(&self, name: &str) -> Result<()> {
                let sql = <$db_type>::build_insert(self.seed_statement(name));
                sqlx::query(&sql)
                    .execute(&self.pool)
                    .await
                    .map_err(super::classify)?;
                Ok(())
            }

            async fn next(&self, name: &str) -> Result<u64> {
                use sqlx::Row;

                let sql = <$db_type>::build_update(self.increment_statement(name));
                let row = sqlx::query(&sql).fetch_optional(&self.pool).await?;
                match row {
                    Some(row) => {
                        let seq: i64 = row.try_get("seq")?;
                        Ok(seq as u64)
                    }
                    None => Err(crate::storage::StorageError::CounterMissing(
                        name.to_string(),
                    )),
                }
            }

            async fn current(&self, name: &str) -> Result<Option<u64>> {
                use sqlx::Row;

                let sql = <$db_type>::build_select(self.current_statement(name));
                let row = sqlx::query(&sql).fetch_optional(&self.pool).await?;
                row.map(|row| row.try_get::<i64, _>("seq").map(|seq| seq as u64))
                    .transpose()
                    .map_err(Into::into)
            }

            async fn close(&self) {
                self.pool.close().await;
            }
        }
    };
}

// Generate implementations for each SQL backend
impl_sequence_store!(super::postgres::Postgres, "postgres");
impl_sequence_store!(super::sqlite::Sqlite, "sqlite");
