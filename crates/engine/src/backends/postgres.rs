//! PostgreSQL Backend Implementation
//!
//! PostgreSQL implementation of the backend traits on top of sqlx.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::postgres::{PgArguments, PgConnectOptions, PgRow, PgSslMode};
use sqlx::{Column, Pool, Postgres, Row, TypeInfo, ValueRef};
use strata_core::{ConnectionDescriptor, DriverKind, SslMode, Transport};

use super::core::*;
use super::pool_options;
use crate::error::{DatabaseError, DatabaseResult};

/// PostgreSQL database backend implementation
#[derive(Debug, Default)]
pub struct PostgresBackend;

impl PostgresBackend {
    pub fn new() -> Self {
        Self
    }

    /// Build connect options field by field so credentials need no escaping.
    /// A `unix` transport treats `host` as the socket directory.
    pub fn connect_options(descriptor: &ConnectionDescriptor) -> PgConnectOptions {
        let mut options = PgConnectOptions::new()
            .port(descriptor.port)
            .username(&descriptor.username)
            .database(&descriptor.database)
            .ssl_mode(pg_ssl_mode(descriptor.ssl_mode));

        options = match descriptor.transport {
            Transport::Tcp => options.host(&descriptor.host),
            Transport::Unix => options.socket(&descriptor.host),
        };

        if let Some(password) = &descriptor.password {
            options = options.password(password);
        }

        options
    }
}

fn pg_ssl_mode(mode: SslMode) -> PgSslMode {
    match mode {
        SslMode::Disable => PgSslMode::Disable,
        SslMode::Allow => PgSslMode::Allow,
        SslMode::Prefer => PgSslMode::Prefer,
        SslMode::Require => PgSslMode::Require,
        SslMode::VerifyCa => PgSslMode::VerifyCa,
        SslMode::VerifyFull => PgSslMode::VerifyFull,
    }
}

#[async_trait]
impl DatabaseBackend for PostgresBackend {
    async fn create_pool(&self, descriptor: &ConnectionDescriptor) -> DatabaseResult<Arc<dyn DatabasePool>> {
        let sqlx_pool = pool_options::<Postgres>(&descriptor.pool)
            .connect_with(Self::connect_options(descriptor))
            .await
            .map_err(|e| DatabaseError::Connection(format!("Failed to create PostgreSQL pool: {}", e)))?;

        Ok(Arc::new(PostgresPool::new(sqlx_pool)))
    }

    fn sql_dialect(&self) -> SqlDialect {
        SqlDialect::PostgreSQL
    }

    fn backend_type(&self) -> DriverKind {
        DriverKind::Postgres
    }
}

/// PostgreSQL connection pool implementation
pub struct PostgresPool {
    pool: Pool<Postgres>,
}

impl PostgresPool {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DatabasePool for PostgresPool {
    async fn begin_transaction(&self) -> DatabaseResult<Box<dyn DatabaseTransaction>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DatabaseError::Connection(format!("Failed to begin transaction: {}", e)))?;

        Ok(Box::new(PostgresTransaction::new(tx)))
    }

    async fn fetch_optional(
        &self,
        sql: &str,
        params: &[DatabaseValue],
    ) -> DatabaseResult<Option<Box<dyn DatabaseRow>>> {
        let mut query = sqlx::query(sql);
        for param in params {
            query = bind_database_value(query, param);
        }

        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::Query(format!("Query fetch failed: {}", e)))?;

        Ok(row.map(|r| Box::new(PostgresRow::new(r)) as Box<dyn DatabaseRow>))
    }

    async fn fetch_all(&self, sql: &str, params: &[DatabaseValue]) -> DatabaseResult<Vec<Box<dyn DatabaseRow>>> {
        let mut query = sqlx::query(sql);
        for param in params {
            query = bind_database_value(query, param);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DatabaseError::Query(format!("Query fetch failed: {}", e)))?;

        Ok(rows
            .into_iter()
            .map(|row| Box::new(PostgresRow::new(row)) as Box<dyn DatabaseRow>)
            .collect())
    }

    async fn close(&self) {
        self.pool.close().await;
    }

    fn stats(&self) -> DatabasePoolStats {
        let total = self.pool.size();
        let idle = self.pool.num_idle() as u32;

        DatabasePoolStats {
            total_connections: total,
            idle_connections: idle,
            active_connections: total.saturating_sub(idle),
        }
    }
}

/// PostgreSQL transaction implementation
pub struct PostgresTransaction {
    tx: Option<sqlx::Transaction<'static, Postgres>>,
}

impl PostgresTransaction {
    pub fn new(tx: sqlx::Transaction<'static, Postgres>) -> Self {
        Self { tx: Some(tx) }
    }

    fn inner(&mut self) -> DatabaseResult<&mut sqlx::Transaction<'static, Postgres>> {
        self.tx
            .as_mut()
            .ok_or_else(|| DatabaseError::Transaction("Transaction already completed".to_string()))
    }
}

#[async_trait]
impl DatabaseTransaction for PostgresTransaction {
    async fn execute(&mut self, sql: &str, params: &[DatabaseValue]) -> DatabaseResult<u64> {
        let tx = self.inner()?;

        let mut query = sqlx::query(sql);
        for param in params {
            query = bind_database_value(query, param);
        }

        let result = query
            .execute(&mut **tx)
            .await
            .map_err(|e| DatabaseError::Query(format!("Query execution failed: {}", e)))?;

        Ok(result.rows_affected())
    }

    async fn execute_script(&mut self, sql: &str) -> DatabaseResult<()> {
        let tx = self.inner()?;

        // Unprepared text goes over the simple query protocol, which accepts
        // several statements in one message.
        sqlx::Executor::execute(&mut **tx, sql)
            .await
            .map_err(|e| DatabaseError::Query(format!("Script execution failed: {}", e)))?;

        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> DatabaseResult<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| DatabaseError::Transaction("Transaction already completed".to_string()))?;

        tx.commit()
            .await
            .map_err(|e| DatabaseError::Transaction(format!("Transaction commit failed: {}", e)))
    }

    async fn rollback(mut self: Box<Self>) -> DatabaseResult<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| DatabaseError::Transaction("Transaction already completed".to_string()))?;

        tx.rollback()
            .await
            .map_err(|e| DatabaseError::Transaction(format!("Transaction rollback failed: {}", e)))
    }
}

/// PostgreSQL row implementation
pub struct PostgresRow {
    row: PgRow,
}

impl PostgresRow {
    pub fn new(row: PgRow) -> Self {
        Self { row }
    }
}

impl DatabaseRow for PostgresRow {
    fn get_by_index(&self, index: usize) -> DatabaseResult<DatabaseValue> {
        postgres_value_to_database_value(&self.row, index)
    }

    fn column_count(&self) -> usize {
        self.row.len()
    }
}

/// Bind a DatabaseValue to a sqlx query
fn bind_database_value<'a>(
    query: sqlx::query::Query<'a, Postgres, PgArguments>,
    value: &DatabaseValue,
) -> sqlx::query::Query<'a, Postgres, PgArguments> {
    match value {
        DatabaseValue::Null => query.bind(Option::<String>::None),
        DatabaseValue::Bool(b) => query.bind(*b),
        DatabaseValue::Int64(i) => query.bind(*i),
        DatabaseValue::String(s) => query.bind(s.clone()),
        DatabaseValue::DateTime(dt) => query.bind(*dt),
    }
}

/// Convert a PostgreSQL column value to DatabaseValue
fn postgres_value_to_database_value(row: &PgRow, index: usize) -> DatabaseResult<DatabaseValue> {
    let column = row
        .columns()
        .get(index)
        .ok_or_else(|| DatabaseError::Decode(format!("Column index {} out of range", index)))?;
    let type_name = column.type_info().name().to_string();

    let raw = row
        .try_get_raw(index)
        .map_err(|e| DatabaseError::Decode(format!("Failed to read column {}: {}", index, e)))?;
    if raw.is_null() {
        return Ok(DatabaseValue::Null);
    }

    let decode_err = |e: sqlx::Error| {
        DatabaseError::Decode(format!("Failed to decode {} column '{}': {}", type_name, column.name(), e))
    };

    match type_name.as_str() {
        "BOOL" => Ok(DatabaseValue::Bool(row.try_get(index).map_err(decode_err)?)),
        "INT2" => Ok(DatabaseValue::Int64(row.try_get::<i16, _>(index).map_err(decode_err)? as i64)),
        "INT4" => Ok(DatabaseValue::Int64(row.try_get::<i32, _>(index).map_err(decode_err)? as i64)),
        "INT8" => Ok(DatabaseValue::Int64(row.try_get(index).map_err(decode_err)?)),
        "TIMESTAMPTZ" => Ok(DatabaseValue::DateTime(row.try_get(index).map_err(decode_err)?)),
        "TIMESTAMP" => {
            let naive: NaiveDateTime = row.try_get(index).map_err(decode_err)?;
            Ok(DatabaseValue::DateTime(DateTime::from_naive_utc_and_offset(naive, Utc)))
        }
        _ => Ok(DatabaseValue::String(row.try_get(index).map_err(decode_err)?)),
    }
}
