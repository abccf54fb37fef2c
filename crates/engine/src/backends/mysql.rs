//! MySQL Backend Implementation
//!
//! MySQL implementation of the backend traits on top of sqlx. MySQL commits
//! implicitly around DDL, so only the DML in a migration is truly rolled back.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::mysql::{MySqlArguments, MySqlConnectOptions, MySqlRow, MySqlSslMode};
use sqlx::{Column, MySql, Pool, Row, TypeInfo, ValueRef};
use strata_core::{ConnectionDescriptor, DriverKind, SslMode, Transport};

use super::core::*;
use super::pool_options;
use crate::error::{DatabaseError, DatabaseResult};

/// MySQL database backend implementation
#[derive(Debug, Default)]
pub struct MySqlBackend;

impl MySqlBackend {
    pub fn new() -> Self {
        Self
    }

    /// Build connect options; a `unix` transport treats `host` as the socket path
    pub fn connect_options(descriptor: &ConnectionDescriptor) -> MySqlConnectOptions {
        let mut options = MySqlConnectOptions::new()
            .username(&descriptor.username)
            .database(&descriptor.database)
            .ssl_mode(mysql_ssl_mode(descriptor.ssl_mode));

        options = match descriptor.transport {
            Transport::Tcp => options.host(&descriptor.host).port(descriptor.port),
            Transport::Unix => options.socket(&descriptor.host),
        };

        if let Some(password) = &descriptor.password {
            options = options.password(password);
        }

        options
    }
}

fn mysql_ssl_mode(mode: SslMode) -> MySqlSslMode {
    match mode {
        SslMode::Disable => MySqlSslMode::Disabled,
        SslMode::Allow | SslMode::Prefer => MySqlSslMode::Preferred,
        SslMode::Require => MySqlSslMode::Required,
        SslMode::VerifyCa => MySqlSslMode::VerifyCa,
        SslMode::VerifyFull => MySqlSslMode::VerifyIdentity,
    }
}

#[async_trait]
impl DatabaseBackend for MySqlBackend {
    async fn create_pool(&self, descriptor: &ConnectionDescriptor) -> DatabaseResult<Arc<dyn DatabasePool>> {
        let sqlx_pool = pool_options::<MySql>(&descriptor.pool)
            .connect_with(Self::connect_options(descriptor))
            .await
            .map_err(|e| DatabaseError::Connection(format!("Failed to create MySQL pool: {}", e)))?;

        Ok(Arc::new(MySqlPool::new(sqlx_pool)))
    }

    fn sql_dialect(&self) -> SqlDialect {
        SqlDialect::MySQL
    }

    fn backend_type(&self) -> DriverKind {
        DriverKind::MySql
    }
}

/// MySQL connection pool implementation
pub struct MySqlPool {
    pool: Pool<MySql>,
}

impl MySqlPool {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DatabasePool for MySqlPool {
    async fn begin_transaction(&self) -> DatabaseResult<Box<dyn DatabaseTransaction>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DatabaseError::Connection(format!("Failed to begin transaction: {}", e)))?;

        Ok(Box::new(MySqlTransaction::new(tx)))
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

        Ok(row.map(|r| Box::new(MySqlDbRow::new(r)) as Box<dyn DatabaseRow>))
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
            .map(|row| Box::new(MySqlDbRow::new(row)) as Box<dyn DatabaseRow>)
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

/// MySQL transaction implementation
pub struct MySqlTransaction {
    tx: Option<sqlx::Transaction<'static, MySql>>,
}

impl MySqlTransaction {
    pub fn new(tx: sqlx::Transaction<'static, MySql>) -> Self {
        Self { tx: Some(tx) }
    }

    fn inner(&mut self) -> DatabaseResult<&mut sqlx::Transaction<'static, MySql>> {
        self.tx
            .as_mut()
            .ok_or_else(|| DatabaseError::Transaction("Transaction already completed".to_string()))
    }
}

#[async_trait]
impl DatabaseTransaction for MySqlTransaction {
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

        // Text protocol; sqlx negotiates CLIENT_MULTI_STATEMENTS on connect.
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

/// MySQL row implementation
pub struct MySqlDbRow {
    row: MySqlRow,
}

impl MySqlDbRow {
    pub fn new(row: MySqlRow) -> Self {
        Self { row }
    }
}

impl DatabaseRow for MySqlDbRow {
    fn get_by_index(&self, index: usize) -> DatabaseResult<DatabaseValue> {
        mysql_value_to_database_value(&self.row, index)
    }

    fn column_count(&self) -> usize {
        self.row.len()
    }
}

/// Bind a DatabaseValue to a sqlx query
fn bind_database_value<'a>(
    query: sqlx::query::Query<'a, MySql, MySqlArguments>,
    value: &DatabaseValue,
) -> sqlx::query::Query<'a, MySql, MySqlArguments> {
    match value {
        DatabaseValue::Null => query.bind(Option::<String>::None),
        DatabaseValue::Bool(b) => query.bind(*b),
        DatabaseValue::Int64(i) => query.bind(*i),
        DatabaseValue::String(s) => query.bind(s.clone()),
        DatabaseValue::DateTime(dt) => query.bind(*dt),
    }
}

/// Convert a MySQL column value to DatabaseValue
fn mysql_value_to_database_value(row: &MySqlRow, index: usize) -> DatabaseResult<DatabaseValue> {
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
        "BOOLEAN" => Ok(DatabaseValue::Bool(row.try_get(index).map_err(decode_err)?)),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            Ok(DatabaseValue::Int64(row.try_get(index).map_err(decode_err)?))
        }
        name if name.ends_with("UNSIGNED") => {
            let value: u64 = row.try_get(index).map_err(decode_err)?;
            let value = i64::try_from(value)
                .map_err(|_| DatabaseError::Decode(format!("Unsigned value {} overflows i64", value)))?;
            Ok(DatabaseValue::Int64(value))
        }
        "TIMESTAMP" | "DATETIME" => {
            let naive: NaiveDateTime = row.try_get(index).map_err(decode_err)?;
            Ok(DatabaseValue::DateTime(DateTime::from_naive_utc_and_offset(naive, Utc)))
        }
        _ => Ok(DatabaseValue::String(row.try_get(index).map_err(decode_err)?)),
    }
}
