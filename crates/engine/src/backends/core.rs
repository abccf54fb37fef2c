//! Core Database Backend Traits
//!
//! The capability set every backend provides: a connection pool that can run
//! queries and hand out transactions, plus the SQL dialect details the ledger
//! needs to build its statements.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use strata_core::{ConnectionDescriptor, DriverKind};

use crate::error::{DatabaseError, DatabaseResult};

/// Database value enumeration for type-safe parameter binding
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseValue {
    Null,
    Bool(bool),
    Int64(i64),
    String(String),
    DateTime(DateTime<Utc>),
}

impl DatabaseValue {
    pub fn is_null(&self) -> bool {
        matches!(self, DatabaseValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DatabaseValue::Int64(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DatabaseValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            DatabaseValue::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }
}

impl From<bool> for DatabaseValue {
    fn from(value: bool) -> Self {
        DatabaseValue::Bool(value)
    }
}

impl From<i64> for DatabaseValue {
    fn from(value: i64) -> Self {
        DatabaseValue::Int64(value)
    }
}

impl From<String> for DatabaseValue {
    fn from(value: String) -> Self {
        DatabaseValue::String(value)
    }
}

impl From<&str> for DatabaseValue {
    fn from(value: &str) -> Self {
        DatabaseValue::String(value.to_string())
    }
}

impl From<DateTime<Utc>> for DatabaseValue {
    fn from(value: DateTime<Utc>) -> Self {
        DatabaseValue::DateTime(value)
    }
}

impl<T> From<Option<T>> for DatabaseValue
where
    T: Into<DatabaseValue>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => DatabaseValue::Null,
        }
    }
}

/// SQL dialect enumeration for generating database-specific SQL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
    PostgreSQL,
    MySQL,
}

impl SqlDialect {
    /// Get the parameter placeholder for the zero-based parameter `index`
    pub fn parameter_placeholder(&self, index: usize) -> String {
        match self {
            SqlDialect::PostgreSQL => format!("${}", index + 1),
            SqlDialect::MySQL => "?".to_string(),
        }
    }

    /// Database-side current time, so ledger timestamps share one clock
    pub fn current_timestamp(&self) -> &'static str {
        match self {
            SqlDialect::PostgreSQL => "NOW()",
            SqlDialect::MySQL => "CURRENT_TIMESTAMP",
        }
    }

    /// Column definition for an auto-incrementing integer primary key
    pub fn auto_increment_primary_key(&self) -> &'static str {
        match self {
            SqlDialect::PostgreSQL => "SERIAL PRIMARY KEY",
            SqlDialect::MySQL => "INT NOT NULL AUTO_INCREMENT PRIMARY KEY",
        }
    }

    /// Cast expression yielding a 64-bit integer
    pub fn cast_bigint(&self, expr: &str) -> String {
        match self {
            SqlDialect::PostgreSQL => format!("CAST({} AS BIGINT)", expr),
            SqlDialect::MySQL => format!("CAST({} AS SIGNED)", expr),
        }
    }
}

impl From<DriverKind> for SqlDialect {
    fn from(driver: DriverKind) -> Self {
        match driver {
            DriverKind::MySql => SqlDialect::MySQL,
            DriverKind::Postgres => SqlDialect::PostgreSQL,
        }
    }
}

/// Abstract database row
pub trait DatabaseRow: Send + Sync {
    /// Get a column value by index
    fn get_by_index(&self, index: usize) -> DatabaseResult<DatabaseValue>;

    fn column_count(&self) -> usize;

    fn get_i64(&self, index: usize) -> DatabaseResult<i64> {
        let value = self.get_by_index(index)?;
        value
            .as_i64()
            .ok_or_else(|| DatabaseError::Decode(format!("column {} is not an integer: {:?}", index, value)))
    }

    fn get_string(&self, index: usize) -> DatabaseResult<String> {
        match self.get_by_index(index)? {
            DatabaseValue::String(s) => Ok(s),
            other => Err(DatabaseError::Decode(format!("column {} is not a string: {:?}", index, other))),
        }
    }

    fn get_datetime(&self, index: usize) -> DatabaseResult<DateTime<Utc>> {
        let value = self.get_by_index(index)?;
        value
            .as_datetime()
            .ok_or_else(|| DatabaseError::Decode(format!("column {} is not a timestamp: {:?}", index, value)))
    }
}

/// Abstract database transaction
///
/// Dropping a transaction without committing rolls it back.
#[async_trait]
pub trait DatabaseTransaction: Send {
    /// Execute a single prepared statement with bound parameters
    async fn execute(&mut self, sql: &str, params: &[DatabaseValue]) -> DatabaseResult<u64>;

    /// Execute SQL text that may hold several `;`-separated statements
    async fn execute_script(&mut self, sql: &str) -> DatabaseResult<()>;

    async fn commit(self: Box<Self>) -> DatabaseResult<()>;

    async fn rollback(self: Box<Self>) -> DatabaseResult<()>;
}

/// Abstract database connection pool
#[async_trait]
pub trait DatabasePool: Send + Sync {
    /// Begin a transaction on a pooled connection
    async fn begin_transaction(&self) -> DatabaseResult<Box<dyn DatabaseTransaction>>;

    /// Execute a query directly on the pool and return the first row, if any
    async fn fetch_optional(
        &self,
        sql: &str,
        params: &[DatabaseValue],
    ) -> DatabaseResult<Option<Box<dyn DatabaseRow>>>;

    /// Execute a query directly on the pool and return all rows
    async fn fetch_all(&self, sql: &str, params: &[DatabaseValue]) -> DatabaseResult<Vec<Box<dyn DatabaseRow>>>;

    /// Close the pool, waiting for checked-out connections to return
    async fn close(&self);

    fn stats(&self) -> DatabasePoolStats;
}

/// Database pool statistics
#[derive(Debug, Clone, Default)]
pub struct DatabasePoolStats {
    pub total_connections: u32,
    pub idle_connections: u32,
    pub active_connections: u32,
}

/// Database backend trait that provides database-specific implementations
#[async_trait]
pub trait DatabaseBackend: Send + Sync {
    /// Open a connection pool described by `descriptor`
    async fn create_pool(&self, descriptor: &ConnectionDescriptor) -> DatabaseResult<Arc<dyn DatabasePool>>;

    fn sql_dialect(&self) -> SqlDialect;

    fn backend_type(&self) -> DriverKind;
}
