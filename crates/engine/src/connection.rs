//! Connection Builder
//!
//! Turns a [`ConnectionDescriptor`] into a shared [`Connection`] handle. The
//! handle is constructed once and passed explicitly to every component that
//! needs the database.

use std::sync::Arc;

use strata_core::{ConnectionDescriptor, DriverKind};
use tracing::info;

use crate::backends::{backend_for, DatabasePool, DatabasePoolStats, SqlDialect};
use crate::error::{MigrationError, MigrationResult};

/// Shared, thread-safe handle to an open connection pool
#[derive(Clone)]
pub struct Connection {
    pool: Arc<dyn DatabasePool>,
    dialect: SqlDialect,
}

impl Connection {
    /// Wrap an existing pool
    pub fn new(pool: Arc<dyn DatabasePool>, dialect: SqlDialect) -> Self {
        Self { pool, dialect }
    }

    pub fn pool(&self) -> &dyn DatabasePool {
        self.pool.as_ref()
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    /// Bound-parameter token for the zero-based parameter `index`
    pub fn placeholder(&self, index: usize) -> String {
        self.dialect.parameter_placeholder(index)
    }

    pub fn stats(&self) -> DatabasePoolStats {
        self.pool.stats()
    }

    /// Close the pool. Call exactly once, after the last operation.
    pub async fn close(self) {
        self.pool.close().await;
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("dialect", &self.dialect)
            .field("stats", &self.pool.stats())
            .finish()
    }
}

/// Opens connections from descriptors
pub struct ConnectionBuilder;

impl ConnectionBuilder {
    /// Open a pool for `descriptor`, selecting the backend from its driver
    pub async fn connect(descriptor: ConnectionDescriptor) -> MigrationResult<Connection> {
        let backend = backend_for(descriptor.driver);

        let pool = backend
            .create_pool(&descriptor)
            .await
            .map_err(|e| MigrationError::Connection(e.to_string()))?;

        info!(
            driver = %descriptor.driver,
            host = %descriptor.host,
            port = descriptor.port,
            database = %descriptor.database,
            "Connected to database"
        );

        Ok(Connection::new(pool, backend.sql_dialect()))
    }

    /// Placeholder syntax for a driver without opening a connection
    pub fn placeholder_for(driver: DriverKind, index: usize) -> String {
        SqlDialect::from(driver).parameter_placeholder(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeDatabase;

    #[test]
    fn test_placeholder_follows_dialect() {
        let mysql = FakeDatabase::new().connection(SqlDialect::MySQL);
        assert_eq!(mysql.placeholder(0), "?");

        let postgres = FakeDatabase::new().connection(SqlDialect::PostgreSQL);
        assert_eq!(postgres.placeholder(0), "$1");
        assert_eq!(postgres.placeholder(1), "$2");
    }

    #[test]
    fn test_placeholder_for_driver() {
        assert_eq!(ConnectionBuilder::placeholder_for(DriverKind::MySql, 0), "?");
        assert_eq!(ConnectionBuilder::placeholder_for(DriverKind::Postgres, 0), "$1");
    }

    #[tokio::test]
    async fn test_connect_reports_unreachable_host() {
        let mut descriptor = ConnectionDescriptor::new(DriverKind::Postgres, "127.0.0.1", "app", "app")
            .with_port(1);
        descriptor.pool.acquire_timeout_seconds = 2;
        descriptor.pool.min_connections = 0;

        let err = ConnectionBuilder::connect(descriptor).await.unwrap_err();
        assert!(matches!(err, MigrationError::Connection(_)), "got {:?}", err);
    }
}
