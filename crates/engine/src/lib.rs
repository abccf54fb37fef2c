//! # strata-engine
//!
//! Applies ordered SQL migration files to MySQL or PostgreSQL, each inside its
//! own transaction, and records applied files in a `migrations` ledger table.
//!
//! ```no_run
//! use strata_core::{ConnectionDescriptor, DriverKind};
//! use strata_engine::{ConnectionBuilder, MigrationRunner};
//!
//! # async fn run() -> Result<(), strata_engine::MigrationError> {
//! let descriptor = ConnectionDescriptor::new(DriverKind::Postgres, "localhost", "app", "app");
//! let conn = ConnectionBuilder::connect(descriptor).await?;
//! let report = MigrationRunner::new(conn.clone()).run_batch("./migrations").await;
//! conn.close().await;
//! println!("applied {}", report?.applied.len());
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod connection;
pub mod error;
pub mod executor;
pub mod migrations;

#[cfg(test)]
mod testing;

pub use backends::{DatabaseBackend, DatabasePool, DatabaseTransaction, DatabaseValue, SqlDialect};
pub use connection::{Connection, ConnectionBuilder};
pub use error::{DatabaseError, DatabaseResult, MigrationError, MigrationResult};
pub use executor::{execute_statements, execute_transactional, Statement};
pub use migrations::{
    discover, generate, BatchReport, MigrationFile, MigrationLedger, MigrationRecord, MigrationRunner,
    MigrationStatus, MigrationStatusEntry, RunnerOptions,
};
