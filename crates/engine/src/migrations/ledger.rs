//! Migration Ledger
//!
//! The `migrations` table recording which migrations have been applied. The
//! statements differ per dialect; the contract does not.

use tracing::debug;

use super::definitions::MigrationRecord;
use crate::backends::DatabaseTransaction;
use crate::connection::Connection;
use crate::error::{DatabaseError, MigrationError, MigrationResult};
use crate::executor::{execute_statements, run_statement, Statement};

/// Name of the ledger table
pub const LEDGER_TABLE: &str = "migrations";

/// Ledger operations over a shared connection
#[derive(Debug, Clone)]
pub struct MigrationLedger {
    conn: Connection,
    table: String,
}

impl MigrationLedger {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn,
            table: LEDGER_TABLE.to_string(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// SQL to create the ledger table
    pub fn create_table_sql(&self) -> String {
        let dialect = self.conn.dialect();
        format!(
            "CREATE TABLE {} (\n    \
                id {},\n    \
                name VARCHAR(255) NOT NULL UNIQUE,\n    \
                created_at TIMESTAMP NOT NULL\n\
            )",
            self.table,
            dialect.auto_increment_primary_key()
        )
    }

    /// SQL to check if a migration has been applied
    pub fn check_applied_sql(&self) -> String {
        format!("SELECT 1 FROM {} WHERE name = {}", self.table, self.conn.placeholder(0))
    }

    /// SQL to record a migration as applied, stamped by the database clock
    pub fn record_sql(&self) -> String {
        format!(
            "INSERT INTO {} (name, created_at) VALUES ({}, {})",
            self.table,
            self.conn.placeholder(0),
            self.conn.dialect().current_timestamp()
        )
    }

    /// SQL to list applied migrations
    pub fn applied_sql(&self) -> String {
        format!(
            "SELECT {} AS id, name, created_at FROM {} ORDER BY id",
            self.conn.dialect().cast_bigint("id"),
            self.table
        )
    }

    /// The record step as a statement for the migration's own transaction
    pub fn record_statement(&self, name: &str) -> Statement {
        Statement::prepared(self.record_sql(), vec![name.into()])
    }

    /// Create the ledger table. Fails if it already exists.
    pub async fn init(&self) -> MigrationResult<()> {
        execute_statements(&self.conn, "ledger initialization", &[Statement::Script(self.create_table_sql())]).await
    }

    /// Whether `name` has a ledger row
    pub async fn is_applied(&self, name: &str) -> MigrationResult<bool> {
        let row = self
            .conn
            .pool()
            .fetch_optional(&self.check_applied_sql(), &[name.into()])
            .await
            .map_err(|e| MigrationError::LedgerQuery(format!("checking {}: {}", name, e)))?;

        debug!("Ledger check for {}: {}", name, if row.is_some() { "applied" } else { "pending" });
        Ok(row.is_some())
    }

    /// Insert the ledger row for `name` inside a transaction the caller owns.
    /// The runner appends [`Self::record_statement`] to a migration instead.
    pub async fn record(&self, tx: &mut dyn DatabaseTransaction, name: &str) -> MigrationResult<()> {
        run_statement(tx, &self.record_statement(name))
            .await
            .map_err(|e| MigrationError::Execution {
                name: name.to_string(),
                message: format!("recording in ledger: {}", e),
            })
    }

    /// All ledger rows, oldest first
    pub async fn applied(&self) -> MigrationResult<Vec<MigrationRecord>> {
        let rows = self
            .conn
            .pool()
            .fetch_all(&self.applied_sql(), &[])
            .await
            .map_err(|e| MigrationError::LedgerQuery(format!("listing applied migrations: {}", e)))?;

        rows.iter()
            .map(|row| -> Result<MigrationRecord, DatabaseError> {
                Ok(MigrationRecord {
                    id: row.get_i64(0)?,
                    name: row.get_string(1)?,
                    created_at: row.get_datetime(2)?,
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| MigrationError::LedgerQuery(format!("decoding ledger row: {}", e)))
    }
}
