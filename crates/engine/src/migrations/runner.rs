//! Migration Runner - Applies migrations against the database
//!
//! A migration is checked against the ledger, executed, and recorded in the
//! same transaction as its own statements, so a ledger row exists exactly
//! when the migration's effects were committed. Batches stop at the first
//! failure: later migrations may depend on the failed one's schema.

use std::path::Path;
use std::time::Instant;

use tracing::{debug, info};

use super::definitions::{
    BatchReport, MigrationFile, MigrationState, MigrationStatus, MigrationStatusEntry,
};
use super::discovery::discover;
use super::ledger::MigrationLedger;
use crate::connection::Connection;
use crate::error::{MigrationError, MigrationResult};
use crate::executor::{execute_statements, script_statements};

/// Runner options
#[derive(Debug, Clone, Default)]
pub struct RunnerOptions {
    /// Execute each statement of a file separately, inside the one transaction
    pub split_statements: bool,
}

/// Migration runner that executes migrations against a database
pub struct MigrationRunner {
    conn: Connection,
    ledger: MigrationLedger,
    options: RunnerOptions,
}

impl MigrationRunner {
    pub fn new(conn: Connection) -> Self {
        Self::with_options(conn, RunnerOptions::default())
    }

    pub fn with_options(conn: Connection, options: RunnerOptions) -> Self {
        let ledger = MigrationLedger::new(conn.clone());
        Self { conn, ledger, options }
    }

    pub fn ledger(&self) -> &MigrationLedger {
        &self.ledger
    }

    /// Create the ledger table
    pub async fn init(&self) -> MigrationResult<()> {
        self.ledger.init().await?;
        info!("Initialized ledger table {}", self.ledger.table());
        Ok(())
    }

    /// Apply the migration at `path`
    ///
    /// Returns the migration name, or [`MigrationError::AlreadyApplied`] when
    /// the ledger already has it.
    pub async fn run_single(&self, path: impl AsRef<Path>) -> MigrationResult<String> {
        let migration = MigrationFile::from_path(path.as_ref())?;
        self.apply(&migration).await?;
        Ok(migration.name)
    }

    /// Apply every pending migration in `dir`, in order, stopping at the first failure
    pub async fn run_batch(&self, dir: impl AsRef<Path>) -> MigrationResult<BatchReport> {
        let start_time = Instant::now();
        let migrations = discover(dir.as_ref())?;
        let mut report = BatchReport::default();

        for migration in &migrations {
            match self.apply(migration).await {
                Ok(()) => report.applied.push(migration.name.clone()),
                Err(MigrationError::AlreadyApplied(name)) => {
                    info!("Migration {} already applied, skipping", name);
                    report.skipped.push(name);
                }
                Err(err) => {
                    report.execution_time_ms = start_time.elapsed().as_millis();
                    return Err(MigrationError::Batch {
                        failed: migration.name.clone(),
                        report,
                        source: Box::new(err),
                    });
                }
            }
        }

        report.execution_time_ms = start_time.elapsed().as_millis();
        info!(
            "Batch complete: {} applied, {} skipped in {}ms",
            report.applied.len(),
            report.skipped.len(),
            report.execution_time_ms
        );
        Ok(report)
    }

    /// Discovered migrations with their ledger status
    pub async fn status(&self, dir: impl AsRef<Path>) -> MigrationResult<Vec<MigrationStatusEntry>> {
        let migrations = discover(dir.as_ref())?;
        let applied = self.ledger.applied().await?;

        Ok(migrations
            .into_iter()
            .map(|migration| {
                let status = applied
                    .iter()
                    .find(|record| record.name == migration.name)
                    .map(|record| MigrationStatus::Applied {
                        applied_at: record.created_at,
                    })
                    .unwrap_or(MigrationStatus::Pending);

                MigrationStatusEntry {
                    name: migration.name,
                    status,
                }
            })
            .collect())
    }

    async fn apply(&self, migration: &MigrationFile) -> MigrationResult<()> {
        let name = migration.name.as_str();
        transition(name, MigrationState::Pending);

        transition(name, MigrationState::Checking);
        if self.ledger.is_applied(name).await? {
            transition(name, MigrationState::AlreadyApplied);
            return Err(MigrationError::AlreadyApplied(name.to_string()));
        }

        let sql = migration.read_sql()?;
        let started = Instant::now();

        let mut statements = script_statements(&sql, self.conn.dialect(), self.options.split_statements);
        statements.push(self.ledger.record_statement(name));

        transition(name, MigrationState::Executing);
        match execute_statements(&self.conn, name, &statements).await {
            Ok(()) => {
                transition(name, MigrationState::Committed);
                info!("Migration {} completed in {}ms", name, started.elapsed().as_millis());
                Ok(())
            }
            Err(err) => {
                if !matches!(err, MigrationError::Commit { .. }) {
                    transition(name, MigrationState::RolledBack);
                }
                Err(err)
            }
        }
    }
}

fn transition(name: &str, state: MigrationState) {
    debug!(migration = name, state = ?state, "Migration state changed");
}
