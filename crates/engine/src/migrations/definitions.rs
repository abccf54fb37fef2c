//! Migration Definitions - Core types shared by discovery, ledger and runner

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{MigrationError, MigrationResult};

/// One migration file on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    pub path: PathBuf,
    /// Canonical name: the file name without its directory
    pub name: String,
    /// Numeric timestamp prefix, if the name has one
    pub version: Option<u64>,
}

impl MigrationFile {
    /// Describe the migration at `path`
    pub fn from_path(path: impl Into<PathBuf>) -> MigrationResult<Self> {
        let path = path.into();
        let name = super::discovery::migration_name(&path)?;
        let version = super::discovery::version_prefix(&name);
        Ok(Self { path, name, version })
    }

    /// Read the SQL text
    pub fn read_sql(&self) -> MigrationResult<String> {
        fs::read_to_string(&self.path).map_err(|e| MigrationError::io(&self.path, e))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// One row of the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationRecord {
    pub id: i64,
    pub name: String,
    /// Set by the database clock when the row was inserted
    pub created_at: DateTime<Utc>,
}

/// Migration status in the system
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MigrationStatus {
    /// Migration is pending (not yet applied)
    Pending,
    /// Migration has been applied
    Applied { applied_at: DateTime<Utc> },
}

/// A discovered file paired with its ledger status
#[derive(Debug, Clone, Serialize)]
pub struct MigrationStatusEntry {
    pub name: String,
    #[serde(flatten)]
    pub status: MigrationStatus,
}

/// Lifecycle of a single migration within one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationState {
    Pending,
    Checking,
    AlreadyApplied,
    Executing,
    Committed,
    RolledBack,
}

impl MigrationState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MigrationState::AlreadyApplied | MigrationState::Committed | MigrationState::RolledBack
        )
    }
}

/// Result of a batch run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Names applied by this run, in order
    pub applied: Vec<String>,
    /// Names found in the ledger and skipped
    pub skipped: Vec<String>,
    /// Total execution time in milliseconds
    pub execution_time_ms: u128,
}

impl BatchReport {
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }
}
