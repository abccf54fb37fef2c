//! Error types for the migration engine
//!
//! [`DatabaseError`] is what backends report; [`MigrationError`] is what the
//! engine reports to its callers, with the stage of the failure attached.

use std::path::PathBuf;

use thiserror::Error;

use crate::migrations::BatchReport;

/// Result type alias for backend operations
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Result type alias for engine operations
pub type MigrationResult<T> = Result<T, MigrationError>;

/// Errors reported by a database backend
#[derive(Debug, Clone, Error)]
pub enum DatabaseError {
    /// Pool creation or connection acquisition failed
    #[error("Connection error: {0}")]
    Connection(String),
    /// A statement failed to execute
    #[error("Query error: {0}")]
    Query(String),
    /// Begin, commit or rollback failed
    #[error("Transaction error: {0}")]
    Transaction(String),
    /// A column could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),
}

/// Errors reported by the migration engine
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Cannot reach or authenticate to the database, or begin a transaction
    #[error("Connection error: {0}")]
    Connection(String),

    /// A statement failed; the transaction was rolled back
    #[error("Migration {name} failed: {message}")]
    Execution { name: String, message: String },

    /// Execution succeeded but the commit did not; the outcome is unknown
    #[error("Commit of {name} failed, its status is unknown and must be checked manually: {message}")]
    Commit { name: String, message: String },

    /// The ledger already records this migration
    #[error("Migration {0} already applied")]
    AlreadyApplied(String),

    /// The applied-check itself failed
    #[error("Ledger query failed: {0}")]
    LedgerQuery(String),

    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot list migrations in {}: {message}", .dir.display())]
    Discovery { dir: PathBuf, message: String },

    #[error("Invalid migration name: {0}")]
    InvalidName(String),

    /// A batch stopped at its first failing migration
    #[error("Batch aborted at {failed} after applying {} migration(s): {source}", .report.applied.len())]
    Batch {
        failed: String,
        report: BatchReport,
        #[source]
        source: Box<MigrationError>,
    },
}

impl MigrationError {
    /// True for outcomes that are reported but are not failures
    pub fn is_skip(&self) -> bool {
        matches!(self, MigrationError::AlreadyApplied(_))
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MigrationError::Io {
            path: path.into(),
            source,
        }
    }
}
