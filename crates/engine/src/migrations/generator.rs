//! Migration stub generation

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::{MigrationError, MigrationResult};

/// File name for a migration created at `now`: `{unix_seconds}_{name}.sql`
pub fn migration_file_name(name: &str, now: DateTime<Utc>) -> String {
    format!("{}_{}.sql", now.timestamp(), name)
}

/// Create an empty migration in `dir`, creating the directory if needed
///
/// Never overwrites: two stubs with the same name in the same second fail
/// with an `AlreadyExists` IO error.
pub fn generate(dir: impl AsRef<Path>, name: &str, now: DateTime<Utc>) -> MigrationResult<PathBuf> {
    let dir = dir.as_ref();
    let name = name.trim();
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(MigrationError::InvalidName(name.to_string()));
    }

    fs::create_dir_all(dir).map_err(|e| MigrationError::io(dir, e))?;

    let file_name = migration_file_name(name, now);
    let path = dir.join(&file_name);

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(|e| MigrationError::io(&path, e))?;
    file.write_all(format!("-- Migration name: {}\n", file_name).as_bytes())
        .map_err(|e| MigrationError::io(&path, e))?;

    tracing::info!("Created migration {}", path.display());
    Ok(path)
}
