//! Migration Discovery
//!
//! Lists `*.sql` files in one directory and orders them by the Unix timestamp
//! prefix the generator puts in front of every name (`1701234567_add_users.sql`).
//! Equal prefixes fall back to the full file name. Files without a numeric
//! prefix sort after all numbered ones.

use std::cmp::Ordering;
use std::fs;
use std::path::Path;

use super::definitions::MigrationFile;
use crate::error::{MigrationError, MigrationResult};

/// Canonical migration name: the final path segment
pub fn migration_name(path: &Path) -> MigrationResult<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| MigrationError::InvalidName(path.display().to_string()))
}

/// Numeric prefix before the first `_`
pub fn version_prefix(name: &str) -> Option<u64> {
    let prefix = name.split('_').next()?;
    let prefix = prefix.strip_suffix(".sql").unwrap_or(prefix);
    if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    prefix.parse().ok()
}

/// Application order of two migrations
pub fn compare(a: &MigrationFile, b: &MigrationFile) -> Ordering {
    match (a.version, b.version) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.name.cmp(&b.name)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.name.cmp(&b.name),
    }
}

/// Discover migrations in `dir`, in application order
pub fn discover(dir: impl AsRef<Path>) -> MigrationResult<Vec<MigrationFile>> {
    let dir = dir.as_ref();
    let discovery_error = |message: String| MigrationError::Discovery {
        dir: dir.to_path_buf(),
        message,
    };

    let entries = fs::read_dir(dir).map_err(|e| discovery_error(e.to_string()))?;

    let mut migrations = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| discovery_error(format!("Failed to read directory entry: {}", e)))?;

        let path = entry.path();
        if !path.extension().map_or(false, |ext| ext == "sql") {
            continue;
        }
        let file_type = entry
            .file_type()
            .map_err(|e| discovery_error(format!("Failed to stat {}: {}", path.display(), e)))?;
        if file_type.is_dir() {
            continue;
        }

        migrations.push(MigrationFile::from_path(path)?);
    }

    migrations.sort_by(compare);

    if let Some(pair) = migrations
        .windows(2)
        .find(|pair| pair[0].version.is_some() && pair[0].version == pair[1].version)
    {
        tracing::warn!(
            "Migrations {} and {} share timestamp {}; applying them in file name order",
            pair[0].name,
            pair[1].name,
            pair[0].version.unwrap_or_default()
        );
    }

    tracing::debug!("Discovered {} migration(s) in {}", migrations.len(), dir.display());
    Ok(migrations)
}
