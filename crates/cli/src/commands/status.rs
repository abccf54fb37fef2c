use std::path::Path;

use anyhow::Context;
use strata_engine::{MigrationStatus, MigrationStatusEntry};

use super::Session;

pub async fn run(config: &Path, dir: &Path, json: bool) -> anyhow::Result<()> {
    let session = Session::open(config).await?;
    let result = session.runner.status(dir).await;
    session.close().await;

    let entries = result.with_context(|| format!("Failed to read migration status for {}", dir.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        print_table(&entries);
    }
    Ok(())
}

fn print_table(entries: &[MigrationStatusEntry]) {
    println!("Migration Status:");
    println!("================");

    if entries.is_empty() {
        println!("No migrations found");
        return;
    }

    let mut pending = 0;
    for entry in entries {
        match &entry.status {
            MigrationStatus::Applied { applied_at } => {
                println!("  ✅ {} (applied {})", entry.name, applied_at.format("%Y-%m-%d %H:%M:%S UTC"))
            }
            MigrationStatus::Pending => {
                pending += 1;
                println!("  ⏳ {}", entry.name);
            }
        }
    }

    println!("\n{} applied, {} pending", entries.len() - pending, pending);
}
