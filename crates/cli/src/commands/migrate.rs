use std::path::Path;

use anyhow::Context;
use strata_engine::{BatchReport, MigrationError};

use super::Session;

/// Apply one migration file. An already-applied file is reported, not an error.
pub async fn single(config: &Path, path: &Path) -> anyhow::Result<()> {
    let session = Session::open(config).await?;
    let result = session.runner.run_single(path).await;
    session.close().await;

    match result {
        Ok(name) => {
            println!("✅ Applied {}", name);
            Ok(())
        }
        Err(e) if e.is_skip() => {
            println!("⏭  {}", e);
            Ok(())
        }
        Err(e) => Err(e).with_context(|| format!("Failed to apply {}", path.display())),
    }
}

/// Apply every pending migration in `dir`, stopping at the first failure
pub async fn batch(config: &Path, dir: &Path) -> anyhow::Result<()> {
    let session = Session::open(config).await?;
    let result = session.runner.run_batch(dir).await;
    session.close().await;

    match result {
        Ok(report) => {
            print_report(&report);
            Ok(())
        }
        Err(MigrationError::Batch { failed, report, source }) => {
            print_report(&report);
            println!("❌ {}", failed);
            Err(anyhow::Error::new(*source).context(format!(
                "Migration {} failed; later migrations were not attempted",
                failed
            )))
        }
        Err(e) => Err(e).with_context(|| format!("Failed to run migrations in {}", dir.display())),
    }
}

fn print_report(report: &BatchReport) {
    for name in &report.skipped {
        println!("⏭  {} (already applied)", name);
    }
    for name in &report.applied {
        println!("✅ {}", name);
    }

    if report.is_noop() {
        println!("Nothing to migrate");
    } else {
        println!(
            "Applied {} migration(s) in {}ms",
            report.applied.len(),
            report.execution_time_ms
        );
    }
}
