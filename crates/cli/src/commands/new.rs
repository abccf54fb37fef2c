use std::path::Path;

use anyhow::Context;
use chrono::Utc;
use strata_engine::generate;

/// Create an empty migration file; needs no database
pub fn run(dir: &Path, name: &str) -> anyhow::Result<()> {
    let path = generate(dir, name, Utc::now())
        .with_context(|| format!("Failed to create migration {}", name))?;

    println!("Created migration: {}", path.display());
    Ok(())
}
